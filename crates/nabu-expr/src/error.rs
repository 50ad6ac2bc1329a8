use std::fmt;

// ── ParseError ────────────────────────────────────────────────────────────

/// Which stage rejected an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown character run or unterminated string.
    Lexical,
    /// Unbalanced brackets, duplicate operands, misplaced operators.
    Syntax,
    /// A token list the compiler has no rule for (empty input, stray operator).
    Compile,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Lexical => "lexical",
            ErrorKind::Syntax  => "syntax",
            ErrorKind::Compile => "compile",
        })
    }
}

/// A template expression that could not be turned into a resolver.
///
/// These are configuration bugs in a template, so they are never retried;
/// `expr` carries the offending source so the template can be located.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ErrorKind,
    pub message: String,
    /// The expression source the error was raised for.
    pub expr: String,
}

impl ParseError {
    pub(crate) fn new(kind: ErrorKind, msg: impl Into<String>, expr: &str) -> Self {
        Self { kind, message: msg.into(), expr: expr.to_string() }
    }

    pub(crate) fn lexical(msg: impl Into<String>, expr: &str) -> Self {
        Self::new(ErrorKind::Lexical, msg, expr)
    }

    pub(crate) fn syntax(msg: impl Into<String>, expr: &str) -> Self {
        Self::new(ErrorKind::Syntax, msg, expr)
    }

    pub(crate) fn compile(msg: impl Into<String>, expr: &str) -> Self {
        Self::new(ErrorKind::Compile, msg, expr)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expression {} error in {:?}: {}", self.kind, self.expr, self.message)
    }
}

impl std::error::Error for ParseError {}

// ── EvalError ─────────────────────────────────────────────────────────────

/// A failure while running a compiled resolver.
///
/// Unresolved names are not errors (they evaluate to `undefined`); only
/// operations that cannot proceed at all end up here.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// A call target evaluated to something other than a function.
    NotCallable { expr: String, found: String },
    /// A `forEach` list evaluated to something that cannot be iterated.
    NotIterable { found: String },
    /// Raised by an application-supplied native function.
    Native(String),
}

impl EvalError {
    pub fn native(msg: impl Into<String>) -> Self {
        EvalError::Native(msg.into())
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::NotCallable { expr, found } => {
                write!(f, "call target in {:?} is not a function (found {})", expr, found)
            }
            EvalError::NotIterable { found } => write!(f, "value is not iterable (found {})", found),
            EvalError::Native(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for EvalError {}
