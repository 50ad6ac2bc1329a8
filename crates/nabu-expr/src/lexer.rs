use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseError;

static SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid symbol pattern"));
static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?[0-9]+$").expect("valid integer pattern"));
static FLOAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?[0-9]+\.[0-9]*$").expect("valid float pattern"));

// ── Token ─────────────────────────────────────────────────────────────────

/// A lexical token, or after parsing, a node of the expression tree.
///
/// The tokenizer only emits the leaf kinds and `Operator`. The parser folds
/// operators away and produces `Index`, `Array` and `Call` nodes that own
/// their nested token lists.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Operands
    Symbol(String),
    Str(String),
    Integer(i64),
    Float(f64),
    // Nodes built by the parser
    /// `obj[expr]`
    Index(Vec<Token>),
    /// `[a, b, ...]`
    Array(Vec<Vec<Token>>),
    /// `callee(a, b, ...)`
    Call(Vec<Vec<Token>>),
    /// One of `[ ] ( ) . ,`
    Operator(char),
}

impl Token {
    pub fn is_operand(&self) -> bool {
        matches!(self, Token::Symbol(_) | Token::Str(_) | Token::Integer(_) | Token::Float(_))
    }

    /// Short human description for error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Symbol(s)   => format!("symbol `{}`", s),
            Token::Str(s)      => format!("string '{}'", s),
            Token::Integer(i)  => format!("integer {}", i),
            Token::Float(f)    => format!("float {}", f),
            Token::Index(_)    => "index".to_string(),
            Token::Array(_)    => "array literal".to_string(),
            Token::Call(_)     => "call".to_string(),
            Token::Operator(c) => format!("operator '{}'", c),
        }
    }
}

fn is_operator(c: char) -> bool {
    matches!(c, '[' | ']' | '(' | ')' | '.' | ',')
}

// ── Lexer ─────────────────────────────────────────────────────────────────

/// Splits an expression into operand runs, quoted strings and operators.
///
/// Everything that is not whitespace, a quote or an operator accumulates into
/// a run; when the run ends it must read as a symbol, an integer or a float
/// in its entirety.
pub struct Lexer<'s> {
    src: &'s str,
    pos: usize,
    run: String,
    tokens: Vec<Token>,
}

impl<'s> Lexer<'s> {
    pub fn new(src: &'s str) -> Self {
        Self { src, pos: 0, run: String::new(), tokens: Vec::new() }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        while let Some(ch) = self.advance() {
            match ch {
                '\'' => {
                    self.flush()?;
                    let s = self.lex_string()?;
                    self.tokens.push(Token::Str(s));
                }
                // `1.5`: a dot right after an integer run continues it as a
                // float, unless the run is itself a selector (`list.0.name`).
                '.' if INTEGER.is_match(&self.run) && !self.run_follows_dot() => self.run.push('.'),
                c if is_operator(c) => {
                    self.flush()?;
                    self.tokens.push(Token::Operator(c));
                }
                c if c.is_whitespace() => self.flush()?,
                c => self.run.push(c),
            }
        }
        self.flush()?;
        Ok(self.tokens)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.src[self.pos..].chars().next()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn run_follows_dot(&self) -> bool {
        matches!(self.tokens.last(), Some(Token::Operator('.')))
    }

    /// Classifies the pending run and pushes it, if any.
    fn flush(&mut self) -> Result<(), ParseError> {
        if self.run.is_empty() {
            return Ok(());
        }
        let run = std::mem::take(&mut self.run);
        let token = if SYMBOL.is_match(&run) {
            Token::Symbol(run)
        } else if INTEGER.is_match(&run) {
            let value = run
                .parse::<i64>()
                .map_err(|_| ParseError::lexical(format!("integer {} is out of range", run), self.src))?;
            Token::Integer(value)
        } else if FLOAT.is_match(&run) {
            let value = run
                .parse::<f64>()
                .map_err(|_| ParseError::lexical(format!("invalid float {}", run), self.src))?;
            Token::Float(value)
        } else {
            return Err(ParseError::lexical(format!("unknown token {:?}", run), self.src));
        };
        self.tokens.push(token);
        Ok(())
    }

    /// Reads up to the closing `'`. No escape sequences.
    fn lex_string(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        loop {
            match self.advance() {
                None => return Err(ParseError::lexical("unterminated string literal", self.src)),
                Some('\'') => break,
                Some(_) => {}
            }
        }
        Ok(self.src[start..self.pos - 1].to_string())
    }
}

/// Tokenizes a raw expression (the text between `{{` and `}}`).
pub fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(src).tokenize()
}
