use crate::error::ParseError;
use crate::lexer::{tokenize, Token};

// ── Levels ────────────────────────────────────────────────────────────────

/// The construct a nested level is building.
enum Open {
    Index,
    Array(Vec<Vec<Token>>),
    Call(Vec<Vec<Token>>),
}

impl Open {
    fn describe(&self) -> &'static str {
        match self {
            Open::Index    => "index '['",
            Open::Array(_) => "array literal '['",
            Open::Call(_)  => "call '('",
        }
    }
}

/// One entry of the parse stack: the tokens of the expression currently being
/// built, plus the construct that owns it (`None` only for level 0).
struct Level {
    open: Option<Open>,
    tokens: Vec<Token>,
}

// ── Parser ────────────────────────────────────────────────────────────────

/// Shift machine that turns the tokenizer's flat output into a chained
/// expression: a flat list of operands and `Index`/`Array`/`Call` nodes,
/// where each element after the first applies to the value of everything
/// before it.
pub struct Parser<'s> {
    expr: &'s str,
    levels: Vec<Level>,
    /// An operand has been shifted and no operator has consumed it yet.
    operand: bool,
    /// The last operator was `.` and is still waiting for its property name.
    dotted: bool,
}

impl<'s> Parser<'s> {
    pub fn new(expr: &'s str) -> Self {
        Self {
            expr,
            levels: vec![Level { open: None, tokens: Vec::new() }],
            operand: false,
            dotted: false,
        }
    }

    fn err(&self, msg: impl Into<String>) -> ParseError {
        ParseError::syntax(msg, self.expr)
    }

    fn current(&mut self) -> &mut Level {
        // Level 0 is never popped, see `fall`.
        let last = self.levels.len() - 1;
        &mut self.levels[last]
    }

    fn elevate(&mut self, open: Open) {
        self.levels.push(Level { open: Some(open), tokens: Vec::new() });
        self.operand = false;
    }

    fn fall(&mut self, closer: char) -> Result<Level, ParseError> {
        if self.levels.len() <= 1 {
            return Err(self.err(format!("unbalanced '{}' with nothing open", closer)));
        }
        self.levels.pop().ok_or_else(|| self.err("parse stack underflow"))
    }

    /// Appends a finished node to the enclosing level; it acts as an operand.
    fn shift_node(&mut self, node: Token) {
        self.current().tokens.push(node);
        self.operand = true;
    }

    fn check_dangling_dot(&self, at: char) -> Result<(), ParseError> {
        if self.dotted {
            return Err(self.err(format!("expected a property name after '.', found '{}'", at)));
        }
        Ok(())
    }

    pub fn parse_tokens(mut self, tokens: Vec<Token>) -> Result<Vec<Token>, ParseError> {
        for token in tokens {
            match token {
                Token::Operator(op) => self.operator(op)?,
                operand if operand.is_operand() => self.shift_operand(operand)?,
                node => {
                    return Err(self.err(format!("unexpected {} in tokenizer output", node.describe())));
                }
            }
        }

        if self.dotted {
            return Err(self.err("expected a property name after '.' at end of expression"));
        }
        if self.levels.len() != 1 {
            let open = self
                .levels
                .last()
                .and_then(|l| l.open.as_ref())
                .map(Open::describe)
                .unwrap_or("level");
            return Err(self.err(format!("unclosed {} at end of expression", open)));
        }
        Ok(self.levels.pop().map(|l| l.tokens).unwrap_or_default())
    }

    fn shift_operand(&mut self, token: Token) -> Result<(), ParseError> {
        if self.operand {
            return Err(self.err(format!(
                "unexpected {} directly after another operand; expected an operator",
                token.describe()
            )));
        }
        self.current().tokens.push(token);
        self.operand = true;
        self.dotted = false;
        Ok(())
    }

    fn operator(&mut self, op: char) -> Result<(), ParseError> {
        match op {
            '.' => {
                if !self.operand {
                    return Err(self.err("'.' needs an operand before it"));
                }
                self.operand = false;
                self.dotted = true;
            }
            ',' => {
                self.check_dangling_dot(',')?;
                let expr = self.expr;
                let level = self.current();
                let tokens = std::mem::take(&mut level.tokens);
                match &mut level.open {
                    Some(Open::Call(list)) | Some(Open::Array(list)) => {
                        if tokens.is_empty() {
                            return Err(ParseError::syntax("missing operand before ','", expr));
                        }
                        list.push(tokens);
                    }
                    _ => {
                        return Err(ParseError::syntax(
                            "',' is only allowed inside a call or an array literal",
                            expr,
                        ));
                    }
                }
                self.operand = false;
            }
            '[' => {
                self.check_dangling_dot('[')?;
                let open = if self.operand { Open::Index } else { Open::Array(Vec::new()) };
                self.elevate(open);
            }
            ']' => {
                self.check_dangling_dot(']')?;
                let level = self.fall(']')?;
                match level.open {
                    Some(Open::Index) => {
                        if level.tokens.is_empty() {
                            return Err(self.err("empty index expression '[]'"));
                        }
                        self.shift_node(Token::Index(level.tokens));
                    }
                    Some(Open::Array(mut elements)) => {
                        if !level.tokens.is_empty() {
                            elements.push(level.tokens);
                        }
                        self.shift_node(Token::Array(elements));
                    }
                    other => {
                        let open = other.as_ref().map(Open::describe).unwrap_or("level");
                        return Err(self.err(format!("']' cannot close {}", open)));
                    }
                }
            }
            '(' => {
                self.check_dangling_dot('(')?;
                if !self.operand {
                    return Err(self.err("'(' needs a callee before it"));
                }
                self.elevate(Open::Call(Vec::new()));
            }
            ')' => {
                self.check_dangling_dot(')')?;
                let level = self.fall(')')?;
                match level.open {
                    Some(Open::Call(mut args)) => {
                        if !level.tokens.is_empty() {
                            args.push(level.tokens);
                        }
                        self.shift_node(Token::Call(args));
                    }
                    other => {
                        let open = other.as_ref().map(Open::describe).unwrap_or("level");
                        return Err(self.err(format!("')' cannot close {}", open)));
                    }
                }
            }
            other => return Err(self.err(format!("unknown operator '{}'", other))),
        }
        Ok(())
    }
}

/// Tokenizes and parses one expression into its token tree.
pub fn parse(src: &str) -> Result<Vec<Token>, ParseError> {
    let tokens = tokenize(src)?;
    Parser::new(src).parse_tokens(tokens)
}
