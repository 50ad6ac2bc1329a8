use std::rc::Rc;

use crate::error::{EvalError, ParseError};
use crate::lexer::Token;
use crate::parser::parse;
use crate::resolver::Resolver;
use crate::scope::ContextStack;
use crate::value::Value;

/// One fold step of a compiled expression.
enum Step {
    /// Leading symbol: resolved against the context stack.
    Lookup(String),
    /// Leading literal.
    Constant(Value),
    /// `.name`, or a literal used as a selector (`list.0`).
    Property(Value),
    /// `[expr]`
    Index(Resolver),
    /// `[a, b]`
    Array(Vec<Resolver>),
    /// `(a, b)`
    Call(Vec<Resolver>),
}

fn literal(token: &Token) -> Option<Value> {
    match token {
        Token::Symbol(s) | Token::Str(s) => Some(Value::str(s.as_str())),
        Token::Integer(i) => Some(Value::Int(*i)),
        Token::Float(f) => Some(Value::Float(*f)),
        _ => None,
    }
}

fn compile_lists(lists: &[Vec<Token>], expr: &str) -> Result<Vec<Resolver>, ParseError> {
    lists.iter().map(|tokens| compile_tokens(tokens, expr)).collect()
}

fn compile_step(token: &Token, first: bool, expr: &str) -> Result<Step, ParseError> {
    Ok(match (token, first) {
        (Token::Symbol(name), true) => Step::Lookup(name.clone()),
        (Token::Str(_) | Token::Integer(_) | Token::Float(_), true) => {
            Step::Constant(literal(token).unwrap_or_default())
        }
        (Token::Symbol(_) | Token::Str(_) | Token::Integer(_) | Token::Float(_), false) => {
            Step::Property(literal(token).unwrap_or_default())
        }
        (Token::Index(tokens), false) => Step::Index(compile_tokens(tokens, expr)?),
        (Token::Array(elements), _) => Step::Array(compile_lists(elements, expr)?),
        (Token::Call(args), false) => Step::Call(compile_lists(args, expr)?),
        (other, _) => {
            let position = if first { "leading" } else { "chained" };
            return Err(ParseError::compile(
                format!("no rule for {} {}", position, other.describe()),
                expr,
            ));
        }
    })
}

fn evaluate(steps: &[Step], expr: &str, context: &ContextStack) -> Result<Value, EvalError> {
    // `receiver` trails `current` by one property lookup so calls get their `this`.
    let mut receiver = Value::Undefined;
    let mut current = Value::Undefined;

    for step in steps {
        match step {
            Step::Lookup(name) => {
                (receiver, current) = context.lookup(name).unwrap_or_default();
            }
            Step::Constant(value) => {
                receiver = Value::Undefined;
                current = value.clone();
            }
            Step::Property(key) => {
                let next = current.get(key);
                receiver = std::mem::replace(&mut current, next);
            }
            Step::Index(index) => {
                let key = index.resolve(context)?;
                let next = current.get(&key);
                receiver = std::mem::replace(&mut current, next);
            }
            Step::Array(elements) => {
                let items = elements
                    .iter()
                    .map(|element| element.resolve(context))
                    .collect::<Result<Vec<_>, _>>()?;
                receiver = Value::Undefined;
                current = Value::array(items);
            }
            Step::Call(args) => {
                let args = args
                    .iter()
                    .map(|arg| arg.resolve(context))
                    .collect::<Result<Vec<_>, _>>()?;
                let result = match &current {
                    Value::Function(function) => function.call(&receiver, &args)?,
                    other => {
                        return Err(EvalError::NotCallable {
                            expr: expr.to_string(),
                            found: other.type_name().to_string(),
                        });
                    }
                };
                receiver = Value::Undefined;
                current = result;
            }
        }
    }
    Ok(current)
}

/// Folds a parsed token tree into a resolver.
///
/// `expr` is the source the tokens came from; it only feeds diagnostics.
pub fn compile_tokens(tokens: &[Token], expr: &str) -> Result<Resolver, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::compile("empty expression", expr));
    }
    let steps = tokens
        .iter()
        .enumerate()
        .map(|(i, token)| compile_step(token, i == 0, expr))
        .collect::<Result<Vec<_>, _>>()?;

    let steps: Rc<[Step]> = steps.into();
    let expr: Rc<str> = expr.into();
    Ok(Resolver::new(move |context| evaluate(&steps, &expr, context)))
}

/// Tokenizes, parses and compiles a single expression.
pub fn compile_expr(src: &str) -> Result<Resolver, ParseError> {
    let tokens = parse(src)?;
    log::trace!("compiling expression {:?} ({} top-level token(s))", src.trim(), tokens.len());
    compile_tokens(&tokens, src.trim())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::error::ErrorKind;
    use crate::value::Record;

    fn eval(src: &str, scopes: Vec<Value>) -> Result<Value, EvalError> {
        compile_expr(src).unwrap().resolve(&ContextStack::from(scopes))
    }

    fn record(fields: Vec<(&str, Value)>) -> Value {
        let record = Record::new();
        for (k, v) in fields {
            record.insert(k, v);
        }
        Value::from(Rc::new(record))
    }

    #[test]
    fn method_call_binds_receiver() {
        let get = Value::function("get", |this, _| Ok(this.get_named("val")));
        let obj = record(vec![("val", Value::Int(10)), ("get", get)]);
        let scope = record(vec![("obj", obj)]);
        assert_eq!(eval("obj.get()", vec![scope]).unwrap(), Value::Int(10));
    }

    #[test]
    fn bare_call_receives_owning_scope() {
        let who = Value::function("who", |this, _| Ok(this.get_named("name")));
        let scope = record(vec![("name", Value::str("root")), ("who", who)]);
        assert_eq!(eval("who()", vec![scope]).unwrap(), Value::str("root"));
    }

    #[test]
    fn call_arguments_are_evaluated_in_order() {
        let join = Value::function("join", |_, args| {
            Ok(Value::str(args.iter().map(|a| a.to_string()).collect::<Vec<_>>().join("|")))
        });
        let scope = record(vec![("join", join), ("x", Value::Int(1))]);
        assert_eq!(eval("join(x, 'b', 2.5, [3])", vec![scope]).unwrap(), Value::str("1|b|2.5|3"));
    }

    #[test]
    fn call_result_can_be_chained() {
        let make = Value::function("make", |_, _| {
            Ok(record(vec![("items", Value::array(vec![Value::str("a"), Value::str("b")]))]))
        });
        let scope = record(vec![("make", make)]);
        assert_eq!(eval("make().items[1]", vec![scope]).unwrap(), Value::str("b"));
    }

    #[test]
    fn index_and_array_literal() {
        assert_eq!(eval("[1,2,3][1]", vec![]).unwrap(), Value::Int(2));
    }

    #[test]
    fn index_expression_uses_same_context() {
        let scope = record(vec![
            ("names", Value::array(vec![Value::str("a"), Value::str("b")])),
            ("i", Value::Int(1)),
        ]);
        assert_eq!(eval("names[i]", vec![scope]).unwrap(), Value::str("b"));
    }

    #[test]
    fn literal_as_selector() {
        let scope = record(vec![("list", Value::array(vec![Value::Int(5), Value::Int(6)]))]);
        assert_eq!(eval("list.1", vec![scope.clone()]).unwrap(), Value::Int(6));
        assert_eq!(eval("list.'length'", vec![scope]).unwrap(), Value::Int(2));
    }

    #[test]
    fn array_literal_is_fresh_each_time() {
        let resolver = compile_expr("[1]").unwrap();
        let ctx = ContextStack::new();
        let a = resolver.resolve(&ctx).unwrap();
        let b = resolver.resolve(&ctx).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn unknown_symbol_is_undefined() {
        assert_eq!(eval("nope.deeper", vec![record(vec![])]).unwrap(), Value::Undefined);
    }

    #[test]
    fn calling_a_non_function_fails() {
        let scope = record(vec![("x", Value::Int(1))]);
        let err = eval("x()", vec![scope]).unwrap_err();
        assert!(matches!(err, EvalError::NotCallable { ref found, .. } if found == "integer"));
        assert!(matches!(eval("missing()", vec![]), Err(EvalError::NotCallable { .. })));
    }

    #[test]
    fn native_errors_propagate() {
        let fail = Value::function("fail", |_, _| Err(EvalError::native("boom")));
        let scope = record(vec![("fail", fail)]);
        assert_eq!(eval("fail()", vec![scope]).unwrap_err(), EvalError::native("boom"));
    }

    #[test]
    fn empty_token_list_fails_to_compile() {
        let err = compile_expr("  ").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Compile);
    }

    #[test]
    fn stray_operator_fails_to_compile() {
        let err = compile_tokens(&[Token::Operator('.')], ".").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Compile);
    }
}
