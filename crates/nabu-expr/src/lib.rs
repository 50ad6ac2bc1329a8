//! The **nabu** template expression language.
//!
//! Template strings embed expressions in `{{ ... }}` spans. An expression is
//! a single chain: a symbol or literal followed by any mix of property
//! access (`a.b`), indexing (`a[i]`), calls (`a.b(x, 'y')`) and array
//! literals (`[1, 2]`). There are no arithmetic or logical operators; logic
//! lives in the functions the application puts into scope.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`value`] | `Value`, `Object`, `Record`, `Function` |
//! | [`scope`] | `ContextStack` (innermost scope first) |
//! | [`lexer`] | `Lexer`, `Token`, `tokenize` |
//! | [`parser`] | `Parser`, `parse` |
//! | [`compiler`] | `compile_tokens`, `compile_expr` |
//! | [`interpolate`] | `compile_str`, `compile_value` |
//! | [`resolver`] | `Resolver` |
//! | [`error`] | `ParseError`, `EvalError` |
//!
//! # Quick start
//!
//! ```rust
//! use std::rc::Rc;
//! use nabu_expr::{compile_str, ContextStack, Record, Value};
//!
//! let greeting = compile_str("Hello, {{ user.name }}!").unwrap();
//! let data = Record::new().with("user", Rc::new(Record::new().with("name", "Ada")));
//! let out = greeting.resolve(&ContextStack::root(Rc::new(data))).unwrap();
//! assert_eq!(out, Value::str("Hello, Ada!"));
//! ```

pub mod compiler;
pub mod error;
pub mod interpolate;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod scope;
pub mod value;

pub use compiler::{compile_expr, compile_tokens};
pub use error::{ErrorKind, EvalError, ParseError};
pub use interpolate::{compile_str, compile_value};
pub use lexer::{tokenize, Token};
pub use parser::parse;
pub use resolver::Resolver;
pub use scope::ContextStack;
pub use value::{Function, Object, Record, Value};

#[cfg(test)]
mod expression_tests {
    use std::rc::Rc;

    use super::*;

    fn run(src: &str, stack: &ContextStack) -> Value {
        compile_str(src).unwrap().resolve(stack).unwrap()
    }

    fn root(record: Record) -> ContextStack {
        ContextStack::root(Rc::new(record))
    }

    #[test]
    fn literal_round_trip() {
        assert_eq!(run("plain text", &ContextStack::new()), Value::str("plain text"));
    }

    #[test]
    fn single_expression_keeps_identity() {
        let list = Value::array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let out = run("{{ a }}", &root(Record::new().with("a", list.clone())));
        assert!(out.same(&list));
    }

    #[test]
    fn mixed_interpolation() {
        assert_eq!(run("x={{ a }}!", &root(Record::new().with("a", 5))), Value::str("x=5!"));
    }

    #[test]
    fn method_receiver_survives_the_fold() {
        let obj = Record::new()
            .with("val", 10)
            .with("get", Function::native("get", |this, _| Ok(this.get_named("val"))));
        let stack = root(Record::new().with("obj", Rc::new(obj)));
        assert_eq!(run("{{ obj.get() }}", &stack), Value::Int(10));
    }

    #[test]
    fn innermost_scope_shadows() {
        let stack = ContextStack::from(vec![
            Value::from(Rc::new(Record::new().with("x", 1))),
            Value::from(Rc::new(Record::new().with("x", 2))),
        ]);
        assert_eq!(run("{{ x }}", &stack), Value::Int(1));
    }

    #[test]
    fn index_into_array_literal() {
        assert_eq!(run("{{ [1,2,3][1] }}", &ContextStack::new()), Value::Int(2));
    }

    #[test]
    fn unbalanced_brackets_are_syntax_errors() {
        assert_eq!(parse("a[0").unwrap_err().kind, ErrorKind::Syntax);
        assert_eq!(parse("a))").unwrap_err().kind, ErrorKind::Syntax);
    }

    #[test]
    fn duplicate_operand_is_syntax_error() {
        assert_eq!(parse("a b").unwrap_err().kind, ErrorKind::Syntax);
    }

    #[test]
    fn string_arguments_and_nested_calls() {
        let upper = Function::native("upper", |_, args| {
            Ok(Value::str(args.first().map(|a| a.to_string()).unwrap_or_default().to_uppercase()))
        });
        let stack = root(Record::new().with("upper", upper).with("name", "nabu"));
        assert_eq!(run("<{{ upper(upper(name)) }}>", &stack), Value::str("<NABU>"));
        assert_eq!(run("{{ upper('a b') }}", &stack), Value::str("A B"));
    }
}
