use std::sync::LazyLock;

use regex::Regex;

use crate::compiler::compile_expr;
use crate::error::ParseError;
use crate::resolver::Resolver;
use crate::value::Value;

/// First (non-greedy) `{{ ... }}` span; may cross lines.
static SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{\{(.*?)\}\}").expect("valid interpolation pattern"));

/// Compiles a template string into one resolver.
///
/// - no `{{ }}` span: a constant resolver returning the text;
/// - exactly one span and nothing around it: the expression's own resolver,
///   so arrays, objects and functions pass through untouched;
/// - anything else: all parts are evaluated against the same stack and
///   concatenated as text.
pub fn compile_str(template: &str) -> Result<Resolver, ParseError> {
    let mut parts = Vec::new();
    let mut rest = template;

    while let Some(caps) = SPAN.captures(rest) {
        let (Some(span), Some(inner)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let before = &rest[..span.start()];
        if !before.is_empty() {
            parts.push(Resolver::constant(before));
        }
        parts.push(compile_expr(inner.as_str())?);
        rest = &rest[span.end()..];
    }
    if !rest.is_empty() || parts.is_empty() {
        parts.push(Resolver::constant(rest));
    }

    log::trace!("compiled template {:?} into {} part(s)", template, parts.len());

    if parts.len() == 1 {
        return Ok(parts.remove(0));
    }
    Ok(Resolver::new(move |context| {
        let mut out = String::new();
        for part in &parts {
            out.push_str(&part.resolve(context)?.to_string());
        }
        Ok(Value::str(out))
    }))
}

/// Compiles a raw template value: strings go through [`compile_str`], any
/// other value becomes a constant.
pub fn compile_value(value: &serde_json::Value) -> Result<Resolver, ParseError> {
    match value {
        serde_json::Value::String(s) => compile_str(s),
        other => Ok(Resolver::constant(Value::from(other))),
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::error::ErrorKind;
    use crate::scope::ContextStack;
    use crate::value::Record;

    fn ctx(key: &str, value: impl Into<Value>) -> ContextStack {
        ContextStack::root(Rc::new(Record::new().with(key, value)))
    }

    #[test]
    fn plain_text_round_trips() {
        let r = compile_str("plain text").unwrap();
        assert_eq!(r.resolve(&ContextStack::new()).unwrap(), Value::str("plain text"));
        assert_eq!(r.resolve(&ctx("a", 1)).unwrap(), Value::str("plain text"));
    }

    #[test]
    fn empty_string_is_empty_constant() {
        let r = compile_str("").unwrap();
        assert_eq!(r.resolve(&ContextStack::new()).unwrap(), Value::str(""));
    }

    #[test]
    fn single_expression_passes_value_through() {
        let list = Value::array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let r = compile_str("{{ a }}").unwrap();
        let out = r.resolve(&ctx("a", list.clone())).unwrap();
        assert!(out.same(&list));
    }

    #[test]
    fn mixed_text_interpolates() {
        let r = compile_str("x={{ a }}!").unwrap();
        assert_eq!(r.resolve(&ctx("a", 5)).unwrap(), Value::str("x=5!"));
    }

    #[test]
    fn adjacent_expressions_concatenate() {
        let r = compile_str("{{ a }}{{ a }}").unwrap();
        assert_eq!(r.resolve(&ctx("a", 7)).unwrap(), Value::str("77"));
    }

    #[test]
    fn surrounding_whitespace_forces_text() {
        let r = compile_str(" {{ a }}").unwrap();
        assert_eq!(r.resolve(&ctx("a", 1)).unwrap(), Value::str(" 1"));
    }

    #[test]
    fn scope_shadowing() {
        let r = compile_str("{{ x }}").unwrap();
        let stack = ContextStack::from(vec![
            Value::from(Rc::new(Record::new().with("x", 1))),
            Value::from(Rc::new(Record::new().with("x", 2))),
        ]);
        assert_eq!(r.resolve(&stack).unwrap(), Value::Int(1));
    }

    #[test]
    fn undefined_interpolates_as_text() {
        let r = compile_str("[{{ missing }}]").unwrap();
        assert_eq!(r.resolve(&ContextStack::new()).unwrap(), Value::str("[undefined]"));
    }

    #[test]
    fn unclosed_span_is_literal_text() {
        let r = compile_str("a {{ b").unwrap();
        assert_eq!(r.resolve(&ContextStack::new()).unwrap(), Value::str("a {{ b"));
    }

    #[test]
    fn bad_expression_reports_its_source() {
        let err = compile_str("ok {{ a b }}").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert_eq!(err.expr, " a b ");
    }

    #[test]
    fn raw_values_become_constants() {
        let r = compile_value(&serde_json::json!(42)).unwrap();
        assert_eq!(r.resolve(&ContextStack::new()).unwrap(), Value::Int(42));
        let r = compile_value(&serde_json::json!(true)).unwrap();
        assert_eq!(r.resolve(&ContextStack::new()).unwrap(), Value::Bool(true));
    }
}
