use serde_json::{Map, Value as Json};

use crate::error::ViewError;
use crate::tag::TagDescriptor;

/// A template object: a nested mapping whose keys are directives or child
/// tag descriptors.
///
/// ```json
/// {
///   "ul#todo.list": {
///     "li.item": {
///       "forEach:task": "{{ tasks }}",
///       "if": "{{ task.visible }}",
///       "bind:text": "{{ task.title }}",
///       "on:click": "{{ toggle(task) }}"
///     }
///   }
/// }
/// ```
///
/// Key order is preserved and is the order children are rendered in.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    root: Map<String, Json>,
}

impl Template {
    pub fn from_json_str(src: &str) -> Result<Self, ViewError> {
        Self::from_value(serde_json::from_str(src)?)
    }

    pub fn from_value(value: Json) -> Result<Self, ViewError> {
        match value {
            Json::Object(root) => Ok(Self { root }),
            other => Err(ViewError::config(format!(
                "a template must be an object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn root(&self) -> &Map<String, Json> {
        &self.root
    }
}

/// One classified key of a template node.
#[derive(Debug)]
pub enum Entry<'t> {
    Once(&'t str, &'t Json),
    Bind(&'t str, &'t Json),
    On(&'t str, &'t Json),
    ForEach(&'t str, &'t Json),
    If(&'t Json),
    Child(TagDescriptor, &'t Map<String, Json>),
}

impl<'t> Entry<'t> {
    pub fn classify(key: &'t str, value: &'t Json) -> Result<Self, ViewError> {
        if key == "if" {
            return Ok(Entry::If(value));
        }
        if let Some((prefix, name)) = key.split_once(':') {
            if name.is_empty() {
                return Err(ViewError::config(format!("directive `{}` has no name", key)));
            }
            return match prefix {
                "once"    => Ok(Entry::Once(name, value)),
                "bind"    => Ok(Entry::Bind(name, value)),
                "on"      => Ok(Entry::On(name, value)),
                "forEach" => Ok(Entry::ForEach(name, value)),
                _ => Err(ViewError::config(format!("unknown directive `{}`", key))),
            };
        }
        let tag = TagDescriptor::parse(key)?;
        match value {
            Json::Object(map) => Ok(Entry::Child(tag, map)),
            other => Err(ViewError::config(format!(
                "child `{}` must map to an object, got {}",
                key,
                json_kind(other)
            ))),
        }
    }
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null      => "null",
        Json::Bool(_)   => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_)  => "an array",
        Json::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_object_text() {
        let t = Template::from_json_str(r#"{ "div#app": { "bind:title": "{{ title }}" } }"#).unwrap();
        assert_eq!(t.root().len(), 1);
    }

    #[test]
    fn key_order_is_preserved() {
        let t = Template::from_json_str(r#"{ "b": {}, "a": {}, "c": {} }"#).unwrap();
        let keys: Vec<_> = t.root().keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn non_object_template_is_rejected() {
        assert!(matches!(Template::from_value(json!([1, 2])), Err(ViewError::Config(_))));
        assert!(matches!(Template::from_json_str("{"), Err(ViewError::Json(_))));
    }

    #[test]
    fn classifies_directives() {
        let v = json!("x");
        assert!(matches!(Entry::classify("once:id", &v), Ok(Entry::Once("id", _))));
        assert!(matches!(Entry::classify("bind:text", &v), Ok(Entry::Bind("text", _))));
        assert!(matches!(Entry::classify("on:click", &v), Ok(Entry::On("click", _))));
        assert!(matches!(Entry::classify("forEach:row", &v), Ok(Entry::ForEach("row", _))));
        assert!(matches!(Entry::classify("if", &v), Ok(Entry::If(_))));
    }

    #[test]
    fn classifies_children() {
        let v = json!({});
        match Entry::classify("p.note", &v).unwrap() {
            Entry::Child(tag, map) => {
                assert_eq!(tag.tag, "p");
                assert!(map.is_empty());
            }
            other => panic!("expected child, got {:?}", other),
        }
    }

    #[test]
    fn rejects_bad_keys() {
        let v = json!("x");
        assert!(Entry::classify("style:color", &v).is_err());
        assert!(Entry::classify("bind:", &v).is_err());
        assert!(Entry::classify("span", &v).is_err());
    }
}
