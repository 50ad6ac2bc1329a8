use std::fmt;

use nabu_expr::{EvalError, ParseError};

// ── ComponentError ────────────────────────────────────────────────────────

/// Failure reported by a renderer's [`Component`](crate::component::Component).
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentError {
    /// The renderer does not provide this capability.
    NotImplemented { method: &'static str },
    /// An event handler failed while being dispatched.
    Handler(EvalError),
    /// Anything else the renderer wants to report.
    Renderer(String),
}

impl fmt::Display for ComponentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentError::NotImplemented { method } => {
                write!(f, "component does not implement `{}`", method)
            }
            ComponentError::Handler(err) => write!(f, "event handler failed: {}", err),
            ComponentError::Renderer(msg) => write!(f, "renderer error: {}", msg),
        }
    }
}

impl std::error::Error for ComponentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ComponentError::Handler(err) => Some(err),
            _ => None,
        }
    }
}

// ── ViewError ─────────────────────────────────────────────────────────────

/// Errors from compiling a template into a view or from building/updating
/// the component tree.
#[derive(Debug)]
pub enum ViewError {
    /// A directive expression failed to compile. `path` is the template key
    /// path, e.g. `div#app/ul/li$item/bind:text`.
    Parse { path: String, source: ParseError },
    /// The template object has a shape the view cannot use.
    Config(String),
    /// The template text is not valid JSON.
    Json(serde_json::Error),
    /// A resolver failed while building or updating.
    Eval(EvalError),
    /// The renderer rejected an operation.
    Component(ComponentError),
    /// The template root produced other than exactly one component.
    RootCount { found: usize },
}

impl ViewError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        ViewError::Config(msg.into())
    }
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewError::Parse { path, source } => write!(f, "in template key `{}`: {}", path, source),
            ViewError::Config(msg) => write!(f, "template configuration error: {}", msg),
            ViewError::Json(err) => write!(f, "template is not valid JSON: {}", err),
            ViewError::Eval(err) => write!(f, "evaluation failed: {}", err),
            ViewError::Component(err) => write!(f, "{}", err),
            ViewError::RootCount { found } => {
                write!(f, "template root must build exactly one component, built {}", found)
            }
        }
    }
}

impl std::error::Error for ViewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ViewError::Parse { source, .. } => Some(source),
            ViewError::Json(err) => Some(err),
            ViewError::Eval(err) => Some(err),
            ViewError::Component(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EvalError> for ViewError {
    fn from(err: EvalError) -> Self {
        ViewError::Eval(err)
    }
}

impl From<ComponentError> for ViewError {
    fn from(err: ComponentError) -> Self {
        ViewError::Component(err)
    }
}

impl From<serde_json::Error> for ViewError {
    fn from(err: serde_json::Error) -> Self {
        ViewError::Json(err)
    }
}
