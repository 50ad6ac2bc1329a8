use std::fmt;
use std::rc::Rc;

use crate::error::EvalError;
use crate::scope::ContextStack;
use crate::value::Value;

type ResolveFn = dyn Fn(&ContextStack) -> Result<Value, EvalError>;

/// A compiled expression: a pure function of the context stack.
///
/// Resolvers never modify the stack they are given. Evaluation may still have
/// side effects through the native functions and getters reachable from it.
#[derive(Clone)]
pub struct Resolver(Rc<ResolveFn>);

impl Resolver {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ContextStack) -> Result<Value, EvalError> + 'static,
    {
        Self(Rc::new(f))
    }

    /// A resolver that ignores the stack and yields `value`.
    pub fn constant(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self::new(move |_| Ok(value.clone()))
    }

    pub fn resolve(&self, context: &ContextStack) -> Result<Value, EvalError> {
        (self.0)(context)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Resolver(..)")
    }
}
