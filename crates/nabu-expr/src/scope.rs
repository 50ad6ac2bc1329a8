use std::rc::Rc;

use crate::value::Value;

struct Frame {
    scope: Value,
    next: Option<Rc<Frame>>,
}

/// The ordered chain of scopes an expression can see, innermost first.
///
/// Stacks are persistent: [`with_front`](Self::with_front) returns a new
/// stack that shares every outer frame with `self`, so a `forEach` can give
/// each item its own frame without copying the enclosing chain.
#[derive(Clone, Default)]
pub struct ContextStack {
    head: Option<Rc<Frame>>,
    len: usize,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stack holding a single (root) scope.
    pub fn root(scope: impl Into<Value>) -> Self {
        Self::new().with_front(scope)
    }

    /// Returns a new stack with `scope` as the innermost frame.
    pub fn with_front(&self, scope: impl Into<Value>) -> Self {
        Self {
            head: Some(Rc::new(Frame { scope: scope.into(), next: self.head.clone() })),
            len: self.len + 1,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Scopes from innermost to outermost.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        std::iter::successors(self.head.as_deref(), |&frame| frame.next.as_deref())
            .map(|frame| &frame.scope)
    }

    /// Finds the innermost scope that owns `name`.
    ///
    /// Returns the owning scope together with the value. A key that is owned
    /// but holds `undefined` does not count: the search moves on to the next
    /// outer scope, so an inner `undefined` never hides an outer value.
    /// `null` is a real value and does stop the search.
    pub fn lookup(&self, name: &str) -> Option<(Value, Value)> {
        self.iter().find_map(|scope| match scope.get_own(name) {
            None | Some(Value::Undefined) => None,
            Some(value) => Some((scope.clone(), value)),
        })
    }
}

/// Index 0 of the vector becomes the innermost scope.
impl From<Vec<Value>> for ContextStack {
    fn from(scopes: Vec<Value>) -> Self {
        scopes
            .into_iter()
            .rev()
            .fold(ContextStack::new(), |stack, scope| stack.with_front(scope))
    }
}
