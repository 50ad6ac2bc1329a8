use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use nabu_expr::{ContextStack, EvalError, Object, Value};

use crate::error::{ComponentError, ViewError};
use crate::tag::TagDescriptor;

// ── Component trait ───────────────────────────────────────────────────────

/// Handler installed for an `on:<event>` directive. Receives the event value
/// and returns whatever the directive expression evaluated to.
pub type EventHandler = Rc<dyn Fn(Value) -> Result<Value, EvalError>>;

/// Creates the renderer-side component for a tag name.
pub type ComponentFactory = Rc<dyn Fn(&str) -> Result<Box<dyn Component>, ComponentError>>;

/// The capabilities a renderer provides for each rendered node.
///
/// Every method has a default that fails with
/// [`ComponentError::NotImplemented`], so a renderer missing a capability
/// the template needs fails loudly instead of silently doing nothing.
///
/// # Implementing a renderer
///
/// ```rust,ignore
/// struct Label { text: String }
///
/// impl Component for Label {
///     fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), ComponentError> {
///         match name {
///             "text" => { self.text = value.to_string(); Ok(()) }
///             _ => Ok(()),
///         }
///     }
///     fn clear_children(&mut self) -> Result<(), ComponentError> { Ok(()) }
/// }
/// ```
pub trait Component: 'static {
    fn get_attribute(&self, _name: &str) -> Result<Value, ComponentError> {
        Err(ComponentError::NotImplemented { method: "get_attribute" })
    }

    fn set_attribute(&mut self, _name: &str, _value: Value) -> Result<(), ComponentError> {
        Err(ComponentError::NotImplemented { method: "set_attribute" })
    }

    fn add_event_listener(&mut self, _name: &str, _handler: EventHandler) -> Result<(), ComponentError> {
        Err(ComponentError::NotImplemented { method: "add_event_listener" })
    }

    fn append_child(&mut self, _child: &Element) -> Result<(), ComponentError> {
        Err(ComponentError::NotImplemented { method: "append_child" })
    }

    fn remove_child(&mut self, _child: &Element) -> Result<(), ComponentError> {
        Err(ComponentError::NotImplemented { method: "remove_child" })
    }

    fn clear_children(&mut self) -> Result<(), ComponentError> {
        Err(ComponentError::NotImplemented { method: "clear_children" })
    }

    /// Handlers registered for `name`, used by hosts to fire events.
    fn listeners(&self, _name: &str) -> Result<Vec<EventHandler>, ComponentError> {
        Err(ComponentError::NotImplemented { method: "listeners" })
    }

    /// Attribute snapshot for diagnostics. Optional; empty by default.
    fn attributes(&self) -> Vec<(String, Value)> {
        Vec::new()
    }
}

// ── ComponentId ───────────────────────────────────────────────────────────

/// Process-unique identity of a mounted element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

impl ComponentId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ComponentId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── Element ───────────────────────────────────────────────────────────────

/// Re-runs the directives of the view that created an element.
pub type Updater = Box<dyn FnMut(&Element) -> Result<(), ViewError>>;

/// A live node of the component tree: the renderer's [`Component`] plus
/// what the core needs to keep it up to date (context snapshot, mounted
/// children, and the updater installed by its view).
///
/// The parent exclusively owns its children; dropping the root drops the
/// tree. Nothing in an element's context holds a strong reference back to
/// an element, so the tree never forms cycles.
pub struct Element {
    id: ComponentId,
    tag: TagDescriptor,
    component: RefCell<Box<dyn Component>>,
    context: ContextStack,
    children: RefCell<Vec<Rc<Element>>>,
    updater: RefCell<Option<Updater>>,
    this: Weak<Element>,
}

impl Element {
    pub fn new(tag: TagDescriptor, component: Box<dyn Component>, context: ContextStack) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            id: ComponentId::next(),
            tag,
            component: RefCell::new(component),
            context,
            children: RefCell::new(Vec::new()),
            updater: RefCell::new(None),
            this: this.clone(),
        })
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn tag(&self) -> &TagDescriptor {
        &self.tag
    }

    pub fn name(&self) -> Option<&str> {
        self.tag.name.as_deref()
    }

    /// The scope chain visible to this element's directives: the element
    /// itself first, then the context it was created in.
    pub fn context(&self) -> ContextStack {
        self.context.with_front(Rc::new(ElementScope(self.this.clone())))
    }

    /// Snapshot of the mounted children.
    pub fn children(&self) -> Vec<Rc<Element>> {
        self.children.borrow().clone()
    }

    /// Runs `f` with shared access to the renderer component.
    pub fn with_component<R>(&self, f: impl FnOnce(&dyn Component) -> R) -> R {
        f(self.component.borrow().as_ref())
    }

    pub fn get_attribute(&self, name: &str) -> Result<Value, ComponentError> {
        self.component.borrow().get_attribute(name)
    }

    pub fn set_attribute(&self, name: &str, value: Value) -> Result<(), ComponentError> {
        self.component.borrow_mut().set_attribute(name, value)
    }

    pub fn add_event_listener(&self, name: &str, handler: EventHandler) -> Result<(), ComponentError> {
        self.component.borrow_mut().add_event_listener(name, handler)
    }

    pub fn append_child(&self, child: Rc<Element>) -> Result<(), ComponentError> {
        self.component.borrow_mut().append_child(&child)?;
        self.children.borrow_mut().push(child);
        Ok(())
    }

    pub fn remove_child(&self, child: &Element) -> Result<(), ComponentError> {
        self.component.borrow_mut().remove_child(child)?;
        self.children.borrow_mut().retain(|c| c.id != child.id);
        Ok(())
    }

    pub fn clear_children(&self) -> Result<(), ComponentError> {
        self.component.borrow_mut().clear_children()?;
        self.children.borrow_mut().clear();
        Ok(())
    }

    /// Fires `name` on this element. Handlers run after the component borrow
    /// is released, so they are free to touch the element again.
    pub fn dispatch_event(&self, name: &str, event: Value) -> Result<Vec<Value>, ComponentError> {
        let handlers = self.component.borrow().listeners(name)?;
        handlers
            .iter()
            .map(|handler| handler(event.clone()).map_err(ComponentError::Handler))
            .collect()
    }

    pub fn set_updater(&self, updater: Updater) {
        *self.updater.borrow_mut() = Some(updater);
    }

    /// Runs this element's updater (rebuilding children and refreshing
    /// `bind:` attributes), then updates the freshly mounted children.
    pub fn update(&self) -> Result<(), ViewError> {
        let updater = self.updater.borrow_mut().take();
        if let Some(mut updater) = updater {
            let result = updater(self);
            let mut slot = self.updater.borrow_mut();
            if slot.is_none() {
                *slot = Some(updater);
            }
            drop(slot);
            result?;
        }
        for child in self.children() {
            child.update()?;
        }
        Ok(())
    }

    /// Depth-first search for a descendant (or self) labelled `$name`.
    pub fn find(&self, name: &str) -> Option<Rc<Element>> {
        if self.name() == Some(name) {
            return self.this.upgrade();
        }
        self.children().iter().find_map(|child| child.find(name))
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.id)
            .field("tag", &self.tag.to_string())
            .field("children", &self.children.borrow().len())
            .finish()
    }
}

// ── ElementScope ──────────────────────────────────────────────────────────

/// An element seen as a scope: it owns `tag` plus every attribute its
/// renderer can report. Holds the element weakly.
struct ElementScope(Weak<Element>);

impl Object for ElementScope {
    fn get_own(&self, key: &str) -> Option<Value> {
        let element = self.0.upgrade()?;
        if key == "tag" {
            return Some(Value::str(element.tag.tag.as_str()));
        }
        // A component busy inside a renderer call reports nothing.
        let component = element.component.try_borrow().ok()?;
        component.get_attribute(key).ok()
    }

    fn keys(&self) -> Vec<String> {
        let Some(element) = self.0.upgrade() else {
            return Vec::new();
        };
        let mut keys = vec!["tag".to_string()];
        if let Ok(component) = element.component.try_borrow() {
            keys.extend(component.attributes().into_iter().map(|(k, _)| k));
        }
        keys
    }

    fn type_name(&self) -> &str {
        "Element"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare;
    impl Component for Bare {}

    fn bare() -> Rc<Element> {
        Element::new(TagDescriptor::parse("div").unwrap(), Box::new(Bare), ContextStack::new())
    }

    #[test]
    fn missing_capabilities_fail_loudly() {
        let el = bare();
        assert_eq!(
            el.set_attribute("x", Value::Int(1)),
            Err(ComponentError::NotImplemented { method: "set_attribute" })
        );
        assert!(matches!(
            el.clear_children(),
            Err(ComponentError::NotImplemented { method: "clear_children" })
        ));
        assert!(matches!(el.append_child(bare()), Err(ComponentError::NotImplemented { .. })));
        assert!(el.children().is_empty());
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(bare().id(), bare().id());
    }

    #[test]
    fn element_is_innermost_scope_of_its_context() {
        let el = bare();
        let ctx = el.context();
        assert_eq!(ctx.len(), 1);
        let (_, tag) = ctx.lookup("tag").unwrap();
        assert_eq!(tag, Value::str("div"));
    }

    #[test]
    fn update_without_updater_is_a_no_op() {
        assert!(bare().update().is_ok());
    }
}
