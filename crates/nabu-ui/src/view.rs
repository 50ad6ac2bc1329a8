use std::rc::Rc;

use nabu_expr::{compile_value, ContextStack, EvalError, Record, Resolver, Value};
use serde_json::{Map, Value as Json};

use crate::component::{ComponentFactory, Element, EventHandler};
use crate::error::ViewError;
use crate::slot::ChildSlot;
use crate::tag::TagDescriptor;
use crate::template::{Entry, Template};

/// Compiled form of one template node. Immutable once built and shared by
/// every element created from it.
#[derive(Debug)]
pub(crate) struct ViewNode {
    pub(crate) tag: TagDescriptor,
    pub(crate) path: String,
    pub(crate) once: Vec<(String, Resolver)>,
    pub(crate) bind: Vec<(String, Resolver)>,
    pub(crate) on: Vec<(String, Resolver)>,
    pub(crate) repeat: Option<(String, Resolver)>,
    pub(crate) condition: Option<Resolver>,
    pub(crate) children: Vec<Rc<ViewNode>>,
}

impl ViewNode {
    fn compile(tag: TagDescriptor, map: &Map<String, Json>, path: String) -> Result<Self, ViewError> {
        log::trace!("compiling view node `{}`", path);

        let mut node = ViewNode {
            tag,
            path,
            once: Vec::new(),
            bind: Vec::new(),
            on: Vec::new(),
            repeat: None,
            condition: None,
            children: Vec::new(),
        };

        for (key, value) in map {
            let key_path = format!("{}/{}", node.path, key);
            let compile = |value: &Json| {
                compile_value(value).map_err(|source| ViewError::Parse { path: key_path.clone(), source })
            };

            match classify(key, value, &key_path)? {
                Entry::Once(name, v) => node.once.push((name.to_string(), compile(v)?)),
                Entry::Bind(name, v) => node.bind.push((name.to_string(), compile(v)?)),
                Entry::On(name, v) => node.on.push((name.to_string(), compile(v)?)),
                Entry::ForEach(name, v) => {
                    if node.repeat.is_some() {
                        return Err(ViewError::config(format!("{}: a node takes at most one forEach", key_path)));
                    }
                    node.repeat = Some((name.to_string(), compile(v)?));
                }
                Entry::If(v) => node.condition = Some(compile(v)?),
                Entry::Child(tag, map) => {
                    node.children.push(Rc::new(ViewNode::compile(tag, map, key_path)?));
                }
            }
        }
        Ok(node)
    }

    /// Evaluates the `if` directive; nodes without one are always shown.
    pub(crate) fn shows(&self, context: &ContextStack) -> Result<bool, EvalError> {
        match &self.condition {
            Some(condition) => Ok(condition.resolve(context)?.truthy()),
            None => Ok(true),
        }
    }
}

fn classify<'t>(key: &'t str, value: &'t Json, path: &str) -> Result<Entry<'t>, ViewError> {
    Entry::classify(key, value).map_err(|err| match err {
        ViewError::Config(msg) => ViewError::Config(format!("{}: {}", path, msg)),
        other => other,
    })
}

/// A template compiled into a tree of view nodes.
///
/// Compilation is eager: every directive expression is parsed when the view
/// is created, so a broken template fails here and never at render time.
///
/// ```rust,ignore
/// let view = View::from_json_str(r#"{ "p.greeting": { "bind:text": "Hello {{ name }}" } }"#)?;
/// let root = view.build(ContextStack::root(data), HeadlessComponent::factory())?;
/// ```
#[derive(Debug)]
pub struct View {
    roots: Vec<Rc<ViewNode>>,
}

impl View {
    pub fn new(template: &Template) -> Result<Self, ViewError> {
        let mut roots = Vec::new();
        for (key, value) in template.root() {
            match classify(key, value, key)? {
                Entry::Child(tag, map) => roots.push(Rc::new(ViewNode::compile(tag, map, key.clone())?)),
                _ => {
                    return Err(ViewError::config(format!(
                        "{}: directives are not allowed at the template root",
                        key
                    )));
                }
            }
        }
        Ok(Self { roots })
    }

    pub fn from_json_str(src: &str) -> Result<Self, ViewError> {
        Self::new(&Template::from_json_str(src)?)
    }

    /// Builds the component tree against `context`.
    ///
    /// The template root must produce exactly one element once its `if` and
    /// `forEach` directives are applied. The element is updated once before
    /// it is returned, so its whole subtree is mounted.
    pub fn build(&self, context: ContextStack, factory: ComponentFactory) -> Result<Rc<Element>, ViewError> {
        let mut built = Vec::new();
        for node in &self.roots {
            built.extend(ChildSlot::new(node.clone()).evaluate(&context, &factory)?);
        }
        if built.len() != 1 {
            return Err(ViewError::RootCount { found: built.len() });
        }
        let root = built.remove(0);
        root.update()?;
        log::debug!("built view rooted at `{}` ({})", root.tag(), root.id());
        Ok(root)
    }
}

/// Instantiates the element for `node`, wires its directives and installs
/// the updater that keeps it current.
pub(crate) fn create_component(
    node: &Rc<ViewNode>,
    context: ContextStack,
    factory: &ComponentFactory,
) -> Result<Rc<Element>, ViewError> {
    let component = factory(&node.tag.tag)?;
    let element = Element::new(node.tag.clone(), component, context);

    if let Some(id) = &node.tag.id {
        element.set_attribute("id", Value::str(id.as_str()))?;
    }
    if let Some(class) = node.tag.class_attr() {
        element.set_attribute("class", Value::from(class))?;
    }

    for (event, resolver) in &node.on {
        let target = Rc::downgrade(&element);
        let resolver = resolver.clone();
        let handler: EventHandler = Rc::new(move |event: Value| {
            let Some(element) = target.upgrade() else {
                return Ok(Value::Undefined);
            };
            let frame = Rc::new(Record::new().with("event", event));
            resolver.resolve(&element.context().with_front(frame))
        });
        element.add_event_listener(event, handler)?;
    }

    let scope = element.context();
    for (name, resolver) in &node.once {
        element.set_attribute(name, resolver.resolve(&scope)?)?;
    }

    let view = node.clone();
    let factory = factory.clone();
    let mut slots: Vec<ChildSlot> = view.children.iter().cloned().map(ChildSlot::new).collect();
    element.set_updater(Box::new(move |element: &Element| -> Result<(), ViewError> {
        let scope = element.context();
        if !slots.is_empty() {
            element.clear_children()?;
            for slot in &mut slots {
                for child in slot.evaluate(&scope, &factory)? {
                    element.append_child(child)?;
                }
            }
        }
        for (name, resolver) in &view.bind {
            element.set_attribute(name, resolver.resolve(&scope)?)?;
        }
        Ok(())
    }));

    Ok(element)
}
