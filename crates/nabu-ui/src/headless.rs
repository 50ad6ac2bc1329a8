use std::fmt::Write as _;
use std::rc::Rc;

use indexmap::IndexMap;
use nabu_expr::Value;

use crate::component::{Component, ComponentFactory, ComponentId, Element, EventHandler};
use crate::error::ComponentError;

/// In-memory renderer. Records attributes, listeners and mounted children so
/// the tree can be inspected without a display.
pub struct HeadlessComponent {
    tag: String,
    attributes: IndexMap<String, Value>,
    listeners: IndexMap<String, Vec<EventHandler>>,
    mounted: Vec<ComponentId>,
}

impl HeadlessComponent {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: IndexMap::new(),
            listeners: IndexMap::new(),
            mounted: Vec::new(),
        }
    }

    /// Factory producing a headless component for every tag.
    pub fn factory() -> ComponentFactory {
        Rc::new(|tag: &str| Ok(Box::new(HeadlessComponent::new(tag)) as Box<dyn Component>))
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Ids of the children mounted on this component, in mount order.
    pub fn mounted(&self) -> &[ComponentId] {
        &self.mounted
    }
}

impl Component for HeadlessComponent {
    fn get_attribute(&self, name: &str) -> Result<Value, ComponentError> {
        Ok(self.attributes.get(name).cloned().unwrap_or_default())
    }

    fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), ComponentError> {
        log::trace!("<{}> {} = {}", self.tag, name, value);
        self.attributes.insert(name.to_string(), value);
        Ok(())
    }

    fn add_event_listener(&mut self, name: &str, handler: EventHandler) -> Result<(), ComponentError> {
        self.listeners.entry(name.to_string()).or_default().push(handler);
        Ok(())
    }

    fn append_child(&mut self, child: &Element) -> Result<(), ComponentError> {
        self.mounted.push(child.id());
        Ok(())
    }

    fn remove_child(&mut self, child: &Element) -> Result<(), ComponentError> {
        let before = self.mounted.len();
        self.mounted.retain(|id| *id != child.id());
        if self.mounted.len() == before {
            return Err(ComponentError::Renderer(format!("{} is not mounted on <{}>", child.id(), self.tag)));
        }
        Ok(())
    }

    fn clear_children(&mut self) -> Result<(), ComponentError> {
        self.mounted.clear();
        Ok(())
    }

    fn listeners(&self, name: &str) -> Result<Vec<EventHandler>, ComponentError> {
        Ok(self.listeners.get(name).cloned().unwrap_or_default())
    }

    fn attributes(&self) -> Vec<(String, Value)> {
        self.attributes.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

/// Indented text dump of a tree, one element per line:
///
/// ```text
/// ul#todo.list
///   li.item [text=Write docs, done=false]
///   li.item [text=Ship, done=true]
/// ```
///
/// `id` and `class` are shown in the descriptor rather than the attribute
/// list.
pub fn render_outline(root: &Element) -> String {
    let mut out = String::new();
    outline_into(&mut out, root, 0);
    out
}

fn outline_into(out: &mut String, element: &Element, depth: usize) {
    let attributes: Vec<String> = element.with_component(|c| {
        c.attributes()
            .into_iter()
            .filter(|(name, _)| name != "id" && name != "class")
            .map(|(name, value)| format!("{}={}", name, value))
            .collect()
    });

    let _ = write!(out, "{:indent$}{}", "", element.tag(), indent = depth * 2);
    if !attributes.is_empty() {
        let _ = write!(out, " [{}]", attributes.join(", "));
    }
    out.push('\n');

    for child in element.children() {
        outline_into(out, &child, depth + 1);
    }
}
