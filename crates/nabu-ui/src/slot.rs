use std::rc::Rc;

use nabu_expr::{ContextStack, Record, Resolver, Value};

use crate::component::{ComponentFactory, Element};
use crate::error::ViewError;
use crate::view::{create_component, ViewNode};

/// The place one child view occupies inside a parent element, together with
/// whatever the parent built there last time.
///
/// A slot decides on every update whether its cached elements can be kept:
///
/// - a conditional slot keeps its element for as long as the condition stays
///   true, and only rebuilds after the condition goes false and back;
/// - a repeated slot keeps its elements while the list is the same reference
///   with the same length and no per-item condition changed.
///
/// Items of a repeated slot are not compared by value. Mutating an item in
/// place leaves the cached per-item frames untouched; replace the list to
/// force a rebuild.
pub(crate) struct ChildSlot {
    node: Rc<ViewNode>,
    kind: SlotKind,
}

enum SlotKind {
    Conditional { cached: Option<Rc<Element>> },
    Repeated { name: String, list: Resolver, cache: Option<RepeatCache> },
}

struct RepeatCache {
    list: Value,
    contexts: Vec<ContextStack>,
    conditions: Vec<bool>,
    elements: Vec<Rc<Element>>,
}

impl ChildSlot {
    pub(crate) fn new(node: Rc<ViewNode>) -> Self {
        let kind = match &node.repeat {
            Some((name, list)) => SlotKind::Repeated { name: name.clone(), list: list.clone(), cache: None },
            None => SlotKind::Conditional { cached: None },
        };
        Self { node, kind }
    }

    /// Elements this slot contributes to its parent, in order.
    pub(crate) fn evaluate(
        &mut self,
        context: &ContextStack,
        factory: &ComponentFactory,
    ) -> Result<Vec<Rc<Element>>, ViewError> {
        let node = &self.node;
        match &mut self.kind {
            SlotKind::Conditional { cached } => {
                if !node.shows(context)? {
                    *cached = None;
                    return Ok(Vec::new());
                }
                if let Some(element) = cached {
                    return Ok(vec![element.clone()]);
                }
                let element = create_component(node, context.clone(), factory)?;
                *cached = Some(element.clone());
                Ok(vec![element])
            }
            SlotKind::Repeated { name, list, cache } => {
                let value = list.resolve(context)?;
                let items = value.items()?;

                if let Some(cache) = cache.as_mut().filter(|c| c.list.same(&value) && c.contexts.len() == items.len()) {
                    let conditions = cache
                        .contexts
                        .iter()
                        .map(|ctx| node.shows(ctx))
                        .collect::<Result<Vec<_>, _>>()?;
                    if conditions != cache.conditions {
                        log::trace!("`{}`: item conditions changed, rebuilding", node.path);
                        cache.elements = build_shown(node, &cache.contexts, &conditions, factory)?;
                        cache.conditions = conditions;
                    }
                    return Ok(cache.elements.clone());
                }

                log::trace!("`{}`: new list of {} item(s), rebuilding", node.path, items.len());
                let contexts: Vec<ContextStack> = items
                    .into_iter()
                    .map(|item| context.with_front(Rc::new(Record::new().with(name.as_str(), item))))
                    .collect();
                let conditions = contexts.iter().map(|ctx| node.shows(ctx)).collect::<Result<Vec<_>, _>>()?;
                let elements = build_shown(node, &contexts, &conditions, factory)?;
                *cache = Some(RepeatCache { list: value, contexts, conditions, elements: elements.clone() });
                Ok(elements)
            }
        }
    }
}

fn build_shown(
    node: &Rc<ViewNode>,
    contexts: &[ContextStack],
    conditions: &[bool],
    factory: &ComponentFactory,
) -> Result<Vec<Rc<Element>>, ViewError> {
    contexts
        .iter()
        .zip(conditions)
        .filter(|(_, shown)| **shown)
        .map(|(ctx, _)| create_component(node, ctx.clone(), factory))
        .collect()
}
