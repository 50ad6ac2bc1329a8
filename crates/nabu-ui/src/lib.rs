//! nabu UI: declarative JSON templates compiled into a live component tree.
//!
//! A template is a nested object. Keys are either child tag descriptors
//! (`tag#id.class$name`) or directives on the enclosing node:
//!
//! | key            | effect                                                   |
//! |----------------|----------------------------------------------------------|
//! | `once:<attr>`  | set once when the element is created                     |
//! | `bind:<attr>`  | re-evaluated and set on every update                     |
//! | `on:<event>`   | handler; the event is visible as `event`                 |
//! | `forEach:<id>` | one element per list item, the item visible as `<id>`    |
//! | `if`           | the element exists only while the value is truthy        |
//!
//! Directive values are strings with `{{ expr }}` spans, compiled by
//! `nabu-expr`.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use nabu_ui::prelude::*;
//!
//! let data = Rc::new(Record::new().with("name", "world"));
//! let view = View::from_json_str(r#"{ "p#hello": { "bind:text": "Hello {{ name }}!" } }"#)?;
//! let root = view.build(ContextStack::root(data.clone()), HeadlessComponent::factory())?;
//!
//! let frames = ManualFrames::new();
//! let scheduler = Scheduler::new(frames.clone());
//! data.insert("name", "nabu");
//! let done = scheduler.request_update(&root);
//! scheduler.pump(&frames, 1);
//! print!("{}", render_outline(&root));   // p#hello [text=Hello nabu!]
//! ```
//!
//! # Plugging in a renderer
//!
//! Implement [`Component`](component::Component) for your renderer's node type
//! and pass a [`ComponentFactory`](component::ComponentFactory) to
//! [`View::build`](view::View::build). Capabilities you leave out fail with
//! `ComponentError::NotImplemented` when a template needs them.

pub mod app;
pub mod component;
pub mod error;
pub mod headless;
pub mod scheduler;
mod slot;
pub mod tag;
pub mod template;
pub mod view;

pub use app::Application;

/// Everything needed to build, render and update a view.
pub mod prelude {
    pub use std::rc::Rc;

    pub use crate::app::{AppHandle, Application, UiApp};
    pub use crate::component::{Component, ComponentFactory, ComponentId, Element, EventHandler};
    pub use crate::error::{ComponentError, ViewError};
    pub use crate::headless::{render_outline, HeadlessComponent};
    pub use crate::scheduler::{BatchReport, FrameDriver, ManualFrames, Scheduler, UpdateReceiver};
    pub use crate::tag::TagDescriptor;
    pub use crate::template::Template;
    pub use crate::view::View;

    pub use nabu_engine::runtime::RuntimeConfig;
    pub use nabu_expr::{ContextStack, EvalError, Function, Object, Record, Value};
}
