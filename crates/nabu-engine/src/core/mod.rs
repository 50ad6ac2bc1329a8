//! Contract between the frame loop and the layers above it.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, RuntimeCtx};
