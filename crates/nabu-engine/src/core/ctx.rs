use crate::time::FrameTime;

/// Requests an app can make of the runtime from inside a frame.
///
/// Commands are buffered and applied after the current callback returns.
#[derive(Debug, Default)]
pub struct RuntimeCtx {
    exit_requested: bool,
}

impl RuntimeCtx {
    /// Stop the loop after the current frame.
    pub fn exit(&mut self) {
        self.exit_requested = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }
}

/// Per-frame context passed to `core::App::on_frame`.
pub struct FrameCtx<'a> {
    pub title: &'a str,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}
