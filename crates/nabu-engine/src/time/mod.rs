//! Frame timing.
//!
//! One [`FrameClock`] per frame loop; call `tick()` once per frame. The
//! update scheduler batches against these ticks.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
