//! Headless frame loop.

mod frame_loop;

pub use frame_loop::{Runtime, RuntimeConfig};
