//! nabu engine crate.
//!
//! Owns the host-side pieces the UI layer runs on: logger setup, frame
//! timing, and a headless frame loop that drives an [`core::App`].

pub mod core;
pub mod logging;
pub mod runtime;
pub mod time;
