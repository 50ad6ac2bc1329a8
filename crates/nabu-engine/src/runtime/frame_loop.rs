use std::time::{Duration, Instant};

use anyhow::{ensure, Result};

use crate::core::{App, AppControl, FrameCtx, RuntimeCtx};
use crate::time::FrameClock;

/// Frame loop configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    /// Frames per second the loop paces itself to.
    pub target_fps: u32,
    /// Stop after this many frames. `None` runs until the app exits.
    pub max_frames: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { title: "nabu".to_string(), target_fps: 60, max_frames: None }
    }
}

impl RuntimeConfig {
    fn frame_budget(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.target_fps))
    }
}

/// Headless frame loop: ticks a [`FrameClock`] at the configured rate and
/// hands each frame to the app. There is no window; renderers that need one
/// are expected to run their own loop and call into the same `App`.
pub struct Runtime;

impl Runtime {
    /// Runs `app` until it returns [`AppControl::Exit`], asks for exit through
    /// [`RuntimeCtx`], or `max_frames` is reached.
    pub fn run<A: App>(config: RuntimeConfig, mut app: A) -> Result<()> {
        ensure!(config.target_fps > 0, "target_fps must be greater than zero");

        let budget = config.frame_budget();
        let mut clock = FrameClock::new();
        let mut runtime = RuntimeCtx::default();

        log::info!("starting frame loop '{}' at {} fps", config.title, config.target_fps);
        app.on_start();

        loop {
            let started = Instant::now();
            let time = clock.tick();

            let control = {
                let mut ctx = FrameCtx { title: &config.title, time, runtime: &mut runtime };
                app.on_frame(&mut ctx)
            };

            if control == AppControl::Exit || runtime.exit_requested() {
                log::debug!("app requested exit after frame {}", time.frame_index);
                break;
            }
            if config.max_frames.is_some_and(|max| clock.frames() >= max) {
                log::debug!("frame limit reached ({} frames)", clock.frames());
                break;
            }

            if let Some(remaining) = budget.checked_sub(started.elapsed()) {
                std::thread::sleep(remaining);
            }
        }

        app.on_exit();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        frames: u64,
        exit_at: Option<u64>,
        started: bool,
        exited: bool,
    }

    impl App for &mut Counter {
        fn on_start(&mut self) {
            self.started = true;
        }

        fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl {
            assert_eq!(ctx.time.frame_index, self.frames);
            self.frames += 1;
            if self.exit_at == Some(self.frames) {
                ctx.runtime.exit();
            }
            AppControl::Continue
        }

        fn on_exit(&mut self) {
            self.exited = true;
        }
    }

    fn fast(max_frames: Option<u64>) -> RuntimeConfig {
        RuntimeConfig { title: "test".into(), target_fps: 1000, max_frames }
    }

    #[test]
    fn stops_at_frame_limit() {
        let mut counter = Counter { frames: 0, exit_at: None, started: false, exited: false };
        Runtime::run(fast(Some(5)), &mut counter).unwrap();
        assert_eq!(counter.frames, 5);
        assert!(counter.started && counter.exited);
    }

    #[test]
    fn stops_when_app_requests_exit() {
        let mut counter = Counter { frames: 0, exit_at: Some(3), started: false, exited: false };
        Runtime::run(fast(Some(100)), &mut counter).unwrap();
        assert_eq!(counter.frames, 3);
    }

    #[test]
    fn zero_fps_is_rejected() {
        let mut counter = Counter { frames: 0, exit_at: None, started: false, exited: false };
        let config = RuntimeConfig { target_fps: 0, ..fast(Some(1)) };
        assert!(Runtime::run(config, &mut counter).is_err());
    }
}
