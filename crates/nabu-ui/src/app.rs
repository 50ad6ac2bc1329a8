use std::rc::Rc;

use nabu_engine::core::{App as EngineApp, AppControl, FrameCtx};
use nabu_engine::runtime::{Runtime, RuntimeConfig};
use nabu_engine::time::FrameTime;
use nabu_expr::{ContextStack, Record};

use crate::component::{ComponentFactory, Element};
use crate::error::ViewError;
use crate::headless::HeadlessComponent;
use crate::scheduler::{BatchReport, ManualFrames, Scheduler, UpdateReceiver};
use crate::view::View;

// ── AppHandle ─────────────────────────────────────────────────────────────

/// What the per-frame hook of an [`Application`] gets to work with.
pub struct AppHandle {
    data: Rc<Record>,
    root: Rc<Element>,
    scheduler: Rc<Scheduler>,
    time: Option<FrameTime>,
    exit_requested: bool,
}

impl AppHandle {
    /// The root data scope the template is evaluated against.
    pub fn data(&self) -> &Rc<Record> {
        &self.data
    }

    pub fn root(&self) -> &Rc<Element> {
        &self.root
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Timing of the frame being processed. `None` before the first frame.
    pub fn time(&self) -> Option<FrameTime> {
        self.time
    }

    /// Schedules the whole tree for the batch at the end of this frame.
    pub fn request_update(&self) -> UpdateReceiver {
        self.scheduler.request_update(&self.root)
    }

    /// Stop the application after the current frame.
    pub fn exit(&mut self) {
        self.exit_requested = true;
    }
}

// ── Application ───────────────────────────────────────────────────────────

type FrameHook = Box<dyn FnMut(&mut AppHandle)>;

/// Builder for a template-driven application on the headless runtime.
///
/// ```rust,ignore
/// let data = Rc::new(Record::new().with("count", 0));
/// Application::new()
///     .title("Counter")
///     .template_str(include_str!("ui/main.json"))
///     .data(data.clone())
///     .on_frame(move |app| {
///         let n = app.data().get("count").as_i64().unwrap_or(0);
///         app.data().insert("count", n + 1);
///         let _ = app.request_update();
///     })
///     .run(RuntimeConfig::default())?;
/// ```
pub struct Application {
    title: Option<String>,
    template: Option<String>,
    data: Rc<Record>,
    factory: ComponentFactory,
    on_frame: Option<FrameHook>,
}

impl Application {
    pub fn new() -> Self {
        Self {
            title: None,
            template: None,
            data: Rc::new(Record::new()),
            factory: HeadlessComponent::factory(),
            on_frame: None,
        }
    }

    /// Overrides the title from the [`RuntimeConfig`] passed to [`run`](Self::run).
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// JSON template text for the root view.
    pub fn template_str(mut self, src: impl Into<String>) -> Self {
        self.template = Some(src.into());
        self
    }

    /// Root data scope. Defaults to an empty record.
    pub fn data(mut self, data: Rc<Record>) -> Self {
        self.data = data;
        self
    }

    /// Renderer factory. Defaults to [`HeadlessComponent::factory`].
    pub fn factory(mut self, factory: ComponentFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Called at the start of every frame, before pending updates run.
    pub fn on_frame(mut self, hook: impl FnMut(&mut AppHandle) + 'static) -> Self {
        self.on_frame = Some(Box::new(hook));
        self
    }

    /// Compiles the template and builds the tree without starting a loop.
    pub fn build(self) -> Result<UiApp, ViewError> {
        let src = self
            .template
            .ok_or_else(|| ViewError::config("no template was given to the application"))?;
        let view = View::from_json_str(&src)?;
        let root = view.build(ContextStack::root(self.data.clone()), self.factory)?;

        let frames = ManualFrames::new();
        let scheduler = Rc::new(Scheduler::new(frames.clone()));

        Ok(UiApp {
            title: self.title,
            handle: AppHandle { data: self.data, root, scheduler, time: None, exit_requested: false },
            frames,
            on_frame: self.on_frame,
            totals: BatchReport::default(),
        })
    }

    /// Builds the application and runs it until the frame hook exits or the
    /// runtime's frame limit is reached.
    pub fn run(self, mut config: RuntimeConfig) -> anyhow::Result<()> {
        let app = self.build()?;
        if let Some(title) = &app.title {
            config.title = title.clone();
        }
        Runtime::run(config, app)
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

// ── UiApp ─────────────────────────────────────────────────────────────────

/// A built [`Application`]: the live tree plus its scheduler, driven by the
/// engine frame loop.
pub struct UiApp {
    title: Option<String>,
    handle: AppHandle,
    frames: Rc<ManualFrames>,
    on_frame: Option<FrameHook>,
    totals: BatchReport,
}

impl UiApp {
    pub fn handle(&mut self) -> &mut AppHandle {
        &mut self.handle
    }

    /// Runs the batch requested since the last frame, if any.
    fn flush(&mut self) {
        if self.frames.take_request() {
            let report = self.handle.scheduler.run_batch();
            self.totals.updated += report.updated;
            self.totals.failed += report.failed;
        }
    }
}

impl EngineApp for UiApp {
    fn on_start(&mut self) {
        log::info!("ui app started, root `{}`", self.handle.root.tag());
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl {
        self.handle.time = Some(ctx.time);
        if let Some(hook) = self.on_frame.as_mut() {
            hook(&mut self.handle);
        }
        self.flush();

        if self.handle.exit_requested {
            AppControl::Exit
        } else {
            AppControl::Continue
        }
    }

    fn on_exit(&mut self) {
        log::info!(
            "ui app stopped: {} element update(s), {} failure(s)",
            self.totals.updated,
            self.totals.failed
        );
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::headless::render_outline;

    const COUNTER: &str = r#"{ "div#app": { "span$count": { "bind:text": "count={{ count }}" } } }"#;

    fn fast(max_frames: u64) -> RuntimeConfig {
        RuntimeConfig { title: "test".into(), target_fps: 1000, max_frames: Some(max_frames) }
    }

    #[test]
    fn frame_hook_drives_updates() {
        let data = Rc::new(Record::new().with("count", 0));
        let seen = Rc::new(RefCell::new(String::new()));
        let out = seen.clone();

        Application::new()
            .template_str(COUNTER)
            .data(data.clone())
            .on_frame(move |app| {
                let frame = app.time().map(|t| t.frame_index).unwrap_or(0);
                if frame == 3 {
                    *out.borrow_mut() = render_outline(app.root());
                    app.exit();
                    return;
                }
                app.data().insert("count", frame as i64 + 1);
                let _ = app.request_update();
            })
            .run(fast(100))
            .unwrap();

        assert!(seen.borrow().contains("span$count [text=count=3]"), "{}", seen.borrow());
        assert_eq!(data.get("count"), 3.into());
    }

    #[test]
    fn build_without_frames_leaves_tree_as_built() {
        let data = Rc::new(Record::new().with("count", 1));
        let mut app = Application::new().template_str(COUNTER).data(data.clone()).build().unwrap();
        data.insert("count", 2);

        let span = app.handle().root().find("count").unwrap();
        assert_eq!(span.get_attribute("text").unwrap().to_string(), "count=1");

        let _ = app.handle().request_update();
        app.flush();
        let span = app.handle().root().find("count").unwrap();
        assert_eq!(span.get_attribute("text").unwrap().to_string(), "count=2");
        assert_eq!(app.totals, BatchReport { updated: 1, failed: 0 });
    }

    #[test]
    fn template_errors_surface_from_run() {
        let err = Application::new()
            .template_str(r#"{ "div": { "bind:x": "{{ a b }}" } }"#)
            .run(fast(1))
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<ViewError>(), Some(ViewError::Parse { .. })));

        let err = Application::new().run(fast(1)).unwrap_err();
        assert!(matches!(err.downcast_ref::<ViewError>(), Some(ViewError::Config(_))));
    }
}
