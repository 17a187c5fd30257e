//! The frame loop host
//!
//! [`GuiHost`] owns a toolkit, the registry of bound elements and the
//! application windows. While running, each frame runs every window's
//! update hook, sweeps the registry, then lets the toolkit render.

use std::cell::Cell;
use std::rc::Rc;

use crate::callback::Callback;
use crate::config::HostConfig;
use crate::error::{GuiError, GuiResult};
use crate::lifecycle::{LifecycleHooks, LifecycleManager, LifecyclePhase};
use crate::registry::{ElementRegistry, SweepStats};
use crate::tag::Tag;
use crate::toolkit::Toolkit;
use crate::window::{describe_window, update_window, Ui, Window};

/// Requests the frame loop to stop after the current frame
///
/// Cheap to clone and usable from widget callbacks.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Rc<Cell<bool>>);

impl StopHandle {
    /// Stop the frame loop before the next frame
    pub fn request_stop(&self) {
        self.0.set(true);
    }

    /// Whether a stop has been requested since the last start
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.0.get()
    }

    /// A callback that requests a stop, for wiring to a button
    #[must_use]
    pub fn as_callback(&self) -> Callback {
        let handle = self.clone();
        Callback::infallible(move |_| handle.request_stop()).with_description("request stop")
    }

    fn reset(&self) {
        self.0.set(false);
    }
}

struct NamedWindow {
    name: String,
    window: Box<dyn Window>,
}

/// Owner of the windows and the frame loop
pub struct GuiHost<T: Toolkit> {
    toolkit: T,
    registry: ElementRegistry,
    windows: Vec<NamedWindow>,
    lifecycle: LifecycleManager,
    stop: StopHandle,
    config: HostConfig,
    frames: u64,
}

impl<T: Toolkit> GuiHost<T> {
    /// Create a host with the default configuration
    pub fn new(toolkit: T) -> Self {
        Self::with_config(toolkit, HostConfig::default())
    }

    /// Create a host with `config`
    pub fn with_config(toolkit: T, config: HostConfig) -> Self {
        Self {
            toolkit,
            registry: ElementRegistry::new(),
            windows: Vec::new(),
            lifecycle: LifecycleManager::new(),
            stop: StopHandle::default(),
            config,
            frames: 0,
        }
    }

    /// Registry shared with the host's bindings
    #[must_use]
    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    /// The toolkit the host renders with
    #[must_use]
    pub fn toolkit(&self) -> &T {
        &self.toolkit
    }

    /// Mutable access to the toolkit, for driving it from tests
    pub fn toolkit_mut(&mut self) -> &mut T {
        &mut self.toolkit
    }

    /// Host configuration
    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Current lifecycle phase
    #[must_use]
    pub fn phase(&self) -> LifecyclePhase {
        self.lifecycle.phase()
    }

    /// Replace the lifecycle hooks
    pub fn set_hooks(&mut self, hooks: LifecycleHooks) {
        self.lifecycle.set_hooks(hooks);
    }

    /// A handle that stops the frame loop, for use from callbacks
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Stop the frame loop before the next frame
    pub fn request_stop(&self) {
        self.stop.request_stop();
    }

    /// Whether the host is between `start` and `finish`
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.registry.is_running()
    }

    /// Frames rendered by [`run`](Self::run)
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Add a named window
    ///
    /// Windows added after [`start`](Self::start) are described immediately.
    ///
    /// # Errors
    /// `DuplicateTag` if a window with this name exists.
    pub fn add_window(&mut self, name: impl Into<String>, window: impl Window + 'static) -> GuiResult<()> {
        let name = name.into();
        if self.windows.iter().any(|w| w.name == name) {
            return Err(GuiError::DuplicateTag(Tag::Name(name)));
        }

        let mut window: Box<dyn Window> = Box::new(window);
        if self.is_running() {
            describe_window(window.as_mut(), &mut Ui::new(&mut self.toolkit, &self.registry))?;
        }
        tracing::debug!(%name, "added window");
        self.windows.push(NamedWindow { name, window });
        Ok(())
    }

    /// Window names in the order they were added
    #[must_use]
    pub fn window_names(&self) -> Vec<&str> {
        self.windows.iter().map(|w| w.name.as_str()).collect()
    }

    /// Look up a window by name
    pub fn window_mut(&mut self, name: &str) -> Option<&mut dyn Window> {
        for named in &mut self.windows {
            if named.name == name {
                return Some(named.window.as_mut());
            }
        }
        None
    }

    /// Open the viewport, describe every window and enter the running state
    ///
    /// A host runs once.
    ///
    /// # Errors
    /// `NotRunning` once the host has finished.
    pub fn start(&mut self) -> GuiResult<()> {
        if self.is_running() {
            return Ok(());
        }
        if self.lifecycle.is_terminated() {
            tracing::warn!("host has already finished, refusing to restart");
            return Err(GuiError::NotRunning);
        }

        self.toolkit.setup(&self.config.viewport)?;
        self.stop.reset();
        self.frames = 0;
        self.registry.set_running(true);

        for named in &mut self.windows {
            let mut ui = Ui::new(&mut self.toolkit, &self.registry);
            describe_window(named.window.as_mut(), &mut ui)?;
        }

        self.lifecycle.start()?;
        tracing::info!(
            title = %self.config.viewport.title,
            windows = self.windows.len(),
            bindings = self.registry.len(),
            "host started"
        );
        Ok(())
    }

    /// Run one frame's window hooks and registry sweep
    ///
    /// # Errors
    /// `NotRunning` outside [`start`](Self::start) / [`finish`](Self::finish).
    pub fn tick(&mut self) -> GuiResult<SweepStats> {
        if !self.is_running() {
            return Err(GuiError::NotRunning);
        }

        for named in &mut self.windows {
            let mut ui = Ui::new(&mut self.toolkit, &self.registry);
            update_window(named.window.as_mut(), &mut ui)?;
        }

        self.registry.update_all(&mut self.toolkit)
    }

    /// Run the frame loop until the toolkit closes, a stop is requested or
    /// the configured frame limit is reached
    ///
    /// Returns the number of frames rendered.
    pub fn run(&mut self) -> GuiResult<u64> {
        if let Err(error) = self.start() {
            if let Err(exit_error) = self.finish() {
                tracing::warn!(%exit_error, "shutdown after failed start also failed");
            }
            return Err(error);
        }
        let result = self.frame_loop();
        let finished = self.finish();
        let frames = result?;
        finished?;
        Ok(frames)
    }

    fn frame_loop(&mut self) -> GuiResult<u64> {
        loop {
            if self.stop.is_stop_requested() {
                tracing::info!(frames = self.frames, "stop requested");
                break;
            }
            if self.config.max_frames.is_some_and(|max| self.frames >= max) {
                tracing::info!(frames = self.frames, "frame limit reached");
                break;
            }

            let stats = self.tick()?;
            if stats.failed > 0 {
                tracing::debug!(frame = self.frames, failed = stats.failed, "sweep had failures");
            }

            if !self.toolkit.render_frame() {
                tracing::info!(frames = self.frames, "toolkit closed");
                break;
            }
            self.frames += 1;
        }
        Ok(self.frames)
    }

    /// Leave the running state, run `on_exiting` and tear the toolkit down
    ///
    /// `on_exiting` runs only on the first call.
    pub fn finish(&mut self) -> GuiResult<()> {
        let first = !self.lifecycle.is_terminated();
        self.registry.set_running(false);
        let hook = self.lifecycle.shutdown();
        self.toolkit.teardown();
        if first {
            tracing::info!(frames = self.frames, "host finished");
        }
        hook
    }
}

impl<T: Toolkit + std::fmt::Debug> std::fmt::Debug for GuiHost<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuiHost")
            .field("toolkit", &self.toolkit)
            .field("windows", &self.window_names())
            .field("phase", &self.lifecycle.phase())
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Bound;
    use crate::model::{FieldBinding, Model, Record};
    use crate::toolkit::{HeadlessToolkit, WidgetParams};
    use crate::value::Value;
    use crate::widgets::Slider;
    use crate::window::Container;
    use std::cell::RefCell;

    struct Counter {
        container: Container,
        model: Rc<RefCell<Record>>,
        slider: Option<Bound<Slider>>,
        updates: Rc<Cell<u32>>,
    }

    impl Counter {
        fn new(model: &Rc<RefCell<Record>>) -> (Self, Rc<Cell<u32>>) {
            let updates = Rc::new(Cell::new(0));
            let window = Self {
                container: Container::window("Counter"),
                model: model.clone(),
                slider: None,
                updates: updates.clone(),
            };
            (window, updates)
        }
    }

    impl Window for Counter {
        fn container_mut(&mut self) -> &mut Container {
            &mut self.container
        }

        fn describe(&mut self, ui: &mut Ui<'_>) -> GuiResult<()> {
            let field = FieldBinding::on_model(&self.model, "count");
            self.slider = Some(ui.slider(field, WidgetParams::new().label("Count"))?);
            Ok(())
        }

        fn update(&mut self, _ui: &mut Ui<'_>) -> GuiResult<()> {
            self.updates.set(self.updates.get() + 1);
            Ok(())
        }
    }

    fn model() -> Rc<RefCell<Record>> {
        Rc::new(RefCell::new(Record::new().with("count", 3)))
    }

    #[test]
    fn test_tick_requires_start() {
        let mut host = GuiHost::new(HeadlessToolkit::new());
        assert!(matches!(host.tick(), Err(GuiError::NotRunning)));
    }

    #[test]
    fn test_duplicate_window_name() {
        let model = model();
        let mut host = GuiHost::new(HeadlessToolkit::new());
        host.add_window("main", Counter::new(&model).0).unwrap();
        assert!(matches!(
            host.add_window("main", Counter::new(&model).0),
            Err(GuiError::DuplicateTag(_))
        ));
        assert_eq!(host.window_names(), vec!["main"]);
    }

    #[test]
    fn test_run_stops_at_frame_limit() {
        let model = model();
        let (counter, updates) = Counter::new(&model);
        let mut host = GuiHost::with_config(HeadlessToolkit::new(), HostConfig::default().with_max_frames(4));
        host.add_window("counter", counter).unwrap();

        let frames = host.run().unwrap();
        assert_eq!(frames, 4);
        assert_eq!(updates.get(), 4);
        assert!(!host.is_running());
        assert_eq!(host.phase(), LifecyclePhase::Terminated);
        assert_eq!(host.toolkit().widget_count(), 0);
    }

    #[test]
    fn test_second_run_is_rejected() {
        let model = model();
        let exits = Rc::new(Cell::new(0));
        let mut host = GuiHost::with_config(HeadlessToolkit::new(), HostConfig::default().with_max_frames(2));
        host.add_window("counter", Counter::new(&model).0).unwrap();
        host.set_hooks(LifecycleHooks::new().with_on_exiting({
            let exits = exits.clone();
            Callback::infallible(move |_| exits.set(exits.get() + 1))
        }));

        assert_eq!(host.run().unwrap(), 2);
        assert!(matches!(host.run(), Err(GuiError::NotRunning)));
        assert!(matches!(host.start(), Err(GuiError::NotRunning)));

        assert!(!host.is_running());
        assert!(!host.toolkit().is_open());
        assert_eq!(host.phase(), LifecyclePhase::Terminated);
        assert_eq!(host.toolkit().widget_count(), 0);
        assert_eq!(exits.get(), 1);
    }

    #[test]
    fn test_finish_after_start_tears_down() {
        let model = model();
        let mut host = GuiHost::new(HeadlessToolkit::new());
        host.add_window("counter", Counter::new(&model).0).unwrap();
        host.start().unwrap();
        assert!(host.toolkit().is_open());

        host.finish().unwrap();
        host.finish().unwrap();
        assert!(!host.is_running());
        assert!(!host.toolkit().is_open());
    }

    #[test]
    fn test_toolkit_close_ends_run() {
        let model = model();
        let mut host = GuiHost::new(HeadlessToolkit::new().with_frame_limit(2));
        host.add_window("counter", Counter::new(&model).0).unwrap();

        assert_eq!(host.run().unwrap(), 1);
    }

    #[test]
    fn test_stop_from_hook() {
        let model = model();
        let mut host = GuiHost::new(HeadlessToolkit::new());
        host.add_window("counter", Counter::new(&model).0).unwrap();
        host.set_hooks(LifecycleHooks::new().with_on_started(host.stop_handle().as_callback()));

        assert_eq!(host.run().unwrap(), 0);
        assert_eq!(host.phase(), LifecyclePhase::Terminated);
    }

    #[test]
    fn test_tick_syncs_bindings() {
        let model = model();
        let mut host = GuiHost::new(HeadlessToolkit::new());
        host.add_window("counter", Counter::new(&model).0).unwrap();
        host.start().unwrap();

        assert_eq!(host.registry().len(), 1);
        let tag = host.registry().tags()[0].clone();
        assert_eq!(host.toolkit().get_value(&tag).unwrap(), Value::Int(3));

        host.toolkit_mut().simulate_change(&tag, 7).unwrap();
        assert_eq!(model.borrow().get("count"), Some(&Value::Int(7)));

        model.borrow_mut().set_field("count", Value::Int(9)).unwrap();
        let stats = host.tick().unwrap();
        assert_eq!(stats.updated, 1);
        assert_eq!(host.toolkit().get_value(&tag).unwrap(), Value::Int(9));

        host.finish().unwrap();
        assert!(matches!(host.tick(), Err(GuiError::NotRunning)));
    }

    #[test]
    fn test_window_added_while_running_is_described() {
        let model = model();
        let mut host = GuiHost::new(HeadlessToolkit::new());
        host.start().unwrap();
        assert_eq!(host.registry().len(), 0);

        host.add_window("late", Counter::new(&model).0).unwrap();
        assert_eq!(host.registry().len(), 1);
    }
}
