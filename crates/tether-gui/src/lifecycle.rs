//! Host lifecycle management
//!
//! Tracks the startup, frame loop and shutdown phases of a
//! [`GuiHost`](crate::host::GuiHost) and runs the hooks attached to them.

use crate::callback::{Callback, CallbackArgs};
use crate::error::GuiResult;

/// Lifecycle phase of the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Windows are being added, the viewport is not open yet
    Initializing,
    /// The frame loop is active
    Running,
    /// The frame loop has ended and hooks are running
    ShuttingDown,
    /// The toolkit has been torn down
    Terminated,
}

/// Hooks invoked at phase transitions
#[derive(Debug, Default, Clone)]
pub struct LifecycleHooks {
    /// Called once windows are described, before the first frame
    pub on_started: Option<Callback>,
    /// Called when the frame loop ends, before the toolkit is torn down
    pub on_exiting: Option<Callback>,
}

impl LifecycleHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `callback` once the host has started
    #[must_use]
    pub fn with_on_started(mut self, callback: Callback) -> Self {
        self.on_started = Some(callback.with_description("on_started"));
        self
    }

    /// Run `callback` when the host shuts down
    #[must_use]
    pub fn with_on_exiting(mut self, callback: Callback) -> Self {
        self.on_exiting = Some(callback.with_description("on_exiting"));
        self
    }
}

/// Lifecycle manager for coordinating host phases
#[derive(Debug)]
pub struct LifecycleManager {
    phase: LifecyclePhase,
    hooks: LifecycleHooks,
}

impl LifecycleManager {
    /// A manager in the Initializing phase with no hooks
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: LifecyclePhase::Initializing,
            hooks: LifecycleHooks::new(),
        }
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// Replace the hooks
    pub fn set_hooks(&mut self, hooks: LifecycleHooks) {
        self.hooks = hooks;
    }

    /// Registered hooks
    #[must_use]
    pub fn hooks(&self) -> &LifecycleHooks {
        &self.hooks
    }

    /// Transition to Running and invoke `on_started`
    pub fn start(&mut self) -> GuiResult<()> {
        if self.phase != LifecyclePhase::Initializing {
            return Ok(());
        }

        self.phase = LifecyclePhase::Running;
        run_hook(self.hooks.on_started.as_ref())
    }

    /// Transition through ShuttingDown to Terminated, invoking `on_exiting`
    ///
    /// The manager ends up terminated even if the hook fails.
    pub fn shutdown(&mut self) -> GuiResult<()> {
        if self.phase == LifecyclePhase::Terminated {
            return Ok(());
        }

        self.phase = LifecyclePhase::ShuttingDown;
        let result = run_hook(self.hooks.on_exiting.as_ref());
        self.phase = LifecyclePhase::Terminated;
        result
    }

    /// Whether the manager is in the Running phase
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.phase == LifecyclePhase::Running
    }

    /// Whether shutdown has completed
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.phase == LifecyclePhase::Terminated
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

fn run_hook(hook: Option<&Callback>) -> GuiResult<()> {
    match hook {
        Some(callback) => {
            tracing::debug!(hook = ?callback.description(), "running lifecycle hook");
            callback.call(&CallbackArgs::empty())
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GuiError;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_lifecycle_phases() {
        let mut manager = LifecycleManager::new();
        assert_eq!(manager.phase(), LifecyclePhase::Initializing);
        assert!(!manager.is_running());
        assert!(!manager.is_terminated());

        manager.start().unwrap();
        assert_eq!(manager.phase(), LifecyclePhase::Running);
        assert!(manager.is_running());

        manager.shutdown().unwrap();
        assert_eq!(manager.phase(), LifecyclePhase::Terminated);
        assert!(manager.is_terminated());
    }

    #[test]
    fn test_hooks_run_at_transitions() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let started = {
            let events = events.clone();
            Callback::infallible(move |_| events.borrow_mut().push("started"))
        };
        let exiting = {
            let events = events.clone();
            Callback::infallible(move |_| events.borrow_mut().push("exiting"))
        };

        let mut manager = LifecycleManager::new();
        manager.set_hooks(LifecycleHooks::new().with_on_started(started).with_on_exiting(exiting));
        assert_eq!(manager.hooks().on_started.as_ref().and_then(Callback::description), Some("on_started"));

        manager.start().unwrap();
        manager.shutdown().unwrap();
        assert_eq!(*events.borrow(), vec!["started", "exiting"]);
    }

    #[test]
    fn test_double_start_is_idempotent() {
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        let mut manager = LifecycleManager::new();
        manager.set_hooks(LifecycleHooks::new().with_on_started(Callback::infallible(move |_| *c.borrow_mut() += 1)));

        manager.start().unwrap();
        manager.start().unwrap();
        assert!(manager.is_running());
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_double_shutdown_is_idempotent() {
        let mut manager = LifecycleManager::new();
        manager.start().unwrap();
        manager.shutdown().unwrap();
        manager.shutdown().unwrap();
        assert!(manager.is_terminated());
    }

    #[test]
    fn test_failing_exit_hook_still_terminates() {
        let mut manager = LifecycleManager::new();
        manager.set_hooks(
            LifecycleHooks::new().with_on_exiting(Callback::new(|_| Err(GuiError::CallbackFailed("save failed".into())))),
        );
        manager.start().unwrap();

        assert!(matches!(manager.shutdown(), Err(GuiError::CallbackFailed(_))));
        assert!(manager.is_terminated());
    }
}
