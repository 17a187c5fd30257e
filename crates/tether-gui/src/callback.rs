//! Widget event callbacks and their composition
//!
//! A toolkit widget has a single event slot. Bindings need that slot for
//! their own model write, and callers still want to react to the same
//! event, so both are composed into one [`Callback`] through a
//! [`CallbackChain`]. A failing entry in a chain is logged and recorded
//! without preventing the remaining entries from running.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::error::{GuiError, GuiResult};
use crate::tag::Tag;
use crate::value::Value;

/// Payload delivered with a widget event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallbackArgs {
    /// Widget that raised the event
    pub sender: Tag,
    /// The widget's value after the event
    pub value: Value,
}

impl CallbackArgs {
    /// Arguments for an event raised by `sender`
    #[must_use]
    pub fn new(sender: Tag, value: impl Into<Value>) -> Self {
        Self {
            sender,
            value: value.into(),
        }
    }

    /// Payload for events with no sender, such as lifecycle hooks
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

type Handler = dyn Fn(&CallbackArgs) -> GuiResult<()>;

/// A widget event handler
#[derive(Clone)]
pub struct Callback {
    handler: Rc<Handler>,
    /// Reports whether the callback's target still exists
    liveness: Option<Rc<dyn Fn() -> bool>>,
    /// Optional description for debugging
    description: Option<String>,
}

impl Callback {
    /// Create a callback from a fallible closure
    pub fn new(handler: impl Fn(&CallbackArgs) -> GuiResult<()> + 'static) -> Self {
        Self {
            handler: Rc::new(handler),
            liveness: None,
            description: None,
        }
    }

    /// Create a callback from a closure that cannot fail
    pub fn infallible(handler: impl Fn(&CallbackArgs) + 'static) -> Self {
        Self::new(move |args| {
            handler(args);
            Ok(())
        })
    }

    /// A callback that does nothing
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|_| Ok(())).with_description("noop")
    }

    /// Create a callback that calls `handler` on `target` without keeping it alive
    ///
    /// Once `target` is dropped the callback stops being callable.
    pub fn with_target<T: 'static>(
        target: &Rc<T>,
        handler: impl Fn(&T, &CallbackArgs) -> GuiResult<()> + 'static,
    ) -> Self {
        let weak = Rc::downgrade(target);
        let alive = weak.clone();
        Self {
            handler: Rc::new(move |args| match weak.upgrade() {
                Some(target) => handler(&target, args),
                None => Err(GuiError::CallbackNotCallable(
                    "callback target was dropped".to_string(),
                )),
            }),
            liveness: Some(Rc::new(move || alive.strong_count() > 0)),
            description: None,
        }
    }

    /// Attach a description
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Human-readable description, used in logs
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether invoking the callback can reach its handler
    #[must_use]
    pub fn is_callable(&self) -> bool {
        self.liveness.as_ref().map_or(true, |alive| alive())
    }

    /// Invoke the callback
    ///
    /// # Errors
    /// Returns `CallbackNotCallable` if the target is gone, otherwise
    /// whatever the handler returns.
    pub fn call(&self, args: &CallbackArgs) -> GuiResult<()> {
        if !self.is_callable() {
            return Err(GuiError::CallbackNotCallable(self.label()));
        }
        (self.handler)(args)
    }

    fn label(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| "anonymous callback".to_string())
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("description", &self.description)
            .field("callable", &self.is_callable())
            .finish()
    }
}

/// A failure recorded while running a chain
#[derive(Debug)]
pub struct CallbackFailure {
    /// Position of the failing entry in the chain
    pub index: usize,
    pub error: GuiError,
}

/// Outcome of running a [`CallbackChain`]
#[derive(Debug, Default)]
pub struct CallbackReport {
    /// Entries that ran to completion
    pub invoked: usize,
    /// Empty slots
    pub skipped: usize,
    pub failures: Vec<CallbackFailure>,
}

impl CallbackReport {
    /// True when no entry failed
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Ordered composition of optional callbacks
#[derive(Debug, Clone, Default)]
pub struct CallbackChain {
    callbacks: Vec<Option<Callback>>,
}

impl CallbackChain {
    /// Compose callbacks; `None` slots are tolerated and skipped
    pub fn new(callbacks: impl IntoIterator<Item = Option<Callback>>) -> Self {
        Self {
            callbacks: callbacks.into_iter().collect(),
        }
    }

    /// Append a callback; `None` entries are skipped when invoked
    pub fn push(&mut self, callback: Option<Callback>) {
        self.callbacks.push(callback);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Run every entry in registration order
    pub fn invoke(&self, args: &CallbackArgs) -> CallbackReport {
        let mut report = CallbackReport::default();

        for (index, slot) in self.callbacks.iter().enumerate() {
            let Some(callback) = slot else {
                report.skipped += 1;
                continue;
            };

            if !callback.is_callable() {
                tracing::warn!(index, callback = ?callback.description(), "callback is not callable, skipping");
                report.failures.push(CallbackFailure {
                    index,
                    error: GuiError::CallbackNotCallable(callback.label()),
                });
                continue;
            }

            match panic::catch_unwind(AssertUnwindSafe(|| callback.call(args))) {
                Ok(Ok(())) => report.invoked += 1,
                Ok(Err(error)) => {
                    tracing::error!(index, sender = %args.sender, %error, "callback failed");
                    report.failures.push(CallbackFailure { index, error });
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(index, sender = %args.sender, %message, "callback panicked");
                    report.failures.push(CallbackFailure {
                        index,
                        error: GuiError::CallbackFailed(message),
                    });
                }
            }
        }

        report
    }

    /// Collapse the chain into a single callback
    ///
    /// The resulting callback always returns `Ok`; failures of individual
    /// entries are only logged.
    #[must_use]
    pub fn into_callback(self) -> Callback {
        Callback::new(move |args| {
            self.invoke(args);
            Ok(())
        })
        .with_description("callback chain")
    }
}

/// Compose callbacks into one, see [`CallbackChain::into_callback`]
pub fn combine(callbacks: impl IntoIterator<Item = Option<Callback>>) -> Callback {
    CallbackChain::new(callbacks).into_callback()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "callback panicked".to_string()
    }
}
