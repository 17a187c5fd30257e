//! Elements and the binding state machine
//!
//! An [`Element`] wraps one toolkit widget, identified by its [`Tag`].
//! An [`UpdatableElement`] additionally binds that widget to one field of
//! a model and takes part in the per-frame registry sweep.
//!
//! Updatable elements are always handled through a [`Bound`] handle, which
//! owns the element behind a shared cell so the registry can index it
//! weakly. The handle drives the lifecycle:
//!
//! ```text
//! Unmaterialized --materialize--> Live --request_reconfigure--> ReconfigurePending
//!                                  ^                                   |
//!                                  +-------------update----------------+
//! Live | ReconfigurePending --dispose--> Destroyed
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::callback::{combine, Callback};
use crate::error::{GuiError, GuiResult};
use crate::model::FieldBinding;
use crate::registry::ElementRegistry;
use crate::tag::Tag;
use crate::toolkit::{Toolkit, WidgetParams};
use crate::value::Value;

/// A widget that can be created once and read back by tag
pub trait Element {
    /// Human readable widget kind, used in errors and logs
    fn kind_name(&self) -> &'static str;

    fn tag(&self) -> Tag;

    /// Create the underlying widget
    ///
    /// # Errors
    /// Calling this a second time fails with `AlreadyMaterialized`.
    fn materialize(&mut self, toolkit: &mut dyn Toolkit, params: WidgetParams) -> GuiResult<Tag>;

    /// Read the value the widget currently displays
    fn current_value(&self, toolkit: &dyn Toolkit) -> GuiResult<Value> {
        read_widget_value(&self.tag(), toolkit)
    }
}

pub(crate) fn read_widget_value(tag: &Tag, toolkit: &dyn Toolkit) -> GuiResult<Value> {
    if !tag.is_assigned() || !toolkit.exists(tag) {
        return Err(GuiError::NotFound(tag.clone()));
    }
    toolkit.get_value(tag)
}

/// Observable lifecycle state of an updatable element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    Unmaterialized,
    Live,
    ReconfigurePending,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Unmaterialized,
    Live,
    Destroyed,
}

/// State shared by every updatable element
pub struct UpdatableCore {
    tag: Tag,
    phase: Phase,
    pending_reconfigure: bool,
    field: FieldBinding,
    registry: ElementRegistry,
}

impl UpdatableCore {
    /// Validate a new binding and return the core with the field's current value
    ///
    /// # Errors
    /// `AttributeMissing` if the field does not exist on the model,
    /// `DuplicateTag` if `tag` already belongs to a live element.
    pub fn bind(registry: &ElementRegistry, field: FieldBinding, tag: Tag) -> GuiResult<(Self, Value)> {
        let current = field.get()?;

        if tag.is_assigned() && registry.contains(&tag) {
            return Err(GuiError::DuplicateTag(tag));
        }

        let core = Self {
            tag,
            phase: Phase::Unmaterialized,
            pending_reconfigure: false,
            field,
            registry: registry.clone(),
        };
        Ok((core, current))
    }

    #[must_use]
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// The bound model field
    #[must_use]
    pub fn field(&self) -> &FieldBinding {
        &self.field
    }

    #[must_use]
    pub fn state(&self) -> ElementState {
        match self.phase {
            Phase::Unmaterialized => ElementState::Unmaterialized,
            Phase::Live if self.pending_reconfigure => ElementState::ReconfigurePending,
            Phase::Live => ElementState::Live,
            Phase::Destroyed => ElementState::Destroyed,
        }
    }

    #[must_use]
    pub fn is_reconfigure_pending(&self) -> bool {
        self.pending_reconfigure
    }

    fn ensure_not_destroyed(&self, widget: &'static str) -> GuiResult<()> {
        if self.phase == Phase::Destroyed {
            return Err(GuiError::UseAfterDestroy {
                widget,
                tag: self.tag.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for UpdatableCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdatableCore")
            .field("tag", &self.tag)
            .field("state", &self.state())
            .field("field", &self.field.name())
            .finish()
    }
}

impl Drop for UpdatableCore {
    fn drop(&mut self) {
        if self.phase == Phase::Live {
            self.registry.release(&self.tag);
        }
    }
}

/// A widget bound to one model field
///
/// Implementors provide the widget-specific pieces; the shared protocol
/// lives in [`Bound`]. The default `reconfigure` and `sync_value` bodies
/// report `NotImplemented`.
pub trait UpdatableElement {
    fn core(&self) -> &UpdatableCore;

    fn core_mut(&mut self) -> &mut UpdatableCore;

    fn kind_name(&self) -> &'static str;

    /// Callback that writes the widget's new value into the bound field
    fn model_writer(&self) -> Callback;

    /// Create the widget
    ///
    /// `params.callback` already holds the composed model-write and user
    /// callbacks.
    fn create(&mut self, toolkit: &mut dyn Toolkit, params: WidgetParams) -> GuiResult<Tag>;

    /// Apply deferred configuration changes to the widget
    fn reconfigure(&mut self, _toolkit: &mut dyn Toolkit) -> GuiResult<()> {
        Err(GuiError::NotImplemented {
            widget: self.kind_name(),
            operation: "reconfigure",
        })
    }

    /// Synchronize the widget and the bound field for this frame
    fn sync_value(&mut self, _toolkit: &mut dyn Toolkit) -> GuiResult<()> {
        Err(GuiError::NotImplemented {
            widget: self.kind_name(),
            operation: "update",
        })
    }
}

/// One frame's update: pending reconfiguration first, then the value sync
pub(crate) fn run_update<E: UpdatableElement + ?Sized>(
    element: &mut E,
    toolkit: &mut dyn Toolkit,
) -> GuiResult<()> {
    let widget = element.kind_name();
    let core = element.core();
    core.ensure_not_destroyed(widget)?;
    if core.phase == Phase::Unmaterialized {
        return Err(GuiError::NotFound(core.tag.clone()));
    }
    if !core.registry.is_running() {
        return Err(GuiError::NotRunning);
    }

    if core.pending_reconfigure {
        tracing::trace!(tag = %core.tag, widget, "applying pending reconfiguration");
        element.reconfigure(toolkit)?;
        element.core_mut().pending_reconfigure = false;
    }

    element.sync_value(toolkit)
}

/// Shared handle to an updatable element
pub struct Bound<E: UpdatableElement + 'static> {
    inner: Rc<RefCell<E>>,
}

impl<E: UpdatableElement + 'static> Clone for Bound<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: UpdatableElement + 'static> Bound<E> {
    /// Wrap a freshly bound element
    pub fn new(element: E) -> Self {
        Self {
            inner: Rc::new(RefCell::new(element)),
        }
    }

    /// Current tag; unassigned until materialized unless fixed at bind time
    #[must_use]
    pub fn tag(&self) -> Tag {
        self.inner.borrow().core().tag.clone()
    }

    /// Position in the binding state machine
    #[must_use]
    pub fn state(&self) -> ElementState {
        self.inner.borrow().core().state()
    }

    /// Whether a reconfiguration waits for the next update
    #[must_use]
    pub fn is_reconfigure_pending(&self) -> bool {
        self.inner.borrow().core().pending_reconfigure
    }

    /// Run `f` with shared access to the element
    pub fn with<R>(&self, f: impl FnOnce(&E) -> R) -> R {
        f(&self.inner.borrow())
    }

    /// Run `f` with exclusive access to the element
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut E) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }

    /// Create the widget and register the element under its tag
    ///
    /// The widget's event slot receives the model write followed by the
    /// caller's `params.callback`, so the caller observes the written value.
    pub fn materialize(&self, toolkit: &mut dyn Toolkit, mut params: WidgetParams) -> GuiResult<Tag> {
        let tag = {
            let mut element = self.inner.borrow_mut();
            let widget = element.kind_name();
            let core = element.core();
            core.ensure_not_destroyed(widget)?;
            if core.phase == Phase::Live {
                return Err(GuiError::AlreadyMaterialized {
                    widget,
                    tag: core.tag.clone(),
                });
            }
            if core.tag.is_assigned() && core.registry.contains(&core.tag) {
                return Err(GuiError::DuplicateTag(core.tag.clone()));
            }

            let user_callback = params.callback.take();
            params.callback = Some(combine([Some(element.model_writer()), user_callback]));
            element.create(toolkit, params)?
        };

        self.register(&tag)?;

        let mut element = self.inner.borrow_mut();
        let widget = element.kind_name();
        let core = element.core_mut();
        core.tag = tag.clone();
        core.phase = Phase::Live;
        core.pending_reconfigure = false;
        tracing::debug!(%tag, widget, field = core.field.name(), "materialized binding");
        Ok(tag)
    }

    /// Defer a configuration change to the next update
    ///
    /// Before materialization this is a no-op: the widget will be created
    /// from the current configuration.
    pub fn request_reconfigure(&self) -> GuiResult<()> {
        let mut element = self.inner.borrow_mut();
        let widget = element.kind_name();
        let core = element.core_mut();
        core.ensure_not_destroyed(widget)?;
        if core.phase == Phase::Live {
            core.pending_reconfigure = true;
        }
        Ok(())
    }

    /// Apply any pending reconfiguration, then sync the value
    ///
    /// # Errors
    /// `NotRunning` outside a running host, `UseAfterDestroy` after
    /// [`dispose`](Self::dispose), `NotFound` before materialization.
    pub fn update(&self, toolkit: &mut dyn Toolkit) -> GuiResult<()> {
        run_update(&mut *self.inner.borrow_mut(), toolkit)
    }

    /// Move the element to a different tag
    ///
    /// Before materialization this only picks the tag the widget will be
    /// created under. A live element takes its widget along: the widget is
    /// renamed in the toolkit, then the old registry entry is replaced by
    /// the new one in one step, leaving the old tag free for reuse.
    ///
    /// # Errors
    /// `DuplicateTag` when another element or widget holds `tag`; a
    /// toolkit error when moving a live element to the unassigned tag.
    pub fn set_tag(&self, toolkit: &mut dyn Toolkit, tag: impl Into<Tag>) -> GuiResult<()> {
        let tag = tag.into();
        let (phase, current, registry) = {
            let element = self.inner.borrow();
            let core = element.core();
            core.ensure_not_destroyed(element.kind_name())?;
            (core.phase, core.tag.clone(), core.registry.clone())
        };

        if tag == current {
            return Ok(());
        }
        if tag.is_assigned() && registry.contains(&tag) {
            return Err(GuiError::DuplicateTag(tag));
        }

        if phase == Phase::Live {
            toolkit.rename_widget(&current, &tag)?;
            self.register(&tag)?;
            tracing::debug!(from = %current, to = %tag, "moved binding");
        }

        self.inner.borrow_mut().core_mut().tag = tag;
        Ok(())
    }

    /// Deregister the element
    ///
    /// Neither the widget nor the model is touched. Every later mutator
    /// fails with `UseAfterDestroy`.
    pub fn dispose(&self) -> GuiResult<()> {
        let mut element = self.inner.borrow_mut();
        let widget = element.kind_name();
        let core = element.core_mut();
        core.ensure_not_destroyed(widget)?;

        if core.phase == Phase::Live {
            core.registry.remove(&self.weak());
        }
        core.phase = Phase::Destroyed;
        core.pending_reconfigure = false;
        tracing::debug!(tag = %core.tag, widget, "disposed binding");
        Ok(())
    }

    /// Read the value the widget currently displays
    pub fn current_value(&self, toolkit: &dyn Toolkit) -> GuiResult<Value> {
        read_widget_value(&self.tag(), toolkit)
    }

    /// Read the bound model field
    pub fn model_value(&self) -> GuiResult<Value> {
        self.inner.borrow().core().field.get()
    }

    fn register(&self, tag: &Tag) -> GuiResult<()> {
        let registry = self.inner.borrow().core().registry.clone();
        registry.reassign(tag, &self.weak())
    }

    fn weak(&self) -> Weak<RefCell<dyn UpdatableElement>> {
        let erased: Rc<RefCell<dyn UpdatableElement>> = self.inner.clone();
        Rc::downgrade(&erased)
    }
}

impl<E: UpdatableElement + 'static> Element for Bound<E> {
    fn kind_name(&self) -> &'static str {
        self.inner.borrow().kind_name()
    }

    fn tag(&self) -> Tag {
        Bound::tag(self)
    }

    fn materialize(&mut self, toolkit: &mut dyn Toolkit, params: WidgetParams) -> GuiResult<Tag> {
        Bound::materialize(self, toolkit, params)
    }
}

impl<E: UpdatableElement + 'static> fmt::Debug for Bound<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(element) => f
                .debug_struct("Bound")
                .field("widget", &element.kind_name())
                .field("core", element.core())
                .finish(),
            Err(_) => f.write_str("Bound { <borrowed> }"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;
    use crate::toolkit::{HeadlessToolkit, WidgetKind};
    use std::cell::Cell;

    /// Minimal element relying on the default hooks
    struct Bare {
        core: UpdatableCore,
    }

    impl UpdatableElement for Bare {
        fn core(&self) -> &UpdatableCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut UpdatableCore {
            &mut self.core
        }

        fn kind_name(&self) -> &'static str {
            "bare"
        }

        fn model_writer(&self) -> Callback {
            Callback::noop()
        }

        fn create(&mut self, toolkit: &mut dyn Toolkit, params: WidgetParams) -> GuiResult<Tag> {
            toolkit.create_widget(WidgetKind::InputText, self.core.tag(), params)
        }
    }

    /// Element counting its hook invocations
    struct Counting {
        core: UpdatableCore,
        reconfigured: Rc<Cell<u32>>,
        synced: Rc<Cell<u32>>,
    }

    impl UpdatableElement for Counting {
        fn core(&self) -> &UpdatableCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut UpdatableCore {
            &mut self.core
        }

        fn kind_name(&self) -> &'static str {
            "counting"
        }

        fn model_writer(&self) -> Callback {
            Callback::noop()
        }

        fn create(&mut self, toolkit: &mut dyn Toolkit, params: WidgetParams) -> GuiResult<Tag> {
            toolkit.create_widget(WidgetKind::InputText, self.core.tag(), params)
        }

        fn reconfigure(&mut self, _toolkit: &mut dyn Toolkit) -> GuiResult<()> {
            assert!(self.core.is_reconfigure_pending());
            self.reconfigured.set(self.reconfigured.get() + 1);
            Ok(())
        }

        fn sync_value(&mut self, _toolkit: &mut dyn Toolkit) -> GuiResult<()> {
            self.synced.set(self.synced.get() + 1);
            Ok(())
        }
    }

    fn model() -> Rc<RefCell<Record>> {
        Rc::new(RefCell::new(Record::new().with("text", "hi")))
    }

    fn counting(registry: &ElementRegistry, model: &Rc<RefCell<Record>>, tag: Tag) -> (Bound<Counting>, Rc<Cell<u32>>) {
        let (core, _) = UpdatableCore::bind(registry, FieldBinding::on_model(model, "text"), tag).unwrap();
        let reconfigured = Rc::new(Cell::new(0));
        let bound = Bound::new(Counting {
            core,
            reconfigured: reconfigured.clone(),
            synced: Rc::new(Cell::new(0)),
        });
        (bound, reconfigured)
    }

    #[test]
    fn test_bind_requires_attribute() {
        let registry = ElementRegistry::new();
        let model = model();
        let result = UpdatableCore::bind(&registry, FieldBinding::on_model(&model, "missing"), Tag::Unassigned);
        assert!(matches!(result, Err(GuiError::AttributeMissing { .. })));
    }

    #[test]
    fn test_bind_rejects_registered_tag() {
        let registry = ElementRegistry::new();
        let model = model();
        let mut toolkit = HeadlessToolkit::new();
        let (first, _) = counting(&registry, &model, Tag::from("shared"));
        first.materialize(&mut toolkit, WidgetParams::new()).unwrap();

        let result = UpdatableCore::bind(&registry, FieldBinding::on_model(&model, "text"), Tag::from("shared"));
        assert!(matches!(result, Err(GuiError::DuplicateTag(_))));
    }

    #[test]
    fn test_state_machine() {
        let registry = ElementRegistry::new();
        registry.set_running(true);
        let model = model();
        let mut toolkit = HeadlessToolkit::new();
        let (bound, reconfigured) = counting(&registry, &model, Tag::Unassigned);

        assert_eq!(bound.state(), ElementState::Unmaterialized);
        bound.request_reconfigure().unwrap();
        assert_eq!(bound.state(), ElementState::Unmaterialized);

        let tag = bound.materialize(&mut toolkit, WidgetParams::new()).unwrap();
        assert_eq!(bound.state(), ElementState::Live);
        assert!(registry.contains(&tag));

        bound.request_reconfigure().unwrap();
        assert_eq!(bound.state(), ElementState::ReconfigurePending);
        assert!(bound.is_reconfigure_pending());

        bound.update(&mut toolkit).unwrap();
        assert_eq!(bound.state(), ElementState::Live);
        assert!(!bound.is_reconfigure_pending());
        assert_eq!(reconfigured.get(), 1);

        bound.update(&mut toolkit).unwrap();
        assert_eq!(reconfigured.get(), 1);

        bound.dispose().unwrap();
        assert_eq!(bound.state(), ElementState::Destroyed);
        assert!(!registry.contains(&tag));
    }

    #[test]
    fn test_materialize_twice_fails_fast() {
        let registry = ElementRegistry::new();
        let model = model();
        let mut toolkit = HeadlessToolkit::new();
        let (bound, _) = counting(&registry, &model, Tag::Unassigned);

        bound.materialize(&mut toolkit, WidgetParams::new()).unwrap();
        let widgets = toolkit.widget_count();
        assert!(matches!(
            bound.materialize(&mut toolkit, WidgetParams::new()),
            Err(GuiError::AlreadyMaterialized { .. })
        ));
        assert_eq!(toolkit.widget_count(), widgets);
    }

    #[test]
    fn test_mutators_after_dispose_fail() {
        let registry = ElementRegistry::new();
        registry.set_running(true);
        let model = model();
        let mut toolkit = HeadlessToolkit::new();
        let (bound, _) = counting(&registry, &model, Tag::Unassigned);
        bound.materialize(&mut toolkit, WidgetParams::new()).unwrap();
        bound.dispose().unwrap();

        let is_use_after_destroy = |r: GuiResult<()>| matches!(r, Err(GuiError::UseAfterDestroy { .. }));
        assert!(is_use_after_destroy(bound.dispose()));
        assert!(is_use_after_destroy(bound.request_reconfigure()));
        assert!(is_use_after_destroy(bound.update(&mut toolkit)));
        assert!(is_use_after_destroy(bound.set_tag(&mut toolkit, "other")));
        assert!(matches!(
            bound.materialize(&mut toolkit, WidgetParams::new()),
            Err(GuiError::UseAfterDestroy { .. })
        ));
    }

    #[test]
    fn test_update_requires_running_host() {
        let registry = ElementRegistry::new();
        let model = model();
        let mut toolkit = HeadlessToolkit::new();
        let (bound, _) = counting(&registry, &model, Tag::Unassigned);
        bound.materialize(&mut toolkit, WidgetParams::new()).unwrap();

        assert!(matches!(bound.update(&mut toolkit), Err(GuiError::NotRunning)));
    }

    #[test]
    fn test_default_hooks_are_not_implemented() {
        let registry = ElementRegistry::new();
        registry.set_running(true);
        let model = model();
        let mut toolkit = HeadlessToolkit::new();
        let (core, _) = UpdatableCore::bind(&registry, FieldBinding::on_model(&model, "text"), Tag::Unassigned).unwrap();
        let bound = Bound::new(Bare { core });
        bound.materialize(&mut toolkit, WidgetParams::new()).unwrap();

        assert!(matches!(
            bound.update(&mut toolkit),
            Err(GuiError::NotImplemented { operation: "update", .. })
        ));

        bound.request_reconfigure().unwrap();
        assert!(matches!(
            bound.update(&mut toolkit),
            Err(GuiError::NotImplemented { operation: "reconfigure", .. })
        ));
        assert!(bound.is_reconfigure_pending());
    }

    #[test]
    fn test_set_tag_moves_registry_entry() {
        let registry = ElementRegistry::new();
        let model = model();
        let mut toolkit = HeadlessToolkit::new();
        let (bound, _) = counting(&registry, &model, Tag::from("a"));
        bound.materialize(&mut toolkit, WidgetParams::new()).unwrap();

        bound.set_tag(&mut toolkit, "b").unwrap();
        assert!(!registry.contains(&Tag::from("a")));
        assert!(registry.contains(&Tag::from("b")));
        assert_eq!(bound.tag(), Tag::from("b"));
        assert!(!toolkit.exists(&Tag::from("a")));
        assert!(toolkit.exists(&Tag::from("b")));
        assert!(bound.current_value(&toolkit).is_ok());

        assert!(matches!(bound.set_tag(&mut toolkit, Tag::Unassigned), Err(GuiError::Toolkit(_))));
        assert_eq!(registry.tags(), vec![Tag::from("b")]);
        assert_eq!(bound.tag(), Tag::from("b"));
    }

    #[test]
    fn test_set_tag_before_materialize() {
        let registry = ElementRegistry::new();
        let model = model();
        let mut toolkit = HeadlessToolkit::new();
        let (bound, _) = counting(&registry, &model, Tag::Unassigned);

        bound.set_tag(&mut toolkit, "named").unwrap();
        assert!(registry.is_empty());
        assert_eq!(toolkit.widget_count(), 0);
        assert_eq!(bound.materialize(&mut toolkit, WidgetParams::new()).unwrap(), Tag::from("named"));
    }

    #[test]
    fn test_drop_deregisters() {
        let registry = ElementRegistry::new();
        let model = model();
        let mut toolkit = HeadlessToolkit::new();
        let (bound, _) = counting(&registry, &model, Tag::Unassigned);
        let tag = bound.materialize(&mut toolkit, WidgetParams::new()).unwrap();
        assert!(registry.contains(&tag));

        drop(bound);
        assert!(!registry.contains(&tag));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_current_value_requires_widget() {
        let registry = ElementRegistry::new();
        let model = model();
        let toolkit = HeadlessToolkit::new();
        let (bound, _) = counting(&registry, &model, Tag::Unassigned);
        assert!(matches!(bound.current_value(&toolkit), Err(GuiError::NotFound(_))));
    }
}
