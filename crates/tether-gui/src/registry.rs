//! Registry of live bound elements
//!
//! The registry indexes elements weakly by tag, in insertion order, and
//! sweeps them once per rendered frame. It is an ordinary value: each host
//! owns one and hands clones to the bindings it creates, so independent
//! hosts (and tests) never share state.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::element::{run_update, UpdatableElement};
use crate::error::{GuiError, GuiResult};
use crate::tag::Tag;
use crate::toolkit::Toolkit;

type ElementRef = Weak<RefCell<dyn UpdatableElement>>;

struct Entry {
    tag: Tag,
    element: ElementRef,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.element.strong_count() > 0
    }
}

#[derive(Default)]
struct RegistryInner {
    entries: RefCell<Vec<Entry>>,
    running: Cell<bool>,
}

/// Counts from one [`ElementRegistry::update_all`] sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub updated: usize,
    /// Elements whose widget is missing or hidden
    pub skipped: usize,
    pub failed: usize,
}

/// Shared index of live bound elements
#[derive(Clone, Default)]
pub struct ElementRegistry {
    inner: Rc<RegistryInner>,
}

impl ElementRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.borrow().iter().filter(|e| e.is_live()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a live element is registered under `tag`
    #[must_use]
    pub fn contains(&self, tag: &Tag) -> bool {
        tag.is_assigned()
            && self
                .inner
                .entries
                .borrow()
                .iter()
                .any(|e| &e.tag == tag && e.is_live())
    }

    /// Tags of live elements in registration order
    #[must_use]
    pub fn tags(&self) -> Vec<Tag> {
        self.inner
            .entries
            .borrow()
            .iter()
            .filter(|e| e.is_live())
            .map(|e| e.tag.clone())
            .collect()
    }

    /// Look up the element registered under `tag`
    #[must_use]
    pub fn get(&self, tag: &Tag) -> Option<Rc<RefCell<dyn UpdatableElement>>> {
        self.inner
            .entries
            .borrow()
            .iter()
            .find(|e| &e.tag == tag)
            .and_then(|e| e.element.upgrade())
    }

    /// Whether the owning host is inside its frame loop
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.inner.running.set(running);
    }

    /// Register `element` under `tag`, dropping any entry it held before
    ///
    /// Validation happens before anything is changed, so a rejected call
    /// leaves the registry untouched.
    pub(crate) fn reassign(&self, tag: &Tag, element: &ElementRef) -> GuiResult<()> {
        let mut entries = self.inner.entries.borrow_mut();

        if tag.is_assigned() {
            let taken = entries
                .iter()
                .any(|e| &e.tag == tag && e.is_live() && !same_element(&e.element, element));
            if taken {
                return Err(GuiError::DuplicateTag(tag.clone()));
            }
        }

        entries.retain(|e| e.is_live() && !same_element(&e.element, element));
        if tag.is_assigned() {
            entries.push(Entry {
                tag: tag.clone(),
                element: element.clone(),
            });
            tracing::trace!(%tag, "registered element");
        }
        Ok(())
    }

    /// Drop every entry held by `element`
    pub(crate) fn remove(&self, element: &ElementRef) {
        self.inner
            .entries
            .borrow_mut()
            .retain(|e| e.is_live() && !same_element(&e.element, element));
    }

    /// Forget the dead entry left behind by a dropped element
    pub(crate) fn release(&self, tag: &Tag) {
        // Drop can run while a sweep holds the entries; the next prune picks it up.
        if let Ok(mut entries) = self.inner.entries.try_borrow_mut() {
            entries.retain(|e| e.is_live() || &e.tag != tag);
        }
    }

    /// Update every live element whose widget exists and is visible
    ///
    /// A failing element is logged and counted; it does not stop the sweep.
    ///
    /// # Errors
    /// `NotRunning` if the host is not inside its frame loop. No toolkit
    /// call is made in that case.
    pub fn update_all(&self, toolkit: &mut dyn Toolkit) -> GuiResult<SweepStats> {
        if !self.is_running() {
            return Err(GuiError::NotRunning);
        }

        let live: Vec<(Tag, Rc<RefCell<dyn UpdatableElement>>)> = {
            let mut entries = self.inner.entries.borrow_mut();
            entries.retain(Entry::is_live);
            entries
                .iter()
                .filter_map(|e| e.element.upgrade().map(|element| (e.tag.clone(), element)))
                .collect()
        };

        let mut stats = SweepStats::default();
        for (tag, element) in live {
            if !toolkit.exists(&tag) || !toolkit.is_visible(&tag) {
                stats.skipped += 1;
                continue;
            }

            let Ok(mut guard) = element.try_borrow_mut() else {
                tracing::warn!(%tag, "element is borrowed elsewhere, skipping update");
                stats.failed += 1;
                continue;
            };

            match run_update(&mut *guard, toolkit) {
                Ok(()) => stats.updated += 1,
                Err(error) => {
                    tracing::warn!(%tag, widget = guard.kind_name(), %error, "element update failed");
                    stats.failed += 1;
                }
            }
        }

        tracing::trace!(updated = stats.updated, skipped = stats.skipped, failed = stats.failed, "sweep finished");
        Ok(stats)
    }
}

impl fmt::Debug for ElementRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementRegistry")
            .field("elements", &self.len())
            .field("running", &self.is_running())
            .finish()
    }
}

fn same_element(a: &ElementRef, b: &ElementRef) -> bool {
    std::ptr::eq(a.as_ptr().cast::<()>(), b.as_ptr().cast::<()>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::Callback;
    use crate::element::{Bound, UpdatableCore};
    use crate::model::{FieldBinding, Record};
    use crate::toolkit::{HeadlessToolkit, WidgetKind, WidgetParams};
    use crate::value::Value;

    /// Pushes the model value into the widget on every update
    struct Mirror {
        core: UpdatableCore,
        fail: bool,
    }

    impl UpdatableElement for Mirror {
        fn core(&self) -> &UpdatableCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut UpdatableCore {
            &mut self.core
        }

        fn kind_name(&self) -> &'static str {
            "mirror"
        }

        fn model_writer(&self) -> Callback {
            Callback::noop()
        }

        fn create(&mut self, toolkit: &mut dyn Toolkit, params: WidgetParams) -> GuiResult<Tag> {
            toolkit.create_widget(WidgetKind::InputText, self.core.tag(), params)
        }

        fn sync_value(&mut self, toolkit: &mut dyn Toolkit) -> GuiResult<()> {
            if self.fail {
                return Err(GuiError::Toolkit("sync refused".into()));
            }
            let value = self.core.field().get()?;
            toolkit.set_value(self.core.tag(), value)
        }
    }

    fn mirror(registry: &ElementRegistry, model: &Rc<RefCell<Record>>, tag: &str, fail: bool) -> Bound<Mirror> {
        let (core, _) = UpdatableCore::bind(registry, FieldBinding::on_model(model, "text"), Tag::from(tag)).unwrap();
        Bound::new(Mirror { core, fail })
    }

    fn setup() -> (ElementRegistry, Rc<RefCell<Record>>, HeadlessToolkit) {
        let model = Rc::new(RefCell::new(Record::new().with("text", "synced")));
        (ElementRegistry::new(), model, HeadlessToolkit::new())
    }

    #[test]
    fn test_sweep_requires_running() {
        let (registry, model, mut toolkit) = setup();
        let element = mirror(&registry, &model, "a", false);
        element.materialize(&mut toolkit, WidgetParams::new()).unwrap();

        let calls = toolkit.call_count();
        assert!(matches!(registry.update_all(&mut toolkit), Err(GuiError::NotRunning)));
        assert_eq!(toolkit.call_count(), calls);
    }

    #[test]
    fn test_sweep_updates_in_registration_order() {
        let (registry, model, mut toolkit) = setup();
        let a = mirror(&registry, &model, "a", false);
        let b = mirror(&registry, &model, "b", false);
        b.materialize(&mut toolkit, WidgetParams::new()).unwrap();
        a.materialize(&mut toolkit, WidgetParams::new()).unwrap();

        assert_eq!(registry.tags(), vec![Tag::from("b"), Tag::from("a")]);

        registry.set_running(true);
        let stats = registry.update_all(&mut toolkit).unwrap();
        assert_eq!(stats.updated, 2);
        assert_eq!(toolkit.get_value(&Tag::from("a")).unwrap(), Value::from("synced"));
    }

    #[test]
    fn test_sweep_skips_hidden_and_missing() {
        let (registry, model, mut toolkit) = setup();
        let group = Tag::from("group");
        toolkit.create_widget(WidgetKind::Group, &group, WidgetParams::new()).unwrap();

        let visible = mirror(&registry, &model, "visible", false);
        let hidden = mirror(&registry, &model, "hidden", false);
        let detached = mirror(&registry, &model, "detached", false);
        visible.materialize(&mut toolkit, WidgetParams::new()).unwrap();
        hidden.materialize(&mut toolkit, WidgetParams::new()).unwrap();
        toolkit.push_container(&group).unwrap();
        detached.materialize(&mut toolkit, WidgetParams::new()).unwrap();
        toolkit.pop_container().unwrap();

        toolkit.set_shown(&Tag::from("hidden"), false).unwrap();
        toolkit.delete_children(&group).unwrap();

        registry.set_running(true);
        let stats = registry.update_all(&mut toolkit).unwrap();
        assert_eq!(stats, SweepStats { updated: 1, skipped: 2, failed: 0 });
    }

    #[test]
    fn test_failing_element_does_not_stop_sweep() {
        let (registry, model, mut toolkit) = setup();
        let bad = mirror(&registry, &model, "bad", true);
        let good = mirror(&registry, &model, "good", false);
        bad.materialize(&mut toolkit, WidgetParams::new()).unwrap();
        good.materialize(&mut toolkit, WidgetParams::new()).unwrap();

        registry.set_running(true);
        let stats = registry.update_all(&mut toolkit).unwrap();
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(toolkit.get_value(&Tag::from("good")).unwrap(), Value::from("synced"));
    }

    #[test]
    fn test_reassign_is_atomic() {
        let (registry, model, mut toolkit) = setup();
        let a = mirror(&registry, &model, "a", false);
        let b = mirror(&registry, &model, "b", false);
        a.materialize(&mut toolkit, WidgetParams::new()).unwrap();
        b.materialize(&mut toolkit, WidgetParams::new()).unwrap();

        assert!(matches!(a.set_tag(&mut toolkit, "b"), Err(GuiError::DuplicateTag(_))));
        assert_eq!(registry.tags(), vec![Tag::from("a"), Tag::from("b")]);
        assert_eq!(a.tag(), Tag::from("a"));
    }

    #[test]
    fn test_dropped_elements_are_pruned() {
        let (registry, model, mut toolkit) = setup();
        let a = mirror(&registry, &model, "a", false);
        a.materialize(&mut toolkit, WidgetParams::new()).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&Tag::from("a")).is_some());

        drop(a);
        assert!(registry.is_empty());
        assert!(registry.get(&Tag::from("a")).is_none());

        registry.set_running(true);
        assert_eq!(registry.update_all(&mut toolkit).unwrap(), SweepStats::default());
    }

    #[test]
    fn test_registries_are_independent() {
        let (first, model, mut toolkit) = setup();
        let second = ElementRegistry::new();
        let a = mirror(&first, &model, "a", false);
        a.materialize(&mut toolkit, WidgetParams::new()).unwrap();

        assert!(first.contains(&Tag::from("a")));
        assert!(!second.contains(&Tag::from("a")));
    }
}
