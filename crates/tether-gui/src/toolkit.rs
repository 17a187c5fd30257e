//! Boundary to the retained-mode widget toolkit
//!
//! The binding layer never talks to a concrete GUI library. Everything it
//! needs is the [`Toolkit`] trait: six widget primitives plus the container
//! and frame-driver calls the host makes. [`HeadlessToolkit`] implements it
//! in memory and is what the tests and the demo binary run against.

use std::cell::Cell;
use std::collections::HashMap;

use crate::callback::{Callback, CallbackArgs};
use crate::config::ViewportSettings;
use crate::error::{GuiError, GuiResult};
use crate::tag::Tag;
use crate::value::Value;

/// Kind of widget to create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    Button,
    Text,
    Checkbox,
    SliderInt,
    SliderFloat,
    InputText,
    Combo,
    Window,
    ChildWindow,
    Group,
}

impl WidgetKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Text => "text",
            Self::Checkbox => "checkbox",
            Self::SliderInt => "int slider",
            Self::SliderFloat => "float slider",
            Self::InputText => "input text",
            Self::Combo => "combo box",
            Self::Window => "window",
            Self::ChildWindow => "child window",
            Self::Group => "group",
        }
    }

    /// Whether widgets can be created inside this kind
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Window | Self::ChildWindow | Self::Group)
    }

    /// Value a freshly created widget of this kind shows
    #[must_use]
    pub fn initial_value(self) -> Value {
        match self {
            Self::Checkbox => Value::Bool(false),
            Self::SliderInt => Value::Int(0),
            Self::SliderFloat => Value::Float(0.0),
            Self::Text | Self::InputText | Self::Combo => Value::Str(String::new()),
            Self::Button | Self::Window | Self::ChildWindow | Self::Group => Value::Null,
        }
    }
}

/// Construction parameters for a widget
#[derive(Debug, Clone, Default)]
pub struct WidgetParams {
    pub label: Option<String>,
    pub default_value: Option<Value>,
    /// Options of a combo box
    pub items: Option<Vec<String>>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub show: Option<bool>,
    /// Lay out a group's children on one line
    pub horizontal: bool,
    /// Handler for the widget's change or click event
    pub callback: Option<Callback>,
}

impl WidgetParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Label shown next to or on the widget
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Initial value of the widget
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Choices offered by a combo box
    #[must_use]
    pub fn items<S: Into<String>>(mut self, items: impl IntoIterator<Item = S>) -> Self {
        self.items = Some(items.into_iter().map(Into::into).collect());
        self
    }

    /// Slider bounds
    #[must_use]
    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    /// Whether the widget starts shown
    #[must_use]
    pub fn show(mut self, show: bool) -> Self {
        self.show = Some(show);
        self
    }

    /// Lay a group's children out on one line
    #[must_use]
    pub fn horizontal(mut self) -> Self {
        self.horizontal = true;
        self
    }

    /// Callback fired on user interaction
    #[must_use]
    pub fn callback(mut self, callback: Callback) -> Self {
        self.callback = Some(callback);
        self
    }
}

/// Partial update of a widget's static configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetConfig {
    pub label: Option<String>,
    pub items: Option<Vec<String>>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub show: Option<bool>,
}

impl WidgetConfig {
    /// Replace a combo box's choices
    #[must_use]
    pub fn items(items: Vec<String>) -> Self {
        Self {
            items: Some(items),
            ..Default::default()
        }
    }

    /// Replace a slider's bounds
    #[must_use]
    pub fn range(min: f64, max: f64) -> Self {
        Self {
            min_value: Some(min),
            max_value: Some(max),
            ..Default::default()
        }
    }

    /// Show or hide the widget
    #[must_use]
    pub fn shown(show: bool) -> Self {
        Self {
            show: Some(show),
            ..Default::default()
        }
    }
}

/// Operations the binding layer needs from a widget toolkit
///
/// All calls happen on the thread that drives the frame loop.
/// Implementations must not fire widget callbacks from [`Toolkit::set_value`];
/// callbacks are reserved for user interaction.
pub trait Toolkit {
    /// Create a widget, returning its tag
    ///
    /// An unassigned `tag` asks the toolkit to allocate one. New widgets are
    /// parented to the innermost pushed container.
    fn create_widget(&mut self, kind: WidgetKind, tag: &Tag, params: WidgetParams) -> GuiResult<Tag>;

    fn get_value(&self, tag: &Tag) -> GuiResult<Value>;

    fn set_value(&mut self, tag: &Tag, value: Value) -> GuiResult<()>;

    fn exists(&self, tag: &Tag) -> bool;

    /// Whether the widget is shown, including all of its ancestors
    fn is_visible(&self, tag: &Tag) -> bool;

    fn configure(&mut self, tag: &Tag, config: WidgetConfig) -> GuiResult<()>;

    /// Move a widget to `new_tag`, keeping its value, configuration,
    /// callback and place in the tree
    fn rename_widget(&mut self, tag: &Tag, new_tag: &Tag) -> GuiResult<()>;

    /// Delete every descendant of a container, keeping the container itself
    fn delete_children(&mut self, tag: &Tag) -> GuiResult<()>;

    /// Make `tag` the parent of subsequently created widgets
    fn push_container(&mut self, tag: &Tag) -> GuiResult<()>;

    fn pop_container(&mut self) -> GuiResult<()>;

    /// Open the viewport
    fn setup(&mut self, viewport: &ViewportSettings) -> GuiResult<()>;

    /// Render one frame, returning `false` once the viewport has closed
    fn render_frame(&mut self) -> bool;

    /// Close the viewport and release every widget
    fn teardown(&mut self);
}

#[derive(Debug)]
struct Node {
    kind: WidgetKind,
    label: Option<String>,
    value: Value,
    items: Vec<String>,
    range: (Option<f64>, Option<f64>),
    shown: bool,
    parent: Option<Tag>,
    children: Vec<Tag>,
    callback: Option<Callback>,
}

#[derive(Debug, Clone)]
struct ScheduledChange {
    frame: u64,
    tag: Tag,
    value: Value,
}

/// In-memory retained widget tree
#[derive(Debug, Default)]
pub struct HeadlessToolkit {
    nodes: HashMap<Tag, Node>,
    next_id: u64,
    container_stack: Vec<Tag>,
    scheduled: Vec<ScheduledChange>,
    frame: u64,
    frame_limit: Option<u64>,
    viewport: Option<ViewportSettings>,
    open: bool,
    /// Number of widget calls made through the `Toolkit` trait
    calls: Cell<u64>,
}

impl HeadlessToolkit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the viewport after `frames` rendered frames
    #[must_use]
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    /// Widget calls made so far
    #[must_use]
    pub fn call_count(&self) -> u64 {
        self.calls.get()
    }

    /// Frames rendered so far
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Whether the viewport is open
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Viewport settings from the last `setup`
    #[must_use]
    pub fn viewport(&self) -> Option<&ViewportSettings> {
        self.viewport.as_ref()
    }

    /// Number of live widgets, containers included
    #[must_use]
    pub fn widget_count(&self) -> usize {
        self.nodes.len()
    }

    /// Kind of the widget under `tag`
    #[must_use]
    pub fn kind(&self, tag: &Tag) -> Option<WidgetKind> {
        self.nodes.get(tag).map(|n| n.kind)
    }

    /// Label of the widget under `tag`
    #[must_use]
    pub fn label(&self, tag: &Tag) -> Option<&str> {
        self.nodes.get(tag).and_then(|n| n.label.as_deref())
    }

    /// Combo box choices of the widget under `tag`
    #[must_use]
    pub fn items(&self, tag: &Tag) -> Option<&[String]> {
        self.nodes.get(tag).map(|n| n.items.as_slice())
    }

    /// Slider bounds of the widget under `tag`
    #[must_use]
    pub fn range(&self, tag: &Tag) -> Option<(Option<f64>, Option<f64>)> {
        self.nodes.get(tag).map(|n| n.range)
    }

    /// Container holding the widget under `tag`
    #[must_use]
    pub fn parent(&self, tag: &Tag) -> Option<&Tag> {
        self.nodes.get(tag).and_then(|n| n.parent.as_ref())
    }

    /// Widgets directly inside the container under `tag`
    #[must_use]
    pub fn children(&self, tag: &Tag) -> &[Tag] {
        self.nodes.get(tag).map_or(&[], |n| n.children.as_slice())
    }

    /// Whether the widget under `tag` has a callback
    #[must_use]
    pub fn has_callback(&self, tag: &Tag) -> bool {
        self.nodes.get(tag).is_some_and(|n| n.callback.is_some())
    }

    /// Show or hide a widget directly, as a user closing a window would
    pub fn set_shown(&mut self, tag: &Tag, shown: bool) -> GuiResult<()> {
        self.node_mut(tag)?.shown = shown;
        Ok(())
    }

    /// Deliver a user edit: store `value` and fire the widget's callback
    pub fn simulate_change(&mut self, tag: &Tag, value: impl Into<Value>) -> GuiResult<()> {
        let node = self.node_mut(tag)?;
        node.value = value.into();
        let args = CallbackArgs::new(tag.clone(), node.value.clone());
        let callback = node.callback.clone();

        match callback {
            Some(callback) => callback.call(&args),
            None => Ok(()),
        }
    }

    /// Deliver a click: fire the widget's callback with its current value
    pub fn click(&mut self, tag: &Tag) -> GuiResult<()> {
        let node = self.node(tag)?;
        let args = CallbackArgs::new(tag.clone(), node.value.clone());
        match node.callback.clone() {
            Some(callback) => callback.call(&args),
            None => Ok(()),
        }
    }

    /// Queue a user edit to be delivered while rendering `frame`
    pub fn schedule_change(&mut self, frame: u64, tag: impl Into<Tag>, value: impl Into<Value>) {
        self.scheduled.push(ScheduledChange {
            frame,
            tag: tag.into(),
            value: value.into(),
        });
    }

    fn node(&self, tag: &Tag) -> GuiResult<&Node> {
        self.nodes.get(tag).ok_or_else(|| GuiError::NotFound(tag.clone()))
    }

    fn node_mut(&mut self, tag: &Tag) -> GuiResult<&mut Node> {
        self.nodes.get_mut(tag).ok_or_else(|| GuiError::NotFound(tag.clone()))
    }

    fn count_call(&self) {
        self.calls.set(self.calls.get() + 1);
    }

    fn allocate_tag(&mut self) -> Tag {
        loop {
            self.next_id += 1;
            let tag = Tag::Id(self.next_id);
            if !self.nodes.contains_key(&tag) {
                return tag;
            }
        }
    }

    fn deliver_scheduled(&mut self) {
        let frame = self.frame;
        let (due, later): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.scheduled).into_iter().partition(|c| c.frame <= frame);
        self.scheduled = later;

        for change in due {
            if let Err(error) = self.simulate_change(&change.tag, change.value) {
                tracing::warn!(tag = %change.tag, frame, %error, "dropping scheduled change");
            }
        }
    }
}

impl Toolkit for HeadlessToolkit {
    fn create_widget(&mut self, kind: WidgetKind, tag: &Tag, params: WidgetParams) -> GuiResult<Tag> {
        self.count_call();

        let tag = if tag.is_assigned() {
            if self.nodes.contains_key(tag) {
                return Err(GuiError::DuplicateTag(tag.clone()));
            }
            tag.clone()
        } else {
            self.allocate_tag()
        };

        let parent = match kind {
            WidgetKind::Window => None,
            _ => self.container_stack.last().cloned(),
        };
        if let Some(parent) = &parent {
            self.node_mut(parent)?.children.push(tag.clone());
        }

        tracing::trace!(%tag, kind = kind.name(), "created widget");
        self.nodes.insert(
            tag.clone(),
            Node {
                kind,
                label: params.label,
                value: params.default_value.unwrap_or_else(|| kind.initial_value()),
                items: params.items.unwrap_or_default(),
                range: (params.min_value, params.max_value),
                shown: params.show.unwrap_or(true),
                parent,
                children: Vec::new(),
                callback: params.callback,
            },
        );
        Ok(tag)
    }

    fn get_value(&self, tag: &Tag) -> GuiResult<Value> {
        self.count_call();
        Ok(self.node(tag)?.value.clone())
    }

    fn set_value(&mut self, tag: &Tag, value: Value) -> GuiResult<()> {
        self.count_call();
        self.node_mut(tag)?.value = value;
        Ok(())
    }

    fn exists(&self, tag: &Tag) -> bool {
        self.count_call();
        self.nodes.contains_key(tag)
    }

    fn is_visible(&self, tag: &Tag) -> bool {
        self.count_call();
        let mut current = self.nodes.get(tag);
        while let Some(node) = current {
            if !node.shown {
                return false;
            }
            match &node.parent {
                Some(parent) => current = self.nodes.get(parent),
                None => return true,
            }
        }
        false
    }

    fn configure(&mut self, tag: &Tag, config: WidgetConfig) -> GuiResult<()> {
        self.count_call();
        let node = self.node_mut(tag)?;
        if let Some(label) = config.label {
            node.label = Some(label);
        }
        if let Some(items) = config.items {
            node.items = items;
        }
        if config.min_value.is_some() {
            node.range.0 = config.min_value;
        }
        if config.max_value.is_some() {
            node.range.1 = config.max_value;
        }
        if let Some(show) = config.show {
            node.shown = show;
        }
        Ok(())
    }

    fn rename_widget(&mut self, tag: &Tag, new_tag: &Tag) -> GuiResult<()> {
        self.count_call();
        if !new_tag.is_assigned() {
            return Err(GuiError::Toolkit(format!("cannot move {tag} to an unassigned tag")));
        }
        if self.nodes.contains_key(new_tag) {
            return Err(GuiError::DuplicateTag(new_tag.clone()));
        }

        let node = self.nodes.remove(tag).ok_or_else(|| GuiError::NotFound(tag.clone()))?;
        if let Some(parent) = node.parent.as_ref().and_then(|parent| self.nodes.get_mut(parent)) {
            for child in &mut parent.children {
                if child == tag {
                    *child = new_tag.clone();
                }
            }
        }
        for child in &node.children {
            if let Some(child) = self.nodes.get_mut(child) {
                child.parent = Some(new_tag.clone());
            }
        }
        for open in &mut self.container_stack {
            if open == tag {
                *open = new_tag.clone();
            }
        }

        tracing::trace!(from = %tag, to = %new_tag, "renamed widget");
        self.nodes.insert(new_tag.clone(), node);
        Ok(())
    }

    fn delete_children(&mut self, tag: &Tag) -> GuiResult<()> {
        self.count_call();
        let mut pending = std::mem::take(&mut self.node_mut(tag)?.children);
        while let Some(child) = pending.pop() {
            if let Some(node) = self.nodes.remove(&child) {
                pending.extend(node.children);
            }
        }
        Ok(())
    }

    fn push_container(&mut self, tag: &Tag) -> GuiResult<()> {
        self.count_call();
        let kind = self.node(tag)?.kind;
        if !kind.is_container() {
            return Err(GuiError::Toolkit(format!("{tag} is a {}, not a container", kind.name())));
        }
        self.container_stack.push(tag.clone());
        Ok(())
    }

    fn pop_container(&mut self) -> GuiResult<()> {
        self.count_call();
        self.container_stack
            .pop()
            .map(|_| ())
            .ok_or_else(|| GuiError::Toolkit("container stack is empty".to_string()))
    }

    fn setup(&mut self, viewport: &ViewportSettings) -> GuiResult<()> {
        tracing::debug!(title = %viewport.title, "opening headless viewport");
        self.viewport = Some(viewport.clone());
        self.open = true;
        Ok(())
    }

    fn render_frame(&mut self) -> bool {
        if !self.open {
            return false;
        }
        self.frame += 1;
        self.deliver_scheduled();
        if self.frame_limit.is_some_and(|limit| self.frame >= limit) {
            self.open = false;
        }
        self.open
    }

    fn teardown(&mut self) {
        self.open = false;
        self.nodes.clear();
        self.container_stack.clear();
        self.scheduled.clear();
    }
}
