//! Windows, containers and the widget-building context
//!
//! A [`Container`] is created lazily the first time something is placed in
//! it. Application windows implement [`Window`] and declare their widgets
//! through a [`Ui`], which pairs the toolkit with the host's registry.

use crate::element::{Bound, Element, UpdatableElement};
use crate::error::{GuiError, GuiResult};
use crate::model::FieldBinding;
use crate::registry::ElementRegistry;
use crate::tag::Tag;
use crate::toolkit::{Toolkit, WidgetConfig, WidgetKind, WidgetParams};
use crate::widgets::{Button, Checkbox, ComboBox, InputText, LabeledSlider, Slider, Text};

/// Kind of container widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Window,
    ChildWindow,
    Group,
    /// A group laying its children out on one line
    HorizontalGroup,
}

impl ContainerKind {
    fn widget_kind(self) -> WidgetKind {
        match self {
            Self::Window => WidgetKind::Window,
            Self::ChildWindow => WidgetKind::ChildWindow,
            Self::Group | Self::HorizontalGroup => WidgetKind::Group,
        }
    }
}

/// A widget that holds other widgets
#[derive(Debug, Clone)]
pub struct Container {
    kind: ContainerKind,
    tag: Tag,
    params: WidgetParams,
    added: bool,
}

impl Container {
    /// An unnamed container of `kind`, shown on creation
    #[must_use]
    pub fn new(kind: ContainerKind) -> Self {
        let params = match kind {
            ContainerKind::HorizontalGroup => WidgetParams::new().horizontal(),
            _ => WidgetParams::new(),
        };
        Self {
            kind,
            tag: Tag::Unassigned,
            params,
            added: false,
        }
    }

    /// A top-level window
    #[must_use]
    pub fn window(label: impl Into<String>) -> Self {
        Self::new(ContainerKind::Window).with_label(label)
    }

    /// A window nested inside another container
    #[must_use]
    pub fn child_window(label: impl Into<String>) -> Self {
        Self::new(ContainerKind::ChildWindow).with_label(label)
    }

    /// A vertical group
    #[must_use]
    pub fn group() -> Self {
        Self::new(ContainerKind::Group)
    }

    /// A group laying its children out on one line
    #[must_use]
    pub fn horizontal_group() -> Self {
        Self::new(ContainerKind::HorizontalGroup)
    }

    /// Create the container under a fixed tag
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<Tag>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Set the title or label
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.params.label = Some(label.into());
        self
    }

    /// Start hidden
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.params.show = Some(false);
        self
    }

    /// The kind of container
    #[must_use]
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// The container's tag, assigned once it is added
    #[must_use]
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Whether the container widget exists
    #[must_use]
    pub fn is_added(&self) -> bool {
        self.added
    }

    /// Create the container widget unless it already exists
    pub fn ensure_added(&mut self, toolkit: &mut dyn Toolkit) -> GuiResult<Tag> {
        if !self.added {
            self.tag = toolkit.create_widget(self.kind.widget_kind(), &self.tag, self.params.clone())?;
            self.added = true;
            tracing::debug!(tag = %self.tag, kind = ?self.kind, "added container");
        }
        Ok(self.tag.clone())
    }

    /// Show the container and its children
    pub fn show(&self, toolkit: &mut dyn Toolkit) -> GuiResult<()> {
        self.require_added()?;
        toolkit.configure(&self.tag, WidgetConfig::shown(true))
    }

    /// Hide the container and its children
    pub fn hide(&self, toolkit: &mut dyn Toolkit) -> GuiResult<()> {
        self.require_added()?;
        toolkit.configure(&self.tag, WidgetConfig::shown(false))
    }

    /// Flip between shown and hidden
    pub fn toggle_visibility(&self, toolkit: &mut dyn Toolkit) -> GuiResult<()> {
        self.require_added()?;
        if toolkit.is_visible(&self.tag) {
            self.hide(toolkit)
        } else {
            self.show(toolkit)
        }
    }

    /// Delete every widget inside the container
    pub fn clear(&self, toolkit: &mut dyn Toolkit) -> GuiResult<()> {
        self.require_added()?;
        toolkit.delete_children(&self.tag)
    }

    /// Run `f` with this container on top of the container stack
    ///
    /// The container is popped again whether or not `f` succeeds. An
    /// error from `f` takes precedence over a failure to pop.
    pub fn scope<R>(
        &mut self,
        toolkit: &mut dyn Toolkit,
        f: impl FnOnce(&mut dyn Toolkit) -> GuiResult<R>,
    ) -> GuiResult<R> {
        let tag = self.ensure_added(toolkit)?;
        toolkit.push_container(&tag)?;
        let result = f(&mut *toolkit);
        close_scope(toolkit, &tag, result)
    }

    fn require_added(&self) -> GuiResult<()> {
        if !self.added {
            tracing::error!(kind = ?self.kind, "container not added yet");
            return Err(GuiError::NotFound(self.tag.clone()));
        }
        Ok(())
    }
}

/// Pop the container opened for a scope and settle the scope's result
fn close_scope<R>(toolkit: &mut dyn Toolkit, tag: &Tag, result: GuiResult<R>) -> GuiResult<R> {
    match (toolkit.pop_container(), result) {
        (Ok(()), result) => result,
        (Err(pop_error), Ok(_)) => Err(pop_error),
        (Err(pop_error), Err(error)) => {
            tracing::error!(%tag, %pop_error, "failed to pop container after a failed scope");
            Err(error)
        }
    }
}

/// An application window managed by a [`GuiHost`](crate::host::GuiHost)
pub trait Window {
    /// The window's own container
    fn container_mut(&mut self) -> &mut Container;

    /// Declare the window's widgets; runs once when the host starts
    fn describe(&mut self, ui: &mut Ui<'_>) -> GuiResult<()>;

    /// Per-frame hook, runs before the registry sweep
    fn update(&mut self, _ui: &mut Ui<'_>) -> GuiResult<()> {
        Ok(())
    }
}

/// Create the window's container and describe it inside
pub(crate) fn describe_window(window: &mut dyn Window, ui: &mut Ui<'_>) -> GuiResult<()> {
    let tag = window.container_mut().ensure_added(&mut *ui.toolkit)?;
    ui.within(&tag, |ui| window.describe(ui))
}

/// Run the window's per-frame hook inside its container
pub(crate) fn update_window(window: &mut dyn Window, ui: &mut Ui<'_>) -> GuiResult<()> {
    let container = window.container_mut();
    if !container.is_added() {
        return window.update(ui);
    }
    let tag = container.tag().clone();
    ui.within(&tag, |ui| window.update(ui))
}

/// Widget-building context handed to window code
///
/// The handles returned by the binding helpers keep their bindings alive;
/// dropping a handle deregisters the binding.
pub struct Ui<'a> {
    toolkit: &'a mut dyn Toolkit,
    registry: &'a ElementRegistry,
}

impl<'a> Ui<'a> {
    /// Borrow a toolkit and registry for window code
    pub fn new(toolkit: &'a mut dyn Toolkit, registry: &'a ElementRegistry) -> Self {
        Self { toolkit, registry }
    }

    /// The toolkit, for materializing elements directly
    pub fn toolkit(&mut self) -> &mut dyn Toolkit {
        &mut *self.toolkit
    }

    /// The registry new bindings join
    #[must_use]
    pub fn registry(&self) -> &ElementRegistry {
        self.registry
    }

    /// Run `f` inside `container`, creating it first if needed
    pub fn scope<R>(&mut self, container: &mut Container, f: impl FnOnce(&mut Self) -> GuiResult<R>) -> GuiResult<R> {
        let tag = container.ensure_added(&mut *self.toolkit)?;
        self.within(&tag, f)
    }

    fn within<R>(&mut self, tag: &Tag, f: impl FnOnce(&mut Self) -> GuiResult<R>) -> GuiResult<R> {
        self.toolkit.push_container(tag)?;
        let result = f(self);
        close_scope(&mut *self.toolkit, tag, result)
    }

    /// Materialize an element built elsewhere
    pub fn add<E: Element>(&mut self, element: &mut E, params: WidgetParams) -> GuiResult<Tag> {
        element.materialize(&mut *self.toolkit, params)
    }

    /// Materialize a binding built elsewhere, for instance one with a fixed tag
    pub fn add_bound<E: UpdatableElement + 'static>(&mut self, bound: &Bound<E>, params: WidgetParams) -> GuiResult<Tag> {
        bound.materialize(&mut *self.toolkit, params)
    }

    /// Add static text
    pub fn text(&mut self, text: impl Into<String>) -> GuiResult<Text> {
        let mut text = Text::new(text);
        self.add(&mut text, WidgetParams::new())?;
        Ok(text)
    }

    /// Add a button
    pub fn button(&mut self, params: WidgetParams) -> GuiResult<Button> {
        let mut button = Button::new();
        self.add(&mut button, params)?;
        Ok(button)
    }

    /// Bind a checkbox to `field`
    pub fn checkbox(&mut self, field: FieldBinding, params: WidgetParams) -> GuiResult<Bound<Checkbox>> {
        let checkbox = Checkbox::bind(self.registry, field, Tag::Unassigned)?;
        self.add_bound(&checkbox, params)?;
        Ok(checkbox)
    }

    /// Bind a slider to `field`
    pub fn slider(&mut self, field: FieldBinding, params: WidgetParams) -> GuiResult<Bound<Slider>> {
        let slider = Slider::bind(self.registry, field, Tag::Unassigned)?;
        self.add_bound(&slider, params)?;
        Ok(slider)
    }

    /// Bind a text input to `field`
    pub fn input_text(&mut self, field: FieldBinding, params: WidgetParams) -> GuiResult<Bound<InputText>> {
        let input = InputText::bind(self.registry, field, Tag::Unassigned)?;
        self.add_bound(&input, params)?;
        Ok(input)
    }

    /// Bind a combo box offering `items` to `field`
    pub fn combo<S: Into<String>>(
        &mut self,
        field: FieldBinding,
        items: impl IntoIterator<Item = S>,
        params: WidgetParams,
    ) -> GuiResult<Bound<ComboBox>> {
        let combo = ComboBox::bind(self.registry, field, items, Tag::Unassigned)?;
        self.add_bound(&combo, params)?;
        Ok(combo)
    }

    /// A label and a slider on one line
    pub fn labeled_slider(
        &mut self,
        field: FieldBinding,
        label: impl Into<String>,
        params: WidgetParams,
    ) -> GuiResult<LabeledSlider> {
        let mut slider = LabeledSlider::bind(self.registry, field, label, Tag::Unassigned)?.horizontal();
        self.add(&mut slider, params)?;
        Ok(slider)
    }
}
