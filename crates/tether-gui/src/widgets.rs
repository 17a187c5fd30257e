//! Concrete widget bindings
//!
//! Every updatable binding follows the same sync policy: the widget's
//! change event writes the new value into the bound field, and each visible
//! frame pushes the field's current value back into the widget when the two
//! differ. The widget therefore follows external model changes as well as
//! user edits.

use crate::callback::Callback;
use crate::element::{Bound, Element, ElementState, UpdatableCore, UpdatableElement};
use crate::error::{GuiError, GuiResult};
use crate::model::FieldBinding;
use crate::registry::ElementRegistry;
use crate::tag::Tag;
use crate::toolkit::{Toolkit, WidgetConfig, WidgetKind, WidgetParams};
use crate::value::Value;

fn unsupported(widget: &'static str, field: &FieldBinding, value: &Value) -> GuiError {
    GuiError::UnsupportedType {
        widget,
        field: field.name().to_string(),
        actual: value.type_name(),
    }
}

/// Drop caller-supplied parameters the binding owns
fn discard_owned(widget: &'static str, tag: &Tag, params: &mut WidgetParams, owns_items: bool) {
    if params.default_value.take().is_some() {
        tracing::warn!(widget, %tag, "default_value is set by the binding, discarding");
    }
    if owns_items && params.items.take().is_some() {
        tracing::warn!(widget, %tag, "items are set by the binding, use set_items instead");
    }
}

/// Write `value` into the widget unless it already displays it
fn push_if_changed(toolkit: &mut dyn Toolkit, tag: &Tag, value: Value) -> GuiResult<()> {
    if toolkit.get_value(tag)? != value {
        toolkit.set_value(tag, value)?;
    }
    Ok(())
}

/// Build the model writer from a value normalizer
fn field_writer(
    widget: &'static str,
    field: &FieldBinding,
    normalize: fn(&FieldBinding, Value) -> GuiResult<Value>,
) -> Callback {
    let field = field.clone();
    Callback::new(move |args| {
        let value = normalize(&field, args.value.clone())?;
        field.set(value)
    })
    .with_description(format!("{widget} model write"))
}

// ============================================================================
// Button
// ============================================================================

/// A push button
///
/// Buttons never touch a model. A button created without a callback gets a
/// no-op one and logs a warning.
#[derive(Debug, Clone, Default)]
pub struct Button {
    tag: Tag,
    materialized: bool,
    fallback_callback: bool,
}

impl Button {
    /// A button with an auto-assigned tag
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A button created under a fixed tag
    #[must_use]
    pub fn with_tag(tag: impl Into<Tag>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Whether the button was created without a callback
    #[must_use]
    pub fn has_fallback_callback(&self) -> bool {
        self.fallback_callback
    }
}

impl Element for Button {
    fn kind_name(&self) -> &'static str {
        "button"
    }

    fn tag(&self) -> Tag {
        self.tag.clone()
    }

    fn materialize(&mut self, toolkit: &mut dyn Toolkit, mut params: WidgetParams) -> GuiResult<Tag> {
        if self.materialized {
            return Err(GuiError::AlreadyMaterialized {
                widget: self.kind_name(),
                tag: self.tag.clone(),
            });
        }

        if params.callback.is_none() {
            tracing::warn!(label = ?params.label, "no callback specified for button");
            params.callback = Some(Callback::noop());
            self.fallback_callback = true;
        }

        self.tag = toolkit.create_widget(WidgetKind::Button, &self.tag, params)?;
        self.materialized = true;
        Ok(self.tag.clone())
    }
}

// ============================================================================
// Text
// ============================================================================

/// Static text
#[derive(Debug, Clone, Default)]
pub struct Text {
    tag: Tag,
    text: String,
    materialized: bool,
}

impl Text {
    /// Static text, created on materialization
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Create the text under a fixed tag
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<Tag>) -> Self {
        self.tag = tag.into();
        self
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the text, updating the widget if it exists
    pub fn set_text(&mut self, toolkit: &mut dyn Toolkit, text: impl Into<String>) -> GuiResult<()> {
        self.text = text.into();
        if self.materialized {
            toolkit.set_value(&self.tag, Value::Str(self.text.clone()))?;
        }
        Ok(())
    }
}

impl Element for Text {
    fn kind_name(&self) -> &'static str {
        "text"
    }

    fn tag(&self) -> Tag {
        self.tag.clone()
    }

    fn materialize(&mut self, toolkit: &mut dyn Toolkit, mut params: WidgetParams) -> GuiResult<Tag> {
        if self.materialized {
            return Err(GuiError::AlreadyMaterialized {
                widget: self.kind_name(),
                tag: self.tag.clone(),
            });
        }

        params.default_value = Some(Value::Str(self.text.clone()));
        self.tag = toolkit.create_widget(WidgetKind::Text, &self.tag, params)?;
        self.materialized = true;
        Ok(self.tag.clone())
    }
}

// ============================================================================
// Checkbox
// ============================================================================

/// A checkbox bound to a boolean field; a null field reads as `false`
#[derive(Debug)]
pub struct Checkbox {
    core: UpdatableCore,
    default_value: bool,
}

impl Checkbox {
    const KIND: &'static str = "checkbox";

    /// Bind a checkbox to a boolean field; null reads as unchecked
    ///
    /// # Errors
    /// `AttributeMissing`, `DuplicateTag`, or `UnsupportedType` for a
    /// non-boolean field.
    pub fn bind(registry: &ElementRegistry, field: FieldBinding, tag: impl Into<Tag>) -> GuiResult<Bound<Self>> {
        let (core, current) = UpdatableCore::bind(registry, field, tag.into())?;
        let default_value = Self::normalize(core.field(), current)?
            .as_bool()
            .unwrap_or_default();
        Ok(Bound::new(Self { core, default_value }))
    }

    /// Value displayed when the widget is created
    #[must_use]
    pub fn default_value(&self) -> bool {
        self.default_value
    }

    fn normalize(field: &FieldBinding, value: Value) -> GuiResult<Value> {
        match value {
            Value::Null => Ok(Value::Bool(false)),
            Value::Bool(_) => Ok(value),
            other => Err(unsupported(Self::KIND, field, &other)),
        }
    }
}

impl UpdatableElement for Checkbox {
    fn core(&self) -> &UpdatableCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut UpdatableCore {
        &mut self.core
    }

    fn kind_name(&self) -> &'static str {
        Self::KIND
    }

    fn model_writer(&self) -> Callback {
        field_writer(Self::KIND, self.core.field(), Self::normalize)
    }

    fn create(&mut self, toolkit: &mut dyn Toolkit, mut params: WidgetParams) -> GuiResult<Tag> {
        discard_owned(Self::KIND, self.core.tag(), &mut params, false);
        params.default_value = Some(Value::Bool(self.default_value));
        toolkit.create_widget(WidgetKind::Checkbox, self.core.tag(), params)
    }

    fn reconfigure(&mut self, _toolkit: &mut dyn Toolkit) -> GuiResult<()> {
        Ok(())
    }

    fn sync_value(&mut self, toolkit: &mut dyn Toolkit) -> GuiResult<()> {
        let value = Self::normalize(self.core.field(), self.core.field().get()?)?;
        push_if_changed(toolkit, self.core.tag(), value)
    }
}

// ============================================================================
// Slider
// ============================================================================

/// Numeric representation of a slider, chosen from the bound field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliderKind {
    Int,
    Float,
}

impl SliderKind {
    fn widget_kind(self) -> WidgetKind {
        match self {
            Self::Int => WidgetKind::SliderInt,
            Self::Float => WidgetKind::SliderFloat,
        }
    }
}

/// A slider bound to an integer or float field
///
/// The slider kind follows the field's value at bind time. A null field
/// binds an integer slider at 0.
#[derive(Debug)]
pub struct Slider {
    core: UpdatableCore,
    kind: SliderKind,
    default_value: Value,
    range: Option<(f64, f64)>,
}

impl Slider {
    const KIND: &'static str = "slider";

    /// Bind a slider to a numeric field
    ///
    /// The field's type picks the slider kind; null binds an integer
    /// slider starting at 0.
    pub fn bind(registry: &ElementRegistry, field: FieldBinding, tag: impl Into<Tag>) -> GuiResult<Bound<Self>> {
        let (core, current) = UpdatableCore::bind(registry, field, tag.into())?;
        let (kind, default_value) = match current {
            Value::Null => (SliderKind::Int, Value::Int(0)),
            Value::Int(_) => (SliderKind::Int, current),
            Value::Float(_) => (SliderKind::Float, current),
            other => return Err(unsupported(Self::KIND, core.field(), &other)),
        };
        Ok(Bound::new(Self {
            core,
            kind,
            default_value,
            range: None,
        }))
    }

    /// Integer or float, fixed at bind time
    #[must_use]
    pub fn kind(&self) -> SliderKind {
        self.kind
    }

    #[must_use]
    pub fn default_value(&self) -> &Value {
        &self.default_value
    }

    /// Bounds applied to the widget, if any
    #[must_use]
    pub fn range(&self) -> Option<(f64, f64)> {
        self.range
    }

    #[allow(clippy::cast_precision_loss)]
    fn normalize(kind: SliderKind, field: &FieldBinding, value: Value) -> GuiResult<Value> {
        match (kind, &value) {
            (SliderKind::Int, Value::Null) => Ok(Value::Int(0)),
            (SliderKind::Float, Value::Null) => Ok(Value::Float(0.0)),
            (SliderKind::Int, Value::Int(_)) | (SliderKind::Float, Value::Float(_)) => Ok(value),
            (SliderKind::Float, Value::Int(i)) => Ok(Value::Float(*i as f64)),
            _ => Err(unsupported(Self::KIND, field, &value)),
        }
    }
}

impl Bound<Slider> {
    /// Change the slider bounds; applied on the next update
    pub fn set_range(&self, min: f64, max: f64) -> GuiResult<()> {
        self.request_reconfigure()?;
        self.with_mut(|slider| slider.range = Some((min, max)));
        Ok(())
    }
}

impl UpdatableElement for Slider {
    fn core(&self) -> &UpdatableCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut UpdatableCore {
        &mut self.core
    }

    fn kind_name(&self) -> &'static str {
        Self::KIND
    }

    fn model_writer(&self) -> Callback {
        let field = self.core.field().clone();
        let kind = self.kind;
        Callback::new(move |args| field.set(Slider::normalize(kind, &field, args.value.clone())?))
            .with_description("slider model write")
    }

    fn create(&mut self, toolkit: &mut dyn Toolkit, mut params: WidgetParams) -> GuiResult<Tag> {
        discard_owned(Self::KIND, self.core.tag(), &mut params, false);
        params.default_value = Some(self.default_value.clone());

        match (self.range, params.min_value, params.max_value) {
            (Some((min, max)), _, _) => {
                params.min_value = Some(min);
                params.max_value = Some(max);
            }
            (None, Some(min), Some(max)) => self.range = Some((min, max)),
            _ => {}
        }

        toolkit.create_widget(self.kind.widget_kind(), self.core.tag(), params)
    }

    fn reconfigure(&mut self, toolkit: &mut dyn Toolkit) -> GuiResult<()> {
        match self.range {
            Some((min, max)) => toolkit.configure(self.core.tag(), WidgetConfig::range(min, max)),
            None => Ok(()),
        }
    }

    fn sync_value(&mut self, toolkit: &mut dyn Toolkit) -> GuiResult<()> {
        let value = Self::normalize(self.kind, self.core.field(), self.core.field().get()?)?;
        push_if_changed(toolkit, self.core.tag(), value)
    }
}

// ============================================================================
// InputText
// ============================================================================

/// A single line text input bound to a string field
#[derive(Debug)]
pub struct InputText {
    core: UpdatableCore,
    default_value: String,
}

impl InputText {
    const KIND: &'static str = "input text";

    /// Bind a text input to a string field; null reads as empty
    pub fn bind(registry: &ElementRegistry, field: FieldBinding, tag: impl Into<Tag>) -> GuiResult<Bound<Self>> {
        let (core, current) = UpdatableCore::bind(registry, field, tag.into())?;
        let default_value = match Self::normalize(core.field(), current)? {
            Value::Str(s) => s,
            _ => String::new(),
        };
        Ok(Bound::new(Self { core, default_value }))
    }

    #[must_use]
    pub fn default_value(&self) -> &str {
        &self.default_value
    }

    fn normalize(field: &FieldBinding, value: Value) -> GuiResult<Value> {
        match value {
            Value::Null => Ok(Value::Str(String::new())),
            Value::Str(_) => Ok(value),
            other => Err(unsupported(Self::KIND, field, &other)),
        }
    }
}

impl UpdatableElement for InputText {
    fn core(&self) -> &UpdatableCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut UpdatableCore {
        &mut self.core
    }

    fn kind_name(&self) -> &'static str {
        Self::KIND
    }

    fn model_writer(&self) -> Callback {
        field_writer(Self::KIND, self.core.field(), Self::normalize)
    }

    fn create(&mut self, toolkit: &mut dyn Toolkit, mut params: WidgetParams) -> GuiResult<Tag> {
        discard_owned(Self::KIND, self.core.tag(), &mut params, false);
        params.default_value = Some(Value::Str(self.default_value.clone()));
        toolkit.create_widget(WidgetKind::InputText, self.core.tag(), params)
    }

    fn reconfigure(&mut self, _toolkit: &mut dyn Toolkit) -> GuiResult<()> {
        Ok(())
    }

    fn sync_value(&mut self, toolkit: &mut dyn Toolkit) -> GuiResult<()> {
        let value = Self::normalize(self.core.field(), self.core.field().get()?)?;
        push_if_changed(toolkit, self.core.tag(), value)
    }
}

// ============================================================================
// ComboBox
// ============================================================================

/// A drop-down choice between string items
///
/// The bound field's value at bind time must be one of the items.
#[derive(Debug)]
pub struct ComboBox {
    core: UpdatableCore,
    items: Vec<String>,
    default_value: String,
}

impl ComboBox {
    const KIND: &'static str = "combo box";

    /// Bind a combo box offering `items` to a string field
    ///
    /// # Errors
    /// `InvalidDefault` when the field's value is not one of `items`.
    pub fn bind<S: Into<String>>(
        registry: &ElementRegistry,
        field: FieldBinding,
        items: impl IntoIterator<Item = S>,
        tag: impl Into<Tag>,
    ) -> GuiResult<Bound<Self>> {
        let (core, current) = UpdatableCore::bind(registry, field, tag.into())?;
        let default_value = match Self::normalize(core.field(), current)? {
            Value::Str(s) => s,
            _ => String::new(),
        };
        let items: Vec<String> = items.into_iter().map(Into::into).collect();

        if !items.contains(&default_value) {
            return Err(GuiError::InvalidDefault {
                field: core.field().name().to_string(),
                value: default_value,
            });
        }

        Ok(Bound::new(Self {
            core,
            items,
            default_value,
        }))
    }

    /// The choices offered by the widget
    #[must_use]
    pub fn items(&self) -> &[String] {
        &self.items
    }

    #[must_use]
    pub fn default_value(&self) -> &str {
        &self.default_value
    }

    fn normalize(field: &FieldBinding, value: Value) -> GuiResult<Value> {
        match value {
            Value::Null => Ok(Value::Str(String::new())),
            Value::Str(_) => Ok(value),
            other => Err(unsupported(Self::KIND, field, &other)),
        }
    }
}

impl Bound<ComboBox> {
    /// Replace the items; the widget receives them on the next update
    pub fn set_items<S: Into<String>>(&self, items: impl IntoIterator<Item = S>) -> GuiResult<()> {
        self.request_reconfigure()?;
        let items: Vec<String> = items.into_iter().map(Into::into).collect();
        self.with_mut(|combo| combo.items = items);
        Ok(())
    }
}

impl UpdatableElement for ComboBox {
    fn core(&self) -> &UpdatableCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut UpdatableCore {
        &mut self.core
    }

    fn kind_name(&self) -> &'static str {
        Self::KIND
    }

    fn model_writer(&self) -> Callback {
        field_writer(Self::KIND, self.core.field(), Self::normalize)
    }

    fn create(&mut self, toolkit: &mut dyn Toolkit, mut params: WidgetParams) -> GuiResult<Tag> {
        discard_owned(Self::KIND, self.core.tag(), &mut params, true);
        params.default_value = Some(Value::Str(self.default_value.clone()));
        params.items = Some(self.items.clone());
        toolkit.create_widget(WidgetKind::Combo, self.core.tag(), params)
    }

    fn reconfigure(&mut self, toolkit: &mut dyn Toolkit) -> GuiResult<()> {
        tracing::trace!(tag = %self.core.tag(), items = self.items.len(), "reconfiguring combo box");
        toolkit.configure(self.core.tag(), WidgetConfig::items(self.items.clone()))
    }

    fn sync_value(&mut self, toolkit: &mut dyn Toolkit) -> GuiResult<()> {
        let value = Self::normalize(self.core.field(), self.core.field().get()?)?;
        push_if_changed(toolkit, self.core.tag(), value)
    }
}

// ============================================================================
// LabeledSlider
// ============================================================================

/// A text label followed by a slider
///
/// With [`horizontal`](Self::horizontal) both sit in one horizontal group.
#[derive(Debug)]
pub struct LabeledSlider {
    label: Text,
    slider: Bound<Slider>,
    horizontal: bool,
    group: Option<Tag>,
}

impl LabeledSlider {
    /// Bind a slider to `field` with a text label in front of it
    pub fn bind(
        registry: &ElementRegistry,
        field: FieldBinding,
        label: impl Into<String>,
        tag: impl Into<Tag>,
    ) -> GuiResult<Self> {
        Ok(Self {
            label: Text::new(label),
            slider: Slider::bind(registry, field, tag)?,
            horizontal: false,
            group: None,
        })
    }

    /// Lay the label and the slider out on one line
    #[must_use]
    pub fn horizontal(mut self) -> Self {
        self.horizontal = true;
        self
    }

    /// The label in front of the slider
    #[must_use]
    pub fn label(&self) -> &Text {
        &self.label
    }

    /// The slider binding
    #[must_use]
    pub fn slider(&self) -> &Bound<Slider> {
        &self.slider
    }

    /// The horizontal group, once created
    #[must_use]
    pub fn group(&self) -> Option<&Tag> {
        self.group.as_ref()
    }

    fn materialize_parts(&mut self, toolkit: &mut dyn Toolkit, mut params: WidgetParams) -> GuiResult<Tag> {
        self.label.materialize(toolkit, WidgetParams::new())?;
        if params.label.is_none() {
            params.label = Some(String::new());
        }
        self.slider.materialize(toolkit, params)
    }
}

impl Element for LabeledSlider {
    fn kind_name(&self) -> &'static str {
        "labeled slider"
    }

    /// Tag of the slider
    fn tag(&self) -> Tag {
        self.slider.tag()
    }

    fn materialize(&mut self, toolkit: &mut dyn Toolkit, params: WidgetParams) -> GuiResult<Tag> {
        if self.slider.state() != ElementState::Unmaterialized {
            return Err(GuiError::AlreadyMaterialized {
                widget: self.kind_name(),
                tag: self.slider.tag(),
            });
        }
        if !self.horizontal {
            return self.materialize_parts(toolkit, params);
        }

        let group = toolkit.create_widget(WidgetKind::Group, &Tag::Unassigned, WidgetParams::new().horizontal())?;
        self.group = Some(group.clone());
        toolkit.push_container(&group)?;
        let result = self.materialize_parts(toolkit, params);
        toolkit.pop_container()?;
        result
    }
}
