//! Model access for bindings
//!
//! A binding never reflects on the model. It is handed a [`FieldBinding`],
//! an accessor pair for exactly one field, built from closures, from a
//! [`Model`] implementation, or from a statically typed getter/setter.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{GuiError, GuiResult};
use crate::value::Value;

/// Name-addressed field access on an application object
pub trait Model {
    /// Current value of `name`, or `None` if the model has no such field
    fn field(&self, name: &str) -> Option<Value>;

    /// Overwrite `name`
    fn set_field(&mut self, name: &str, value: Value) -> GuiResult<()>;
}

/// A model backed by an ordered map of fields
///
/// Fields are declared up front; `set_field` never adds new ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field with its initial value
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Current value of `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Fields in name order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl Model for Record {
    fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    fn set_field(&mut self, name: &str, value: Value) -> GuiResult<()> {
        match self.fields.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(GuiError::AttributeMissing {
                field: name.to_string(),
            }),
        }
    }
}

type Getter = dyn Fn() -> GuiResult<Option<Value>>;
type Setter = dyn Fn(Value) -> GuiResult<()>;

/// Accessor pair for one field of one model
#[derive(Clone)]
pub struct FieldBinding {
    name: Rc<str>,
    getter: Rc<Getter>,
    setter: Rc<Setter>,
}

impl FieldBinding {
    /// Build from closures; the getter returns `None` when the field is absent
    pub fn new(
        name: impl Into<String>,
        get: impl Fn() -> Option<Value> + 'static,
        set: impl Fn(Value) -> GuiResult<()> + 'static,
    ) -> Self {
        Self {
            name: Rc::from(name.into()),
            getter: Rc::new(move || -> GuiResult<Option<Value>> { Ok(get()) }),
            setter: Rc::new(set),
        }
    }

    /// Bind to a field of a shared model without extending its lifetime
    pub fn on_model<M: Model + 'static>(model: &Rc<RefCell<M>>, name: impl Into<String>) -> Self {
        let name: Rc<str> = Rc::from(name.into());

        let getter = {
            let model = Rc::downgrade(model);
            let name = name.clone();
            move || -> GuiResult<Option<Value>> {
                let model = model.upgrade().ok_or_else(|| unavailable(&name, "model was dropped"))?;
                let model = model
                    .try_borrow()
                    .map_err(|_| unavailable(&name, "model is mutably borrowed"))?;
                Ok(model.field(&name))
            }
        };

        let setter = {
            let model = Rc::downgrade(model);
            let name = name.clone();
            move |value: Value| -> GuiResult<()> {
                let model = model.upgrade().ok_or_else(|| unavailable(&name, "model was dropped"))?;
                let mut model = model
                    .try_borrow_mut()
                    .map_err(|_| unavailable(&name, "model is borrowed"))?;
                model.set_field(&name, value)
            }
        };

        Self {
            name,
            getter: Rc::new(getter),
            setter: Rc::new(setter),
        }
    }

    /// Bind to a statically typed field
    ///
    /// Writes of a value that does not convert to `V` fail with
    /// `UnsupportedType`.
    pub fn typed<V>(
        name: impl Into<String>,
        get: impl Fn() -> V + 'static,
        set: impl Fn(V) + 'static,
    ) -> Self
    where
        V: Into<Value> + TryFrom<Value, Error = Value> + 'static,
    {
        let name: Rc<str> = Rc::from(name.into());
        let field = name.clone();
        Self {
            name,
            getter: Rc::new(move || -> GuiResult<Option<Value>> { Ok(Some(get().into())) }),
            setter: Rc::new(move |value: Value| -> GuiResult<()> {
                let typed = V::try_from(value).map_err(|rejected| GuiError::UnsupportedType {
                    widget: "typed field",
                    field: field.to_string(),
                    actual: rejected.type_name(),
                })?;
                set(typed);
                Ok(())
            }),
        }
    }

    /// Name of the bound field
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read the field
    ///
    /// # Errors
    /// `AttributeMissing` if the model has no such field,
    /// `ModelUnavailable` if the model cannot be reached.
    pub fn get(&self) -> GuiResult<Value> {
        (self.getter)()?.ok_or_else(|| GuiError::AttributeMissing {
            field: self.name.to_string(),
        })
    }

    /// Write the field
    pub fn set(&self, value: Value) -> GuiResult<()> {
        (self.setter)(value)
    }
}

impl fmt::Debug for FieldBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding").field("name", &self.name).finish()
    }
}

fn unavailable(field: &str, reason: &'static str) -> GuiError {
    GuiError::ModelUnavailable {
        field: field.to_string(),
        reason,
    }
}
