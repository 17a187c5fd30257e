//! Tether - bind retained-mode GUI widgets to application model fields
//!
//! A binding connects one widget to one field of a model. When the user
//! edits the widget, the new value is written into the field; once per
//! frame, every visible binding pushes the field's current value back into
//! its widget, so programmatic model changes show up too.
//!
//! # Architecture
//!
//! - **Toolkit**: the widget primitives the bindings need, behind the
//!   [`Toolkit`] trait. [`HeadlessToolkit`] keeps the widget tree in memory.
//! - **Bindings**: [`Checkbox`], [`Slider`], [`InputText`] and [`ComboBox`]
//!   are [`UpdatableElement`]s driven through a [`Bound`] handle.
//!   [`Button`] and [`Text`] are plain [`Element`]s.
//! - **Registry**: [`ElementRegistry`] weakly indexes live bindings by
//!   [`Tag`] and sweeps them each frame.
//! - **Host**: [`GuiHost`] owns the toolkit, registry and [`Window`]s and
//!   runs the frame loop.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use tether_gui::{ElementRegistry, FieldBinding, HeadlessToolkit, Record, Slider, Tag, Value, WidgetParams};
//!
//! let model = Rc::new(RefCell::new(Record::new().with("count", 3)));
//! let registry = ElementRegistry::new();
//! let mut toolkit = HeadlessToolkit::new();
//!
//! let slider = Slider::bind(&registry, FieldBinding::on_model(&model, "count"), Tag::Unassigned)?;
//! let tag = slider.materialize(&mut toolkit, WidgetParams::new().label("Count"))?;
//!
//! toolkit.simulate_change(&tag, 7)?;
//! assert_eq!(model.borrow().get("count"), Some(&Value::Int(7)));
//! # Ok::<(), tether_gui::GuiError>(())
//! ```

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for binding operations
pub mod error;

/// Widget identifiers
pub mod tag;

/// Dynamic values exchanged with widgets
pub mod value;

/// Widget event callbacks and their composition
pub mod callback;

/// Model field access
pub mod model;

/// The widget toolkit boundary and the headless toolkit
pub mod toolkit;

/// Registry of live bindings
pub mod registry;

/// Element traits and the binding state machine
pub mod element;

/// Concrete widget bindings
pub mod widgets;

/// Containers, windows and the `Ui` builder
pub mod window;

/// Host lifecycle management
pub mod lifecycle;

/// Host configuration
pub mod config;

/// The frame loop host
pub mod host;

// Re-exports for convenience
pub use callback::{combine, Callback, CallbackArgs, CallbackChain, CallbackFailure, CallbackReport};
pub use config::{HostConfig, ViewportSettings};
pub use element::{Bound, Element, ElementState, UpdatableCore, UpdatableElement};
pub use error::{GuiError, GuiResult};
pub use host::{GuiHost, StopHandle};
pub use lifecycle::{LifecycleHooks, LifecycleManager, LifecyclePhase};
pub use model::{FieldBinding, Model, Record};
pub use registry::{ElementRegistry, SweepStats};
pub use tag::Tag;
pub use toolkit::{HeadlessToolkit, Toolkit, WidgetConfig, WidgetKind, WidgetParams};
pub use value::Value;
pub use widgets::{Button, Checkbox, ComboBox, InputText, LabeledSlider, Slider, SliderKind, Text};
pub use window::{Container, ContainerKind, Ui, Window};
