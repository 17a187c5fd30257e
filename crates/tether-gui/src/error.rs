//! Error types for the tether binding layer

use thiserror::Error;

use crate::tag::Tag;

/// Binding and host errors
///
/// Every variant is a distinct failure category so callers can match on
/// the kind instead of the message.
#[derive(Debug, Error)]
pub enum GuiError {
    /// The bound model has no field with this name
    #[error("model has no attribute '{field}'")]
    AttributeMissing { field: String },

    /// The bound field holds a type the widget cannot display
    #[error("{widget} cannot bind '{field}' of type {actual}")]
    UnsupportedType {
        widget: &'static str,
        field: String,
        actual: &'static str,
    },

    /// The derived default is not a valid choice for the widget
    #[error("default value '{value}' of '{field}' is not one of the available items")]
    InvalidDefault { field: String, value: String },

    /// A non-sentinel tag is already owned by another live element
    #[error("tag {0} is already registered")]
    DuplicateTag(Tag),

    /// An operation was attempted on a disposed element
    #[error("{widget} {tag} was used after it was destroyed")]
    UseAfterDestroy { widget: &'static str, tag: Tag },

    /// The registry sweep was requested outside a running host
    #[error("GUI host is not running")]
    NotRunning,

    /// The abstract operation has no implementation for this element
    #[error("{operation} is not implemented for {widget}")]
    NotImplemented {
        widget: &'static str,
        operation: &'static str,
    },

    /// The tag has no corresponding widget
    #[error("no widget exists for tag {0}")]
    NotFound(Tag),

    /// `materialize` was invoked a second time
    #[error("{widget} {tag} has already been materialized")]
    AlreadyMaterialized { widget: &'static str, tag: Tag },

    /// A composed callback could not be invoked
    #[error("callback is not callable: {0}")]
    CallbackNotCallable(String),

    /// A composed callback returned an error or panicked
    #[error("callback failed: {0}")]
    CallbackFailed(String),

    /// The model behind a binding was dropped or is borrowed elsewhere
    #[error("model for '{field}' is unavailable: {reason}")]
    ModelUnavailable { field: String, reason: &'static str },

    /// The widget toolkit rejected a call
    #[error("toolkit error: {0}")]
    Toolkit(String),

    /// Host configuration could not be parsed or serialized
    #[error("configuration error: {0}")]
    Config(String),

    /// Reading or writing a configuration file failed
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for binding operations
pub type GuiResult<T> = Result<T, GuiError>;
