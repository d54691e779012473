//! Error types for autoxai_core.

use thiserror::Error;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur while driving a model.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid tensor shape provided.
    #[error("Invalid shape: expected {expected}, got {got}")]
    InvalidShape {
        /// Expected shape description.
        expected: String,
        /// Actual shape description.
        got: String,
    },

    /// The model has no layer with the requested name.
    #[error("Layer '{0}' not found in model")]
    LayerNotFound(String),

    /// Layer attribution requested on a model without convolutions.
    #[error("Model does not contain any Conv2d layer")]
    NoConvLayer,

    /// The model does not implement an optional capability.
    #[error("Model does not support {0}")]
    Unsupported(String),
}
