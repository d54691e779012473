//! Error types for autoxai_explain.

use autoxai_core::CoreError;
use thiserror::Error;

/// Result type alias using [`ExplainError`].
pub type Result<T> = std::result::Result<T, ExplainError>;

/// Errors raised while building or running explainers.
#[derive(Error, Debug)]
pub enum ExplainError {
    /// The explainer list handed to the context manager was empty.
    #[error("At least one explainer should be defined.")]
    NoExplainers,

    /// Explainers attribute to exactly one model input.
    #[error("calculate_features() supports a single model input, got {0} inputs")]
    MultipleInputs(usize),

    /// Target class index outside the model output.
    #[error("Target index {target} out of range for a model with {n_outputs} outputs")]
    TargetOutOfRange {
        /// Requested target index.
        target: usize,
        /// Number of model outputs.
        n_outputs: usize,
    },

    /// Backward pass did not reach the tensor attributions are computed for.
    #[error("No gradient reached {0}")]
    MissingGradient(String),

    /// An attribution algorithm produced a tensor without elements.
    #[error("Attribution is empty: shape {0:?}")]
    EmptyAttribution(Vec<usize>),

    /// Parameters rejected before running.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Name that does not match any explainer.
    #[error("Unknown explainer '{0}'")]
    UnknownExplainer(String),

    /// Model-level error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
