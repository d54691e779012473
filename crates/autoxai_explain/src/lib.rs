//! # autoxai_explain
//!
//! Explainability for image classifiers: attribution algorithms, explainer
//! dispatch and the AutoXAI context manager.
//!
//! This crate provides:
//! - Activation and gradient capture at the input or at a named layer
//! - Attribution primitives (Integrated Gradients, Noise Tunnel, Gradient
//!   SHAP, Occlusion, LRP, GradCAM, Guided GradCAM)
//! - One wrapper per explainer, selected through [`Explainers`]
//! - [`AutoXaiExplainer`], which puts a model in evaluation mode and runs a
//!   set of explainers next to every forward pass

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attribution;
pub mod capture;
mod config;
mod context;
mod error;
pub mod explainer;

#[cfg(test)]
mod test_utils;

pub use attribution::{AttributionMap, AttributionMethod, AttributionSummary, BaselineType};
pub use config::XaiConfig;
pub use context::{AutoXaiExplainer, Explanations, XaiSession};
pub use error::{ExplainError, Result};
pub use explainer::{CvExplainer, Explainers};
