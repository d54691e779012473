//! # autoxai
//!
//! Explain image classifiers while they predict.
//!
//! autoxai wraps a model in a context manager that switches it to
//! evaluation mode, runs the forward pass and computes one attribution map
//! per requested explainer:
//!
//! - **Input attribution**: Occlusion, Integrated Gradients, Noise Tunnel,
//!   Gradient SHAP, LRP, Guided GradCAM
//! - **Layer attribution**: Layer Integrated Gradients, Layer Noise Tunnel,
//!   Layer Gradient SHAP, Layer LRP, Layer GradCAM
//!
//! Gradients come from the Burn autodiff backend; models implement
//! [`XaiModel`](autoxai_core::XaiModel).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use autoxai::prelude::*;
//!
//! let mut model = SampleModelConfig::default().init::<Backend>(&device);
//! let explainer = AutoXaiExplainer::new(&mut model, &[Explainers::NoiseTunnel], 0)?;
//!
//! let (output, explanations) = explainer.run(|xai| xai.explain(image))?;
//! let attributions = &explanations["CV_NOISE_TUNNEL_EXPLAINER"];
//! ```
//!
//! ## Feature Flags
//!
//! - `backend-ndarray` (default): CPU backend using ndarray

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub use autoxai_core as core;
pub use autoxai_explain as explain;
pub use autoxai_models as models;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use autoxai::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use autoxai_core::{ImageShape, LayerInfo, LayerKind, Seed, XaiBackend, XaiModel};

    // Models
    pub use autoxai_models::{SampleModel, SampleModelConfig, SimpleCnn, SimpleCnnConfig};

    // Explain
    pub use autoxai_explain::attribution::{
        CamInterpolation, GradCamConfig, GradientShapConfig, IntegratedGradientsConfig,
        NoiseTunnelConfig, NoiseTunnelType, OcclusionConfig,
    };
    pub use autoxai_explain::{
        AttributionMap, AttributionMethod, AutoXaiExplainer, BaselineType, CvExplainer,
        ExplainError, Explainers, Explanations, XaiConfig, XaiSession,
    };
}

/// Backend type aliases.
pub use autoxai_core::backend;
