//! Explainer wrappers and the dispatch enum.
//!
//! Each wrapper fixes the parameters of one attribution algorithm, runs the
//! matching primitive from [`crate::attribution`] and validates the result.
//! [`Explainers`] maps the algorithm names used by callers and configuration
//! files to the wrappers.

mod gradcam;
mod gradient_shap;
mod integrated_gradients;
mod lrp;
mod noise_tunnel;
mod occlusion;

pub use gradcam::{GuidedGradCamCvExplainer, LayerGradCamCvExplainer};
pub use gradient_shap::{GradientShapCvExplainer, LayerGradientShapCvExplainer};
pub use integrated_gradients::{IntegratedGradientsCvExplainer, LayerIntegratedGradientsCvExplainer};
pub use lrp::{LayerLrpCvExplainer, LrpCvExplainer};
pub use noise_tunnel::{LayerNoiseTunnelCvExplainer, NoiseTunnelCvExplainer};
pub use occlusion::OcclusionCvExplainer;

use std::fmt;
use std::str::FromStr;

use autoxai_core::{XaiBackend, XaiModel};
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::attribution::AttributionMethod;
use crate::config::XaiConfig;
use crate::error::{ExplainError, Result};

/// An attribution algorithm with its parameters fixed.
pub trait CvExplainer<B: XaiBackend, M: XaiModel<B>> {
    /// Which algorithm this is.
    fn kind(&self) -> Explainers;

    /// Canonical name of the algorithm.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Attribute the `target` output of `model` to `input` (or to the
    /// selected layer, for layer algorithms).
    ///
    /// # Errors
    ///
    /// Fails on an invalid target or layer, and when the attribution comes
    /// out empty.
    fn calculate_features(&self, model: &M, input: Tensor<B, 4>, target: usize) -> Result<Tensor<B, 4>>;
}

/// Supported explainers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Explainers {
    /// Sliding-window occlusion.
    #[serde(rename = "CV_OCCLUSION_EXPLAINER")]
    Occlusion,
    /// Integrated Gradients on the input.
    #[serde(rename = "CV_INTEGRATED_GRADIENTS_EXPLAINER")]
    IntegratedGradients,
    /// Noise Tunnel over Integrated Gradients on the input.
    #[serde(rename = "CV_NOISE_TUNNEL_EXPLAINER")]
    NoiseTunnel,
    /// Gradient SHAP on the input.
    #[serde(rename = "CV_GRADIENT_SHAP_EXPLAINER")]
    GradientShap,
    /// LRP relevance of the input.
    #[serde(rename = "CV_LRP_EXPLAINER")]
    Lrp,
    /// Guided GradCAM.
    #[serde(rename = "CV_GUIDEDGRADCAM_EXPLAINER")]
    GuidedGradCam,
    /// Integrated Gradients on a layer.
    #[serde(rename = "CV_LAYER_INTEGRATED_GRADIENTS_EXPLAINER")]
    LayerIntegratedGradients,
    /// Noise Tunnel over Integrated Gradients on a layer.
    #[serde(rename = "CV_LAYER_NOISE_TUNNEL_EXPLAINER")]
    LayerNoiseTunnel,
    /// Gradient SHAP on a layer.
    #[serde(rename = "CV_LAYER_GRADIENT_SHAP_EXPLAINER")]
    LayerGradientShap,
    /// LRP relevance of a layer.
    #[serde(rename = "CV_LAYER_LRP_EXPLAINER")]
    LayerLrp,
    /// GradCAM on a layer.
    #[serde(rename = "CV_LAYER_GRADCAM_EXPLAINER")]
    LayerGradCam,
}

impl Explainers {
    /// Every explainer, in declaration order.
    pub const ALL: [Explainers; 11] = [
        Explainers::Occlusion,
        Explainers::IntegratedGradients,
        Explainers::NoiseTunnel,
        Explainers::GradientShap,
        Explainers::Lrp,
        Explainers::GuidedGradCam,
        Explainers::LayerIntegratedGradients,
        Explainers::LayerNoiseTunnel,
        Explainers::LayerGradientShap,
        Explainers::LayerLrp,
        Explainers::LayerGradCam,
    ];

    /// Canonical name, used as the key of the explanation map.
    pub const fn name(&self) -> &'static str {
        match self {
            Explainers::Occlusion => "CV_OCCLUSION_EXPLAINER",
            Explainers::IntegratedGradients => "CV_INTEGRATED_GRADIENTS_EXPLAINER",
            Explainers::NoiseTunnel => "CV_NOISE_TUNNEL_EXPLAINER",
            Explainers::GradientShap => "CV_GRADIENT_SHAP_EXPLAINER",
            Explainers::Lrp => "CV_LRP_EXPLAINER",
            Explainers::GuidedGradCam => "CV_GUIDEDGRADCAM_EXPLAINER",
            Explainers::LayerIntegratedGradients => "CV_LAYER_INTEGRATED_GRADIENTS_EXPLAINER",
            Explainers::LayerNoiseTunnel => "CV_LAYER_NOISE_TUNNEL_EXPLAINER",
            Explainers::LayerGradientShap => "CV_LAYER_GRADIENT_SHAP_EXPLAINER",
            Explainers::LayerLrp => "CV_LAYER_LRP_EXPLAINER",
            Explainers::LayerGradCam => "CV_LAYER_GRADCAM_EXPLAINER",
        }
    }

    /// Short kebab-case alias, e.g. `noise-tunnel`.
    pub const fn alias(&self) -> &'static str {
        match self {
            Explainers::Occlusion => "occlusion",
            Explainers::IntegratedGradients => "integrated-gradients",
            Explainers::NoiseTunnel => "noise-tunnel",
            Explainers::GradientShap => "gradient-shap",
            Explainers::Lrp => "lrp",
            Explainers::GuidedGradCam => "guided-gradcam",
            Explainers::LayerIntegratedGradients => "layer-integrated-gradients",
            Explainers::LayerNoiseTunnel => "layer-noise-tunnel",
            Explainers::LayerGradientShap => "layer-gradient-shap",
            Explainers::LayerLrp => "layer-lrp",
            Explainers::LayerGradCam => "layer-gradcam",
        }
    }

    /// One-line description.
    pub const fn description(&self) -> &'static str {
        match self {
            Explainers::Occlusion => "Score drop when sliding windows of the input are blanked out",
            Explainers::IntegratedGradients => "Path integral of input gradients from a baseline",
            Explainers::NoiseTunnel => "Integrated Gradients averaged over noisy copies of the input",
            Explainers::GradientShap => "Expected gradients over random baselines and path points",
            Explainers::Lrp => "Relevance propagated back to the input pixels",
            Explainers::GuidedGradCam => "GradCAM map sharpened by guided backpropagation",
            Explainers::LayerIntegratedGradients => "Integrated Gradients on a layer's output",
            Explainers::LayerNoiseTunnel => "Layer Integrated Gradients averaged over noisy inputs",
            Explainers::LayerGradientShap => "Gradient SHAP on a layer's output",
            Explainers::LayerLrp => "Relevance of a layer's neurons",
            Explainers::LayerGradCam => "Gradient-weighted class activation map of a layer",
        }
    }

    /// Attribution primitive the explainer is built on.
    pub const fn method(&self) -> AttributionMethod {
        match self {
            Explainers::Occlusion => AttributionMethod::Occlusion,
            Explainers::IntegratedGradients | Explainers::LayerIntegratedGradients => {
                AttributionMethod::IntegratedGradients
            }
            Explainers::NoiseTunnel | Explainers::LayerNoiseTunnel => AttributionMethod::NoiseTunnel,
            Explainers::GradientShap | Explainers::LayerGradientShap => AttributionMethod::GradientShap,
            Explainers::Lrp | Explainers::LayerLrp => AttributionMethod::Lrp,
            Explainers::GuidedGradCam => AttributionMethod::GuidedGradCam,
            Explainers::LayerGradCam => AttributionMethod::GradCam,
        }
    }

    /// Whether the explainer attributes to a layer rather than the input.
    pub const fn is_layer(&self) -> bool {
        matches!(
            self,
            Explainers::LayerIntegratedGradients
                | Explainers::LayerNoiseTunnel
                | Explainers::LayerGradientShap
                | Explainers::LayerLrp
                | Explainers::LayerGradCam
        )
    }

    /// Build the wrapper with the parameters from `config`.
    pub fn create<B, M>(&self, config: &XaiConfig) -> Box<dyn CvExplainer<B, M>>
    where
        B: XaiBackend,
        M: XaiModel<B>,
    {
        let seed = config.seed;
        let layer = config.layer.clone();
        match self {
            Explainers::Occlusion => Box::new(OcclusionCvExplainer::new(config.occlusion.clone())),
            Explainers::IntegratedGradients => Box::new(IntegratedGradientsCvExplainer::new(
                config.integrated_gradients.clone(),
                seed,
            )),
            Explainers::NoiseTunnel => Box::new(NoiseTunnelCvExplainer::new(
                config.noise_tunnel.clone(),
                config.integrated_gradients.clone(),
                seed,
            )),
            Explainers::GradientShap => Box::new(GradientShapCvExplainer::new(config.gradient_shap.clone(), seed)),
            Explainers::Lrp => Box::new(LrpCvExplainer),
            Explainers::GuidedGradCam => {
                Box::new(GuidedGradCamCvExplainer::new(config.grad_cam.clone(), layer))
            }
            Explainers::LayerIntegratedGradients => Box::new(LayerIntegratedGradientsCvExplainer::new(
                config.integrated_gradients.clone(),
                layer,
                seed,
            )),
            Explainers::LayerNoiseTunnel => Box::new(LayerNoiseTunnelCvExplainer::new(
                config.noise_tunnel.clone(),
                config.integrated_gradients.clone(),
                layer,
                seed,
            )),
            Explainers::LayerGradientShap => Box::new(LayerGradientShapCvExplainer::new(
                config.gradient_shap.clone(),
                layer,
                seed,
            )),
            Explainers::LayerLrp => Box::new(LayerLrpCvExplainer::new(layer)),
            Explainers::LayerGradCam => Box::new(LayerGradCamCvExplainer::new(config.grad_cam.clone(), layer)),
        }
    }
}

impl fmt::Display for Explainers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Explainers {
    type Err = ExplainError;

    /// Parse a canonical name (`CV_NOISE_TUNNEL_EXPLAINER`) or an alias
    /// (`noise-tunnel`), ignoring case.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Explainers::ALL
            .into_iter()
            .find(|e| e.name().eq_ignore_ascii_case(wanted) || e.alias().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ExplainError::UnknownExplainer(s.to_string()))
    }
}

/// Layer to attribute to: the requested one, or the model's last
/// convolutional layer.
pub(crate) fn resolve_layer<B, M>(model: &M, layer: Option<&str>) -> Result<String>
where
    B: XaiBackend,
    M: XaiModel<B>,
{
    match layer {
        Some(name) => Ok(name.to_string()),
        None => Ok(model.last_conv_layer()?),
    }
}
