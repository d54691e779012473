//! Gradient SHAP explainers.

use autoxai_core::{Seed, XaiBackend, XaiModel};
use burn::prelude::*;

use super::{resolve_layer, CvExplainer, Explainers};
use crate::attribution::{gradient_shap, validate_result, GradientShapConfig};
use crate::capture::{capture_input, capture_layer, layer_activation};
use crate::error::Result;

/// Gradient SHAP attributed to the input pixels.
#[derive(Debug, Clone, Default)]
pub struct GradientShapCvExplainer {
    config: GradientShapConfig,
    seed: Option<Seed>,
}

impl GradientShapCvExplainer {
    /// Create the explainer.
    pub fn new(config: GradientShapConfig, seed: Option<Seed>) -> Self {
        Self { config, seed }
    }
}

impl<B, M> CvExplainer<B, M> for GradientShapCvExplainer
where
    B: XaiBackend,
    M: XaiModel<B>,
{
    fn kind(&self) -> Explainers {
        Explainers::GradientShap
    }

    fn calculate_features(&self, model: &M, input: Tensor<B, 4>, target: usize) -> Result<Tensor<B, 4>> {
        let attributions = gradient_shap(
            &input,
            &self.config,
            self.seed,
            |samples| capture_input(model, samples, target),
            Ok,
        )?
        .values;
        validate_result(&attributions)?;
        Ok(attributions)
    }
}

/// Gradient SHAP attributed to the output of a layer.
///
/// Without an explicit layer the model's last convolution is used.
#[derive(Debug, Clone, Default)]
pub struct LayerGradientShapCvExplainer {
    config: GradientShapConfig,
    layer: Option<String>,
    seed: Option<Seed>,
}

impl LayerGradientShapCvExplainer {
    /// Create the explainer.
    pub fn new(config: GradientShapConfig, layer: Option<String>, seed: Option<Seed>) -> Self {
        Self { config, layer, seed }
    }
}

impl<B, M> CvExplainer<B, M> for LayerGradientShapCvExplainer
where
    B: XaiBackend,
    M: XaiModel<B>,
{
    fn kind(&self) -> Explainers {
        Explainers::LayerGradientShap
    }

    fn calculate_features(&self, model: &M, input: Tensor<B, 4>, target: usize) -> Result<Tensor<B, 4>> {
        let layer = resolve_layer(model, self.layer.as_deref())?;
        let attributions = gradient_shap(
            &input,
            &self.config,
            self.seed,
            |samples| capture_layer(model, samples, &layer, target),
            |x| layer_activation(model, x, &layer),
        )?
        .values;
        validate_result(&attributions)?;
        Ok(attributions)
    }
}
