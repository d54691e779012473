//! GradCAM explainers.

use autoxai_core::{XaiBackend, XaiModel};
use burn::prelude::*;

use super::{resolve_layer, CvExplainer, Explainers};
use crate::attribution::{grad_cam, guided_grad_cam, upsample, validate_result, GradCamConfig};
use crate::capture::{capture_guided_input, capture_layer};
use crate::error::Result;

/// GradCAM of a convolutional layer, `(batch, 1, h, w)` or resized to the
/// input when `upsample_to_input` is set.
///
/// Without an explicit layer the model's last convolution is used.
#[derive(Debug, Clone, Default)]
pub struct LayerGradCamCvExplainer {
    config: GradCamConfig,
    layer: Option<String>,
}

impl LayerGradCamCvExplainer {
    /// Create the explainer.
    pub fn new(config: GradCamConfig, layer: Option<String>) -> Self {
        Self { config, layer }
    }
}

impl<B, M> CvExplainer<B, M> for LayerGradCamCvExplainer
where
    B: XaiBackend,
    M: XaiModel<B>,
{
    fn kind(&self) -> Explainers {
        Explainers::LayerGradCam
    }

    fn calculate_features(&self, model: &M, input: Tensor<B, 4>, target: usize) -> Result<Tensor<B, 4>> {
        let [_, _, height, width] = input.dims();
        let layer = resolve_layer(model, self.layer.as_deref())?;
        let capture = capture_layer(model, input, &layer, target)?;

        let mut cam = grad_cam(capture, self.config.relu_attributions).values;
        if self.config.upsample_to_input {
            cam = upsample(cam, [height, width], self.config.interpolate_mode);
        }
        validate_result(&cam)?;
        Ok(cam)
    }
}

/// GradCAM of a convolutional layer multiplied with the guided
/// backpropagation gradient. Same shape as the input.
///
/// The model must implement [`XaiModel::forward_guided`].
///
/// Without an explicit layer the model's last convolution is used.
#[derive(Debug, Clone, Default)]
pub struct GuidedGradCamCvExplainer {
    config: GradCamConfig,
    layer: Option<String>,
}

impl GuidedGradCamCvExplainer {
    /// Create the explainer.
    pub fn new(config: GradCamConfig, layer: Option<String>) -> Self {
        Self { config, layer }
    }
}

impl<B, M> CvExplainer<B, M> for GuidedGradCamCvExplainer
where
    B: XaiBackend,
    M: XaiModel<B>,
{
    fn kind(&self) -> Explainers {
        Explainers::GuidedGradCam
    }

    fn calculate_features(&self, model: &M, input: Tensor<B, 4>, target: usize) -> Result<Tensor<B, 4>> {
        let layer = resolve_layer(model, self.layer.as_deref())?;
        let cam = grad_cam(capture_layer(model, input.clone(), &layer, target)?, true).values;
        let guided_gradient = capture_guided_input(model, input, target)?.gradient;

        let guided = guided_grad_cam(cam, guided_gradient, self.config.interpolate_mode).values;
        validate_result(&guided)?;
        Ok(guided)
    }
}
