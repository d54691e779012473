//! Class activation maps.

use burn::prelude::*;
use burn::tensor::module::interpolate;
use burn::tensor::ops::{InterpolateMode, InterpolateOptions};
use serde::{Deserialize, Serialize};

use super::{AttributionMap, AttributionMethod};
use crate::capture::LayerCapture;

/// Interpolation used when resizing a map to the input resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CamInterpolation {
    /// Nearest neighbour.
    #[default]
    Nearest,
    /// Bilinear.
    Bilinear,
    /// Bicubic.
    Bicubic,
}

impl From<CamInterpolation> for InterpolateMode {
    fn from(mode: CamInterpolation) -> Self {
        match mode {
            CamInterpolation::Nearest => InterpolateMode::Nearest,
            CamInterpolation::Bilinear => InterpolateMode::Bilinear,
            CamInterpolation::Bicubic => InterpolateMode::Bicubic,
        }
    }
}

/// Configuration for GradCAM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradCamConfig {
    /// Keep only positive evidence for the target.
    pub relu_attributions: bool,
    /// Resize the map to the input resolution.
    pub upsample_to_input: bool,
    /// Interpolation used for resizing.
    pub interpolate_mode: CamInterpolation,
}

impl Default for GradCamConfig {
    fn default() -> Self {
        Self {
            relu_attributions: false,
            upsample_to_input: false,
            interpolate_mode: CamInterpolation::Nearest,
        }
    }
}

impl GradCamConfig {
    /// Set whether negative map values are clipped.
    #[must_use]
    pub fn with_relu_attributions(mut self, relu: bool) -> Self {
        self.relu_attributions = relu;
        self
    }

    /// Set whether the map is resized to the input.
    #[must_use]
    pub fn with_upsample_to_input(mut self, upsample: bool) -> Self {
        self.upsample_to_input = upsample;
        self
    }

    /// Set the interpolation mode.
    #[must_use]
    pub fn with_interpolate_mode(mut self, mode: CamInterpolation) -> Self {
        self.interpolate_mode = mode;
        self
    }
}

/// Compute GradCAM attribution from a captured convolutional layer.
///
/// # Arguments
///
/// * `capture` - Activations and gradients of the layer (batch, channels, h, w)
/// * `relu` - Clip negative values
///
/// # Returns
///
/// Attribution map of shape (batch, 1, h, w).
pub fn grad_cam<B: Backend>(capture: LayerCapture<B>, relu: bool) -> AttributionMap<B> {
    // Global average pool the gradients: (batch, channels, h, w) -> (batch, channels, 1, 1)
    let weights = capture.gradient.mean_dim(3).mean_dim(2);

    // Weight the activations and sum across channels: -> (batch, 1, h, w)
    let cam = (capture.activation * weights).sum_dim(1);

    let cam = if relu { cam.clamp_min(0.0) } else { cam };
    AttributionMap::new(cam, AttributionMethod::GradCam)
}

/// Resize a map to `[height, width]`.
pub fn upsample<B: Backend>(map: Tensor<B, 4>, size: [usize; 2], mode: CamInterpolation) -> Tensor<B, 4> {
    let [_, _, height, width] = map.dims();
    if [height, width] == size {
        return map;
    }
    interpolate(map, size, InterpolateOptions::new(mode.into()))
}

/// Combine a GradCAM map with guided backpropagation gradients.
///
/// The map is resized to the input resolution and multiplied element-wise
/// with the gradient, broadcasting over channels. The gradient should come
/// from [`capture_guided_input`](crate::capture::capture_guided_input); it
/// is used as is, so its sign carries into the result.
///
/// Reference: Selvaraju et al., "Grad-CAM: Visual Explanations from Deep Networks", ICCV 2017.
///
/// # Arguments
///
/// * `cam` - GradCAM map (batch, 1, h, w)
/// * `guided_gradient` - Guided gradient of the target w.r.t. the input (batch, channels, H, W)
/// * `mode` - Interpolation used for resizing the map
pub fn guided_grad_cam<B: Backend>(
    cam: Tensor<B, 4>,
    guided_gradient: Tensor<B, 4>,
    mode: CamInterpolation,
) -> AttributionMap<B> {
    let [_, _, height, width] = guided_gradient.dims();
    let cam = upsample(cam, [height, width], mode);
    let guided = guided_gradient * cam;
    AttributionMap::new(guided, AttributionMethod::GuidedGradCam)
}
