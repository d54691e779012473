//! Activation and gradient capture.
//!
//! Every gradient-based attribution starts from the same measurement: the
//! gradient of one output score with respect to some tensor inside the
//! model, together with that tensor's value. For input attribution the
//! tensor is the input itself, for layer attribution it is a layer output.

use autoxai_core::{ImageShape, XaiBackend, XaiModel};
use burn::prelude::*;

use crate::error::{ExplainError, Result};

/// Activation and gradient captured at one point of the network.
#[derive(Debug, Clone)]
pub struct LayerCapture<B: Backend> {
    /// Value of the captured tensor, detached from the graph.
    pub activation: Tensor<B, 4>,
    /// Gradient of the summed target score with respect to `activation`.
    pub gradient: Tensor<B, 4>,
}

impl<B: Backend> LayerCapture<B> {
    /// Shape of the captured tensor.
    pub fn dims(&self) -> [usize; 4] {
        self.activation.dims()
    }
}

/// Select the target column of a `(batch, n_outputs)` score tensor.
///
/// Returns one score per sample, shape `(batch,)`.
pub fn target_scores<B: Backend>(output: Tensor<B, 2>, target: usize) -> Result<Tensor<B, 1>> {
    let [batch, n_outputs] = output.dims();
    if target >= n_outputs {
        return Err(ExplainError::TargetOutOfRange { target, n_outputs });
    }
    Ok(output.narrow(1, target, 1).reshape([batch]))
}

/// Bring a gradient to the shape of the tensor it was taken against.
///
/// Strided convolutions whose windows do not tile the input leave the last
/// rows and columns out of the backward pass, and some backends return the
/// gradient without them. Those positions do not influence the output, so
/// the missing part is filled with zeros. A larger gradient is an error.
pub fn fit_gradient<B: Backend>(gradient: Tensor<B, 4>, dims: [usize; 4]) -> Result<Tensor<B, 4>> {
    let got = gradient.dims();
    if got == dims {
        return Ok(gradient);
    }

    let (got, expected) = (ImageShape::from(got), ImageShape::from(dims));
    if !got.fits_within(&expected) {
        return Err(got.mismatch(&expected).into());
    }
    let [b, c, h, w] = got.as_array();
    let zeros = Tensor::<B, 4>::zeros(dims, &gradient.device());
    Ok(zeros.slice_assign([0..b, 0..c, 0..h, 0..w], gradient))
}

fn input_capture<B: XaiBackend>(
    input: Tensor<B, 4>,
    output: Tensor<B, 2>,
    target: usize,
) -> Result<LayerCapture<B>> {
    let grads = target_scores(output, target)?.sum().backward();
    let gradient = input
        .grad(&grads)
        .ok_or_else(|| ExplainError::MissingGradient("model input".to_string()))?;

    Ok(LayerCapture {
        gradient: fit_gradient(Tensor::from_inner(gradient), input.dims())?,
        activation: input.detach(),
    })
}

/// Capture the input gradient of the target score.
///
/// Samples in a batch are independent in evaluation mode, so summing the
/// scores before the backward pass yields every sample's own gradient.
pub fn capture_input<B, M>(model: &M, input: Tensor<B, 4>, target: usize) -> Result<LayerCapture<B>>
where
    B: XaiBackend,
    M: XaiModel<B>,
{
    let input = input.detach().require_grad();
    let output = model.forward(input.clone());
    input_capture(input, output, target)
}

/// Capture the guided backpropagation gradient of the target score.
///
/// Same as [`capture_input`] with [`XaiModel::forward_guided`] as the
/// forward pass, so negative gradients stop at every ReLU.
pub fn capture_guided_input<B, M>(model: &M, input: Tensor<B, 4>, target: usize) -> Result<LayerCapture<B>>
where
    B: XaiBackend,
    M: XaiModel<B>,
{
    let input = input.detach().require_grad();
    let output = model.forward_guided(input.clone())?;
    input_capture(input, output, target)
}

/// Capture the output activation of `layer` and the target score's gradient
/// with respect to it.
pub fn capture_layer<B, M>(
    model: &M,
    input: Tensor<B, 4>,
    layer: &str,
    target: usize,
) -> Result<LayerCapture<B>>
where
    B: XaiBackend,
    M: XaiModel<B>,
{
    let activation = model.forward_to_layer(input.detach(), layer)?;
    capture_from_layer(model, activation, layer, target)
}

/// Gradient of the target score with respect to a given output of `layer`.
///
/// The activation does not have to come from a forward pass, which lets
/// layer attributions walk paths in activation space.
pub fn capture_from_layer<B, M>(
    model: &M,
    activation: Tensor<B, 4>,
    layer: &str,
    target: usize,
) -> Result<LayerCapture<B>>
where
    B: XaiBackend,
    M: XaiModel<B>,
{
    let activation = activation.detach().require_grad();
    let output = model.forward_from_layer(activation.clone(), layer)?;
    let grads = target_scores(output, target)?.sum().backward();

    let gradient = activation
        .grad(&grads)
        .ok_or_else(|| ExplainError::MissingGradient(format!("layer '{layer}'")))?;

    Ok(LayerCapture {
        gradient: fit_gradient(Tensor::from_inner(gradient), activation.dims())?,
        activation: activation.detach(),
    })
}

/// Output activation of `layer` without a backward pass.
pub fn layer_activation<B, M>(model: &M, input: Tensor<B, 4>, layer: &str) -> Result<Tensor<B, 4>>
where
    B: XaiBackend,
    M: XaiModel<B>,
{
    Ok(model.forward_to_layer(input.detach(), layer)?.detach())
}
