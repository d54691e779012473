//! Model trait for explanation.
//!
//! Defines what a classifier must expose so attribution algorithms can run
//! forward passes, toggle its evaluation mode and split it at a named layer.

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::guided::XaiBackend;

/// Kind of a named layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    /// 2D convolution.
    Conv2d,
    /// Fully connected layer.
    Linear,
    /// Element-wise activation.
    Activation,
    /// Pooling layer.
    Pooling,
    /// Anything else.
    Other,
}

/// A named layer that attributions can be computed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerInfo {
    /// Layer name as accepted by [`XaiModel::forward_to_layer`].
    pub name: String,
    /// Layer kind.
    pub kind: LayerKind,
}

impl LayerInfo {
    /// Create a new layer description.
    pub fn new(name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Trait for image classifiers that can be explained.
///
/// Burn modules carry no train/eval flag of their own, so implementors keep
/// one and gate training-only behaviour (dropout) on it.
///
/// Layer attribution needs the activation of an inner layer and the
/// gradient of the output with respect to it. Instead of forward hooks the
/// model is split in two at the layer: [`forward_to_layer`] produces the
/// layer output, [`forward_from_layer`] finishes the forward pass from it.
/// Dense activations are reported with shape `(batch, features, 1, 1)`.
///
/// Guided backpropagation needs every ReLU swapped for
/// [`guided_relu`](crate::guided_relu), which [`forward_guided`] does.
///
/// [`forward_to_layer`]: XaiModel::forward_to_layer
/// [`forward_from_layer`]: XaiModel::forward_from_layer
/// [`forward_guided`]: XaiModel::forward_guided
pub trait XaiModel<B: XaiBackend> {
    /// Forward pass.
    ///
    /// # Arguments
    ///
    /// * `x` - Input tensor of shape (batch, channels, height, width)
    ///
    /// # Returns
    ///
    /// Scores tensor of shape (batch, n_outputs)
    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2>;

    /// Whether training-only behaviour is enabled.
    fn is_training(&self) -> bool;

    /// Enable or disable training-only behaviour.
    fn set_training(&mut self, training: bool);

    /// Switch to evaluation mode.
    fn eval(&mut self) {
        self.set_training(false);
    }

    /// Switch to training mode.
    fn train(&mut self) {
        self.set_training(true);
    }

    /// Forward pass with guided ReLUs.
    ///
    /// Must produce the same scores as [`forward`](XaiModel::forward).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Unsupported`] unless the model implements it.
    fn forward_guided(&self, _x: Tensor<B, 4>) -> Result<Tensor<B, 2>> {
        Err(CoreError::Unsupported("guided backpropagation".to_string()))
    }

    /// Named layers, in forward order.
    fn layers(&self) -> Vec<LayerInfo> {
        Vec::new()
    }

    /// Run the network up to and including `layer`.
    fn forward_to_layer(&self, _x: Tensor<B, 4>, layer: &str) -> Result<Tensor<B, 4>> {
        Err(CoreError::LayerNotFound(layer.to_string()))
    }

    /// Run the rest of the network from the output of `layer`.
    fn forward_from_layer(&self, _activation: Tensor<B, 4>, layer: &str) -> Result<Tensor<B, 2>> {
        Err(CoreError::LayerNotFound(layer.to_string()))
    }

    /// Name of the last `Conv2d` layer.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoConvLayer`] if the model has no convolution.
    fn last_conv_layer(&self) -> Result<String> {
        self.layers()
            .into_iter()
            .rev()
            .find(|layer| layer.kind == LayerKind::Conv2d)
            .map(|layer| layer.name)
            .ok_or(CoreError::NoConvLayer)
    }
}
