//! Two-block convolutional classifier.
//!
//! Architecture:
//! - Conv2d(in_channels, n_filters_1, kernel=3, same padding) -> ReLU
//! - Conv2d(n_filters_1, n_filters_2, kernel=3, same padding) -> ReLU
//! - Global Average Pooling
//! - Dropout -> Linear(n_filters_2, n_classes)

use autoxai_core::{guided_relu, CoreError, LayerInfo, LayerKind, XaiBackend, XaiModel};
use burn::nn::{
    conv::{Conv2d, Conv2dConfig},
    pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
    Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
};
use burn::prelude::*;
use burn::tensor::activation::softmax;
use serde::{Deserialize, Serialize};

/// Configuration for [`SimpleCnn`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleCnnConfig {
    /// Number of input channels.
    pub in_channels: usize,
    /// Number of output classes.
    pub n_classes: usize,
    /// Filters in the first convolution.
    pub n_filters_1: usize,
    /// Filters in the second convolution.
    pub n_filters_2: usize,
    /// Dropout probability before the classifier.
    pub dropout: f64,
}

impl Default for SimpleCnnConfig {
    fn default() -> Self {
        Self {
            in_channels: 3,
            n_classes: 10,
            n_filters_1: 8,
            n_filters_2: 16,
            dropout: 0.25,
        }
    }
}

impl SimpleCnnConfig {
    /// Create a new config with specified dimensions.
    pub fn new(in_channels: usize, n_classes: usize) -> Self {
        Self {
            in_channels,
            n_classes,
            ..Default::default()
        }
    }

    /// Set the number of filters for both convolutions.
    #[must_use]
    pub fn with_filters(mut self, n_filters_1: usize, n_filters_2: usize) -> Self {
        self.n_filters_1 = n_filters_1;
        self.n_filters_2 = n_filters_2;
        self
    }

    /// Initialize the model. New models start in training mode.
    pub fn init<B: Backend>(&self, device: &B::Device) -> SimpleCnn<B> {
        SimpleCnn::new(self, device)
    }
}

/// Small multi-class image classifier returning logits.
#[derive(Module, Debug)]
pub struct SimpleCnn<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    gap: AdaptiveAvgPool2d,
    dropout: Dropout,
    fc: Linear<B>,
    training: bool,
}

impl<B: Backend> SimpleCnn<B> {
    /// Create a new model.
    pub fn new(config: &SimpleCnnConfig, device: &B::Device) -> Self {
        let conv1 = Conv2dConfig::new([config.in_channels, config.n_filters_1], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let conv2 = Conv2dConfig::new([config.n_filters_1, config.n_filters_2], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);

        Self {
            conv1,
            conv2,
            gap: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            dropout: DropoutConfig::new(config.dropout).init(),
            fc: LinearConfig::new(config.n_filters_2, config.n_classes).init(device),
            training: true,
        }
    }

    /// Forward pass returning logits of shape (batch, n_classes).
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let out = Relu::new().forward(self.conv1.forward(x));
        let out = self.conv2.forward(out);
        self.head(Relu::new().forward(out))
    }

    /// Forward pass returning probabilities.
    pub fn forward_probs(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(x), 1)
    }

    fn head(&self, features: Tensor<B, 4>) -> Tensor<B, 2> {
        let out = self.gap.forward(features);
        let [batch, channels, _, _] = out.dims();
        let out = out.reshape([batch, channels]);
        let out = if self.training {
            self.dropout.forward(out)
        } else {
            out
        };
        self.fc.forward(out)
    }
}

impl<B: XaiBackend> XaiModel<B> for SimpleCnn<B> {
    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        SimpleCnn::forward(self, x)
    }

    fn forward_guided(&self, x: Tensor<B, 4>) -> autoxai_core::Result<Tensor<B, 2>> {
        let out = guided_relu(self.conv1.forward(x));
        let out = guided_relu(self.conv2.forward(out));
        Ok(self.head(out))
    }

    fn is_training(&self) -> bool {
        self.training
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn layers(&self) -> Vec<LayerInfo> {
        vec![
            LayerInfo::new("conv1", LayerKind::Conv2d),
            LayerInfo::new("conv2", LayerKind::Conv2d),
            LayerInfo::new("gap", LayerKind::Pooling),
            LayerInfo::new("fc", LayerKind::Linear),
        ]
    }

    fn forward_to_layer(&self, x: Tensor<B, 4>, layer: &str) -> autoxai_core::Result<Tensor<B, 4>> {
        let conv1 = self.conv1.forward(x);
        if layer == "conv1" {
            return Ok(conv1);
        }

        let conv2 = self.conv2.forward(Relu::new().forward(conv1));
        match layer {
            "conv2" => Ok(conv2),
            "gap" => Ok(self.gap.forward(Relu::new().forward(conv2))),
            "fc" => {
                let logits = self.head(Relu::new().forward(conv2));
                let [batch, classes] = logits.dims();
                Ok(logits.reshape([batch, classes, 1, 1]))
            }
            other => Err(CoreError::LayerNotFound(other.to_string())),
        }
    }

    fn forward_from_layer(
        &self,
        activation: Tensor<B, 4>,
        layer: &str,
    ) -> autoxai_core::Result<Tensor<B, 2>> {
        match layer {
            "conv1" => {
                let out = self.conv2.forward(Relu::new().forward(activation));
                Ok(self.head(Relu::new().forward(out)))
            }
            "conv2" => Ok(self.head(Relu::new().forward(activation))),
            "gap" => Ok(self.head(activation)),
            "fc" => {
                let [batch, classes, _, _] = activation.dims();
                Ok(activation.reshape([batch, classes]))
            }
            other => Err(CoreError::LayerNotFound(other.to_string())),
        }
    }
}
