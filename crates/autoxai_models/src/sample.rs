//! Minimal binary classifier used in demos and tests.
//!
//! Architecture:
//! - Conv2d(in_channels, 16, kernel=5, stride=16) -> ReLU
//! - Flatten -> Dropout(0.5) -> Linear(features, 1)
//! - Sigmoid

use autoxai_core::{guided_relu, CoreError, LayerInfo, LayerKind, XaiBackend, XaiModel};
use burn::nn::{
    conv::{Conv2d, Conv2dConfig},
    Dropout, DropoutConfig, Linear, LinearConfig, Relu,
};
use burn::prelude::*;
use burn::tensor::activation::sigmoid;
use serde::{Deserialize, Serialize};

/// Configuration for [`SampleModel`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleModelConfig {
    /// Number of input channels.
    pub in_channels: usize,
    /// Square input resolution.
    pub resolution: usize,
    /// Convolution output channels.
    pub out_channels: usize,
    /// Convolution kernel size.
    pub kernel_size: usize,
    /// Convolution stride.
    pub stride: usize,
    /// Dropout probability in the classifier head.
    pub dropout: f64,
}

impl Default for SampleModelConfig {
    fn default() -> Self {
        Self {
            in_channels: 1,
            resolution: 224,
            out_channels: 16,
            kernel_size: 5,
            stride: 16,
            dropout: 0.5,
        }
    }
}

impl SampleModelConfig {
    /// Create a config for the given channels and resolution.
    pub fn new(in_channels: usize, resolution: usize) -> Self {
        Self {
            in_channels,
            resolution,
            ..Default::default()
        }
    }

    /// Spatial size of the convolution output.
    pub fn conv_output_size(&self) -> usize {
        (self.resolution.saturating_sub(self.kernel_size)) / self.stride + 1
    }

    /// Number of features entering the linear head.
    pub fn n_features(&self) -> usize {
        self.conv_output_size().pow(2) * self.out_channels
    }

    /// Initialize the model. New models start in training mode.
    pub fn init<B: Backend>(&self, device: &B::Device) -> SampleModel<B> {
        SampleModel::new(self, device)
    }
}

/// Single-convolution classifier producing one sigmoid score per image.
#[derive(Module, Debug)]
pub struct SampleModel<B: Backend> {
    conv1: Conv2d<B>,
    dropout: Dropout,
    cls: Linear<B>,
    training: bool,
}

impl<B: Backend> SampleModel<B> {
    /// Create a new model.
    pub fn new(config: &SampleModelConfig, device: &B::Device) -> Self {
        let conv1 = Conv2dConfig::new(
            [config.in_channels, config.out_channels],
            [config.kernel_size, config.kernel_size],
        )
        .with_stride([config.stride, config.stride])
        .init(device);

        let dropout = DropoutConfig::new(config.dropout).init();
        let cls = LinearConfig::new(config.n_features(), 1)
            .with_bias(true)
            .init(device);

        Self {
            conv1,
            dropout,
            cls,
            training: true,
        }
    }

    /// Forward pass returning sigmoid scores of shape (batch, 1).
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let out = self.conv1.forward(x);
        let out = Relu::new().forward(out);
        sigmoid(self.logits(out))
    }

    fn logits(&self, activation: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch, channels, height, width] = activation.dims();
        let out = activation.reshape([batch, channels * height * width]);
        let out = if self.training {
            self.dropout.forward(out)
        } else {
            out
        };
        self.cls.forward(out)
    }
}

impl<B: XaiBackend> XaiModel<B> for SampleModel<B> {
    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        SampleModel::forward(self, x)
    }

    fn forward_guided(&self, x: Tensor<B, 4>) -> autoxai_core::Result<Tensor<B, 2>> {
        let out = guided_relu(self.conv1.forward(x));
        Ok(sigmoid(self.logits(out)))
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
            LayerInfo::new("relu", LayerKind::Activation),
            LayerInfo::new("cls", LayerKind::Linear),
        ]
    }

    fn forward_to_layer(&self, x: Tensor<B, 4>, layer: &str) -> autoxai_core::Result<Tensor<B, 4>> {
        let conv = self.conv1.forward(x);
        match layer {
            "conv1" => Ok(conv),
            "relu" => Ok(Relu::new().forward(conv)),
            "cls" => {
                let logits = self.logits(Relu::new().forward(conv));
                let [batch, features] = logits.dims();
                Ok(logits.reshape([batch, features, 1, 1]))
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
            "conv1" => Ok(sigmoid(self.logits(Relu::new().forward(activation)))),
            "relu" => Ok(sigmoid(self.logits(activation))),
            "cls" => {
                let [batch, features, _, _] = activation.dims();
                Ok(sigmoid(activation.reshape([batch, features])))
            }
            other => Err(CoreError::LayerNotFound(other.to_string())),
        }
    }
}
