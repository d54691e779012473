//! Analytic probe model for unit tests.

use autoxai_core::backend::{Autodiff, NdArray};
use autoxai_core::{CoreError, LayerInfo, LayerKind, XaiModel};
use burn::prelude::*;

pub(crate) type TestBackend = Autodiff<NdArray>;

/// Two outputs with closed-form gradients:
/// - class 0: sum of all pixels
/// - class 1: sum of squared pixels
///
/// Layer `double` outputs `2 * x`.
#[derive(Debug, Default)]
pub(crate) struct ProbeModel {
    pub training: bool,
}

fn scores(flat: Tensor<TestBackend, 2>) -> Tensor<TestBackend, 2> {
    let linear = flat.clone().sum_dim(1);
    let square = (flat.clone() * flat).sum_dim(1);
    Tensor::cat(vec![linear, square], 1)
}

fn flatten(x: Tensor<TestBackend, 4>) -> Tensor<TestBackend, 2> {
    let [batch, channels, height, width] = x.dims();
    x.reshape([batch, channels * height * width])
}

impl XaiModel<TestBackend> for ProbeModel {
    fn forward(&self, x: Tensor<TestBackend, 4>) -> Tensor<TestBackend, 2> {
        scores(flatten(x))
    }

    // No ReLUs to guide.
    fn forward_guided(&self, x: Tensor<TestBackend, 4>) -> autoxai_core::Result<Tensor<TestBackend, 2>> {
        Ok(scores(flatten(x)))
    }

    fn is_training(&self) -> bool {
        self.training
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn layers(&self) -> Vec<LayerInfo> {
        vec![LayerInfo::new("double", LayerKind::Conv2d)]
    }

    fn forward_to_layer(
        &self,
        x: Tensor<TestBackend, 4>,
        layer: &str,
    ) -> autoxai_core::Result<Tensor<TestBackend, 4>> {
        match layer {
            "double" => Ok(x * 2.0),
            other => Err(CoreError::LayerNotFound(other.to_string())),
        }
    }

    fn forward_from_layer(
        &self,
        activation: Tensor<TestBackend, 4>,
        layer: &str,
    ) -> autoxai_core::Result<Tensor<TestBackend, 2>> {
        match layer {
            "double" => Ok(scores(flatten(activation) / 2.0)),
            other => Err(CoreError::LayerNotFound(other.to_string())),
        }
    }
}
