//! LRP explainers.

use autoxai_core::{XaiBackend, XaiModel};
use burn::prelude::*;

use super::{resolve_layer, CvExplainer, Explainers};
use crate::attribution::{lrp, validate_result};
use crate::capture::{capture_input, capture_layer};
use crate::error::Result;

/// LRP relevance of the input pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct LrpCvExplainer;

impl<B, M> CvExplainer<B, M> for LrpCvExplainer
where
    B: XaiBackend,
    M: XaiModel<B>,
{
    fn kind(&self) -> Explainers {
        Explainers::Lrp
    }

    fn calculate_features(&self, model: &M, input: Tensor<B, 4>, target: usize) -> Result<Tensor<B, 4>> {
        let relevance = lrp(capture_input(model, input, target)?).values;
        validate_result(&relevance)?;
        Ok(relevance)
    }
}

/// LRP relevance of a layer's neurons.
///
/// Without an explicit layer the model's last convolution is used.
#[derive(Debug, Clone, Default)]
pub struct LayerLrpCvExplainer {
    layer: Option<String>,
}

impl LayerLrpCvExplainer {
    /// Create the explainer.
    pub fn new(layer: Option<String>) -> Self {
        Self { layer }
    }
}

impl<B, M> CvExplainer<B, M> for LayerLrpCvExplainer
where
    B: XaiBackend,
    M: XaiModel<B>,
{
    fn kind(&self) -> Explainers {
        Explainers::LayerLrp
    }

    fn calculate_features(&self, model: &M, input: Tensor<B, 4>, target: usize) -> Result<Tensor<B, 4>> {
        let layer = resolve_layer(model, self.layer.as_deref())?;
        let relevance = lrp(capture_layer(model, input, &layer, target)?).values;
        validate_result(&relevance)?;
        Ok(relevance)
    }
}
