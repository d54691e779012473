//! Occlusion explainer.

use autoxai_core::{XaiBackend, XaiModel};
use burn::prelude::*;

use super::{CvExplainer, Explainers};
use crate::attribution::{occlusion, validate_result, OcclusionConfig};
use crate::capture::target_scores;
use crate::error::Result;

/// Occlusion attributed to the input pixels.
#[derive(Debug, Clone, Default)]
pub struct OcclusionCvExplainer {
    config: OcclusionConfig,
}

impl OcclusionCvExplainer {
    /// Create the explainer.
    pub fn new(config: OcclusionConfig) -> Self {
        Self { config }
    }
}

impl<B, M> CvExplainer<B, M> for OcclusionCvExplainer
where
    B: XaiBackend,
    M: XaiModel<B>,
{
    fn kind(&self) -> Explainers {
        Explainers::Occlusion
    }

    fn calculate_features(&self, model: &M, input: Tensor<B, 4>, target: usize) -> Result<Tensor<B, 4>> {
        let input = input.detach();
        let attributions = occlusion(&input, &self.config, |occluded| {
            target_scores(model.forward(occluded), target)
        })?
        .values;
        validate_result(&attributions)?;
        Ok(attributions)
    }
}
