//! Integrated Gradients explainers.

use autoxai_core::{Seed, XaiBackend, XaiModel};
use burn::prelude::*;

use super::{resolve_layer, CvExplainer, Explainers};
use crate::attribution::{
    baseline_like, integrated_gradients, layer_integrated_gradients, validate_result,
    IntegratedGradientsConfig,
};
use crate::capture::capture_input;
use crate::error::Result;

/// Integrated Gradients attributed to the input pixels.
#[derive(Debug, Clone, Default)]
pub struct IntegratedGradientsCvExplainer {
    config: IntegratedGradientsConfig,
    seed: Option<Seed>,
}

impl IntegratedGradientsCvExplainer {
    /// Create the explainer.
    pub fn new(config: IntegratedGradientsConfig, seed: Option<Seed>) -> Self {
        Self { config, seed }
    }
}

impl<B, M> CvExplainer<B, M> for IntegratedGradientsCvExplainer
where
    B: XaiBackend,
    M: XaiModel<B>,
{
    fn kind(&self) -> Explainers {
        Explainers::IntegratedGradients
    }

    fn calculate_features(&self, model: &M, input: Tensor<B, 4>, target: usize) -> Result<Tensor<B, 4>> {
        let baseline = baseline_like(&input, self.config.baseline, self.seed.map(|s| s.derive("baseline")));
        let attributions = integrated_gradients(
            &input,
            &baseline,
            |scaled| capture_input(model, scaled, target),
            &self.config,
        )?
        .values;
        validate_result(&attributions)?;
        Ok(attributions)
    }
}

/// Integrated Gradients attributed to the output of a layer.
///
/// Without an explicit layer the model's last convolution is used.
#[derive(Debug, Clone, Default)]
pub struct LayerIntegratedGradientsCvExplainer {
    config: IntegratedGradientsConfig,
    layer: Option<String>,
    seed: Option<Seed>,
}

impl LayerIntegratedGradientsCvExplainer {
    /// Create the explainer.
    pub fn new(config: IntegratedGradientsConfig, layer: Option<String>, seed: Option<Seed>) -> Self {
        Self { config, layer, seed }
    }
}

impl<B, M> CvExplainer<B, M> for LayerIntegratedGradientsCvExplainer
where
    B: XaiBackend,
    M: XaiModel<B>,
{
    fn kind(&self) -> Explainers {
        Explainers::LayerIntegratedGradients
    }

    fn calculate_features(&self, model: &M, input: Tensor<B, 4>, target: usize) -> Result<Tensor<B, 4>> {
        let layer = resolve_layer(model, self.layer.as_deref())?;
        let baseline = baseline_like(&input, self.config.baseline, self.seed.map(|s| s.derive("baseline")));
        let attributions =
            layer_integrated_gradients(model, &input, &baseline, &layer, target, &self.config)?.values;
        validate_result(&attributions)?;
        Ok(attributions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExplainError;
    use crate::test_utils::{ProbeModel, TestBackend};

    #[test]
    fn test_integrated_gradients_explainer() {
        let device = Default::default();
        let model = ProbeModel::default();
        let input = Tensor::<TestBackend, 4>::ones([1, 1, 4, 4], &device) * 2.0;
        let explainer = IntegratedGradientsCvExplainer::new(IntegratedGradientsConfig::default().with_n_steps(10), None);

        let attributions = explainer.calculate_features(&model, input, 0).unwrap();

        // Linear class: attribution equals the input
        assert_eq!(attributions.dims(), [1, 1, 4, 4]);
        let values = attributions.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| (v - 2.0).abs() < 1e-4));
    }

    #[test]
    fn test_layer_explainer_defaults_to_last_conv() {
        let device = Default::default();
        let model = ProbeModel::default();
        let input = Tensor::<TestBackend, 4>::ones([2, 1, 3, 3], &device);
        let explainer = LayerIntegratedGradientsCvExplainer::default();

        let attributions = explainer.calculate_features(&model, input, 0).unwrap();
        assert_eq!(attributions.dims(), [2, 1, 3, 3]);
    }

    #[test]
    fn test_layer_explainer_unknown_layer() {
        let device = Default::default();
        let model = ProbeModel::default();
        let input = Tensor::<TestBackend, 4>::ones([1, 1, 3, 3], &device);
        let explainer = LayerIntegratedGradientsCvExplainer::new(
            IntegratedGradientsConfig::default(),
            Some("fc9".to_string()),
            None,
        );

        let err = explainer.calculate_features(&model, input, 0).unwrap_err();
        assert!(matches!(err, ExplainError::Core(_)));
    }

    #[test]
    fn test_target_out_of_range() {
        let device = Default::default();
        let model = ProbeModel::default();
        let input = Tensor::<TestBackend, 4>::ones([1, 1, 3, 3], &device);
        let explainer = IntegratedGradientsCvExplainer::default();

        let err = explainer.calculate_features(&model, input, 2).unwrap_err();
        assert!(matches!(err, ExplainError::TargetOutOfRange { target: 2, n_outputs: 2 }));
    }
}
