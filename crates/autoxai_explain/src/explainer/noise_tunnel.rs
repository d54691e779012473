//! Noise Tunnel explainers.
//!
//! Both wrap Integrated Gradients: on the input for
//! [`NoiseTunnelCvExplainer`], on a layer for [`LayerNoiseTunnelCvExplainer`].

use autoxai_core::{Seed, XaiBackend, XaiModel};
use burn::prelude::*;

use super::{resolve_layer, CvExplainer, Explainers};
use crate::attribution::{
    baseline_like, integrated_gradients, layer_integrated_gradients, noise_tunnel, validate_result,
    BaselineType, IntegratedGradientsConfig, NoiseTunnelConfig,
};
use crate::capture::capture_input;
use crate::error::Result;

/// Baselines for one call of the wrapped method.
///
/// With `draw_baseline_from_distrib` every noisy sample gets its own draw
/// from a standard normal, otherwise the wrapped method's baseline is used.
struct BaselineSampler {
    baseline: BaselineType,
    seed: Option<Seed>,
    draws: u64,
}

impl BaselineSampler {
    fn new(noise_tunnel: &NoiseTunnelConfig, integrated: &IntegratedGradientsConfig, seed: Option<Seed>) -> Self {
        let baseline = if noise_tunnel.draw_baseline_from_distrib {
            BaselineType::Random
        } else {
            integrated.baseline
        };
        Self {
            baseline,
            seed,
            draws: 0,
        }
    }

    fn next<B: Backend>(&mut self, noisy: &Tensor<B, 4>) -> Tensor<B, 4> {
        let seed = self.seed.map(|s| s.derive(&format!("baseline-{}", self.draws)));
        self.draws += 1;
        baseline_like(noisy, self.baseline, seed)
    }
}

/// Noise Tunnel over Integrated Gradients on the input.
#[derive(Debug, Clone, Default)]
pub struct NoiseTunnelCvExplainer {
    config: NoiseTunnelConfig,
    integrated: IntegratedGradientsConfig,
    seed: Option<Seed>,
}

impl NoiseTunnelCvExplainer {
    /// Create the explainer.
    pub fn new(config: NoiseTunnelConfig, integrated: IntegratedGradientsConfig, seed: Option<Seed>) -> Self {
        Self {
            config,
            integrated,
            seed,
        }
    }
}

impl<B, M> CvExplainer<B, M> for NoiseTunnelCvExplainer
where
    B: XaiBackend,
    M: XaiModel<B>,
{
    fn kind(&self) -> Explainers {
        Explainers::NoiseTunnel
    }

    fn calculate_features(&self, model: &M, input: Tensor<B, 4>, target: usize) -> Result<Tensor<B, 4>> {
        let mut baselines = BaselineSampler::new(&self.config, &self.integrated, self.seed);
        let attributions = noise_tunnel(
            &input,
            &self.config,
            self.seed.map(|s| s.derive("noise")),
            |noisy| {
                let baseline = baselines.next(&noisy);
                let map = integrated_gradients(
                    &noisy,
                    &baseline,
                    |scaled| capture_input(model, scaled, target),
                    &self.integrated,
                )?;
                Ok(map.values)
            },
        )?;
        validate_result(&attributions)?;
        Ok(attributions)
    }
}

/// Noise Tunnel over Integrated Gradients on a layer.
///
/// Without an explicit layer the model's last convolution is used.
#[derive(Debug, Clone, Default)]
pub struct LayerNoiseTunnelCvExplainer {
    config: NoiseTunnelConfig,
    integrated: IntegratedGradientsConfig,
    layer: Option<String>,
    seed: Option<Seed>,
}

impl LayerNoiseTunnelCvExplainer {
    /// Create the explainer.
    pub fn new(
        config: NoiseTunnelConfig,
        integrated: IntegratedGradientsConfig,
        layer: Option<String>,
        seed: Option<Seed>,
    ) -> Self {
        Self {
            config,
            integrated,
            layer,
            seed,
        }
    }
}

impl<B, M> CvExplainer<B, M> for LayerNoiseTunnelCvExplainer
where
    B: XaiBackend,
    M: XaiModel<B>,
{
    fn kind(&self) -> Explainers {
        Explainers::LayerNoiseTunnel
    }

    fn calculate_features(&self, model: &M, input: Tensor<B, 4>, target: usize) -> Result<Tensor<B, 4>> {
        let layer = resolve_layer(model, self.layer.as_deref())?;
        let mut baselines = BaselineSampler::new(&self.config, &self.integrated, self.seed);
        let attributions = noise_tunnel(
            &input,
            &self.config,
            self.seed.map(|s| s.derive("noise")),
            |noisy| {
                let baseline = baselines.next(&noisy);
                let map = layer_integrated_gradients(model, &noisy, &baseline, &layer, target, &self.integrated)?;
                Ok(map.values)
            },
        )?;
        validate_result(&attributions)?;
        Ok(attributions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::NoiseTunnelType;
    use crate::test_utils::{ProbeModel, TestBackend};

    fn small_integrated() -> IntegratedGradientsConfig {
        IntegratedGradientsConfig::default().with_n_steps(4)
    }

    #[test]
    fn test_noise_tunnel_shape_matches_input() {
        let device = Default::default();
        let model = ProbeModel::default();
        let input = Tensor::<TestBackend, 4>::ones([2, 3, 5, 5], &device);
        let explainer = NoiseTunnelCvExplainer::new(NoiseTunnelConfig::default(), small_integrated(), Some(Seed::new(0)));

        let attributions = explainer.calculate_features(&model, input, 1).unwrap();
        assert_eq!(attributions.dims(), [2, 3, 5, 5]);
    }

    #[test]
    fn test_linear_target_ignores_noise() {
        // Class 0 is linear, so IG on each noisy copy returns that copy; with a
        // zero baseline smoothgrad returns the mean noisy input.
        let device = Default::default();
        let model = ProbeModel::default();
        let input = Tensor::<TestBackend, 4>::ones([1, 1, 4, 4], &device) * 3.0;
        let config = NoiseTunnelConfig::default().with_stdevs(0.0);
        let explainer = NoiseTunnelCvExplainer::new(config, small_integrated(), None);

        let attributions = explainer.calculate_features(&model, input, 0).unwrap();
        let values = attributions.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| (v - 3.0).abs() < 1e-4));
    }

    #[test]
    fn test_seeded_runs_match() {
        let device = Default::default();
        let model = ProbeModel::default();
        let input = Tensor::<TestBackend, 4>::ones([1, 1, 3, 3], &device);
        let mut config = NoiseTunnelConfig::default()
            .with_nt_type(NoiseTunnelType::Vargrad)
            .with_nt_samples_batch_size(2);
        config.draw_baseline_from_distrib = true;
        let explainer = NoiseTunnelCvExplainer::new(config, small_integrated(), Some(Seed::new(17)));

        let a = explainer.calculate_features(&model, input.clone(), 1).unwrap();
        let b = explainer.calculate_features(&model, input, 1).unwrap();
        let diff: f32 = (a - b).abs().sum().into_scalar().elem();
        assert!(diff < 1e-5);
    }

    #[test]
    fn test_layer_noise_tunnel() {
        let device = Default::default();
        let model = ProbeModel::default();
        let input = Tensor::<TestBackend, 4>::ones([2, 1, 3, 3], &device);
        let explainer = LayerNoiseTunnelCvExplainer::new(
            NoiseTunnelConfig::default().with_nt_samples(3),
            small_integrated(),
            None,
            Some(Seed::new(5)),
        );

        let attributions = explainer.calculate_features(&model, input, 0).unwrap();
        assert_eq!(attributions.dims(), [2, 1, 3, 3]);
    }
}
