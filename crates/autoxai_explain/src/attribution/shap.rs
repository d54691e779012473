//! Gradient SHAP.

use autoxai_core::Seed;
use burn::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{baseline_like, gaussian_noise, AttributionMap, AttributionMethod, BaselineType};
use crate::capture::LayerCapture;
use crate::error::{ExplainError, Result};

/// Configuration for Gradient SHAP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientShapConfig {
    /// Number of random path points per input.
    pub n_samples: usize,
    /// Standard deviation of the noise added to the input before
    /// interpolating.
    pub stdevs: f32,
    /// Distribution baselines are drawn from.
    pub baseline: BaselineType,
}

impl Default for GradientShapConfig {
    fn default() -> Self {
        Self {
            n_samples: 5,
            stdevs: 0.0,
            baseline: BaselineType::Random,
        }
    }
}

impl GradientShapConfig {
    /// Set the number of samples.
    #[must_use]
    pub fn with_n_samples(mut self, n_samples: usize) -> Self {
        self.n_samples = n_samples;
        self
    }

    /// Set the input noise standard deviation.
    #[must_use]
    pub fn with_stdevs(mut self, stdevs: f32) -> Self {
        self.stdevs = stdevs;
        self
    }

    /// Set the baseline distribution.
    #[must_use]
    pub fn with_baseline(mut self, baseline: BaselineType) -> Self {
        self.baseline = baseline;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.n_samples == 0 {
            return Err(ExplainError::InvalidConfig(
                "gradient shap needs n_samples >= 1".to_string(),
            ));
        }
        if self.stdevs.is_nan() || self.stdevs < 0.0 {
            return Err(ExplainError::InvalidConfig(format!(
                "gradient shap stdevs must be non-negative, got {}",
                self.stdevs
            )));
        }
        Ok(())
    }
}

/// Compute Gradient SHAP attribution.
///
/// Approximates SHAP values as the expected gradient over random points on
/// the path between a baseline drawn from the baseline distribution and the
/// (optionally noised) input, multiplied by the activation difference
/// between that noised input and the baseline.
///
/// Reference: Lundberg & Lee, "A Unified Approach to Interpreting Model Predictions", NeurIPS 2017.
///
/// # Arguments
///
/// * `input` - Model input (batch, channels, height, width)
/// * `config` - Sampling parameters
/// * `seed` - Makes baselines, noise and path positions reproducible
/// * `capture` - Returns activation and gradient for a stack of inputs
/// * `activations` - Activation of the captured tensor without a backward
///   pass; the identity for input attribution
pub fn gradient_shap<B, F, G>(
    input: &Tensor<B, 4>,
    config: &GradientShapConfig,
    seed: Option<Seed>,
    mut capture: F,
    mut activations: G,
) -> Result<AttributionMap<B>>
where
    B: Backend,
    F: FnMut(Tensor<B, 4>) -> Result<LayerCapture<B>>,
    G: FnMut(Tensor<B, 4>) -> Result<Tensor<B, 4>>,
{
    config.validate()?;

    let [batch_size, channels, height, width] = input.dims();
    let device = input.device();
    let n_samples = config.n_samples;
    let rows = n_samples * batch_size;
    let seed = seed.unwrap_or_else(Seed::from_entropy);

    // Sample-major stack: n_samples copies of the batch
    let inputs = input.clone().repeat_dim(0, n_samples);
    let baselines = baseline_like(&inputs, config.baseline, Some(seed.derive("baseline")));

    let noisy = if config.stdevs > 0.0 {
        let mut rng = seed.derive("noise").to_rng();
        inputs + gaussian_noise([rows, channels, height, width], config.stdevs, &mut rng, &device)
    } else {
        inputs
    };

    let mut rng = seed.derive("alpha").to_rng();
    let alphas: Vec<f32> = (0..rows).map(|_| rng.gen::<f32>()).collect();
    let alphas = Tensor::<B, 4>::from_data(TensorData::new(alphas, [rows, 1, 1, 1]), &device);

    let scaled = baselines.clone() + (noisy.clone() - baselines.clone()) * alphas;
    let gradients = capture(scaled)?.gradient;
    let delta = activations(noisy)? - activations(baselines)?;

    let [_, a_channels, a_height, a_width] = gradients.dims();
    let per_sample: Tensor<B, 5> =
        (gradients * delta).reshape([n_samples, batch_size, a_channels, a_height, a_width]);
    let attribution: Tensor<B, 4> = per_sample
        .mean_dim(0)
        .reshape([batch_size, a_channels, a_height, a_width]);

    Ok(AttributionMap::new(attribution, AttributionMethod::GradientShap))
}
