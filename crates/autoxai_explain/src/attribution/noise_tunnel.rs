//! Noise Tunnel: smoothing an attribution method over noisy inputs.

use autoxai_core::Seed;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use super::gaussian_noise;
use crate::error::{ExplainError, Result};

/// How attributions of the noisy samples are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseTunnelType {
    /// Mean of the sample attributions.
    #[default]
    Smoothgrad,
    /// Mean of the squared sample attributions.
    SmoothgradSq,
    /// Variance of the sample attributions.
    Vargrad,
}

/// Configuration for Noise Tunnel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseTunnelConfig {
    /// Aggregation of the sample attributions.
    pub nt_type: NoiseTunnelType,
    /// Number of noisy samples generated per input.
    pub nt_samples: usize,
    /// Samples attributed together in one call. `None` processes all at once.
    pub nt_samples_batch_size: Option<usize>,
    /// Standard deviation of the zero-mean Gaussian noise.
    pub stdevs: f32,
    /// Draw a random baseline for every noisy sample instead of using the
    /// wrapped method's fixed baseline.
    pub draw_baseline_from_distrib: bool,
}

impl Default for NoiseTunnelConfig {
    fn default() -> Self {
        Self {
            nt_type: NoiseTunnelType::Smoothgrad,
            nt_samples: 5,
            nt_samples_batch_size: None,
            stdevs: 1.0,
            draw_baseline_from_distrib: false,
        }
    }
}

impl NoiseTunnelConfig {
    /// Set the aggregation type.
    #[must_use]
    pub fn with_nt_type(mut self, nt_type: NoiseTunnelType) -> Self {
        self.nt_type = nt_type;
        self
    }

    /// Set the number of noisy samples.
    #[must_use]
    pub fn with_nt_samples(mut self, nt_samples: usize) -> Self {
        self.nt_samples = nt_samples;
        self
    }

    /// Set how many samples are attributed per call.
    #[must_use]
    pub fn with_nt_samples_batch_size(mut self, size: usize) -> Self {
        self.nt_samples_batch_size = Some(size);
        self
    }

    /// Set the noise standard deviation.
    #[must_use]
    pub fn with_stdevs(mut self, stdevs: f32) -> Self {
        self.stdevs = stdevs;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.nt_samples == 0 {
            return Err(ExplainError::InvalidConfig(
                "noise tunnel needs nt_samples >= 1".to_string(),
            ));
        }
        if self.nt_samples_batch_size == Some(0) {
            return Err(ExplainError::InvalidConfig(
                "nt_samples_batch_size must be positive".to_string(),
            ));
        }
        if self.stdevs.is_nan() || self.stdevs < 0.0 {
            return Err(ExplainError::InvalidConfig(format!(
                "noise stdevs must be non-negative, got {}",
                self.stdevs
            )));
        }
        Ok(())
    }
}

/// Smooth an attribution method by averaging it over noisy copies of the input.
///
/// Reference: Smilkov et al., "SmoothGrad: removing noise by adding noise", 2017.
///
/// # Arguments
///
/// * `input` - Model input (batch, channels, height, width)
/// * `config` - Sampling and aggregation parameters
/// * `seed` - Makes the noise reproducible
/// * `attribute` - The wrapped method. It receives `k * batch` noisy inputs,
///   sample-major (`k` copies of the batch), and returns one attribution per row.
///
/// # Returns
///
/// Aggregated attribution with the wrapped method's per-sample shape.
pub fn noise_tunnel<B, F>(
    input: &Tensor<B, 4>,
    config: &NoiseTunnelConfig,
    seed: Option<Seed>,
    mut attribute: F,
) -> Result<Tensor<B, 4>>
where
    B: Backend,
    F: FnMut(Tensor<B, 4>) -> Result<Tensor<B, 4>>,
{
    config.validate()?;

    let [batch_size, channels, height, width] = input.dims();
    let device = input.device();
    let n_samples = config.nt_samples;
    let per_call = config.nt_samples_batch_size.unwrap_or(n_samples).min(n_samples);

    let mut rng = seed.unwrap_or_else(Seed::from_entropy).to_rng();

    let mut sum: Option<Tensor<B, 4>> = None;
    let mut sum_sq: Option<Tensor<B, 4>> = None;
    let mut done = 0;

    while done < n_samples {
        let k = per_call.min(n_samples - done);
        let noise = gaussian_noise(
            [k * batch_size, channels, height, width],
            config.stdevs,
            &mut rng,
            &device,
        );
        let noisy = input.clone().repeat_dim(0, k) + noise;

        let attributions = attribute(noisy)?;
        let [rows, a_channels, a_height, a_width] = attributions.dims();
        if rows != k * batch_size {
            return Err(ExplainError::InvalidConfig(format!(
                "wrapped attribution returned {rows} rows for {} noisy inputs",
                k * batch_size
            )));
        }

        // (k * batch, ...) -> (k, batch, ...) and reduce over the samples
        let per_sample: Tensor<B, 5> =
            attributions.reshape([k, batch_size, a_channels, a_height, a_width]);
        let shape = [batch_size, a_channels, a_height, a_width];
        let chunk_sum: Tensor<B, 4> = per_sample.clone().sum_dim(0).reshape(shape);
        let chunk_sq: Tensor<B, 4> = per_sample.powf_scalar(2.0).sum_dim(0).reshape(shape);

        sum = Some(match sum {
            Some(acc) => acc + chunk_sum,
            None => chunk_sum,
        });
        sum_sq = Some(match sum_sq {
            Some(acc) => acc + chunk_sq,
            None => chunk_sq,
        });
        done += k;
    }

    let missing = || ExplainError::MissingGradient("noise tunnel samples".to_string());
    let mean = sum.ok_or_else(missing)? / n_samples as f32;
    let mean_sq = sum_sq.ok_or_else(missing)? / n_samples as f32;

    Ok(match config.nt_type {
        NoiseTunnelType::Smoothgrad => mean,
        NoiseTunnelType::SmoothgradSq => mean_sq,
        NoiseTunnelType::Vargrad => mean_sq - mean.powf_scalar(2.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestBackend;

    #[test]
    fn test_noise_tunnel_config_default() {
        let config = NoiseTunnelConfig::default();
        assert_eq!(config.nt_type, NoiseTunnelType::Smoothgrad);
        assert_eq!(config.nt_samples, 5);
        assert!(config.nt_samples_batch_size.is_none());
        assert_eq!(config.stdevs, 1.0);
        assert!(!config.draw_baseline_from_distrib);
    }

    #[test]
    fn test_invalid_config() {
        assert!(NoiseTunnelConfig::default().with_nt_samples(0).validate().is_err());
        assert!(NoiseTunnelConfig::default().with_stdevs(-1.0).validate().is_err());
        assert!(NoiseTunnelConfig::default()
            .with_nt_samples_batch_size(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_zero_noise_is_identity_for_smoothgrad() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 1>::from_floats([1.0, -2.0, 3.0, 4.0], &device).reshape([1, 1, 2, 2]);
        let config = NoiseTunnelConfig::default().with_stdevs(0.0);

        let smoothed = noise_tunnel(&input, &config, Some(Seed::new(1)), |x| Ok(x * 2.0)).unwrap();

        let diff: f32 = (smoothed - input * 2.0).abs().sum().into_scalar().elem();
        assert!(diff < 1e-5);
    }

    #[test]
    fn test_vargrad_of_constant_is_zero() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::ones([2, 1, 3, 3], &device);
        let config = NoiseTunnelConfig::default().with_nt_type(NoiseTunnelType::Vargrad);

        // The wrapped method ignores the noise entirely.
        let var = noise_tunnel(&input, &config, None, |x| Ok(x.ones_like())).unwrap();

        assert_eq!(var.dims(), [2, 1, 3, 3]);
        let total: f32 = var.abs().sum().into_scalar().elem();
        assert!(total < 1e-5);
    }

    #[test]
    fn test_smoothgrad_sq_non_negative() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::zeros([1, 1, 4, 4], &device);
        let config = NoiseTunnelConfig::default().with_nt_type(NoiseTunnelType::SmoothgradSq);

        let sq = noise_tunnel(&input, &config, Some(Seed::new(5)), Ok).unwrap();
        let min: f32 = sq.min().into_scalar().elem();
        assert!(min >= 0.0);
    }

    #[test]
    fn test_batched_samples_are_reproducible() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::ones([2, 1, 3, 3], &device);
        let config = NoiseTunnelConfig::default().with_nt_samples(4).with_nt_samples_batch_size(3);

        let mut calls = Vec::new();
        let a = noise_tunnel(&input, &config, Some(Seed::new(11)), |x| {
            calls.push(x.dims()[0]);
            Ok(x)
        })
        .unwrap();
        let b = noise_tunnel(&input, &config, Some(Seed::new(11)), Ok).unwrap();

        // 4 samples in calls of 3 and 1, each times the batch of 2
        assert_eq!(calls, vec![6, 2]);
        let diff: f32 = (a - b).abs().sum().into_scalar().elem();
        assert!(diff < 1e-6);
    }

    #[test]
    fn test_layer_shaped_attributions() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::ones([3, 1, 8, 8], &device);
        let config = NoiseTunnelConfig::default();

        // Wrapped method reduces the spatial size, like a layer attribution.
        let out = noise_tunnel(&input, &config, None, |x| {
            let [rows, _, _, _] = x.dims();
            Ok(Tensor::ones([rows, 4, 2, 2], &x.device()))
        })
        .unwrap();

        assert_eq!(out.dims(), [3, 4, 2, 2]);
    }
}
