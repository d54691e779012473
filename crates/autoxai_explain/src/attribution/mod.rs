//! Attribution map computation.
//!
//! The primitives in this module implement the sampling and aggregation
//! scheme of each algorithm. Model access goes through [`crate::capture`],
//! gradients always come from the Burn autodiff backend.

mod cam;
mod integrated;
mod lrp;
mod noise_tunnel;
mod occlusion;
mod shap;

pub use cam::{grad_cam, guided_grad_cam, upsample, CamInterpolation, GradCamConfig};
pub use integrated::{integrated_gradients, layer_integrated_gradients, IntegratedGradientsConfig};
pub use lrp::lrp;
pub use noise_tunnel::{noise_tunnel, NoiseTunnelConfig, NoiseTunnelType};
pub use occlusion::{occlusion, OcclusionConfig};
pub use shap::{gradient_shap, GradientShapConfig};

use autoxai_core::{sample_normal, Seed};
use burn::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ExplainError, Result};

/// Method used to compute an attribution map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributionMethod {
    /// Perturbation by sliding-window occlusion.
    Occlusion,
    /// Integrated Gradients.
    IntegratedGradients,
    /// Noise Tunnel smoothing of another method.
    NoiseTunnel,
    /// Gradient SHAP.
    GradientShap,
    /// Layer-wise Relevance Propagation.
    Lrp,
    /// Gradient-weighted Class Activation Mapping.
    GradCam,
    /// GradCAM combined with guided backpropagation gradients.
    GuidedGradCam,
}

/// Attribution map over an image batch.
#[derive(Debug, Clone)]
pub struct AttributionMap<B: Backend> {
    /// The attribution values, `(batch, channels, height, width)`.
    pub values: Tensor<B, 4>,
    /// The method used.
    pub method: AttributionMethod,
    /// Target class.
    pub target_class: Option<usize>,
}

/// Scalar statistics of an attribution map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttributionSummary {
    /// Smallest value.
    pub min: f32,
    /// Largest value.
    pub max: f32,
    /// Mean value.
    pub mean: f32,
    /// Mean absolute value.
    pub abs_mean: f32,
}

impl<B: Backend> AttributionMap<B> {
    /// Create a new attribution map.
    pub fn new(values: Tensor<B, 4>, method: AttributionMethod) -> Self {
        Self {
            values,
            method,
            target_class: None,
        }
    }

    /// Set the target class.
    pub fn with_target_class(mut self, class: usize) -> Self {
        self.target_class = Some(class);
        self
    }

    /// Get the shape of the attribution map.
    pub fn shape(&self) -> [usize; 4] {
        self.values.dims()
    }

    /// Normalize the attribution values to [0, 1].
    pub fn normalize(&self) -> Self {
        let min_val: f32 = self.values.clone().min().into_scalar().elem();
        let max_val: f32 = self.values.clone().max().into_scalar().elem();
        let range = max_val - min_val;

        // Constant maps stay as they are
        let normalized = if range > 1e-8 {
            (self.values.clone() - min_val) / range
        } else {
            self.values.clone()
        };

        Self {
            values: normalized,
            method: self.method,
            target_class: self.target_class,
        }
    }

    /// Sum over channels, `(batch, 1, height, width)`. Typical input for a heatmap.
    pub fn channel_sum(&self) -> Tensor<B, 4> {
        self.values.clone().sum_dim(1)
    }

    /// Mean attribution per channel, `(batch, channels, 1, 1)`.
    pub fn mean_per_channel(&self) -> Tensor<B, 4> {
        self.values.clone().mean_dim(3).mean_dim(2)
    }

    /// Min, max, mean and mean absolute value.
    pub fn summary(&self) -> AttributionSummary {
        AttributionSummary {
            min: self.values.clone().min().into_scalar().elem(),
            max: self.values.clone().max().into_scalar().elem(),
            mean: self.values.clone().mean().into_scalar().elem(),
            abs_mean: self.values.clone().abs().mean().into_scalar().elem(),
        }
    }
}

/// Type of baseline to use for path-based methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineType {
    /// Zero baseline (black image).
    #[default]
    Zeros,
    /// Random baseline sampled from standard normal.
    Random,
    /// Per-image mean intensity.
    Mean,
}

/// Create a zero baseline.
pub fn zero_baseline<B: Backend>(shape: [usize; 4], device: &B::Device) -> Tensor<B, 4> {
    Tensor::zeros(shape, device)
}

/// Draw a tensor of zero-mean Gaussian noise with standard deviation `std`.
pub fn gaussian_noise<B: Backend, R: Rng + ?Sized>(
    shape: [usize; 4],
    std: f32,
    rng: &mut R,
    device: &B::Device,
) -> Tensor<B, 4> {
    let samples = sample_normal(rng, shape.iter().product(), std);
    Tensor::from_data(TensorData::new(samples, shape), device)
}

/// Create a random baseline from a standard normal distribution.
///
/// The same seed always gives the same baseline. Without one the draw is
/// seeded from the clock.
pub fn random_baseline<B: Backend>(
    shape: [usize; 4],
    seed: Option<Seed>,
    device: &B::Device,
) -> Tensor<B, 4> {
    let mut rng = seed.unwrap_or_else(Seed::from_entropy).to_rng();
    gaussian_noise(shape, 1.0, &mut rng, device)
}

/// Build a baseline of the requested type for `input`.
pub fn baseline_like<B: Backend>(
    input: &Tensor<B, 4>,
    baseline: BaselineType,
    seed: Option<Seed>,
) -> Tensor<B, 4> {
    let device = input.device();
    match baseline {
        BaselineType::Zeros => zero_baseline(input.dims(), &device),
        BaselineType::Random => random_baseline(input.dims(), seed, &device),
        BaselineType::Mean => {
            let mean = input.clone().mean_dim(3).mean_dim(2).mean_dim(1);
            input.zeros_like() + mean
        }
    }
}

/// Reject attributions that contain no elements.
pub fn validate_result<B: Backend>(attributions: &Tensor<B, 4>) -> Result<()> {
    let dims = attributions.dims();
    if dims.iter().any(|&d| d == 0) {
        return Err(ExplainError::EmptyAttribution(dims.to_vec()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestBackend;

    #[test]
    fn test_attribution_map_shape() {
        let device = Default::default();
        let values = Tensor::<TestBackend, 4>::zeros([2, 3, 8, 8], &device);
        let map = AttributionMap::new(values, AttributionMethod::Lrp);

        assert_eq!(map.shape(), [2, 3, 8, 8]);
        assert_eq!(map.method, AttributionMethod::Lrp);
        assert!(map.target_class.is_none());
        assert_eq!(map.with_target_class(4).target_class, Some(4));
    }

    #[test]
    fn test_attribution_map_normalize() {
        let device = Default::default();
        let data: Vec<f32> = (0..32).map(|i| i as f32 - 10.0).collect();
        let values = Tensor::<TestBackend, 1>::from_floats(data.as_slice(), &device).reshape([2, 1, 4, 4]);
        let normalized = AttributionMap::new(values, AttributionMethod::GradCam).normalize();

        let summary = normalized.summary();
        assert!(summary.min.abs() < 1e-6);
        assert!((summary.max - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_channel_reductions() {
        let device = Default::default();
        let values = Tensor::<TestBackend, 4>::ones([2, 3, 4, 5], &device);
        let map = AttributionMap::new(values, AttributionMethod::IntegratedGradients);

        assert_eq!(map.channel_sum().dims(), [2, 1, 4, 5]);
        assert_eq!(map.mean_per_channel().dims(), [2, 3, 1, 1]);
        let total: f32 = map.channel_sum().sum().into_scalar().elem();
        assert!((total - 120.0).abs() < 1e-4);
    }

    #[test]
    fn test_summary() {
        let device = Default::default();
        let values = Tensor::<TestBackend, 1>::from_floats([-2.0, 0.0, 1.0, 1.0], &device).reshape([1, 1, 2, 2]);
        let summary = AttributionMap::new(values, AttributionMethod::Occlusion).summary();

        assert_eq!(summary.min, -2.0);
        assert_eq!(summary.max, 1.0);
        assert!(summary.mean.abs() < 1e-6);
        assert!((summary.abs_mean - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_baselines() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 1>::from_floats([1.0, 2.0, 3.0, 6.0], &device).reshape([1, 1, 2, 2]);

        let zeros = baseline_like(&input, BaselineType::Zeros, None);
        let zero_sum: f32 = zeros.sum().into_scalar().elem();
        assert!(zero_sum.abs() < 1e-6);

        let mean = baseline_like(&input, BaselineType::Mean, None);
        let values = mean.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| (v - 3.0).abs() < 1e-6));

        let a = baseline_like(&input, BaselineType::Random, Some(Seed::new(9)));
        let b = baseline_like(&input, BaselineType::Random, Some(Seed::new(9)));
        assert_eq!(a.dims(), [1, 1, 2, 2]);
        let diff: f32 = (a - b).abs().sum().into_scalar().elem();
        assert!(diff < 1e-6);
    }

    #[test]
    fn test_gaussian_noise() {
        let device = Default::default();
        let mut rng = Seed::new(4).to_rng();
        let noise = gaussian_noise::<TestBackend, _>([2, 3, 8, 8], 0.5, &mut rng, &device);

        assert_eq!(noise.dims(), [2, 3, 8, 8]);
        let spread: f32 = noise.abs().sum().into_scalar().elem();
        assert!(spread > 0.0);

        let mut rng = Seed::new(4).to_rng();
        let again = gaussian_noise::<TestBackend, _>([2, 3, 8, 8], 0.5, &mut rng, &device);
        let first = gaussian_noise::<TestBackend, _>([2, 3, 8, 8], 0.5, &mut Seed::new(4).to_rng(), &device);
        let diff: f32 = (again - first).abs().sum().into_scalar().elem();
        assert!(diff < 1e-6);
    }

    #[test]
    fn test_validate_result() {
        let device = Default::default();
        let ok = Tensor::<TestBackend, 4>::zeros([1, 1, 2, 2], &device);
        assert!(validate_result(&ok).is_ok());

        let empty = Tensor::<TestBackend, 4>::zeros([1, 0, 2, 2], &device);
        assert!(matches!(validate_result(&empty), Err(ExplainError::EmptyAttribution(_))));
    }

    #[test]
    fn test_baseline_type_serde() {
        let json = serde_json::to_string(&BaselineType::Random).unwrap();
        assert_eq!(json, "\"random\"");
        let decoded: BaselineType = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, BaselineType::Random);
    }
}
