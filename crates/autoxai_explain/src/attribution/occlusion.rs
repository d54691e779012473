//! Sliding-window occlusion.

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use super::{AttributionMap, AttributionMethod};
use crate::error::{ExplainError, Result};

/// Configuration for occlusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcclusionConfig {
    /// Window shape `[channels, height, width]`.
    pub sliding_window: [usize; 3],
    /// Window step `[channels, height, width]`.
    pub strides: [usize; 3],
    /// Value written into the occluded window.
    pub baseline: f32,
    /// Number of occluded copies evaluated per forward pass.
    pub perturbations_per_eval: usize,
}

impl Default for OcclusionConfig {
    fn default() -> Self {
        Self {
            sliding_window: [1, 16, 16],
            strides: [1, 8, 8],
            baseline: 0.0,
            perturbations_per_eval: 1,
        }
    }
}

impl OcclusionConfig {
    /// Set the window shape.
    #[must_use]
    pub fn with_sliding_window(mut self, window: [usize; 3]) -> Self {
        self.sliding_window = window;
        self
    }

    /// Set the window strides.
    #[must_use]
    pub fn with_strides(mut self, strides: [usize; 3]) -> Self {
        self.strides = strides;
        self
    }

    /// Set the number of occluded copies per forward pass.
    #[must_use]
    pub fn with_perturbations_per_eval(mut self, n: usize) -> Self {
        self.perturbations_per_eval = n;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.sliding_window.iter().any(|&w| w == 0) {
            return Err(ExplainError::InvalidConfig(
                "occlusion window dimensions must be positive".to_string(),
            ));
        }
        if self.strides.iter().any(|&s| s == 0) {
            return Err(ExplainError::InvalidConfig(
                "occlusion strides must be positive".to_string(),
            ));
        }
        if self.perturbations_per_eval == 0 {
            return Err(ExplainError::InvalidConfig(
                "perturbations_per_eval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Window origins along each of the channel, height and width axes.
    fn origins(&self, dims: [usize; 3]) -> Result<[Vec<usize>; 3]> {
        let mut origins: [Vec<usize>; 3] = Default::default();
        for axis in 0..3 {
            let (size, window, stride) = (dims[axis], self.sliding_window[axis], self.strides[axis]);
            if window > size {
                return Err(ExplainError::InvalidConfig(format!(
                    "occlusion window {:?} does not fit input {:?}",
                    self.sliding_window, dims
                )));
            }
            origins[axis] = (0..=size - window).step_by(stride).collect();
        }
        Ok(origins)
    }
}

/// Compute occlusion attribution.
///
/// Every window position is replaced by the baseline value and the drop in
/// target score is credited to all elements of the window. Elements covered
/// by several windows receive the mean drop.
///
/// Reference: Zeiler & Fergus, "Visualizing and Understanding Convolutional Networks", ECCV 2014.
///
/// # Arguments
///
/// * `input` - Model input (batch, channels, height, width)
/// * `config` - Window parameters
/// * `scores` - Runs the model and returns the target score per row
pub fn occlusion<B, F>(
    input: &Tensor<B, 4>,
    config: &OcclusionConfig,
    mut scores: F,
) -> Result<AttributionMap<B>>
where
    B: Backend,
    F: FnMut(Tensor<B, 4>) -> Result<Tensor<B, 1>>,
{
    config.validate()?;

    let [batch_size, channels, height, width] = input.dims();
    let device = input.device();
    let [wc, wh, ww] = config.sliding_window;
    let [c_origins, h_origins, w_origins] = config.origins([channels, height, width])?;

    let mut windows = Vec::with_capacity(c_origins.len() * h_origins.len() * w_origins.len());
    for &c in &c_origins {
        for &h in &h_origins {
            for &w in &w_origins {
                windows.push([0..batch_size, c..c + wc, h..h + wh, w..w + ww]);
            }
        }
    }

    let reference = scores(input.clone())?.reshape([batch_size, 1, 1, 1]);
    let patch = Tensor::<B, 4>::full([batch_size, wc, wh, ww], config.baseline, &device);

    let mut total = Tensor::<B, 4>::zeros([batch_size, channels, height, width], &device);
    let mut counts = Tensor::<B, 4>::zeros([1, channels, height, width], &device);

    for group in windows.chunks(config.perturbations_per_eval) {
        let occluded = group
            .iter()
            .map(|region| input.clone().slice_assign(region.clone(), patch.clone()))
            .collect::<Vec<_>>();
        let occluded_scores = scores(Tensor::cat(occluded, 0))?;

        for (offset, region) in group.iter().enumerate() {
            let drop = reference.clone()
                - occluded_scores
                    .clone()
                    .narrow(0, offset * batch_size, batch_size)
                    .reshape([batch_size, 1, 1, 1]);

            let credited = total.clone().slice(region.clone()) + patch.ones_like() * drop;
            total = total.slice_assign(region.clone(), credited);

            let [_, c, h, w] = region.clone();
            let count_region = [0..1, c, h, w];
            let covered = counts.clone().slice(count_region.clone()) + 1.0;
            counts = counts.slice_assign(count_region, covered);
        }
    }

    let attribution = total / counts.clamp_min(1.0);
    Ok(AttributionMap::new(attribution, AttributionMethod::Occlusion))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::target_scores;
    use crate::test_utils::{ProbeModel, TestBackend};
    use autoxai_core::XaiModel;

    #[test]
    fn test_occlusion_config_default() {
        let config = OcclusionConfig::default();
        assert_eq!(config.sliding_window, [1, 16, 16]);
        assert_eq!(config.strides, [1, 8, 8]);
        assert_eq!(config.baseline, 0.0);
        assert!(config.clone().with_strides([1, 0, 1]).validate().is_err());
        assert!(config.with_sliding_window([0, 1, 1]).validate().is_err());
    }

    #[test]
    fn test_window_larger_than_input() {
        let device = Default::default();
        let model = ProbeModel::default();
        let input = Tensor::<TestBackend, 4>::ones([1, 1, 4, 4], &device);

        let result = occlusion(&input, &OcclusionConfig::default(), |x| {
            target_scores(model.forward(x), 0)
        });
        assert!(matches!(result, Err(ExplainError::InvalidConfig(_))));
    }

    #[test]
    fn test_single_pixel_windows_recover_linear_contributions() {
        // With 1x1 windows on a pixel-sum score, each pixel's drop is its value.
        let device = Default::default();
        let model = ProbeModel::default();
        let data: Vec<f32> = (0..8).map(|i| i as f32).collect();
        let input = Tensor::<TestBackend, 1>::from_floats(data.as_slice(), &device).reshape([2, 1, 2, 2]);
        let config = OcclusionConfig::default()
            .with_sliding_window([1, 1, 1])
            .with_strides([1, 1, 1]);

        let attr = occlusion(&input, &config, |x| target_scores(model.forward(x), 0)).unwrap();

        let values = attr.values.into_data().to_vec::<f32>().unwrap();
        for (value, expected) in values.iter().zip(data.iter()) {
            assert!((value - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn test_overlapping_windows_are_averaged() {
        let device = Default::default();
        let model = ProbeModel::default();
        let input = Tensor::<TestBackend, 4>::ones([1, 1, 4, 4], &device);
        let config = OcclusionConfig::default()
            .with_sliding_window([1, 2, 2])
            .with_strides([1, 1, 1])
            .with_perturbations_per_eval(4);

        let attr = occlusion(&input, &config, |x| target_scores(model.forward(x), 0)).unwrap();

        // Every 2x2 window of ones drops the sum by 4, whatever the overlap.
        assert_eq!(attr.shape(), [1, 1, 4, 4]);
        let values = attr.values.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| (v - 4.0).abs() < 1e-4));
    }
}
