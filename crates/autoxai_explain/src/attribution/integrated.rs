//! Integrated Gradients, at the input or at an inner layer.

use autoxai_core::{XaiBackend, XaiModel};
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use super::{AttributionMap, AttributionMethod, BaselineType};
use crate::capture::{capture_from_layer, layer_activation, LayerCapture};
use crate::error::{ExplainError, Result};

/// Configuration for Integrated Gradients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratedGradientsConfig {
    /// Number of steps for Riemann approximation of the integral.
    pub n_steps: usize,
    /// Baseline type for the path integral.
    pub baseline: BaselineType,
    /// Maximum number of scaled samples per forward pass.
    /// `None` evaluates the whole path in one pass.
    pub internal_batch_size: Option<usize>,
}

impl Default for IntegratedGradientsConfig {
    fn default() -> Self {
        Self {
            n_steps: 50,
            baseline: BaselineType::Zeros,
            internal_batch_size: None,
        }
    }
}

impl IntegratedGradientsConfig {
    /// Set the number of integration steps.
    #[must_use]
    pub fn with_n_steps(mut self, n_steps: usize) -> Self {
        self.n_steps = n_steps;
        self
    }

    /// Set the baseline type.
    #[must_use]
    pub fn with_baseline(mut self, baseline: BaselineType) -> Self {
        self.baseline = baseline;
        self
    }

    /// Set the internal batch size.
    #[must_use]
    pub fn with_internal_batch_size(mut self, size: usize) -> Self {
        self.internal_batch_size = Some(size);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.n_steps == 0 {
            return Err(ExplainError::InvalidConfig(
                "integrated gradients needs n_steps >= 1".to_string(),
            ));
        }
        if self.internal_batch_size == Some(0) {
            return Err(ExplainError::InvalidConfig(
                "internal_batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Compute Integrated Gradients attribution.
///
/// Integrated Gradients is a path-based attribution method that computes
/// the integral of gradients along a straight line path from a baseline
/// to the input. This satisfies important axioms like sensitivity and
/// implementation invariance.
///
/// Reference: Sundararajan et al., "Axiomatic Attribution for Deep Networks", ICML 2017.
///
/// # Arguments
///
/// * `input` - End point of the path (batch, channels, height, width)
/// * `baseline` - Start point of the same shape, typically zeros
/// * `capture` - Evaluates a stack of path points and returns them with
///   their gradients. Points are model inputs for input attribution and
///   layer activations for layer attribution.
/// * `config` - Configuration for the method
///
/// # Returns
///
/// Signed attribution of the captured tensor's shape:
/// `(a(input) - a(baseline)) * mean gradient along the path`.
///
/// # Example
///
/// ```rust,ignore
/// use autoxai_explain::attribution::{integrated_gradients, IntegratedGradientsConfig};
/// use autoxai_explain::capture::capture_input;
///
/// let config = IntegratedGradientsConfig::default();
/// let attribution = integrated_gradients(&input, &baseline, |x| capture_input(&model, x, 0), &config)?;
/// ```
pub fn integrated_gradients<B, F>(
    input: &Tensor<B, 4>,
    baseline: &Tensor<B, 4>,
    mut capture: F,
    config: &IntegratedGradientsConfig,
) -> Result<AttributionMap<B>>
where
    B: Backend,
    F: FnMut(Tensor<B, 4>) -> Result<LayerCapture<B>>,
{
    config.validate()?;
    if input.dims() != baseline.dims() {
        return Err(ExplainError::InvalidConfig(format!(
            "baseline shape {:?} does not match input shape {:?}",
            baseline.dims(),
            input.dims()
        )));
    }

    let [batch_size, _, _, _] = input.dims();
    let n_steps = config.n_steps;
    let steps_per_pass = config
        .internal_batch_size
        .map(|size| (size / batch_size.max(1)).max(1))
        .unwrap_or(n_steps + 1);

    // Compute the difference (input - baseline)
    let diff = input.clone() - baseline.clone();

    let steps: Vec<usize> = (0..=n_steps).collect();
    let mut integral: Option<Tensor<B, 4>> = None;
    let mut start: Option<Tensor<B, 4>> = None;
    let mut end: Option<Tensor<B, 4>> = None;

    for chunk in steps.chunks(steps_per_pass) {
        // Interpolated inputs: baseline + alpha * (input - baseline), stacked on the batch axis
        let scaled = chunk
            .iter()
            .map(|&step| baseline.clone() + diff.clone() * (step as f32 / n_steps as f32))
            .collect::<Vec<_>>();
        let captured = capture(Tensor::cat(scaled, 0))?;

        for (offset, &step) in chunk.iter().enumerate() {
            let grads = captured.gradient.clone().narrow(0, offset * batch_size, batch_size);

            // Trapezoidal rule: weight endpoints by 0.5
            let weight = if step == 0 || step == n_steps { 0.5 } else { 1.0 };
            integral = Some(match integral {
                Some(acc) => acc + grads * weight,
                None => grads * weight,
            });

            if step == 0 {
                start = Some(captured.activation.clone().narrow(0, offset * batch_size, batch_size));
            }
            if step == n_steps {
                end = Some(captured.activation.clone().narrow(0, offset * batch_size, batch_size));
            }
        }
    }

    let missing = || ExplainError::MissingGradient("integration path".to_string());
    let integral = integral.ok_or_else(missing)?;
    let delta = end.ok_or_else(missing)? - start.ok_or_else(missing)?;

    // Scale by step size and multiply by the activation difference
    let attribution = delta * integral / n_steps as f32;

    Ok(AttributionMap::new(attribution, AttributionMethod::IntegratedGradients))
}

/// Integrated Gradients attributed to the output of `layer`.
///
/// The path runs in activation space, from the layer's activation on the
/// baseline to its activation on the input, and the rest of the network is
/// evaluated from each point. Attributions sum to the change in the target
/// score.
pub fn layer_integrated_gradients<B, M>(
    model: &M,
    input: &Tensor<B, 4>,
    baseline: &Tensor<B, 4>,
    layer: &str,
    target: usize,
    config: &IntegratedGradientsConfig,
) -> Result<AttributionMap<B>>
where
    B: XaiBackend,
    M: XaiModel<B>,
{
    if input.dims() != baseline.dims() {
        return Err(ExplainError::InvalidConfig(format!(
            "baseline shape {:?} does not match input shape {:?}",
            baseline.dims(),
            input.dims()
        )));
    }

    let end = layer_activation(model, input.clone(), layer)?;
    let start = layer_activation(model, baseline.clone(), layer)?;
    let map = integrated_gradients(
        &end,
        &start,
        |points| capture_from_layer(model, points, layer, target),
        config,
    )?;
    Ok(map.with_target_class(target))
}
