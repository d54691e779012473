//! Run explainers alongside inference.
//!
//! [`AutoXaiExplainer`] holds the explainers to run and the model to run
//! them on. Entering it yields an [`XaiSession`], which runs the forward
//! pass once per call and then every explainer on the same input.
//!
//! # Example
//!
//! ```rust,ignore
//! use autoxai_explain::{AutoXaiExplainer, Explainers};
//!
//! let explainer = AutoXaiExplainer::new(&mut model, &[Explainers::NoiseTunnel], 0)?;
//! let (output, explanations) = explainer.run(|session| session.explain(input))?;
//! let map = &explanations["CV_NOISE_TUNNEL_EXPLAINER"];
//! ```

use std::collections::BTreeMap;
use std::time::Instant;

use autoxai_core::{CoreError, ImageShape, XaiBackend, XaiModel};
use burn::prelude::*;

use crate::config::XaiConfig;
use crate::error::{ExplainError, Result};
use crate::explainer::{CvExplainer, Explainers};

/// Attribution tensors keyed by explainer name, e.g. `CV_NOISE_TUNNEL_EXPLAINER`.
pub type Explanations<B> = BTreeMap<String, Tensor<B, 4>>;

type ExplainerMap<B, M> = BTreeMap<Explainers, Box<dyn CvExplainer<B, M>>>;

/// Explainers bound to a caller-owned model.
///
/// Requesting the same explainer twice runs it once.
pub struct AutoXaiExplainer<'a, B: XaiBackend, M: XaiModel<B>> {
    model: &'a mut M,
    explainer_map: ExplainerMap<B, M>,
    target: usize,
}

impl<'a, B: XaiBackend, M: XaiModel<B>> AutoXaiExplainer<'a, B, M> {
    /// Create the explainers with default parameters.
    ///
    /// # Arguments
    ///
    /// * `model` - The model to explain
    /// * `explainers` - Explainers to run on every call
    /// * `target` - Output index to explain
    ///
    /// # Errors
    ///
    /// [`ExplainError::NoExplainers`] if `explainers` is empty.
    pub fn new(model: &'a mut M, explainers: &[Explainers], target: usize) -> Result<Self> {
        Self::from_config(model, &XaiConfig::new(explainers.iter().copied()).with_target(target))
    }

    /// Like [`AutoXaiExplainer::new`], with algorithm parameters from `config`.
    ///
    /// The explainer list and target of `config` are ignored.
    pub fn with_config(
        model: &'a mut M,
        explainers: &[Explainers],
        target: usize,
        config: &XaiConfig,
    ) -> Result<Self> {
        let config = XaiConfig {
            explainers: explainers.to_vec(),
            target,
            ..config.clone()
        };
        Self::from_config(model, &config)
    }

    /// Create the explainers, list and target included, from `config`.
    pub fn from_config(model: &'a mut M, config: &XaiConfig) -> Result<Self> {
        if config.explainers.is_empty() {
            return Err(ExplainError::NoExplainers);
        }
        config.validate()?;

        let explainer_map = config
            .explainers
            .iter()
            .map(|kind| (*kind, kind.create::<B, M>(config)))
            .collect();

        Ok(Self {
            model,
            explainer_map,
            target: config.target,
        })
    }

    /// Explainers that will run, in order.
    pub fn explainers(&self) -> Vec<Explainers> {
        self.explainer_map.keys().copied().collect()
    }

    /// Output index being explained.
    pub fn target(&self) -> usize {
        self.target
    }

    /// The wrapped model.
    pub fn model(&self) -> &M {
        &*self.model
    }

    /// Put the model in evaluation mode and start a session.
    ///
    /// A model left in training mode is switched to evaluation mode with a
    /// warning.
    pub fn enter(self) -> XaiSession<'a, B, M> {
        if self.model.is_training() {
            tracing::warn!("The model should be in the eval model. Toggling it to eval mode right now.");
            self.model.eval();
        }
        XaiSession {
            model: self.model,
            explainer_map: self.explainer_map,
            target: self.target,
        }
    }

    /// Enter, run `f` with the session, and leave.
    pub fn run<R>(self, f: impl FnOnce(&mut XaiSession<'a, B, M>) -> R) -> R {
        let mut session = self.enter();
        f(&mut session)
    }
}

/// An entered [`AutoXaiExplainer`]. The model is in evaluation mode.
pub struct XaiSession<'a, B: XaiBackend, M: XaiModel<B>> {
    model: &'a mut M,
    explainer_map: ExplainerMap<B, M>,
    target: usize,
}

impl<'a, B: XaiBackend, M: XaiModel<B>> XaiSession<'a, B, M> {
    /// Run the model and every explainer.
    ///
    /// Explainers support models with exactly one input tensor.
    ///
    /// # Errors
    ///
    /// [`ExplainError::MultipleInputs`] unless `inputs` holds one tensor,
    /// otherwise the first error raised by an explainer.
    pub fn call(&mut self, inputs: &[Tensor<B, 4>]) -> Result<(Tensor<B, 2>, Explanations<B>)> {
        match inputs {
            [input] => self.explain(input.clone()),
            _ => Err(ExplainError::MultipleInputs(inputs.len())),
        }
    }

    /// Run the model and every explainer on a single input.
    ///
    /// # Returns
    ///
    /// The model output and one attribution tensor per explainer.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidShape`] if any dimension of `input` is zero.
    pub fn explain(&mut self, input: Tensor<B, 4>) -> Result<(Tensor<B, 2>, Explanations<B>)> {
        let shape = ImageShape::from(input.dims());
        if shape.is_empty() {
            return Err(CoreError::InvalidShape {
                expected: "non-empty (B, C, H, W) batch".to_string(),
                got: shape.to_string(),
            }
            .into());
        }
        tracing::debug!("Explaining input {}", shape);

        let output = self.model.forward(input.clone().detach()).detach();

        let mut explanations = Explanations::new();
        for (kind, explainer) in &self.explainer_map {
            let start = Instant::now();
            let attributions = explainer.calculate_features(&*self.model, input.clone(), self.target)?;
            tracing::debug!(
                "{} computed {:?} attributions in {}ms",
                kind,
                attributions.dims(),
                start.elapsed().as_millis()
            );
            explanations.insert(kind.name().to_string(), attributions);
        }

        Ok((output, explanations))
    }

    /// The wrapped model.
    pub fn model(&self) -> &M {
        &*self.model
    }

    /// Output index being explained.
    pub fn target(&self) -> usize {
        self.target
    }
}

impl<B: XaiBackend, M: XaiModel<B>> Drop for XaiSession<'_, B, M> {
    fn drop(&mut self) {
        tracing::trace!("Leaving explanation session with {} explainer(s)", self.explainer_map.len());
    }
}
