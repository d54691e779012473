//! Explanation configuration.

use std::path::Path;

use autoxai_core::Seed;
use serde::{Deserialize, Serialize};

use crate::attribution::{
    GradCamConfig, GradientShapConfig, IntegratedGradientsConfig, NoiseTunnelConfig, OcclusionConfig,
};
use crate::error::{ExplainError, Result};
use crate::explainer::Explainers;

/// Which explainers to run and with which parameters.
///
/// Every section falls back to its defaults, so a configuration file only
/// needs the fields it changes:
///
/// ```json
/// {
///   "explainers": ["CV_NOISE_TUNNEL_EXPLAINER", "CV_LAYER_GRADCAM_EXPLAINER"],
///   "target": 3,
///   "seed": 42,
///   "noise_tunnel": { "nt_samples": 10, "stdevs": 0.2 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XaiConfig {
    /// Explainers to run.
    pub explainers: Vec<Explainers>,
    /// Output index to explain.
    pub target: usize,
    /// Seed for the noise based explainers. `None` draws fresh noise each run.
    pub seed: Option<Seed>,
    /// Layer for layer explainers and GuidedGradCAM. `None` uses the last
    /// convolutional layer.
    pub layer: Option<String>,
    /// Integrated Gradients, also used inside Noise Tunnel.
    pub integrated_gradients: IntegratedGradientsConfig,
    /// Noise Tunnel.
    pub noise_tunnel: NoiseTunnelConfig,
    /// Gradient SHAP.
    pub gradient_shap: GradientShapConfig,
    /// Occlusion.
    pub occlusion: OcclusionConfig,
    /// GradCAM and GuidedGradCAM.
    pub grad_cam: GradCamConfig,
}

impl Default for XaiConfig {
    fn default() -> Self {
        Self {
            explainers: Vec::new(),
            target: 0,
            seed: None,
            layer: None,
            integrated_gradients: IntegratedGradientsConfig::default(),
            noise_tunnel: NoiseTunnelConfig::default(),
            gradient_shap: GradientShapConfig::default(),
            occlusion: OcclusionConfig::default(),
            grad_cam: GradCamConfig::default(),
        }
    }
}

impl XaiConfig {
    /// Create a configuration for the given explainers with default parameters.
    pub fn new(explainers: impl IntoIterator<Item = Explainers>) -> Self {
        Self {
            explainers: explainers.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Set the target output index.
    #[must_use]
    pub fn with_target(mut self, target: usize) -> Self {
        self.target = target;
        self
    }

    /// Set the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: Seed) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the layer used by layer explainers.
    #[must_use]
    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    /// Set the Integrated Gradients parameters.
    #[must_use]
    pub fn with_integrated_gradients(mut self, config: IntegratedGradientsConfig) -> Self {
        self.integrated_gradients = config;
        self
    }

    /// Set the Noise Tunnel parameters.
    #[must_use]
    pub fn with_noise_tunnel(mut self, config: NoiseTunnelConfig) -> Self {
        self.noise_tunnel = config;
        self
    }

    /// Set the Gradient SHAP parameters.
    #[must_use]
    pub fn with_gradient_shap(mut self, config: GradientShapConfig) -> Self {
        self.gradient_shap = config;
        self
    }

    /// Set the occlusion parameters.
    #[must_use]
    pub fn with_occlusion(mut self, config: OcclusionConfig) -> Self {
        self.occlusion = config;
        self
    }

    /// Set the GradCAM parameters.
    #[must_use]
    pub fn with_grad_cam(mut self, config: GradCamConfig) -> Self {
        self.grad_cam = config;
        self
    }

    /// Check every parameter section.
    ///
    /// # Errors
    ///
    /// [`ExplainError::NoExplainers`] for an empty explainer list,
    /// [`ExplainError::InvalidConfig`] for out-of-range parameters.
    pub fn validate(&self) -> Result<()> {
        if self.explainers.is_empty() {
            return Err(ExplainError::NoExplainers);
        }
        self.integrated_gradients.validate()?;
        self.noise_tunnel.validate()?;
        self.gradient_shap.validate()?;
        self.occlusion.validate()?;
        Ok(())
    }

    /// Parse from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Save to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::NoiseTunnelType;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = XaiConfig::from_json_str(
            r#"{
                "explainers": ["CV_NOISE_TUNNEL_EXPLAINER"],
                "target": 2,
                "seed": 42,
                "noise_tunnel": { "nt_type": "vargrad", "nt_samples": 10 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.explainers, vec![Explainers::NoiseTunnel]);
        assert_eq!(config.target, 2);
        assert_eq!(config.seed, Some(Seed::new(42)));
        assert_eq!(config.noise_tunnel.nt_type, NoiseTunnelType::Vargrad);
        assert_eq!(config.noise_tunnel.nt_samples, 10);
        assert_eq!(config.noise_tunnel.stdevs, 1.0);
        assert_eq!(config.integrated_gradients, IntegratedGradientsConfig::default());
        assert!(config.layer.is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let config = XaiConfig::new([Explainers::Lrp, Explainers::LayerGradCam])
            .with_target(1)
            .with_seed(Seed::new(7))
            .with_layer("conv2")
            .with_occlusion(OcclusionConfig::default().with_sliding_window([3, 8, 8]));

        let json = config.to_json_string().unwrap();
        assert!(json.contains("CV_LAYER_GRADCAM_EXPLAINER"));
        assert_eq!(XaiConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_validate() {
        assert!(matches!(XaiConfig::default().validate(), Err(ExplainError::NoExplainers)));
        assert!(XaiConfig::new([Explainers::Occlusion]).validate().is_ok());

        let bad = XaiConfig::new([Explainers::Occlusion])
            .with_integrated_gradients(IntegratedGradientsConfig::default().with_n_steps(0));
        assert!(matches!(bad.validate(), Err(ExplainError::InvalidConfig(_))));
    }

    #[test]
    fn test_unknown_explainer_in_json() {
        let result = XaiConfig::from_json_str(r#"{ "explainers": ["CV_SALIENCY_EXPLAINER"] }"#);
        assert!(matches!(result, Err(ExplainError::Serialization(_))));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("autoxai_config_{}.json", std::process::id()));
        let config = XaiConfig::new([Explainers::GradientShap]).with_seed(Seed::new(3));

        config.save(&path).unwrap();
        let loaded = XaiConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, config);
    }
}
