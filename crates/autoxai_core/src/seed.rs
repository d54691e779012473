//! Reproducible randomness for noise-based attribution.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// A seed for the random parts of an explanation.
///
/// Noise Tunnel and Gradient SHAP perturb the input with Gaussian noise and
/// sample path positions. Fixing the seed makes two runs on the same input
/// produce identical attributions.
///
/// # Example
///
/// ```rust
/// use autoxai_core::Seed;
/// use rand::Rng;
///
/// let mut rng = Seed::new(42).to_rng();
/// let mut rng2 = Seed::new(42).to_rng();
///
/// let alpha: f32 = rng.gen();
/// let alpha2: f32 = rng2.gen();
/// assert_eq!(alpha, alpha2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seed(u64);

impl Seed {
    /// Create a new seed with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Create a seed from the current system time.
    #[must_use]
    pub fn from_entropy() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self(nanos)
    }

    /// Get the underlying seed value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Create a random number generator for host-side sampling
    /// (interpolation coefficients, baseline draws).
    #[must_use]
    pub fn to_rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.0)
    }

    /// Derive an independent seed for a named random stream.
    ///
    /// # Example
    ///
    /// ```rust
    /// use autoxai_core::Seed;
    ///
    /// let master = Seed::new(42);
    /// assert_ne!(master.derive("noise").value(), master.derive("alpha").value());
    /// ```
    #[must_use]
    pub fn derive(&self, key: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        self.0.hash(&mut hasher);
        key.hash(&mut hasher);
        Self(hasher.finish())
    }
}

/// Draw `n` samples from a zero-mean normal distribution with standard
/// deviation `std`, using the Box-Muller transform.
pub fn sample_normal<R: Rng + ?Sized>(rng: &mut R, n: usize, std: f32) -> Vec<f32> {
    let mut samples = Vec::with_capacity(n + 1);
    while samples.len() < n {
        // 1 - U keeps the log argument in (0, 1]
        let u1: f32 = 1.0 - rng.gen::<f32>();
        let u2: f32 = rng.gen();
        let radius = (-2.0 * u1.ln()).sqrt() * std;
        let angle = 2.0 * std::f32::consts::PI * u2;
        samples.push(radius * angle.cos());
        samples.push(radius * angle.sin());
    }
    samples.truncate(n);
    samples
}

impl Default for Seed {
    fn default() -> Self {
        Self::new(0)
    }
}

impl From<u64> for Seed {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}
