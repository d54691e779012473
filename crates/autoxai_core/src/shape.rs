//! Image batch shape metadata.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Shape metadata for image batches.
///
/// Follows the convention `(B, C, H, W)`.
///
/// # Example
///
/// ```rust
/// use autoxai_core::ImageShape;
///
/// let shape = ImageShape::new(2, 3, 32, 32);
/// assert_eq!(shape.batch(), 2);
/// assert_eq!(shape.spatial(), [32, 32]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageShape {
    batch: usize,
    channels: usize,
    height: usize,
    width: usize,
}

impl ImageShape {
    /// Create a new shape.
    #[must_use]
    pub const fn new(batch: usize, channels: usize, height: usize, width: usize) -> Self {
        Self {
            batch,
            channels,
            height,
            width,
        }
    }

    /// Batch size.
    #[must_use]
    pub const fn batch(&self) -> usize {
        self.batch
    }

    /// Number of channels.
    #[must_use]
    pub const fn channels(&self) -> usize {
        self.channels
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// `[height, width]`.
    #[must_use]
    pub const fn spatial(&self) -> [usize; 2] {
        [self.height, self.width]
    }

    /// Check if any dimension is zero.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.batch == 0 || self.channels == 0 || self.height == 0 || self.width == 0
    }

    /// Whether every dimension is at most the same dimension of `other`.
    #[must_use]
    pub const fn fits_within(&self, other: &Self) -> bool {
        self.batch <= other.batch
            && self.channels <= other.channels
            && self.height <= other.height
            && self.width <= other.width
    }

    /// Error for a tensor of this shape where `expected` was required.
    #[must_use]
    pub fn mismatch(&self, expected: &Self) -> CoreError {
        CoreError::InvalidShape {
            expected: expected.to_string(),
            got: self.to_string(),
        }
    }

    /// Convert to an array.
    #[must_use]
    pub const fn as_array(&self) -> [usize; 4] {
        [self.batch, self.channels, self.height, self.width]
    }
}

impl From<[usize; 4]> for ImageShape {
    fn from(dims: [usize; 4]) -> Self {
        Self::new(dims[0], dims[1], dims[2], dims[3])
    }
}

impl std::fmt::Display for ImageShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(B={}, C={}, H={}, W={})",
            self.batch, self.channels, self.height, self.width
        )
    }
}
