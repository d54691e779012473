//! # autoxai_core
//!
//! Core types and traits for autoxai explainability.
//!
//! This crate provides:
//! - [`XaiModel`], the contract a classifier fulfils to be explained
//! - [`XaiBackend`] and [`guided_relu`] for guided backpropagation
//! - [`ImageShape`] for image batch shape metadata
//! - [`Seed`] for reproducible noise and baseline sampling
//! - Error types and common utilities
//!
//! ## Shape Convention
//!
//! Image batches follow the convention `(B, C, H, W)`:
//! - `B`: Batch size (number of images)
//! - `C`: Channels
//! - `H`, `W`: Height and width in pixels
//!
//! ## Example
//!
//! ```rust,ignore
//! use autoxai_core::{ImageShape, Seed};
//!
//! let seed = Seed::new(42);
//! let shape = ImageShape::new(1, 1, 224, 224);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod guided;
mod model_trait;
mod seed;
mod shape;

pub use error::{CoreError, Result};
pub use guided::{guided_relu, XaiBackend};
pub use model_trait::{LayerInfo, LayerKind, XaiModel};
pub use seed::{sample_normal, Seed};
pub use shape::ImageShape;

/// Backend type aliases for convenience
pub mod backend {
    pub use burn_autodiff::Autodiff;

    #[cfg(feature = "backend-ndarray")]
    pub use burn_ndarray::NdArray;
}
