//! # autoxai_models
//!
//! Small image classifiers implementing [`autoxai_core::XaiModel`].
//!
//! - [`SampleModel`] - single strided convolution with a sigmoid head
//! - [`SimpleCnn`] - two convolutions, global pooling and a multi-class head
//!
//! Both keep an explicit training flag: dropout is only applied while the
//! flag is set, independent of the backend.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod cnn;
mod sample;

pub use cnn::{SimpleCnn, SimpleCnnConfig};
pub use sample::{SampleModel, SampleModelConfig};
