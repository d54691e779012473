//! Layer-wise Relevance Propagation.

use burn::prelude::*;

use super::{AttributionMap, AttributionMethod};
use crate::capture::LayerCapture;

/// Compute LRP-0 relevance of a captured tensor.
///
/// For networks made of linear maps and rectifiers, propagating relevance
/// with the basic LRP-0 rule from the target score down to a tensor gives
/// exactly activation × gradient at that tensor (Ancona et al., "Towards
/// better understanding of gradient-based attribution methods", ICLR 2018).
/// Capture at the input for pixel relevance, at a layer for neuron relevance.
///
/// Models with other non-linearities after the captured tensor get the
/// gradient × input approximation of their relevance.
pub fn lrp<B: Backend>(capture: LayerCapture<B>) -> AttributionMap<B> {
    AttributionMap::new(capture.activation * capture.gradient, AttributionMethod::Lrp)
}
