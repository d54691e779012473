//! Guided backpropagation.
//!
//! Guided backpropagation replaces the backward pass of every ReLU: the
//! incoming gradient is masked by the forward activation like a plain ReLU,
//! and negative gradients are dropped as well. Burn has no backward hooks,
//! so the guided ReLU is its own autodiff operation and models opt into it
//! through [`XaiModel::forward_guided`](crate::XaiModel::forward_guided).

use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::ops::FloatTensor;
use burn::tensor::{ElementConversion, TensorPrimitive};
use burn_autodiff::checkpoint::base::Checkpointer;
use burn_autodiff::checkpoint::strategy::CheckpointStrategy;
use burn_autodiff::grads::Gradients;
use burn_autodiff::ops::{unary, Backward, Ops, OpsKind};
use burn_autodiff::Autodiff;

/// Autodiff backend with the operations explanations need on top of plain
/// differentiation.
pub trait XaiBackend: AutodiffBackend {
    /// ReLU whose backward pass only lets positive gradients through
    /// positive activations.
    fn guided_relu(tensor: FloatTensor<Self>) -> FloatTensor<Self>;
}

#[derive(Debug)]
struct GuidedRelu;

impl<B: Backend> Backward<B, 1> for GuidedRelu {
    // ReLU output, positive exactly where the input is.
    type State = B::FloatTensorPrimitive;

    fn backward(self, ops: Ops<Self::State, 1>, grads: &mut Gradients, _checkpointer: &mut Checkpointer) {
        let output = ops.state;
        unary::<B, _>(ops.parents, ops.node, grads, |grad| {
            B::relu_backward(output, B::float_clamp_min(grad, 0.0.elem()))
        });
    }
}

impl<B: Backend, C: CheckpointStrategy> XaiBackend for Autodiff<B, C> {
    fn guided_relu(tensor: FloatTensor<Self>) -> FloatTensor<Self> {
        match GuidedRelu
            .prepare::<C>([tensor.node.clone()])
            .compute_bound()
            .stateful()
        {
            OpsKind::Tracked(prep) => {
                let output = B::relu(tensor.primitive);
                prep.finish(output.clone(), output)
            }
            OpsKind::UnTracked(prep) => prep.finish(B::relu(tensor.primitive)),
        }
    }
}

/// Apply a guided ReLU to a tensor.
///
/// The forward value equals `relu(x)`. Backward, the gradient reaching `x` is
/// `max(grad, 0)` where `x > 0` and zero elsewhere.
pub fn guided_relu<B: XaiBackend, const D: usize>(tensor: Tensor<B, D>) -> Tensor<B, D> {
    let primitive = tensor.into_primitive().tensor();
    Tensor::from_primitive(TensorPrimitive::Float(B::guided_relu(primitive)))
}
