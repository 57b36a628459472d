//! Broadcasting and validation of cross-product operands.

use crate::cross::axis::resolve_axis;
use crate::error::{Result, TensorError};
use crate::shape::{infer_broadcast_shape, wrap_dim, Shape};
use crate::tensor::Tensor;

/// Operands that passed validation, ready for dispatch.
///
/// `input` and `other` both have shape `out_shape`; either may be a stride-0
/// view of the caller's tensor.
#[derive(Debug, Clone)]
pub struct PreparedCross {
    pub input: Tensor,
    pub other: Tensor,
    /// Non-negative cross-product axis.
    pub dim: usize,
    pub out_shape: Shape,
}

/// Broadcast the operands and validate the cross-product axis.
///
/// With `dim == None` the axis is inferred from `input`'s own shape. The
/// resolved axis is then wrapped against the rank of the broadcast shape and
/// must have extent 3. Neither operand is modified.
pub fn prepare(input: &Tensor, other: &Tensor, dim: Option<i64>) -> Result<PreparedCross> {
    if other.dtype() != input.dtype() {
        return Err(TensorError::DTypeMismatch {
            expected: input.dtype(),
            actual: other.dtype(),
        });
    }
    if other.device() != input.device() {
        return Err(TensorError::DeviceMismatch {
            expected: input.device(),
            actual: other.device(),
        });
    }

    let requested = resolve_axis(dim, input.dims())?;
    let out_shape = infer_broadcast_shape(input.shape(), other.shape())?;

    let input_b = broadcast_operand(input, &out_shape)?;
    let other_b = broadcast_operand(other, &out_shape)?;

    let dim = wrap_dim(requested, out_shape.ndim())?;
    let extent = input_b.shape().dim(dim);
    if extent != 3 {
        return Err(TensorError::InvalidAxisExtent {
            axis: requested,
            extent,
        });
    }

    log::trace!(
        "cross: {} x {} -> {} along dim {}",
        input.shape(),
        other.shape(),
        out_shape,
        dim
    );

    Ok(PreparedCross {
        input: input_b,
        other: other_b,
        dim,
        out_shape,
    })
}

/// The tensor itself when it already has `shape`, else a broadcast view.
fn broadcast_operand(x: &Tensor, shape: &Shape) -> Result<Tensor> {
    if x.shape() == shape {
        Ok(x.clone())
    } else {
        x.expand(shape)
    }
}
