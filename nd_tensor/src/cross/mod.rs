//! Cross product of 3-vectors along one axis, with broadcasting.
//!
//! A call runs in three steps:
//! 1. [`prepare`] resolves the axis, broadcasts the operands and checks that
//!    the axis has extent 3;
//! 2. [`OutputPlan`] decides whether the output is allocated, resized (with a
//!    warning) or reused;
//! 3. the [`CrossKernel`](crate::kernel::CrossKernel) registered for the
//!    output's device writes the result.
//!
//! All validation happens before the output is touched, so a failed call
//! leaves it unchanged.
//!
//! ## Example
//!
//! ```ignore
//! use nd_tensor::prelude::*;
//!
//! nd_backend_cpu::register();
//!
//! let a = Tensor::from_vec(vec![1.0f32, 0.0, 0.0], vec![3])?;
//! let b = Tensor::from_vec(vec![0.0f32, 1.0, 0.0], vec![3])?;
//! let c = cross(&a, &b, None)?;
//! assert_eq!(c.to_vec::<f32>()?, vec![0.0, 0.0, 1.0]);
//! ```

mod axis;
mod output;
mod prepare;

use std::sync::Arc;

pub use axis::resolve_axis;
pub use output::OutputPlan;
pub use prepare::{prepare, PreparedCross};

use crate::device::Device;
use crate::error::{Result, TensorError};
use crate::kernel::{cross_kernel, CrossKernel, KernelRegistry};
use crate::tensor::Tensor;

/// Cross product into a newly allocated tensor.
///
/// With `dim == None` the first dimension of extent 3 in `input` is used.
pub fn cross(input: &Tensor, other: &Tensor, dim: Option<i64>) -> Result<Tensor> {
    let mut out = Tensor::empty(vec![0], input.options());
    cross_into(input, other, dim, &mut out)?;
    Ok(out)
}

/// Cross product written into `out`, which is resized if needed.
pub fn cross_into<'a>(
    input: &Tensor,
    other: &Tensor,
    dim: Option<i64>,
    out: &'a mut Tensor,
) -> Result<&'a mut Tensor> {
    let prepared = prepare(input, other, dim)?;
    execute(&prepared, out)
}

/// Cross product along an explicit axis (negative counts from the end).
pub fn cross_on_axis(input: &Tensor, other: &Tensor, dim: i64) -> Result<Tensor> {
    cross(input, other, Some(dim))
}

/// Cross product along an explicit axis, written into `out`.
pub fn cross_on_axis_into<'a>(
    input: &Tensor,
    other: &Tensor,
    dim: i64,
    out: &'a mut Tensor,
) -> Result<&'a mut Tensor> {
    cross_into(input, other, Some(dim), out)
}

/// Run prepared operands through the globally registered kernel for
/// `out.device()`.
pub fn execute<'a>(prepared: &PreparedCross, out: &'a mut Tensor) -> Result<&'a mut Tensor> {
    execute_with(cross_kernel, prepared, out)
}

/// Like [`execute`], but looks the kernel up in `registry`.
pub fn execute_in<'a>(
    registry: &KernelRegistry,
    prepared: &PreparedCross,
    out: &'a mut Tensor,
) -> Result<&'a mut Tensor> {
    execute_with(|device| registry.get(device), prepared, out)
}

fn execute_with<'a, F>(
    lookup: F,
    prepared: &PreparedCross,
    out: &'a mut Tensor,
) -> Result<&'a mut Tensor>
where
    F: FnOnce(Device) -> Result<Arc<dyn CrossKernel>>,
{
    if out.dtype() != prepared.input.dtype() {
        return Err(TensorError::DTypeMismatch {
            expected: prepared.input.dtype(),
            actual: out.dtype(),
        });
    }
    if out.device() != prepared.input.device() {
        return Err(TensorError::DeviceMismatch {
            expected: prepared.input.device(),
            actual: out.device(),
        });
    }

    let plan = OutputPlan::decide(out, &prepared.out_shape);
    plan.check(out)?;
    let kernel = lookup(out.device())?;

    plan.apply(out, &prepared.out_shape);
    if out.is_empty() {
        return Ok(out);
    }

    log::trace!("dispatching cross to '{}' on {}", kernel.name(), out.device());
    kernel.cross(out, &prepared.input, &prepared.other, prepared.dim)?;
    Ok(out)
}

impl Tensor {
    /// `self × other`; see [`cross`].
    pub fn cross(&self, other: &Tensor, dim: Option<i64>) -> Result<Tensor> {
        cross(self, other, dim)
    }

    /// `self × other` along an explicit axis; see [`cross_on_axis`].
    pub fn cross_on_axis(&self, other: &Tensor, dim: i64) -> Result<Tensor> {
        cross_on_axis(self, other, dim)
    }
}
