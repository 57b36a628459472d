//! Error type shared by tensor construction, validation and dispatch.

use thiserror::Error;

use crate::device::{DType, Device};
use crate::shape::{Shape, Strides};

/// Errors raised by tensor operations.
///
/// Every variant is a usage error: it is returned before any kernel runs, so a
/// failed call never leaves an output partially written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TensorError {
    /// No dimension of extent 3 to infer the cross-product axis from.
    #[error("no dimension of size 3 in input of shape {shape}")]
    NoSuitableAxis { shape: Shape },

    /// Shapes cannot be broadcast together.
    #[error("shapes {lhs} and {rhs} are not broadcast compatible")]
    ShapeMismatch { lhs: Shape, rhs: Shape },

    /// Axis falls outside `[-rank, rank)`.
    #[error("dimension {axis} out of range for tensor of rank {rank}")]
    AxisOutOfRange { axis: i64, rank: usize },

    /// Axis is valid but its extent is not 3.
    #[error("dimension {axis} does not have size 3 (found {extent})")]
    InvalidAxisExtent { axis: i64, extent: usize },

    /// No kernel registered for the device.
    #[error("no cross kernel registered for device {0}")]
    UnsupportedDevice(Device),

    #[error("expected dtype {expected}, found {actual}")]
    DTypeMismatch { expected: DType, actual: DType },

    #[error("expected tensor on device {expected}, found {actual}")]
    DeviceMismatch { expected: Device, actual: Device },

    /// Output has several indices mapping to the same element.
    #[error("output of shape {shape} with strides {strides:?} has overlapping elements")]
    InternalOverlap { shape: Shape, strides: Strides },

    #[error("data length {actual} doesn't match shape numel {expected}")]
    DataLength { expected: usize, actual: usize },

    /// The backend failed while running a kernel (device lost, shader build).
    #[error("{device} kernel failed: {message}")]
    Kernel { device: Device, message: String },
}

/// Result alias for tensor operations.
pub type Result<T> = std::result::Result<T, TensorError>;
