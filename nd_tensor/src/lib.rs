//! # nd_tensor - Strided Tensors with Device-Dispatched Kernels
//!
//! This crate provides a dense n-d tensor handle, shape broadcasting, and the
//! 3-vector cross product operator routed to pluggable per-device kernels.
//!
//! ## Overview
//!
//! The core abstractions are:
//! - [`Shape`], [`Strides`] and [`Layout`] - Tensor shape and memory layout
//! - [`Tensor`] - Shared-storage handle with device tag and dtype
//! - [`CrossKernel`] - Trait for backends implementing the cross product
//! - [`cross`] and friends - Axis resolution, broadcasting, output handling
//!   and dispatch
//!
//! Backends (`nd_backend_cpu`, `nd_backend_metal`) register their kernels at
//! startup; calls on a device without a kernel fail with
//! [`TensorError::UnsupportedDevice`].
//!
//! ## Example
//!
//! ```ignore
//! use nd_tensor::prelude::*;
//!
//! nd_backend_cpu::register();
//!
//! let a = Tensor::from_vec(vec![1.0f32, 2.0, 3.0], vec![3])?;
//! let b = Tensor::from_vec(vec![4.0f32, 5.0, 6.0, 7.0, 8.0, 9.0], vec![2, 3])?;
//!
//! // [3] broadcasts against [2, 3]
//! let c = cross_on_axis(&a, &b, -1)?;
//! assert_eq!(c.dims(), &[2, 3]);
//! ```

pub mod cross;
pub mod device;
pub mod error;
pub mod kernel;
pub mod shape;
pub mod tensor;

pub use cross::{
    cross, cross_into, cross_on_axis, cross_on_axis_into, execute, execute_in, prepare,
    resolve_axis, OutputPlan, PreparedCross,
};
pub use device::{DType, Device, Element, TensorOptions};
pub use error::{Result, TensorError};
pub use kernel::{
    cross_kernel, global_registry, register_cross_kernel, registered_devices, CrossKernel,
    KernelRegistry,
};
pub use shape::{infer_broadcast_shape, wrap_dim, Layout, Shape, Strides};
pub use tensor::{Storage, Tensor};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::cross::{cross, cross_into, cross_on_axis, cross_on_axis_into};
    pub use crate::device::{DType, Device, Element, TensorOptions};
    pub use crate::error::{Result, TensorError};
    pub use crate::kernel::CrossKernel;
    pub use crate::shape::{Shape, Strides};
    pub use crate::tensor::Tensor;
}
