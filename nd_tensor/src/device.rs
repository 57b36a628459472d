//! Device tags, element types and tensor creation options.

use std::fmt;

use num_traits::Float;

use crate::tensor::Storage;

/// Device a tensor is bound to.
///
/// The set is closed: each backend crate registers a kernel for the tag it
/// serves, and dispatch looks the tag up at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
    Metal,
}

impl Device {
    pub const ALL: [Device; 3] = [Device::Cpu, Device::Cuda, Device::Metal];

    pub fn name(&self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
            Device::Metal => "metal",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Element type of a tensor's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DType {
    #[default]
    F32,
    F64,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => f.write_str("f32"),
            DType::F64 => f.write_str("f64"),
        }
    }
}

/// Device and dtype a new tensor is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TensorOptions {
    pub device: Device,
    pub dtype: DType,
}

impl TensorOptions {
    pub fn new(device: Device, dtype: DType) -> Self {
        TensorOptions { device, dtype }
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }
}

/// Scalar types a tensor can hold.
///
/// Implemented for `f32` and `f64`. Kernels are written once, generic over
/// this trait, and monomorphized per dtype.
pub trait Element: Float + fmt::Debug + Send + Sync + 'static {
    const DTYPE: DType;

    /// Wrap a vector as tensor storage.
    fn into_storage(data: Vec<Self>) -> Storage;

    /// Borrow storage as a typed slice, `None` if the dtype differs.
    fn slice(storage: &Storage) -> Option<&[Self]>;

    /// Mutably borrow storage as a typed slice, `None` if the dtype differs.
    fn slice_mut(storage: &mut Storage) -> Option<&mut [Self]>;
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;

    fn into_storage(data: Vec<Self>) -> Storage {
        Storage::F32(data)
    }

    fn slice(storage: &Storage) -> Option<&[Self]> {
        match storage {
            Storage::F32(data) => Some(data),
            _ => None,
        }
    }

    fn slice_mut(storage: &mut Storage) -> Option<&mut [Self]> {
        match storage {
            Storage::F32(data) => Some(data),
            _ => None,
        }
    }
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;

    fn into_storage(data: Vec<Self>) -> Storage {
        Storage::F64(data)
    }

    fn slice(storage: &Storage) -> Option<&[Self]> {
        match storage {
            Storage::F64(data) => Some(data),
            _ => None,
        }
    }

    fn slice_mut(storage: &mut Storage) -> Option<&mut [Self]> {
        match storage {
            Storage::F64(data) => Some(data),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_names() {
        assert_eq!(Device::Cpu.to_string(), "cpu");
        assert_eq!(Device::Metal.to_string(), "metal");
        assert_eq!(Device::default(), Device::Cpu);
        assert_eq!(Device::ALL.len(), 3);
    }

    #[test]
    fn test_options_builder() {
        let opts = TensorOptions::default()
            .with_device(Device::Cuda)
            .with_dtype(DType::F64);
        assert_eq!(opts, TensorOptions::new(Device::Cuda, DType::F64));
        assert_eq!(opts.dtype, DType::F64);
    }

    #[test]
    fn test_element_storage_roundtrip_rejects_other_dtype() {
        let storage = f32::into_storage(vec![1.0, 2.0]);
        assert_eq!(f32::slice(&storage), Some(&[1.0f32, 2.0][..]));
        assert!(f64::slice(&storage).is_none());
    }
}
