//! Tensor handle: strided view over shared, host-resident storage.

use std::sync::Arc;

use crate::device::{DType, Device, Element, TensorOptions};
use crate::error::{Result, TensorError};
use crate::shape::{Layout, Shape, Strides};

/// Flat element buffer backing one or more tensors.
#[derive(Clone, Debug, PartialEq)]
pub enum Storage {
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl Storage {
    /// Zero-filled storage of `len` elements.
    pub fn zeros(dtype: DType, len: usize) -> Self {
        match dtype {
            DType::F32 => Storage::F32(vec![0.0; len]),
            DType::F64 => Storage::F64(vec![0.0; len]),
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            Storage::F32(_) => DType::F32,
            Storage::F64(_) => DType::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Storage::F32(data) => data.len(),
            Storage::F64(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grow (zero-filled) or truncate in place.
    pub fn resize(&mut self, len: usize) {
        match self {
            Storage::F32(data) => data.resize(len, 0.0),
            Storage::F64(data) => data.resize(len, 0.0),
        }
    }

    fn as_ptr(&self) -> *const u8 {
        match self {
            Storage::F32(data) => data.as_ptr() as *const u8,
            Storage::F64(data) => data.as_ptr() as *const u8,
        }
    }
}

/// A dense n-d array handle.
///
/// Cloning a tensor or taking a view (`expand`, `to_device`) shares storage.
/// Writes go through [`Tensor::storage_mut`], which copies the storage first
/// if another handle still references it, so views are never changed behind
/// their owner's back.
///
/// Storage always lives in host memory; the device tag selects which
/// registered kernel computes on it.
#[derive(Clone, Debug)]
pub struct Tensor {
    storage: Arc<Storage>,
    shape: Shape,
    strides: Strides,
    offset: usize,
    device: Device,
}

impl Tensor {
    /// Create a contiguous CPU tensor from data and shape.
    pub fn from_vec<T: Element>(data: Vec<T>, shape: impl Into<Shape>) -> Result<Self> {
        let shape = shape.into();
        if data.len() != shape.numel() {
            return Err(TensorError::DataLength {
                expected: shape.numel(),
                actual: data.len(),
            });
        }
        Ok(Tensor {
            storage: Arc::new(T::into_storage(data)),
            strides: shape.contiguous_strides(),
            shape,
            offset: 0,
            device: Device::Cpu,
        })
    }

    /// Allocate a zero-filled contiguous tensor.
    pub fn empty(shape: impl Into<Shape>, options: TensorOptions) -> Self {
        let shape = shape.into();
        Tensor {
            storage: Arc::new(Storage::zeros(options.dtype, shape.numel())),
            strides: shape.contiguous_strides(),
            shape,
            offset: 0,
            device: options.device,
        }
    }

    // === Queries ===

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// True when the tensor holds no elements.
    pub fn is_empty(&self) -> bool {
        self.numel() == 0
    }

    pub fn strides(&self) -> &Strides {
        &self.strides
    }

    /// Storage offset of the first element.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Options matching this tensor, for allocating siblings.
    pub fn options(&self) -> TensorOptions {
        TensorOptions::new(self.device, self.dtype())
    }

    pub fn layout(&self) -> Layout<'_> {
        Layout::new(&self.shape, &self.strides, self.offset)
    }

    pub fn is_contiguous(&self) -> bool {
        self.strides == self.shape.contiguous_strides()
    }

    /// Address of the storage buffer. Equal pointers mean the same allocation.
    pub fn data_ptr(&self) -> *const u8 {
        self.storage.as_ptr()
    }

    // === Storage access ===

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Mutable storage, copied first if shared with another handle.
    pub fn storage_mut(&mut self) -> &mut Storage {
        Arc::make_mut(&mut self.storage)
    }

    /// Typed view of the whole backing storage (not just this tensor's window).
    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        let actual = self.dtype();
        T::slice(&self.storage).ok_or(TensorError::DTypeMismatch {
            expected: T::DTYPE,
            actual,
        })
    }

    /// Typed mutable view of the whole backing storage.
    pub fn as_mut_slice<T: Element>(&mut self) -> Result<&mut [T]> {
        let actual = self.dtype();
        T::slice_mut(self.storage_mut()).ok_or(TensorError::DTypeMismatch {
            expected: T::DTYPE,
            actual,
        })
    }

    /// Copy out the elements in row-major logical order.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        let data = self.as_slice::<T>()?;
        if self.ndim() == 0 {
            return Ok(vec![data[self.offset]]);
        }

        let last = self.ndim() - 1;
        let extent = self.shape.dim(last);
        let stride = self.strides.0[last];
        let mut out = Vec::with_capacity(self.numel());
        for base in self.layout().lane_offsets(last) {
            out.extend((0..extent).map(|j| data[base + j * stride]));
        }
        Ok(out)
    }

    // === Views and resizing ===

    /// Retag the tensor for another device, sharing storage.
    pub fn to_device(&self, device: Device) -> Tensor {
        Tensor {
            device,
            ..self.clone()
        }
    }

    /// Broadcast view with the given shape, without copying.
    ///
    /// Dimensions of extent 1 and missing leading dimensions get stride 0.
    pub fn expand(&self, shape: &Shape) -> Result<Tensor> {
        let mismatch = || TensorError::ShapeMismatch {
            lhs: self.shape.clone(),
            rhs: shape.clone(),
        };
        if shape.ndim() < self.ndim() {
            return Err(mismatch());
        }

        let lead = shape.ndim() - self.ndim();
        let mut strides = vec![0usize; shape.ndim()];
        for (i, &target) in shape.dims().iter().enumerate().skip(lead) {
            let src = i - lead;
            let extent = self.shape.dim(src);
            if extent == target {
                strides[i] = self.strides.0[src];
            } else if extent != 1 {
                return Err(mismatch());
            }
        }

        Ok(Tensor {
            storage: Arc::clone(&self.storage),
            shape: shape.clone(),
            strides: Strides(strides),
            offset: self.offset,
            device: self.device,
        })
    }

    /// View with dimensions `d0` and `d1` swapped, without copying.
    pub fn transpose(&self, d0: usize, d1: usize) -> Result<Tensor> {
        for d in [d0, d1] {
            if d >= self.ndim() {
                return Err(TensorError::AxisOutOfRange {
                    axis: d as i64,
                    rank: self.ndim(),
                });
            }
        }
        let mut view = self.clone();
        view.shape.0.swap(d0, d1);
        view.strides.0.swap(d0, d1);
        Ok(view)
    }

    /// Resize in place to a contiguous tensor of `shape`.
    ///
    /// Uniquely owned storage is grown or truncated in place; shared storage is
    /// replaced by a fresh zeroed allocation. Element values are unspecified
    /// afterwards and must be overwritten by the caller.
    pub fn resize_(&mut self, shape: &Shape) {
        let numel = shape.numel();
        let dtype = self.dtype();
        match Arc::get_mut(&mut self.storage) {
            Some(storage) if self.offset == 0 => storage.resize(numel),
            _ => self.storage = Arc::new(Storage::zeros(dtype, numel)),
        }
        self.shape = shape.clone();
        self.strides = shape.contiguous_strides();
        self.offset = 0;
    }
}
