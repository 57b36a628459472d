//! Cross-product kernel trait and the process-wide device registry.
//!
//! Backend crates implement [`CrossKernel`] and call
//! [`register_cross_kernel`] once at startup (for example
//! `nd_backend_cpu::register()`). The operator looks the kernel up by the
//! output tensor's device on every call.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::device::Device;
use crate::error::{Result, TensorError};
use crate::tensor::Tensor;

/// A device-specific implementation of the 3-vector cross product.
pub trait CrossKernel: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    /// Write `input × other` along `dim` into `out`.
    ///
    /// The caller guarantees that `out`, `input` and `other` share one shape
    /// and dtype, that `dim` is in range with extent 3, and that `out` has no
    /// overlapping elements. `input` and `other` may be broadcast views with
    /// zero strides. For every lane, with `a = input` and `b = other`:
    /// `out = (a1*b2 - a2*b1, a2*b0 - a0*b2, a0*b1 - a1*b0)`.
    fn cross(&self, out: &mut Tensor, input: &Tensor, other: &Tensor, dim: usize) -> Result<()>;
}

/// Mapping from device tag to kernel.
#[derive(Clone, Default)]
pub struct KernelRegistry {
    kernels: HashMap<Device, Arc<dyn CrossKernel>>,
}

impl KernelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `kernel` for `device`. The first registration wins; returns
    /// `false` if a kernel was already present.
    pub fn register(&mut self, device: Device, kernel: Arc<dyn CrossKernel>) -> bool {
        if self.kernels.contains_key(&device) {
            return false;
        }
        log::debug!("Registering cross kernel '{}' for {}", kernel.name(), device);
        self.kernels.insert(device, kernel);
        true
    }

    /// Kernel for `device`, or `UnsupportedDevice`.
    pub fn get(&self, device: Device) -> Result<Arc<dyn CrossKernel>> {
        self.kernels
            .get(&device)
            .cloned()
            .ok_or(TensorError::UnsupportedDevice(device))
    }

    /// Devices with a registered kernel, in declaration order.
    pub fn devices(&self) -> Vec<Device> {
        Device::ALL
            .into_iter()
            .filter(|d| self.kernels.contains_key(d))
            .collect()
    }
}

impl fmt::Debug for KernelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for device in self.devices() {
            if let Some(kernel) = self.kernels.get(&device) {
                map.entry(&device, &kernel.name());
            }
        }
        map.finish()
    }
}

/// Global registry, populated by backend crates.
static CROSS_KERNELS: OnceLock<RwLock<KernelRegistry>> = OnceLock::new();

fn registry() -> &'static RwLock<KernelRegistry> {
    CROSS_KERNELS.get_or_init(|| RwLock::new(KernelRegistry::new()))
}

/// Register a kernel in the global registry.
///
/// Intended to be called once per backend during startup; later calls for an
/// already registered device are ignored and return `false`.
pub fn register_cross_kernel(device: Device, kernel: Arc<dyn CrossKernel>) -> bool {
    registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(device, kernel)
}

/// Look up the globally registered kernel for `device`.
pub fn cross_kernel(device: Device) -> Result<Arc<dyn CrossKernel>> {
    registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(device)
}

/// Devices with a globally registered kernel.
pub fn registered_devices() -> Vec<Device> {
    registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .devices()
}

/// Snapshot of the global registry.
pub fn global_registry() -> KernelRegistry {
    registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}
