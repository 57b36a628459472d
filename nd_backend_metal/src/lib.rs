//! Metal GPU Backend for nd_tensor (macOS only).
//!
//! Runs the cross product as a compute shader over per-lane offset tables, so
//! broadcast (stride-0) operands and strided outputs need no host-side copy
//! into contiguous layout. On other platforms the crate only exposes a
//! [`register`] that reports the backend as unavailable.

#[cfg(target_os = "macos")]
mod metal_impl;

#[cfg(target_os = "macos")]
pub use metal_impl::*;

/// Metal is unavailable on this platform; always returns `false`.
#[cfg(not(target_os = "macos"))]
pub fn register() -> bool {
    log::debug!("Metal backend is only available on macOS");
    false
}
