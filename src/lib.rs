//! ## Virtual Ethernet driver module for SLOF
//!
//! The firmware kernel loads driver modules as raw images, relocates them and calls their
//! `module_init` entry point. Before any driver code runs, the module checks that its image size
//! is within the firmware's limit and clears its BSS segment. Only then is control passed to the
//! virtual Ethernet driver itself.
//!
//! The exported entry point, the linker symbol references and the panic handler are only built
//! with the `firmware` feature. Everything else, including the entry sequence in
//! [`entry::boot_module()`], builds for any target, which is what the tests rely on.

#![no_std]

#[cfg(feature = "firmware")]
mod arch;

pub mod entry;

pub mod image;

pub mod logging;

pub use image::{LoadError, ModuleImage, PreparedImage, MODULE_SIZE_LIMIT};

use snk::{DeviceConfig, KernelServices, VioConfig};

/// Bring up a freshly relocated module image: reject it if it is too large, clear its BSS and
/// then call the driver initializer `init`, whose result is returned unchanged.
///
/// ### Safety
///
/// See [`ModuleImage::prepare()`].
pub unsafe fn module_init<K, R, F>(
    image: ModuleImage,
    kernel: &K,
    config: &DeviceConfig,
    init: F,
) -> Result<R, LoadError>
where
    K: KernelServices + ?Sized,
    F: FnOnce(&K, &VioConfig) -> R,
{
    let prepared = unsafe { image.prepare(kernel)? };
    prepared.start(kernel, config, init)
}
