//! The relocated module image and the steps needed before driver code may run.
//!
//! A [`ModuleImage`] is the image as the firmware left it: code and data in place, but the BSS
//! segment holding whatever was in memory before. [`ModuleImage::prepare()`] checks the image
//! size and clears the BSS, producing a [`PreparedImage`] that can be started exactly once.

use core::ffi::CStr;
use core::fmt::{Display, Formatter};

use snk::{ConfigError, DeviceConfig, KernelServices, VioConfig};
use types::{
    fmt::ByteSize,
    mem::{fill_region, MemoryRegion},
};

/// Modules must be strictly smaller than this to be accepted by the firmware.
pub const MODULE_SIZE_LIMIT: usize = 0x80_0000; // 8 MiB

const OVERSIZED_MESSAGE: &CStr = c"Module size (%llu bytes) is too big!\n";

/// Reasons for refusing to start the driver contained in a module image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    /// The module image is at least [`MODULE_SIZE_LIMIT`] bytes large.
    OversizedModule { size: usize },

    /// The device configuration does not describe a virtual I/O device.
    ConfigMismatch(ConfigError),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OversizedModule { size } => write!(
                f,
                "module size ({size} bytes) exceeds the limit of {}",
                ByteSize::from(MODULE_SIZE_LIMIT)
            ),
            Self::ConfigMismatch(err) => write!(f, "unusable device configuration: {err}"),
        }
    }
}

impl From<ConfigError> for LoadError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigMismatch(err)
    }
}

/// Location of a freshly relocated module image and of its BSS segment.
#[derive(Debug)]
pub struct ModuleImage {
    image: MemoryRegion,
    bss: MemoryRegion,
}

impl ModuleImage {
    pub const fn new(image: MemoryRegion, bss: MemoryRegion) -> Self {
        Self { image, bss }
    }

    /// Size of the whole image (code, data and BSS) in bytes.
    pub fn size(&self) -> usize {
        self.image.length
    }

    pub fn check_size(&self) -> Result<(), LoadError> {
        if self.size() >= MODULE_SIZE_LIMIT {
            return Err(LoadError::OversizedModule { size: self.size() });
        }
        Ok(())
    }

    /// Check the image size and clear the BSS segment. An oversized image is reported on the
    /// firmware console and its memory is left untouched.
    ///
    /// ### Safety
    ///
    /// The BSS region must be valid, writable memory that nothing else references. Any static
    /// living in the BSS is reset, so this must run before such statics are used.
    ///
    /// The image is consumed, so it cannot be prepared a second time:
    ///
    /// ```compile_fail
    /// # use core::ffi::CStr;
    /// # use snk::KernelServices;
    /// # use types::mem::MemoryRegion;
    /// # use veth_module::ModuleImage;
    /// # struct Console;
    /// # impl KernelServices for Console {
    /// #     fn print_u64(&self, _: &CStr, _: u64) {}
    /// #     fn print_str(&self, _: &CStr) {}
    /// # }
    /// let image = ModuleImage::new(MemoryRegion::new(0x1000, 0x100), MemoryRegion::new(0, 0));
    /// let first = unsafe { image.prepare(&Console) };
    /// let second = unsafe { image.prepare(&Console) };
    /// ```
    pub unsafe fn prepare<K>(self, kernel: &K) -> Result<PreparedImage, LoadError>
    where
        K: KernelServices + ?Sized,
    {
        if let Err(err) = self.check_size() {
            kernel.print_u64(OVERSIZED_MESSAGE, self.size() as u64);
            return Err(err);
        }

        fill_region(unsafe { self.bss.as_mut_slice() }, 0);

        Ok(PreparedImage {
            image: self.image,
            bss: self.bss,
        })
    }
}

/// A module image that passed the size check and has a cleared BSS segment.
#[derive(Debug)]
pub struct PreparedImage {
    image: MemoryRegion,
    bss: MemoryRegion,
}

impl PreparedImage {
    /// Hand control to the driver initializer `init`, passing along the kernel services and the
    /// virtual I/O configuration recovered from `config`. The initializer's result is returned
    /// unchanged.
    pub fn start<K, R, F>(self, kernel: &K, config: &DeviceConfig, init: F) -> Result<R, LoadError>
    where
        K: ?Sized,
        F: FnOnce(&K, &VioConfig) -> R,
    {
        log::info!("Module image {}, BSS {}", self.image, self.bss);

        let vio: &VioConfig = config.try_into()?;
        log::debug!("Starting driver for {:?}", vio);

        Ok(init(kernel, vio))
    }
}
