//! Entry point of the module as seen by the firmware kernel. After relocating the module image,
//! the firmware looks up the `module_init` symbol and calls it once with its service table and the
//! configuration of the device the driver should take over.
//!
//! [`boot_module()`] implements the entry sequence for any [`KernelServices`] provider. The
//! exported symbol, which feeds it the linker-defined image layout, only exists with the
//! `firmware` feature.

use core::ptr;

use snk::{DeviceConfig, KernelServices, SnkModule, VioConfig};

use crate::image::ModuleImage;

/// Check and prepare `image`, then start the driver through `init`. Returns the driver's module
/// descriptor unchanged, or null if the module must not be used. `attach_log` runs right after
/// the BSS has been cleared, so it may set up statics such as the kernel log.
///
/// ### Safety
///
/// See [`ModuleImage::prepare()`].
pub unsafe fn boot_module<K, A, F>(
    image: ModuleImage,
    kernel: &K,
    config: &DeviceConfig,
    attach_log: A,
    init: F,
) -> *mut SnkModule
where
    K: KernelServices + ?Sized,
    A: FnOnce(),
    F: FnOnce(&K, &VioConfig) -> *mut SnkModule,
{
    let prepared = match unsafe { image.prepare(kernel) } {
        Ok(prepared) => prepared,
        Err(_) => return ptr::null_mut(),
    };

    attach_log();

    match prepared.start(kernel, config, init) {
        Ok(module) => module,
        Err(err) => {
            log::error!("Not starting driver: {}", err);
            ptr::null_mut()
        }
    }
}

#[cfg(feature = "firmware")]
mod firmware {
    use core::ptr;

    use snk::{DeviceConfig, SnkKernel, SnkModule, VioConfig};
    use types::mem::MemoryRegion;

    use crate::image::ModuleImage;

    extern "C" {
        // Symbols defined by the module linker script:

        /// First byte of the module image.
        static __module_start: u8;

        /// First byte after the module image.
        static __module_end: u8;

        /// Start address of the BSS segment.
        static __bss_start: u8;

        /// End address of the BSS segment.
        static __bss_end: u8;

        /// Initialization routine of the virtual Ethernet driver.
        fn veth_module_init(kernel: *const SnkKernel, config: *const VioConfig)
            -> *mut SnkModule;
    }

    /// Describe the module image as laid out by the linker script. Only the addresses of the
    /// symbols are taken, their contents are never read.
    fn linked_image() -> ModuleImage {
        ModuleImage::new(
            MemoryRegion::from_ptr_range(
                ptr::addr_of!(__module_start),
                ptr::addr_of!(__module_end),
            ),
            MemoryRegion::from_ptr_range(ptr::addr_of!(__bss_start), ptr::addr_of!(__bss_end)),
        )
    }

    /// Exported entry point called by the firmware kernel.
    ///
    /// ### Safety
    ///
    /// Must be called exactly once, right after relocation and before any other code of this
    /// module. `kernel` must point to the firmware's service table, valid for as long as the
    /// module stays loaded. `config` must point to a complete, tagged device configuration.
    #[no_mangle]
    pub unsafe extern "C" fn module_init(
        kernel: *const SnkKernel,
        config: *const DeviceConfig,
    ) -> *mut SnkModule {
        let kernel: &'static SnkKernel = unsafe { SnkKernel::from_ptr(kernel) };
        let config = unsafe { DeviceConfig::from_ptr(config) };

        unsafe {
            super::boot_module(
                linked_image(),
                kernel,
                config,
                || {
                    crate::logging::initialize_kernel_log(kernel).ok();
                },
                |kernel, vio| veth_module_init(kernel, vio),
            )
        }
    }

    /// The panic handler is called whenever the module encountered an unrecoverable error. There
    /// is no way to hand control back to the firmware, so report the panic and halt.
    #[cfg(not(test))]
    #[panic_handler]
    fn panic(reason: &core::panic::PanicInfo) -> ! {
        log::error!("Halting due to unrecoverable panic:\n{}", reason);
        crate::arch::halt_core();
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use core::cell::{Cell, RefCell};
    use core::ffi::CStr;
    use core::ptr::NonNull;
    use snk::PciConfig;
    use std::vec::Vec;
    use types::mem::MemoryRegion;

    #[derive(Default)]
    struct Console {
        sizes: RefCell<Vec<u64>>,
    }

    impl KernelServices for Console {
        fn print_u64(&self, _format: &CStr, value: u64) {
            self.sizes.borrow_mut().push(value);
        }

        fn print_str(&self, _text: &CStr) {}
    }

    fn image(size: usize, bss: *mut u8, bss_len: usize) -> ModuleImage {
        ModuleImage::new(
            MemoryRegion::new(0x1000, size),
            MemoryRegion::new(bss as usize, bss_len),
        )
    }

    #[test]
    fn driver_descriptor_is_passed_through() {
        let console = Console::default();
        let vio = VioConfig::new(0x3000_0002, b"IBM,l-lan");
        let mut bss = [0xaa_u8; 16];
        let bss_ptr = bss.as_mut_ptr();
        let descriptor = NonNull::<SnkModule>::dangling().as_ptr();

        let attached_to_clear_bss = Cell::new(false);
        let module = unsafe {
            boot_module(
                image(0x7f_ffff, bss_ptr, 16),
                &console,
                vio.as_device_config(),
                || {
                    let bss = core::slice::from_raw_parts(bss_ptr, 16);
                    attached_to_clear_bss.set(bss.iter().all(|&b| b == 0));
                },
                |_, config| {
                    assert_eq!(config.reg, 0x3000_0002);
                    descriptor
                },
            )
        };

        assert_eq!(module, descriptor);
        assert!(attached_to_clear_bss.get());
        assert!(console.sizes.borrow().is_empty());
        assert_eq!(bss, [0; 16]);
    }

    #[test]
    fn oversized_module_yields_null() {
        let console = Console::default();
        let vio = VioConfig::new(0, b"IBM,l-lan");
        let mut bss = [0xaa_u8; 16];
        let attached = Cell::new(false);
        let started = Cell::new(false);

        let module = unsafe {
            boot_module(
                image(0x80_0000, bss.as_mut_ptr(), 16),
                &console,
                vio.as_device_config(),
                || attached.set(true),
                |_, _| {
                    started.set(true);
                    NonNull::dangling().as_ptr()
                },
            )
        };

        assert!(module.is_null());
        assert_eq!(console.sizes.borrow().as_slice(), &[0x80_0000]);
        assert!(!attached.get());
        assert!(!started.get());
        assert_eq!(bss, [0xaa; 16]);
    }

    #[test]
    fn pci_config_yields_null() {
        let console = Console::default();
        let pci = PciConfig::new(0x800000020000000, 0, 3 << 3);
        let mut bss = [0xaa_u8; 16];
        let attached = Cell::new(false);
        let started = Cell::new(false);

        let module = unsafe {
            boot_module(
                image(0x1000, bss.as_mut_ptr(), 16),
                &console,
                pci.as_device_config(),
                || attached.set(true),
                |_, _| {
                    started.set(true);
                    NonNull::dangling().as_ptr()
                },
            )
        };

        assert!(module.is_null());
        assert!(attached.get());
        assert!(!started.get());
        assert!(console.sizes.borrow().is_empty());
        assert_eq!(bss, [0; 16]);
    }
}
