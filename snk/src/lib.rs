//! Structures shared between the SLOF network kernel ("SNK") and the driver modules it loads.
//!
//! The firmware kernel relocates a driver module into memory, then calls the module's
//! `module_init` entry point with a table of kernel services and the configuration of the device
//! instance the driver should take over. Only the leading fields of these structures are declared
//! here; they are only ever accessed through references handed out by the firmware.

#![no_std]

pub mod config;

use core::ffi::{c_char, c_int, c_uint, CStr};

pub use config::*;

/// `printf`-like console output provided by the firmware kernel.
pub type PrintFn = unsafe extern "C" fn(format: *const c_char, ...) -> c_int;

/// Busy-wait delay provided by the firmware kernel.
pub type DelayFn = unsafe extern "C" fn(amount: c_uint) -> c_int;

/// Table of services that the firmware kernel offers to a loaded driver module. The firmware
/// owns the table; drivers only borrow it.
#[repr(C)]
pub struct SnkKernel {
    /// Interface version of the firmware kernel.
    pub version: c_int,

    /// Writes formatted output to the firmware console. The format string uses C `printf`
    /// conventions, so arguments must match their conversion specifiers exactly.
    pub print: PrintFn,

    /// Delays execution for the given number of microseconds.
    pub us_delay: DelayFn,

    /// Delays execution for the given number of milliseconds.
    pub ms_delay: DelayFn,
}

impl SnkKernel {
    /// Dereference the kernel service table passed by the firmware.
    ///
    /// ### Safety
    ///
    /// The pointer has to be aligned, non-null and must point to a valid table for the `'snk`
    /// lifetime.
    pub unsafe fn from_ptr<'snk>(ptr: *const SnkKernel) -> &'snk SnkKernel {
        debug_assert!(!ptr.is_null(), "Kernel service table pointer must be non-null");
        unsafe { &*ptr }
    }
}

impl core::fmt::Debug for SnkKernel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SnkKernel")
            .field("version", &self.version)
            .field("print", &(self.print as *const ()))
            .finish_non_exhaustive()
    }
}

/// Descriptor of an initialized driver module. It is created and owned by the driver; the entry
/// point only passes it back to the firmware kernel.
#[repr(C)]
pub struct SnkModule {
    _private: [u8; 0],
}

/// The subset of firmware kernel services that the module entry relies on.
pub trait KernelServices {
    /// Print a diagnostic message. `format` must contain exactly one `%llu` conversion, which is
    /// substituted by `value`.
    fn print_u64(&self, format: &CStr, value: u64);

    /// Print `text` verbatim. It is never interpreted as a format string.
    fn print_str(&self, text: &CStr);
}

impl KernelServices for SnkKernel {
    fn print_u64(&self, format: &CStr, value: u64) {
        unsafe {
            // SAFETY: The firmware guarantees `print` to be a valid `printf` implementation and
            // the caller guarantees the `%llu` conversion.
            (self.print)(format.as_ptr(), value as core::ffi::c_ulonglong);
        }
    }

    fn print_str(&self, text: &CStr) {
        unsafe {
            // SAFETY: `%s` consumes exactly one NUL-terminated string argument.
            (self.print)(c"%s".as_ptr(), text.as_ptr());
        }
    }
}
