//! Device configuration handed to a driver module by the firmware kernel.
//!
//! Every configuration structure starts with a [`ConfigHeader`] carrying the [`DeviceKind`] tag.
//! The kernel passes configurations around as a generic [`DeviceConfig`]; a driver recovers the
//! concrete structure via `TryFrom`, which checks the tag instead of blindly casting the pointer.

use core::fmt::{Display, Formatter, Result};

/// Length of the `compatible` property buffer of a virtual I/O device.
pub const VIO_COMPAT_LEN: usize = 64;

/// Kind of device a configuration structure describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum DeviceKind {
    Pci = 1,
    Vio = 2,
}

impl DeviceKind {
    /// Decode a raw tag value as found in a [`ConfigHeader`].
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Self::Pci),
            2 => Some(Self::Vio),
            _ => None,
        }
    }
}

impl Display for DeviceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str(match self {
            Self::Pci => "pci",
            Self::Vio => "vio",
        })
    }
}

/// Common prefix of all device configuration structures. The tag is kept raw because the
/// firmware may write values this crate doesn't know about.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct ConfigHeader {
    kind: u32,
}

impl ConfigHeader {
    const fn new(kind: DeviceKind) -> Self {
        Self { kind: kind as u32 }
    }
}

/// Generic, type-erased handle to a device configuration.
#[repr(C)]
pub struct DeviceConfig {
    header: ConfigHeader,
}

impl DeviceConfig {
    /// Dereference a configuration pointer passed by the firmware.
    ///
    /// ### Safety
    ///
    /// The pointer has to be aligned and non-null, and it must point to a complete configuration
    /// structure of the kind named in its header, valid for the `'cfg` lifetime.
    pub unsafe fn from_ptr<'cfg>(ptr: *const DeviceConfig) -> &'cfg DeviceConfig {
        debug_assert!(!ptr.is_null(), "Device configuration pointer must be non-null");
        unsafe { &*ptr }
    }

    /// Returns the device kind, or `None` if the tag is not recognized.
    pub fn kind(&self) -> Option<DeviceKind> {
        DeviceKind::from_raw(self.header.kind)
    }

    fn expect_kind(&self, expected: DeviceKind) -> core::result::Result<(), ConfigError> {
        match self.kind() {
            Some(kind) if kind == expected => Ok(()),
            _ => Err(ConfigError::KindMismatch {
                expected,
                found: self.header.kind,
            }),
        }
    }
}

impl core::fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self.kind() {
            Some(kind) => write!(f, "DeviceConfig({kind})"),
            None => write!(f, "DeviceConfig(unknown: {})", self.header.kind),
        }
    }
}

/// Configuration of a device found on the PCI bus.
#[repr(C)]
#[derive(Debug)]
pub struct PciConfig {
    header: ConfigHeader,

    /// Firmware-assigned unit identifier of the PCI host bridge.
    pub puid: u64,

    /// Bus number of the device.
    pub bus: i32,

    /// Device and function number, encoded as `device << 3 | function`.
    pub devfn: i32,
}

impl PciConfig {
    pub const fn new(puid: u64, bus: i32, devfn: i32) -> Self {
        Self {
            header: ConfigHeader::new(DeviceKind::Pci),
            puid,
            bus,
            devfn,
        }
    }

    pub fn as_device_config(&self) -> &DeviceConfig {
        unsafe {
            // SAFETY: `PciConfig` is `repr(C)` and starts with the header tagged `Pci`.
            &*(self as *const Self).cast::<DeviceConfig>()
        }
    }
}

/// Configuration of a paravirtual (VIO) device, as presented by the hypervisor.
#[repr(C)]
pub struct VioConfig {
    header: ConfigHeader,

    /// Unit address (`reg` property) of the device on the VIO bus.
    pub reg: u32,

    /// NUL-padded `compatible` property of the device node.
    compat: [u8; VIO_COMPAT_LEN],
}

impl VioConfig {
    /// Create a configuration for the VIO device at `reg`. `compatible` is truncated so that at
    /// least one terminating NUL remains.
    pub fn new(reg: u32, compatible: &[u8]) -> Self {
        let mut compat = [0; VIO_COMPAT_LEN];
        let len = compatible.len().min(VIO_COMPAT_LEN - 1);
        compat[..len].copy_from_slice(&compatible[..len]);
        Self {
            header: ConfigHeader::new(DeviceKind::Vio),
            reg,
            compat,
        }
    }

    /// Returns the `compatible` property without its NUL padding.
    pub fn compatible(&self) -> &[u8] {
        let end = self
            .compat
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(VIO_COMPAT_LEN);
        &self.compat[..end]
    }

    pub fn as_device_config(&self) -> &DeviceConfig {
        unsafe {
            // SAFETY: `VioConfig` is `repr(C)` and starts with the header tagged `Vio`.
            &*(self as *const Self).cast::<DeviceConfig>()
        }
    }
}

impl core::fmt::Debug for VioConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_struct("VioConfig")
            .field("reg", &format_args!("0x{:x}", self.reg))
            .field(
                "compatible",
                &core::str::from_utf8(self.compatible()).unwrap_or("invalid (non-utf-8)"),
            )
            .finish()
    }
}

impl<'cfg> TryFrom<&'cfg DeviceConfig> for &'cfg VioConfig {
    type Error = ConfigError;

    fn try_from(config: &'cfg DeviceConfig) -> core::result::Result<Self, Self::Error> {
        config.expect_kind(DeviceKind::Vio)?;
        Ok(unsafe {
            // SAFETY: A `DeviceConfig` can only be obtained from a complete structure of the kind
            // named in its header, which we just checked.
            &*(config as *const DeviceConfig).cast::<VioConfig>()
        })
    }
}

/// Failure to interpret a [`DeviceConfig`] as a concrete configuration structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The header names a different (or unknown) device kind.
    KindMismatch { expected: DeviceKind, found: u32 },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Self::KindMismatch { expected, found } => match DeviceKind::from_raw(*found) {
                Some(kind) => write!(f, "expected {expected} device configuration, got {kind}"),
                None => write!(
                    f,
                    "expected {expected} device configuration, got unknown kind {found}"
                ),
            },
        }
    }
}
