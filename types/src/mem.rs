use core::fmt::{Display, Formatter, Result};

use crate::fmt::ByteSize;

/// A contiguous range of bytes in the address space of the running firmware, described by its
/// first address and its length.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    pub base_addr: usize,
    pub length: usize,
}

impl MemoryRegion {
    pub const fn new(base_addr: usize, length: usize) -> Self {
        Self { base_addr, length }
    }

    /// Build the region `[start, end)`. Inverted bounds yield an empty region at `start`.
    pub const fn from_bounds(start: usize, end: usize) -> Self {
        Self {
            base_addr: start,
            length: end.saturating_sub(start),
        }
    }

    /// Build the region spanned by a pair of pointers, e.g. two linker-defined symbols.
    pub fn from_ptr_range(start: *const u8, end: *const u8) -> Self {
        Self::from_bounds(start as usize, end as usize)
    }

    pub const fn end_addr(&self) -> usize {
        self.base_addr + self.length
    }

    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns a mutable view of the bytes covered by this region.
    ///
    /// ### Safety
    ///
    /// The region must be valid, writable memory that is not referenced by anything else for the
    /// lifetime `'a`.
    pub unsafe fn as_mut_slice<'a>(&self) -> &'a mut [u8] {
        if self.is_empty() {
            return &mut [];
        }
        unsafe {
            // SAFETY: Non-empty, and the caller vouches for validity and exclusivity.
            core::slice::from_raw_parts_mut(self.base_addr as *mut u8, self.length)
        }
    }
}

/// Overwrite every byte of `buffer` with `value`. Nothing outside of `buffer` is touched.
pub fn fill_region(buffer: &mut [u8], value: u8) {
    buffer.fill(value);
}

impl core::fmt::Debug for MemoryRegion {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "(@ 0x{:x}..0x{:x}, len: 0x{:x})",
            self.base_addr,
            self.end_addr(),
            self.length,
        )
    }
}

impl Display for MemoryRegion {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "@ 0x{:x}: {}", self.base_addr, ByteSize::from(self.length))
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::{fill_region, MemoryRegion};
    use std::format;

    #[test]
    fn bounds() {
        let region = MemoryRegion::from_bounds(0x1000, 0x1000 + 0x7f_ffff);
        assert_eq!(region.base_addr, 0x1000);
        assert_eq!(region.length, 0x7f_ffff);
        assert_eq!(region.end_addr(), 0x80_0fff);
        assert!(!region.is_empty());
    }

    #[test]
    fn inverted_bounds_are_empty() {
        let region = MemoryRegion::from_bounds(0x2000, 0x1000);
        assert!(region.is_empty());
        assert_eq!(region.base_addr, 0x2000);
    }

    #[test]
    fn fill_stays_in_bounds() {
        let mut buffer = [0xaa_u8; 32];
        fill_region(&mut buffer[8..24], 0);

        assert!(buffer[..8].iter().all(|&b| b == 0xaa));
        assert!(buffer[8..24].iter().all(|&b| b == 0));
        assert!(buffer[24..].iter().all(|&b| b == 0xaa));
    }

    #[test]
    fn fill_is_idempotent() {
        let mut buffer = [0_u8; 16];
        fill_region(&mut buffer, 0);
        fill_region(&mut buffer, 0);
        assert_eq!(buffer, [0; 16]);
    }

    #[test]
    fn mutable_view_of_region() {
        let mut buffer = [0x55_u8; 16];
        let region = MemoryRegion::new(buffer.as_mut_ptr() as usize + 4, 8);
        fill_region(unsafe { region.as_mut_slice() }, 0);
        assert_eq!(buffer[3], 0x55);
        assert_eq!(&buffer[4..12], &[0; 8]);
        assert_eq!(buffer[12], 0x55);
    }

    #[test]
    fn empty_view_does_not_touch_memory() {
        let region = MemoryRegion::new(0, 0);
        let view = unsafe { region.as_mut_slice() };
        fill_region(view, 0);
        assert!(view.is_empty());
    }

    #[test]
    fn display() {
        let region = MemoryRegion::new(0x1000, 0x3000);
        assert_eq!(format!("{}", region), "@ 0x1000: 12 KiB");
        assert_eq!(format!("{:?}", region), "(@ 0x1000..0x4000, len: 0x3000)");
    }
}
