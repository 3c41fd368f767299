use core::fmt::{Display, Formatter, Result};

/// A byte count that displays itself in the largest binary unit (B, KiB, MiB, GiB) that still
/// shows at least two integral digits, e.g. `0x4000` as `16 KiB` but `0x2000` as `8192 B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSize(pub u64);

impl ByteSize {
    /// Units from largest to smallest, with the shift that converts bytes into them.
    const UNITS: [(&'static str, u32); 3] = [("GiB", 30), ("MiB", 20), ("KiB", 10)];
}

impl From<usize> for ByteSize {
    fn from(bytes: usize) -> Self {
        Self(bytes as u64)
    }
}

impl Display for ByteSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        for (unit, shift) in Self::UNITS {
            if self.0 >= 10 << shift {
                return write!(f, "{} {unit}", self.0 >> shift);
            }
        }
        write!(f, "{} B", self.0)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::ByteSize;
    use std::format;

    #[test]
    fn picks_unit_by_magnitude() {
        assert_eq!(format!("{}", ByteSize(4823)), "4823 B");
        assert_eq!(format!("{}", ByteSize::from(0x7f_ffff_usize)), "8191 KiB");
        assert_eq!(format!("{}", ByteSize(0x1000_0000)), "256 MiB");
        assert_eq!(format!("{}", ByteSize(12 << 30)), "12 GiB");
    }

    #[test]
    fn unit_switches_at_ten() {
        assert_eq!(format!("{}", ByteSize(10 * 1024 - 1)), "10239 B");
        assert_eq!(format!("{}", ByteSize(10 * 1024)), "10 KiB");
        assert_eq!(format!("{}", ByteSize(0)), "0 B");
    }
}
