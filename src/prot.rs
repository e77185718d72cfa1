//! Page protection.
//!
//! The core models protection as a three-valued enum and never matches on
//! raw bits internally. [`RawProt`] exists only for MMU implementations that
//! want a hardware-style bitfield at the boundary, mirroring how comparable
//! kernel code (e.g. frame/allocation flags) is modeled with `bitflags`.

use bitflags::bitflags;

/// Current MMU protection of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Prot {
    /// No access: reads and writes both fault.
    #[default]
    None,
    /// Read-only.
    Read,
    /// Read and write.
    ReadWrite,
}

impl Prot {
    /// Translates to the hardware-style bitfield encoding, for MMU
    /// implementations that want one at the boundary.
    #[must_use]
    pub fn as_raw(self) -> RawProt {
        match self {
            Prot::None => RawProt::empty(),
            Prot::Read => RawProt::READ,
            Prot::ReadWrite => RawProt::READ | RawProt::WRITE,
        }
    }

    /// Reconstructs a [`Prot`] from the raw bitfield encoding.
    ///
    /// `WRITE` without `READ` is normalized up to `ReadWrite`: the core's
    /// three states have no "write-only" case, and a boundary that hands us
    /// that combination almost certainly means "writable", not "neither".
    #[must_use]
    pub fn from_raw(raw: RawProt) -> Self {
        if raw.contains(RawProt::WRITE) {
            Prot::ReadWrite
        } else if raw.contains(RawProt::READ) {
            Prot::Read
        } else {
            Prot::None
        }
    }
}

bitflags! {
    /// Hardware-style protection bits, the boundary encoding for [`Prot`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RawProt: u8 {
        /// Page is readable.
        const READ = 1 << 0;
        /// Page is writable. Implies readable by convention, but
        /// `from_raw` tolerates a bare `WRITE` bit too.
        const WRITE = 1 << 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_raw() {
        for p in [Prot::None, Prot::Read, Prot::ReadWrite] {
            assert_eq!(Prot::from_raw(p.as_raw()), p);
        }
    }

    #[test]
    fn write_without_read_normalizes_to_read_write() {
        assert_eq!(Prot::from_raw(RawProt::WRITE), Prot::ReadWrite);
    }
}
