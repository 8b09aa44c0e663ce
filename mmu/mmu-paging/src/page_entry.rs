//! # Page Entries
//!
//! Directory and table entries share one 8-byte encoding: a present bit and
//! the number of the frame the entry references. For a directory entry that
//! is the first frame of a second-level table; for a table entry it is the
//! data page.

use bitfield_struct::bitfield;
use mmu_addresses::PhysicalPage;

/// Raw bit layout of a directory or table entry.
///
/// | Bits   | Name      | Meaning |
/// |--------|-----------|---------|
/// | 0      | `present` | Entry references a frame if set |
/// | 1‒31   | reserved  | Always zero |
/// | 32‒63  | `frame`   | Referenced frame number |
///
/// An all-zero entry is absent, which keeps freshly zeroed tables empty.
///
/// ```rust
/// # use mmu_paging::PageEntryBits;
/// let e = PageEntryBits::new().with_present(true).with_frame(7);
/// assert!(e.present());
/// assert_eq!(e.frame(), 7);
/// assert_eq!(e.into_bits(), (7 << 32) | 1);
/// ```
#[bitfield(u64)]
pub struct PageEntryBits {
    /// Set if `frame` is meaningful.
    pub present: bool,

    #[bits(31)]
    __: u32,

    /// Frame number of the referenced page.
    pub frame: u32,
}

/// A typed page entry, as stored in the arena.
#[repr(transparent)]
#[derive(Copy, Clone)]
pub struct PageEntry(PageEntryBits);

impl PageEntry {
    /// The absent entry.
    #[inline]
    #[must_use]
    pub const fn absent() -> Self {
        Self(PageEntryBits::new())
    }

    /// An entry referencing `frame`.
    #[inline]
    #[must_use]
    pub const fn mapping(frame: PhysicalPage) -> Self {
        Self(PageEntryBits::new().with_present(true).with_frame(frame.number()))
    }

    #[inline]
    #[must_use]
    pub const fn is_present(self) -> bool {
        self.0.present()
    }

    /// The referenced frame, if present.
    #[inline]
    #[must_use]
    pub const fn frame(self) -> Option<PhysicalPage> {
        if self.0.present() {
            Some(PhysicalPage::new(self.0.frame()))
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub const fn from_raw(v: u64) -> Self {
        Self(PageEntryBits::from_bits(v))
    }

    #[inline]
    #[must_use]
    pub const fn into_raw(self) -> u64 {
        self.0.into_bits()
    }
}

impl core::fmt::Debug for PageEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.frame() {
            Some(frame) => write!(f, "PageEntry({frame:?})"),
            None => f.write_str("PageEntry(absent)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_absent() {
        assert!(!PageEntry::from_raw(0).is_present());
        assert_eq!(PageEntry::absent().into_raw(), 0);
    }

    #[test]
    fn frame_zero_is_a_valid_mapping() {
        let e = PageEntry::mapping(PhysicalPage::new(0));
        assert!(e.is_present());
        assert_eq!(e.frame(), Some(PhysicalPage::new(0)));
        assert_ne!(e.into_raw(), 0);
    }

    #[test]
    fn raw_round_trip_keeps_frame() {
        let e = PageEntry::mapping(PhysicalPage::new(0xFFFF_FFFF));
        let back = PageEntry::from_raw(e.into_raw());
        assert_eq!(back.frame(), Some(PhysicalPage::new(0xFFFF_FFFF)));
    }
}
