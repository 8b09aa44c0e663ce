use crate::{PageSize, VirtualAddress};
use core::fmt;

/// Virtual page number.
///
/// Identifies the page that spans `[number << shift, (number + 1) << shift)`.
/// The base address needs the [`PageSize`] it was derived with.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualPage(u32);

impl VirtualPage {
    #[inline]
    #[must_use]
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    /// Page that contains `addr`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn containing(addr: VirtualAddress, page: PageSize) -> Self {
        Self((addr.as_u64() >> page.shift()) as u32)
    }

    #[inline]
    #[must_use]
    pub const fn number(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// First address of this page.
    #[inline]
    #[must_use]
    pub const fn base(self, page: PageSize) -> VirtualAddress {
        VirtualAddress::new(self.0 << page.shift())
    }
}

impl fmt::Display for VirtualPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vpn {:#x}", self.0)
    }
}

impl fmt::Debug for VirtualPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtualPage({:#x})", self.0)
    }
}
