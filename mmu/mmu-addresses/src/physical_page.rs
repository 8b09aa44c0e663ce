use crate::{PageSize, PhysicalAddress};
use core::fmt;

/// Physical frame number inside the simulated arena.
///
/// Frame `n` occupies arena bytes `[n << shift, (n + 1) << shift)`.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalPage(u32);

impl PhysicalPage {
    #[inline]
    #[must_use]
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    /// Frame that contains `addr`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn containing(addr: PhysicalAddress, page: PageSize) -> Self {
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

    /// First arena offset of this frame.
    #[inline]
    #[must_use]
    pub const fn base(self, page: PageSize) -> PhysicalAddress {
        PhysicalAddress::new((self.0 as u64) << page.shift())
    }
}

impl fmt::Display for PhysicalPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame {:#x}", self.0)
    }
}

impl fmt::Debug for PhysicalPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalPage({:#x})", self.0)
    }
}
