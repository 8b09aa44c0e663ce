use crate::{MemoryAddress, PageSize, PhysicalPage};
use core::fmt;
use core::ops::{Add, AddAssign};

/// Physical memory address: a byte offset into the simulated RAM arena.
///
/// A thin wrapper around [`MemoryAddress`] that denotes **physical** addresses.
/// It is never a host pointer; the arena resolves it to a byte range.
///
/// ### Examples
/// ```rust
/// # use mmu_addresses::*;
/// let ps = PageSize::new(4096).unwrap();
/// let pa = PhysicalAddress::new(0x2042);
/// let (pp, off) = pa.split(ps);
/// assert_eq!(pp.number(), 2);
/// assert_eq!(pp.base(ps) + off, pa);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(pub(crate) MemoryAddress);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(MemoryAddress::new(v))
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0.as_u64()
    }

    #[inline]
    #[must_use]
    pub const fn page(self, page: PageSize) -> PhysicalPage {
        PhysicalPage::containing(self, page)
    }

    #[inline]
    #[must_use]
    pub const fn offset(self, page: PageSize) -> u64 {
        self.0.offset(page)
    }

    #[inline]
    #[must_use]
    pub const fn split(self, page: PageSize) -> (PhysicalPage, u64) {
        (self.page(page), self.offset(page))
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:016X})", self.as_u64())
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.as_u64())
    }
}

impl From<u64> for PhysicalAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl Add<u64> for PhysicalAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u64> for PhysicalAddress {
    #[inline]
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}
