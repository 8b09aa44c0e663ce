use crate::{MemoryAddress, PageSize, VirtualPage};
use core::fmt;
use core::ops::{Add, AddAssign};

/// Virtual memory address in the simulated 32-bit address space.
///
/// A thin wrapper around [`MemoryAddress`] that denotes **virtual** addresses.
/// Construction takes a `u32`, so a value outside the 32-bit space can only
/// arise through arithmetic; [`checked_add`](Self::checked_add) guards that.
///
/// ### Semantics
/// - Use [`VirtualAddress::page`] / [`VirtualAddress::offset`] / [`VirtualAddress::split`]
///   to derive the page number and the in-page offset for a [`PageSize`].
/// - Address zero is a valid value of this type; the allocator simply never
///   hands it out.
///
/// ### Examples
/// ```rust
/// # use mmu_addresses::*;
/// let ps = PageSize::new(4096).unwrap();
/// let va = VirtualAddress::new(0x8000_1234);
/// let (vp, off) = va.split(ps);
/// assert_eq!(vp.base(ps).as_u32() & 0xFFF, 0);
/// assert_eq!(vp.base(ps) + off, va);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(pub(crate) MemoryAddress);

impl VirtualAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u32) -> Self {
        Self(MemoryAddress::new(v as u64))
    }

    /// Build from a wider value, `None` if it does not fit 32 bits.
    #[inline]
    #[must_use]
    pub const fn try_from_u64(v: u64) -> Option<Self> {
        if v > u32::MAX as u64 {
            None
        } else {
            Some(Self(MemoryAddress::new(v)))
        }
    }

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0)
    }

    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0.as_u64() == 0
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0.as_u64()
    }

    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn as_u32(self) -> u32 {
        self.0.as_u64() as u32
    }

    #[inline]
    #[must_use]
    pub const fn page(self, page: PageSize) -> VirtualPage {
        VirtualPage::containing(self, page)
    }

    #[inline]
    #[must_use]
    pub const fn offset(self, page: PageSize) -> u64 {
        self.0.offset(page)
    }

    #[inline]
    #[must_use]
    pub const fn split(self, page: PageSize) -> (VirtualPage, u64) {
        (self.page(page), self.offset(page))
    }

    /// Add `rhs` bytes, `None` if the result leaves the 32-bit space.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, rhs: u64) -> Option<Self> {
        match self.0.checked_add(rhs) {
            Some(v) => Self::try_from_u64(v.as_u64()),
            None => None,
        }
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA(0x{:08X})", self.as_u64())
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.as_u64())
    }
}

impl From<u32> for VirtualAddress {
    #[inline]
    fn from(v: u32) -> Self {
        Self::new(v)
    }
}

impl Add<u64> for VirtualAddress {
    type Output = Self;

    /// Plain add; the caller guarantees the result stays within 32 bits.
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        let sum = self.0 + rhs;
        debug_assert!(u32::try_from(sum.as_u64()).is_ok(), "virtual address overflow");
        Self(sum)
    }
}

impl AddAssign<u64> for VirtualAddress {
    #[inline]
    fn add_assign(&mut self, rhs: u64) {
        *self = *self + rhs;
    }
}
