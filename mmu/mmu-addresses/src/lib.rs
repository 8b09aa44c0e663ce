//! # Simulated Virtual and Physical Address Types
//!
//! Strongly typed wrappers for the two address kinds of the simulated MMU.
//!
//! ## Overview
//!
//! Client code only ever sees **virtual** addresses inside a 32-bit address
//! space. **Physical** addresses are byte offsets into the simulated RAM arena;
//! they are never host pointers. Keeping both in distinct types prevents the
//! classic "is this a pointer or an offset?" confusion at compile time.
//!
//! | Concept | Description |
//! |----------|-------------|
//! | [`MemoryAddress`] | A raw address value, either physical or virtual. |
//! | [`PageSize`] | A runtime power-of-two page size (e.g. 4 KiB). |
//! | [`VirtualAddress`] / [`VirtualPage`] | A client address / a virtual page number. |
//! | [`PhysicalAddress`] / [`PhysicalPage`] | An arena offset / a physical frame number. |
//!
//! Unlike hardware page sizes, the simulated page size is a configuration
//! value, so pages are identified by their **number** and converted to base
//! addresses with an explicit [`PageSize`].
//!
//! ## Example
//!
//! ```rust
//! use mmu_addresses::*;
//!
//! let ps = PageSize::new(4096).unwrap();
//! let va = VirtualAddress::new(0x0040_1234);
//! let (page, off) = va.split(ps);
//! assert_eq!(page.number(), 0x401);
//! assert_eq!(off, 0x234);
//! assert_eq!(page.base(ps) + off, va);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod page_size;
mod physical_address;
mod physical_page;
mod virtual_address;
mod virtual_page;

pub use crate::page_size::PageSize;
pub use crate::physical_address::PhysicalAddress;
pub use crate::physical_page::PhysicalPage;
pub use crate::virtual_address::VirtualAddress;
pub use crate::virtual_page::VirtualPage;

use core::fmt;
use core::ops::{Add, AddAssign};

/// Principal raw memory address ([virtual](VirtualAddress) or [physical](PhysicalAddress)).
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MemoryAddress(u64);

impl MemoryAddress {
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The offset within the page of size `page` that contains this address.
    #[inline]
    #[must_use]
    pub const fn offset(self, page: PageSize) -> u64 {
        self.0 & page.mask()
    }

    /// Checked add, returning `None` on overflow.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, rhs: u64) -> Option<Self> {
        match self.0.checked_add(rhs) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }
}

impl fmt::Debug for MemoryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryAddress(0x{:016X})", self.0)
    }
}

impl fmt::Display for MemoryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.as_u64())
    }
}

impl Add<u64> for MemoryAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u64> for MemoryAddress {
    #[inline]
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_within_page() {
        let ps = PageSize::new(4096).unwrap();
        let a = MemoryAddress::new(0x1234_5678);
        assert_eq!(a.offset(ps), 0x678);
        assert_eq!(MemoryAddress::new(0x1234_5000).offset(ps), 0);
    }

    #[test]
    fn checked_add_detects_overflow() {
        assert!(MemoryAddress::new(u64::MAX).checked_add(1).is_none());
        assert_eq!(
            MemoryAddress::new(1).checked_add(2),
            Some(MemoryAddress::new(3))
        );
    }
}
