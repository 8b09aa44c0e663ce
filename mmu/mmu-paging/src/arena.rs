//! # Physical Arena
//!
//! One contiguous, zero-initialised byte buffer standing in for physical RAM.
//! A [`PhysicalAddress`] is an offset into this buffer; the page directory,
//! every second-level table and all data pages live here.
//!
//! Every access is bounds-checked. Going out of range is an internal
//! invariant violation (a corrupt table entry or a bad translation), so it
//! panics instead of returning an error.

use alloc::vec;
use alloc::vec::Vec;
use core::ops::Range;
use mmu_addresses::{PageSize, PhysicalAddress, PhysicalPage};

/// The simulated physical memory.
pub struct PhysicalArena {
    bytes: Vec<u8>,
    page: PageSize,
}

impl PhysicalArena {
    /// Allocate `size` zeroed bytes divided into frames of `page`.
    ///
    /// ### Panics
    /// If `size` does not fit the host's address space.
    #[must_use]
    pub fn new(size: u64, page: PageSize) -> Self {
        let len = usize::try_from(size).unwrap_or_else(|_| panic!("arena of {size} bytes exceeds host memory"));
        Self {
            bytes: vec![0; len],
            page,
        }
    }

    /// Copy `buf.len()` bytes starting at `pa` into `buf`.
    pub fn read(&self, pa: PhysicalAddress, buf: &mut [u8]) {
        let r = self.range(pa, buf.len());
        buf.copy_from_slice(&self.bytes[r]);
    }

    /// Copy `data` into the arena starting at `pa`.
    pub fn write(&mut self, pa: PhysicalAddress, data: &[u8]) {
        let r = self.range(pa, data.len());
        self.bytes[r].copy_from_slice(data);
    }

    /// Zero `count` consecutive frames starting at `first`.
    pub fn zero_frames(&mut self, first: PhysicalPage, count: u32) {
        let len = usize::try_from(u64::from(count) << self.page.shift()).unwrap_or(usize::MAX);
        let r = self.range(first.base(self.page), len);
        self.bytes[r].fill(0);
    }

    /// Load a little-endian `u64` (one page-table entry).
    #[must_use]
    pub fn read_u64(&self, pa: PhysicalAddress) -> u64 {
        let mut raw = [0u8; 8];
        self.read(pa, &mut raw);
        u64::from_le_bytes(raw)
    }

    /// Store a little-endian `u64` (one page-table entry).
    pub fn write_u64(&mut self, pa: PhysicalAddress, value: u64) {
        self.write(pa, &value.to_le_bytes());
    }

    fn range(&self, pa: PhysicalAddress, len: usize) -> Range<usize> {
        let start = usize::try_from(pa.as_u64()).unwrap_or(usize::MAX);
        let end = start.checked_add(len);
        match end {
            Some(end) if end <= self.bytes.len() => start..end,
            _ => panic!(
                "physical access {pa:?}+{len:#x} outside arena of {:#x} bytes",
                self.bytes.len()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peek(a: &PhysicalArena, pa: u64, len: usize) -> Vec<u8> {
        let mut buf = vec![0; len];
        a.read(PhysicalAddress::new(pa), &mut buf);
        buf
    }

    #[test]
    fn starts_zeroed_and_round_trips() {
        let mut a = PhysicalArena::new(64 * 1024, PageSize::SIZE_4K);
        assert!(peek(&a, 0, 64 * 1024).iter().all(|&b| b == 0));

        a.write(PhysicalAddress::new(0x1FFE), b"abcd");
        let mut buf = [0u8; 4];
        a.read(PhysicalAddress::new(0x1FFE), &mut buf);
        assert_eq!(&buf, b"abcd");
    }

    #[test]
    fn u64_is_little_endian() {
        let mut a = PhysicalArena::new(4096, PageSize::SIZE_4K);
        a.write_u64(PhysicalAddress::new(8), 0x0102_0304_0506_0708);
        assert_eq!(peek(&a, 8, 2), [0x08, 0x07]);
        assert_eq!(a.read_u64(PhysicalAddress::new(8)), 0x0102_0304_0506_0708);
    }

    #[test]
    fn zero_frames_clears_only_the_requested_frames() {
        let mut a = PhysicalArena::new(3 * 4096, PageSize::SIZE_4K);
        a.write(PhysicalAddress::new(0), &[0xAA; 3 * 4096]);
        a.zero_frames(PhysicalPage::new(1), 1);
        assert!(peek(&a, 4096, 4096).iter().all(|&b| b == 0));
        assert_eq!(peek(&a, 4095, 1), [0xAA]);
        assert_eq!(peek(&a, 8192, 1), [0xAA]);
    }

    #[test]
    #[should_panic(expected = "outside arena")]
    fn out_of_range_access_is_fatal() {
        let a = PhysicalArena::new(4096, PageSize::SIZE_4K);
        let _ = a.read_u64(PhysicalAddress::new(4092));
    }
}
