//! Per-page record of how far writes have reached.

use mmu_addresses::VirtualPage;

/// Furthest in-page end offset written to each virtual page since it was
/// allocated. Reads beyond it are refused.
#[derive(Clone, Debug)]
pub struct PageFillTable {
    fills: Vec<u32>,
}

impl PageFillTable {
    #[must_use]
    pub fn new(pages: u32) -> Self {
        Self {
            fills: vec![0; pages as usize],
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, page: VirtualPage) -> u64 {
        u64::from(self.fills[page.as_usize()])
    }

    /// Raise the fill of `page` to `end` if it is lower.
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub fn record(&mut self, page: VirtualPage, end: u64) {
        let slot = &mut self.fills[page.as_usize()];
        // Bounded by the page size, which is at most 1 GiB.
        *slot = (*slot).max(end as u32);
    }

    #[inline]
    pub fn reset(&mut self, page: VirtualPage) {
        self.fills[page.as_usize()] = 0;
    }
}
