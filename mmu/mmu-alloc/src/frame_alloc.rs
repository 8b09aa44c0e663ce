//! Bitmap-backed physical frame allocator.
//!
//! Hands out frames of the simulated arena, lowest free frame first. It is
//! also the [`FrameAlloc`] the page table uses for new second-level tables.

use crate::bitmap::Bitmap;
use mmu_addresses::PhysicalPage;
use mmu_paging::FrameAlloc;

#[derive(Clone, Debug)]
pub struct BitmapFrameAlloc {
    used: Bitmap,
}

impl BitmapFrameAlloc {
    /// Track `frames` frames, all free.
    #[must_use]
    pub fn new(frames: u32) -> Self {
        Self {
            used: Bitmap::new(frames),
        }
    }

    /// Return `frame` to the pool.
    pub fn free(&mut self, frame: PhysicalPage) {
        debug_assert!(self.used.get(frame.number()), "double free of {frame:?}");
        self.used.clear(frame.number());
    }

    #[inline]
    #[must_use]
    pub const fn bitmap(&self) -> &Bitmap {
        &self.used
    }
}

impl FrameAlloc for BitmapFrameAlloc {
    fn alloc_contiguous(&mut self, count: u32) -> Option<PhysicalPage> {
        let first = self.used.find_free_run(count)?;
        self.used.set_range(first, count);
        Some(PhysicalPage::new(first))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowest_free_frame_first() {
        let mut a = BitmapFrameAlloc::new(8);
        assert_eq!(a.alloc_contiguous(2), Some(PhysicalPage::new(0)));
        assert_eq!(a.alloc_frame(), Some(PhysicalPage::new(2)));
        a.free(PhysicalPage::new(0));
        assert_eq!(a.alloc_frame(), Some(PhysicalPage::new(0)));
        assert_eq!(a.bitmap().count_set(), 3);
    }

    #[test]
    fn contiguous_runs_skip_holes() {
        let mut a = BitmapFrameAlloc::new(8);
        let _ = a.alloc_contiguous(3);
        a.free(PhysicalPage::new(1));
        assert_eq!(a.alloc_contiguous(2), Some(PhysicalPage::new(3)));
        assert!(a.bitmap().get(4));
        assert!(!a.bitmap().get(1));
    }

    #[test]
    fn exhaustion_returns_none() {
        let mut a = BitmapFrameAlloc::new(2);
        assert!(a.alloc_contiguous(2).is_some());
        assert_eq!(a.alloc_frame(), None);
    }
}
