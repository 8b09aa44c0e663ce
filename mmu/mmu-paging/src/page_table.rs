//! # Two-Level Page Table
//!
//! The directory and every second-level table are arrays of 8-byte
//! [`PageEntry`] values stored in the [`PhysicalArena`]. The directory is
//! allocated once, when the table is created; second-level tables are created
//! on demand by [`PageTable::insert`] and never reclaimed.
//!
//! ## Invariants & Notes
//!
//! - A table occupies `layout.table_pages()` physically contiguous frames and
//!   is zeroed on creation, since its frames may previously have held data.
//! - Mapping entries store the frame number of the data page; the in-page
//!   offset is added by the caller.
//! - After changing a mapping the caller must invalidate the TLB slot.

use crate::{AddressSpaceLayout, DirectoryIndex, FrameAlloc, PageEntry, PhysicalArena, TableIndex};
use log::trace;
use mmu_addresses::{PhysicalAddress, PhysicalPage, VirtualAddress};
use mmu_info::memory::PAGE_ENTRY_SIZE;

/// Failures reported by page table mutation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum PageTableError {
    /// The page containing the address already has a mapping.
    #[error("page at {0} is already mapped")]
    AlreadyMapped(VirtualAddress),
    /// The page containing the address has no mapping.
    #[error("page at {0} is not mapped")]
    NotMapped(VirtualAddress),
    /// No contiguous run of frames was left for a new second-level table.
    #[error("out of physical memory for a page table")]
    OutOfMemory,
}

/// Handle to the directory of a two-level page table living in an arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PageTable {
    directory: PhysicalPage,
    layout: AddressSpaceLayout,
}

impl PageTable {
    /// Allocate and zero the page directory.
    ///
    /// # Errors
    /// [`PageTableError::OutOfMemory`] if `alloc` cannot provide the directory frames.
    pub fn create<A: FrameAlloc>(
        arena: &mut PhysicalArena,
        alloc: &mut A,
        layout: AddressSpaceLayout,
    ) -> Result<Self, PageTableError> {
        let pages = layout.directory_pages();
        let directory = alloc.alloc_contiguous(pages).ok_or(PageTableError::OutOfMemory)?;
        arena.zero_frames(directory, pages);
        trace!("page directory at {directory:?} ({pages} frames)");
        Ok(Self { directory, layout })
    }

    /// First frame of the page directory.
    #[inline]
    #[must_use]
    pub const fn directory(&self) -> PhysicalPage {
        self.directory
    }

    #[inline]
    #[must_use]
    pub const fn layout(&self) -> &AddressSpaceLayout {
        &self.layout
    }

    /// Walk the tables for `va`; returns the frame of its data page.
    #[must_use]
    pub fn lookup(&self, arena: &PhysicalArena, va: VirtualAddress) -> Option<PhysicalPage> {
        let (d, t, _) = self.layout.split(va);
        let table = self.directory_entry(arena, d).frame()?;
        PageEntry::from_raw(arena.read_u64(self.table_slot(table, t))).frame()
    }

    /// Map the page containing `va` to `frame`, creating its second-level
    /// table if the directory slot is empty.
    ///
    /// # Errors
    /// - [`PageTableError::AlreadyMapped`] if the page has a mapping.
    /// - [`PageTableError::OutOfMemory`] if a new table cannot be allocated.
    pub fn insert<A: FrameAlloc>(
        &self,
        arena: &mut PhysicalArena,
        alloc: &mut A,
        va: VirtualAddress,
        frame: PhysicalPage,
    ) -> Result<(), PageTableError> {
        let (d, t, _) = self.layout.split(va);
        let table = match self.directory_entry(arena, d).frame() {
            Some(table) => table,
            None => self.create_table(arena, alloc, d)?,
        };

        let slot = self.table_slot(table, t);
        if PageEntry::from_raw(arena.read_u64(slot)).is_present() {
            return Err(PageTableError::AlreadyMapped(self.layout.compose(d, t)));
        }
        arena.write_u64(slot, PageEntry::mapping(frame).into_raw());
        Ok(())
    }

    /// Clear the mapping of the page containing `va`; returns the frame it mapped.
    ///
    /// # Errors
    /// [`PageTableError::NotMapped`] if either level is absent.
    pub fn remove(&self, arena: &mut PhysicalArena, va: VirtualAddress) -> Result<PhysicalPage, PageTableError> {
        let (d, t, _) = self.layout.split(va);
        let not_mapped = PageTableError::NotMapped(self.layout.compose(d, t));

        let table = self.directory_entry(arena, d).frame().ok_or(not_mapped)?;
        let slot = self.table_slot(table, t);
        let frame = PageEntry::from_raw(arena.read_u64(slot)).frame().ok_or(not_mapped)?;
        arena.write_u64(slot, PageEntry::absent().into_raw());
        Ok(frame)
    }

    fn create_table<A: FrameAlloc>(
        &self,
        arena: &mut PhysicalArena,
        alloc: &mut A,
        d: DirectoryIndex,
    ) -> Result<PhysicalPage, PageTableError> {
        let pages = self.layout.table_pages();
        let table = alloc.alloc_contiguous(pages).ok_or(PageTableError::OutOfMemory)?;
        arena.zero_frames(table, pages);
        arena.write_u64(self.directory_slot(d), PageEntry::mapping(table).into_raw());
        trace!("second-level table {} at {table:?}", d.as_u32());
        Ok(table)
    }

    fn directory_entry(&self, arena: &PhysicalArena, d: DirectoryIndex) -> PageEntry {
        PageEntry::from_raw(arena.read_u64(self.directory_slot(d)))
    }

    #[inline]
    fn directory_slot(&self, d: DirectoryIndex) -> PhysicalAddress {
        self.directory.base(self.layout.page_size()) + d.as_u64() * PAGE_ENTRY_SIZE
    }

    #[inline]
    fn table_slot(&self, table: PhysicalPage, t: TableIndex) -> PhysicalAddress {
        table.base(self.layout.page_size()) + t.as_u64() * PAGE_ENTRY_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::BumpAlloc;
    use mmu_addresses::PageSize;

    const FRAMES: u32 = 64;

    fn setup() -> (PhysicalArena, BumpAlloc, PageTable) {
        let ps = PageSize::SIZE_4K;
        let mut arena = PhysicalArena::new(u64::from(FRAMES) * ps.bytes(), ps);
        let mut alloc = BumpAlloc::new(0, FRAMES);
        let pt = PageTable::create(&mut arena, &mut alloc, AddressSpaceLayout::new(ps)).unwrap();
        (arena, alloc, pt)
    }

    #[test]
    fn directory_takes_the_first_frames() {
        let (_, alloc, pt) = setup();
        assert_eq!(pt.directory(), PhysicalPage::new(0));
        assert_eq!(alloc.next, 2);
    }

    #[test]
    fn insert_then_lookup() {
        let (mut arena, mut alloc, pt) = setup();
        let va = VirtualAddress::new(0x0040_3000);
        pt.insert(&mut arena, &mut alloc, va, PhysicalPage::new(9)).unwrap();

        assert_eq!(pt.lookup(&arena, va), Some(PhysicalPage::new(9)));
        assert_eq!(pt.lookup(&arena, va + 0xFFF), Some(PhysicalPage::new(9)));
        assert_eq!(pt.lookup(&arena, va + 0x1000), None);
        assert_eq!(pt.lookup(&arena, VirtualAddress::new(0x8000_0000)), None);
    }

    #[test]
    fn tables_are_created_once_per_directory_slot() {
        let (mut arena, mut alloc, pt) = setup();
        pt.insert(&mut arena, &mut alloc, VirtualAddress::new(0x1000), PhysicalPage::new(40))
            .unwrap();
        assert_eq!(alloc.next, 4);
        pt.insert(&mut arena, &mut alloc, VirtualAddress::new(0x2000), PhysicalPage::new(41))
            .unwrap();
        assert_eq!(alloc.next, 4);
        pt.insert(&mut arena, &mut alloc, VirtualAddress::new(0x0040_0000), PhysicalPage::new(42))
            .unwrap();
        assert_eq!(alloc.next, 6);
    }

    #[test]
    fn double_insert_is_rejected() {
        let (mut arena, mut alloc, pt) = setup();
        let va = VirtualAddress::new(0x5000);
        pt.insert(&mut arena, &mut alloc, va, PhysicalPage::new(10)).unwrap();
        assert_eq!(
            pt.insert(&mut arena, &mut alloc, va + 4, PhysicalPage::new(11)),
            Err(PageTableError::AlreadyMapped(va))
        );
        assert_eq!(pt.lookup(&arena, va), Some(PhysicalPage::new(10)));
    }

    #[test]
    fn remove_clears_only_that_page() {
        let (mut arena, mut alloc, pt) = setup();
        let a = VirtualAddress::new(0x5000);
        let b = VirtualAddress::new(0x6000);
        pt.insert(&mut arena, &mut alloc, a, PhysicalPage::new(10)).unwrap();
        pt.insert(&mut arena, &mut alloc, b, PhysicalPage::new(11)).unwrap();

        assert_eq!(pt.remove(&mut arena, a + 0x10), Ok(PhysicalPage::new(10)));
        assert_eq!(pt.lookup(&arena, a), None);
        assert_eq!(pt.lookup(&arena, b), Some(PhysicalPage::new(11)));
        assert_eq!(pt.remove(&mut arena, a), Err(PageTableError::NotMapped(a)));
    }

    #[test]
    fn remove_without_table_is_not_mapped() {
        let (mut arena, _, pt) = setup();
        let va = VirtualAddress::new(0xC000_0000);
        assert_eq!(pt.remove(&mut arena, va), Err(PageTableError::NotMapped(va)));
    }

    #[test]
    fn table_allocation_failure_is_out_of_memory() {
        let (mut arena, _, pt) = setup();
        let mut empty = BumpAlloc::new(FRAMES, FRAMES);
        assert_eq!(
            pt.insert(&mut arena, &mut empty, VirtualAddress::new(0x1000), PhysicalPage::new(5)),
            Err(PageTableError::OutOfMemory)
        );
        assert_eq!(pt.lookup(&arena, VirtualAddress::new(0x1000)), None);
    }

    #[test]
    fn recycled_table_frames_are_zeroed() {
        let (mut arena, mut alloc, pt) = setup();
        let ps = PageSize::SIZE_4K;
        arena.write(PhysicalPage::new(2).base(ps), &[0xFF; 2 * 4096]);

        pt.insert(&mut arena, &mut alloc, VirtualAddress::new(0x1000), PhysicalPage::new(20))
            .unwrap();
        assert_eq!(pt.lookup(&arena, VirtualAddress::new(0x2000)), None);
        assert_eq!(pt.lookup(&arena, VirtualAddress::new(0x3F_F000)), None);
    }
}
