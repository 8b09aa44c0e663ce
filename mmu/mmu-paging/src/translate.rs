//! # Translation
//!
//! Virtual → physical translation as the hardware would do it: consult the
//! TLB, fall back to a page-table walk on a miss and refill the TLB with the
//! result. Every call counts as one lookup.

use crate::{PageTable, PhysicalArena, TlbCache};
use log::trace;
use mmu_addresses::{PhysicalAddress, VirtualAddress};

/// Borrowed view over the pieces a translation needs.
pub struct Translator<'a> {
    table: &'a PageTable,
    arena: &'a PhysicalArena,
    tlb: &'a mut TlbCache,
}

impl<'a> Translator<'a> {
    #[inline]
    pub const fn new(table: &'a PageTable, arena: &'a PhysicalArena, tlb: &'a mut TlbCache) -> Self {
        Self { table, arena, tlb }
    }

    /// Translate `va`, offset included. `None` if its page is unmapped.
    ///
    /// Unmapped pages count as a miss and leave the TLB untouched.
    pub fn translate(&mut self, va: VirtualAddress) -> Option<PhysicalAddress> {
        let layout = self.table.layout();
        let (d, t, offset) = layout.split(va);
        let page = layout.tag(d, t);

        let frame = if let Some(frame) = self.tlb.lookup(page) {
            self.tlb.stats_mut().record(true);
            frame
        } else {
            self.tlb.stats_mut().record(false);
            let frame = self.table.lookup(self.arena, va)?;
            trace!("TLB miss {page:?} -> {frame:?}");
            self.tlb.insert(page, frame);
            frame
        };
        Some(frame.base(layout.page_size()) + offset)
    }
}
