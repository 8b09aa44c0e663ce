//! # Translation Lookaside Buffer
//!
//! A direct-mapped cache of recent translations. The slot of a page is its
//! translation tag (the virtual page number) modulo the number of entries;
//! each slot remembers the tag it holds so aliasing pages are told apart.

use alloc::vec;
use alloc::vec::Vec;
use mmu_addresses::{PhysicalPage, VirtualPage};

/// One TLB slot.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct TlbEntry {
    pub valid: bool,
    pub page: VirtualPage,
    pub frame: PhysicalPage,
}

/// Lookup counters. Only translations count; invalidation and insertion do not.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct TlbStats {
    pub lookups: u64,
    pub misses: u64,
}

impl TlbStats {
    #[inline]
    #[must_use]
    pub const fn hits(&self) -> u64 {
        self.lookups - self.misses
    }

    /// Fraction of lookups that missed, `0.0` before the first lookup.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn miss_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.misses as f64 / self.lookups as f64
        }
    }

    #[inline]
    pub const fn record(&mut self, hit: bool) {
        self.lookups += 1;
        if !hit {
            self.misses += 1;
        }
    }
}

/// Direct-mapped translation cache.
#[derive(Debug, Clone)]
pub struct TlbCache {
    entries: Vec<TlbEntry>,
    stats: TlbStats,
}

impl TlbCache {
    /// Create a cache with `entries` slots, all invalid.
    ///
    /// ### Panics
    /// If `entries` is zero.
    #[must_use]
    pub fn new(entries: u32) -> Self {
        assert!(entries > 0, "a TLB needs at least one entry");
        Self {
            entries: vec![TlbEntry::default(); entries as usize],
            stats: TlbStats::default(),
        }
    }

    /// Slot a page maps to.
    #[inline]
    fn slot(&self, page: VirtualPage) -> usize {
        page.as_usize() % self.entries.len()
    }

    /// Cache `page → frame`, evicting whatever shared the slot.
    pub fn insert(&mut self, page: VirtualPage, frame: PhysicalPage) {
        let slot = self.slot(page);
        self.entries[slot] = TlbEntry {
            valid: true,
            page,
            frame,
        };
    }

    /// Invalidate the slot `page` maps to, whichever page it currently holds.
    pub fn invalidate(&mut self, page: VirtualPage) {
        let slot = self.slot(page);
        self.entries[slot].valid = false;
    }

    /// Cached frame of `page`. Does not touch the counters.
    #[must_use]
    pub fn lookup(&self, page: VirtualPage) -> Option<PhysicalPage> {
        let e = self.entries[self.slot(page)];
        (e.valid && e.page == page).then_some(e.frame)
    }

    #[inline]
    #[must_use]
    pub const fn stats(&self) -> TlbStats {
        self.stats
    }

    #[inline]
    pub const fn stats_mut(&mut self) -> &mut TlbStats {
        &mut self.stats
    }
}
