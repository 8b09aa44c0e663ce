//! # Runtime Configuration

use crate::memory::{
    ADDRESS_BITS, MAX_MEMSIZE, MAX_PAGE_SHIFT, MEMSIZE, MIN_PAGE_SHIFT, PGSIZE, TLB_ENTRIES,
};
use mmu_addresses::PageSize;

/// Sizes of one simulated address space.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct MmuConfig {
    /// Page size in bytes; must be a power of two.
    pub page_size: u32,
    /// Size of the simulated physical arena in bytes.
    pub physical_size: u64,
    /// Size of the virtual address space in bytes (at most 4 GiB).
    pub virtual_size: u64,
    /// Number of direct-mapped TLB slots.
    pub tlb_entries: u32,
}

impl Default for MmuConfig {
    fn default() -> Self {
        Self {
            page_size: PGSIZE,
            physical_size: MEMSIZE,
            virtual_size: MAX_MEMSIZE,
            tlb_entries: TLB_ENTRIES,
        }
    }
}

impl MmuConfig {
    #[must_use]
    pub const fn with_page_size(mut self, bytes: u32) -> Self {
        self.page_size = bytes;
        self
    }

    #[must_use]
    pub const fn with_physical_size(mut self, bytes: u64) -> Self {
        self.physical_size = bytes;
        self
    }

    #[must_use]
    pub const fn with_virtual_size(mut self, bytes: u64) -> Self {
        self.virtual_size = bytes;
        self
    }

    #[must_use]
    pub const fn with_tlb_entries(mut self, entries: u32) -> Self {
        self.tlb_entries = entries;
        self
    }

    /// Check that all sizes are usable.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found, checking the page size first
    /// since every other check depends on it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let page = match PageSize::new(self.page_size) {
            Some(p) if (MIN_PAGE_SHIFT..=MAX_PAGE_SHIFT).contains(&p.shift()) => p,
            _ => return Err(ConfigError::PageSize(self.page_size)),
        };

        if self.physical_size == 0
            || !self.physical_size.is_multiple_of(page.bytes())
            || page.pages_for(self.physical_size) > u64::from(u32::MAX)
        {
            return Err(ConfigError::PhysicalSize(self.physical_size));
        }

        if self.virtual_size > 1 << ADDRESS_BITS
            || !self.virtual_size.is_multiple_of(page.bytes())
            || page.pages_for(self.virtual_size) < 2
        {
            return Err(ConfigError::VirtualSize(self.virtual_size));
        }

        if self.tlb_entries == 0 {
            return Err(ConfigError::TlbEntries);
        }

        Ok(())
    }

    /// The page size, falling back to 4 KiB for an unvalidated config.
    #[must_use]
    pub fn page(&self) -> PageSize {
        PageSize::new(self.page_size).unwrap_or_default()
    }

    /// Number of physical frames in the arena.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn physical_pages(&self) -> u32 {
        (self.physical_size >> self.page().shift()) as u32
    }

    /// Number of pages in the virtual address space.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn virtual_pages(&self) -> u32 {
        // 4 GiB of 1-byte pages is ruled out by MIN_PAGE_SHIFT.
        (self.virtual_size >> self.page().shift()) as u32
    }
}

/// Rejected configuration values.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("page size {0} is not a power of two between 4 bytes and 1 GiB")]
    PageSize(u32),
    #[error("physical size {0:#x} is not a non-zero whole number of pages")]
    PhysicalSize(u64),
    #[error("virtual size {0:#x} must be at least two pages, page aligned and at most 4 GiB")]
    VirtualSize(u64),
    #[error("the TLB needs at least one entry")]
    TlbEntries,
    #[error("physical memory holds {available} pages but the page tables alone need {required}")]
    PhysicalTooSmall { required: u64, available: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = MmuConfig::default();
        assert_eq!(cfg.validate(), Ok(()));
        assert_eq!(cfg.physical_pages(), 262_144);
        assert_eq!(cfg.virtual_pages(), 1_048_576);
    }

    #[test]
    fn rejects_bad_page_sizes() {
        for bad in [0, 3, 4095, 2] {
            let cfg = MmuConfig::default().with_page_size(bad);
            assert_eq!(cfg.validate(), Err(ConfigError::PageSize(bad)));
        }
        let huge = MmuConfig::default().with_page_size(1 << 31);
        assert_eq!(huge.validate(), Err(ConfigError::PageSize(1 << 31)));
    }

    #[test]
    fn rejects_unaligned_or_empty_physical_memory() {
        let cfg = MmuConfig::default().with_physical_size(4096 * 3 + 1);
        assert_eq!(cfg.validate(), Err(ConfigError::PhysicalSize(4096 * 3 + 1)));
        let cfg = MmuConfig::default().with_physical_size(0);
        assert_eq!(cfg.validate(), Err(ConfigError::PhysicalSize(0)));
    }

    #[test]
    fn rejects_oversized_virtual_space() {
        let cfg = MmuConfig::default().with_virtual_size((1 << 32) + 4096);
        assert!(matches!(cfg.validate(), Err(ConfigError::VirtualSize(_))));
        let cfg = MmuConfig::default().with_virtual_size(4096);
        assert_eq!(cfg.validate(), Err(ConfigError::VirtualSize(4096)));
    }

    #[test]
    fn rejects_empty_tlb() {
        let cfg = MmuConfig::default().with_tlb_entries(0);
        assert_eq!(cfg.validate(), Err(ConfigError::TlbEntries));
    }
}
