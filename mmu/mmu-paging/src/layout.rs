//! # Address Space Layout
//!
//! Derives the bit-field split of a 32-bit virtual address from the page size.
//! The bits left over after the page offset are shared between the two table
//! levels as evenly as possible; when the count is odd the directory gets the
//! smaller half.

use mmu_addresses::{PageSize, VirtualAddress, VirtualPage};
use mmu_info::memory::{ADDRESS_BITS, PAGE_ENTRY_SIZE};

/// Index into the page directory (the top `directory_bits` of an address).
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DirectoryIndex(u32);

/// Index into a second-level page table.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TableIndex(u32);

impl DirectoryIndex {
    #[inline]
    #[must_use]
    pub const fn new(v: u32) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0 as u64
    }
}

impl TableIndex {
    #[inline]
    #[must_use]
    pub const fn new(v: u32) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0 as u64
    }
}

/// Immutable split of a virtual address into `{directory, table, offset}`.
///
/// ### Invariants
/// - `offset_bits + directory_bits + table_bits == 32`
/// - `directory_bits <= table_bits <= directory_bits + 1`
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[allow(clippy::struct_field_names)]
pub struct AddressSpaceLayout {
    offset_bits: u32,
    directory_bits: u32,
    table_bits: u32,
}

impl AddressSpaceLayout {
    /// Derive the layout for `page`.
    ///
    /// ### Panics
    /// If the page leaves fewer than two bits for the table levels; a
    /// validated [`MmuConfig`](mmu_info::MmuConfig) never does.
    #[must_use]
    pub const fn new(page: PageSize) -> Self {
        let offset_bits = page.shift();
        assert!(offset_bits + 2 <= ADDRESS_BITS, "page size too large for a two-level table");
        let leftover = ADDRESS_BITS - offset_bits;
        let table_bits = leftover.div_ceil(2);
        let directory_bits = leftover - table_bits;
        Self {
            offset_bits,
            directory_bits,
            table_bits,
        }
    }

    #[inline]
    #[must_use]
    pub const fn offset_bits(&self) -> u32 {
        self.offset_bits
    }

    #[inline]
    #[must_use]
    pub const fn directory_bits(&self) -> u32 {
        self.directory_bits
    }

    #[inline]
    #[must_use]
    pub const fn table_bits(&self) -> u32 {
        self.table_bits
    }

    #[inline]
    #[must_use]
    pub const fn page_size(&self) -> PageSize {
        PageSize::from_shift(self.offset_bits)
    }

    /// Number of entries in the page directory.
    #[inline]
    #[must_use]
    pub const fn directory_entries(&self) -> u64 {
        1 << self.directory_bits
    }

    /// Number of entries in one second-level table.
    #[inline]
    #[must_use]
    pub const fn table_entries(&self) -> u64 {
        1 << self.table_bits
    }

    /// Bytes occupied by the directory in the arena.
    #[inline]
    #[must_use]
    pub const fn directory_bytes(&self) -> u64 {
        self.directory_entries() * PAGE_ENTRY_SIZE
    }

    /// Bytes occupied by one second-level table in the arena.
    #[inline]
    #[must_use]
    pub const fn table_bytes(&self) -> u64 {
        self.table_entries() * PAGE_ENTRY_SIZE
    }

    /// Frames needed to hold the directory.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn directory_pages(&self) -> u32 {
        self.page_size().pages_for(self.directory_bytes()) as u32
    }

    /// Frames needed to hold one second-level table.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn table_pages(&self) -> u32 {
        self.page_size().pages_for(self.table_bytes()) as u32
    }

    /// Decompose `va` into `(directory, table, offset)`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn split(&self, va: VirtualAddress) -> (DirectoryIndex, TableIndex, u64) {
        let raw = va.as_u64();
        assert!(raw >> ADDRESS_BITS == 0, "virtual address outside the 32-bit space");
        let directory = (raw >> (self.offset_bits + self.table_bits)) as u32;
        let table = ((raw >> self.offset_bits) & (self.table_entries() - 1)) as u32;
        let offset = raw & self.page_size().mask();
        (DirectoryIndex(directory), TableIndex(table), offset)
    }

    /// Inverse of [`split`](Self::split) for the page base.
    #[inline]
    #[must_use]
    pub const fn compose(&self, directory: DirectoryIndex, table: TableIndex) -> VirtualAddress {
        let raw = (directory.0 << (self.offset_bits + self.table_bits)) | (table.0 << self.offset_bits);
        VirtualAddress::new(raw)
    }

    /// The translation tag of a page: `directory * table_entries + table`.
    ///
    /// Because the address is exactly 32 bits wide this equals the virtual
    /// page number, which is what the TLB and the fill table index by.
    #[inline]
    #[must_use]
    pub const fn tag(&self, directory: DirectoryIndex, table: TableIndex) -> VirtualPage {
        VirtualPage::new((directory.0 << self.table_bits) | table.0)
    }
}
