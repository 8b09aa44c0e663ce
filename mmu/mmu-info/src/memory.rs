//! # Memory Defaults

/// Width of a simulated virtual address in bits.
pub const ADDRESS_BITS: u32 = 32;

/// Default page size in bytes.
pub const PGSIZE: u32 = 4096;

/// Default size of the virtual address space (the full 32-bit space).
pub const MAX_MEMSIZE: u64 = 4 * 1024 * 1024 * 1024;

/// Default size of the simulated physical memory.
pub const MEMSIZE: u64 = 1024 * 1024 * 1024;

/// Default number of TLB slots.
pub const TLB_ENTRIES: u32 = 512;

/// Size of one page directory or page table entry in the arena.
pub const PAGE_ENTRY_SIZE: u64 = 8;

/// Smallest accepted `log2(page size)`.
///
/// Leaves at most 30 bits for the two table levels.
pub const MIN_PAGE_SHIFT: u32 = 2;

/// Largest accepted `log2(page size)`.
///
/// Leaves at least one bit for each table level.
pub const MAX_PAGE_SHIFT: u32 = ADDRESS_BITS - 2;

const _: () = {
    assert!(PGSIZE.is_power_of_two());
    assert!(MEMSIZE.is_multiple_of(PGSIZE as u64));
    assert!(MAX_MEMSIZE.is_multiple_of(PGSIZE as u64));
    assert!(MAX_MEMSIZE <= 1 << ADDRESS_BITS);
    assert!(PGSIZE.trailing_zeros() >= MIN_PAGE_SHIFT);
    assert!(PGSIZE.trailing_zeros() <= MAX_PAGE_SHIFT);
    assert!(TLB_ENTRIES > 0);
};
