//! # Simulated Two-Level Paging
//!
//! Translation machinery of the simulated MMU: the address-space layout, the
//! physical RAM arena, the in-arena page tables and the translation cache.
//!
//! ## What you get
//! - An [`AddressSpaceLayout`] that splits a 32-bit virtual address into
//!   directory index, table index and page offset for a runtime page size.
//! - A [`PhysicalArena`]: one contiguous byte buffer standing in for RAM.
//!   Physical addresses are offsets into it, never host pointers.
//! - A two-level [`PageTable`] whose directory and tables live **inside** the
//!   arena, exactly like hardware tables live in RAM.
//! - A direct-mapped [`TlbCache`] with hit/miss [`TlbStats`].
//! - A [`Translator`] that consults the TLB first and walks the tables on a miss.
//! - A tiny allocator interface ([`FrameAlloc`]) the table code uses to obtain
//!   frames for new second-level tables.
//!
//! ## Virtual Address → Physical Address Walk
//!
//! With 4 KiB pages a virtual address is divided into three fields:
//!
//! ```text
//! | 31‒22 | 21‒12 | 11‒0   |
//! |  Dir  | Table | Offset |
//! ```
//!
//! ```text
//!  Directory  →  Table  →  Physical Page
//!     │            │
//!     │            └───► Table entry     → frame holding the data page
//!     └────────────────► Directory entry → first frame of a second-level table
//! ```
//!
//! Each entry is 8 bytes with an explicit *present* bit; a cleared entry is
//! "absent", so frame 0 remains a perfectly valid mapping target.

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod arena;
mod layout;
mod page_entry;
mod page_table;
mod tlb;
mod translate;

pub use crate::arena::PhysicalArena;
pub use crate::layout::{AddressSpaceLayout, DirectoryIndex, TableIndex};
pub use crate::page_entry::{PageEntry, PageEntryBits};
pub use crate::page_table::{PageTable, PageTableError};
pub use crate::tlb::{TlbCache, TlbEntry, TlbStats};
pub use crate::translate::Translator;

/// Re-export address types.
pub use mmu_addresses as addresses;

use mmu_addresses::PhysicalPage;

/// Source of **physical** frames for page tables.
///
/// The implementation decides where frames come from (bitmap, bump pointer,
/// etc.). Returned frames are marked used by the allocator; the caller owns
/// their contents.
///
/// Returns `None` when no suitable run of frames exists.
pub trait FrameAlloc {
    /// Allocate `count` physically contiguous frames and return the first.
    fn alloc_contiguous(&mut self, count: u32) -> Option<PhysicalPage>;

    /// Allocate a single frame.
    fn alloc_frame(&mut self) -> Option<PhysicalPage> {
        self.alloc_contiguous(1)
    }
}
