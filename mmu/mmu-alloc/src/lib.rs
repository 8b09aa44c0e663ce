//! # Simulated MMU Allocation and Access
//!
//! The allocator half of the simulated MMU. Built on the translation
//! machinery of `mmu-paging`, this crate adds the bookkeeping that decides
//! *which* pages and frames are in use and the byte-level access path that
//! client code sees.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     Mmu context                     │
//! │    • allocate / release of page runs                │
//! │    • multi-page write / read with fill tracking     │
//! │    • one coarse lock, lazy initialisation           │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │          Translator (TLB + page-table walk)         │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │   Bitmaps: virtual pages, physical frames           │
//! │    • first-fit contiguous run search                │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Components
//!
//! - [`Bitmap`]: packed usage bits with [`Bitmap::find_free_run`].
//! - [`BitmapFrameAlloc`]: physical frames, also feeding new page tables.
//! - [`PageFillTable`]: how far writes reached into each page.
//! - [`Mmu`]: the context tying it all together. [`SpinMmu`] swaps the
//!   parking lock for a spin lock.
//!
//! ## Invariants
//!
//! - Virtual page 0 is never handed out, so address zero is never valid.
//! - The page directory occupies the lowest physical frames for the lifetime
//!   of the context.
//! - A failed `allocate` or `release` leaves both bitmaps unchanged.

pub mod bitmap;
pub mod fill;
pub mod frame_alloc;
pub mod mmu;

pub use crate::bitmap::Bitmap;
pub use crate::fill::PageFillTable;
pub use crate::frame_alloc::BitmapFrameAlloc;
pub use crate::mmu::{Mmu, MmuError, Occupancy, SpinMmu};
pub use mmu_addresses::{PhysicalAddress, VirtualAddress};
pub use mmu_info::{ConfigError, MmuConfig};
pub use mmu_paging::{AddressSpaceLayout, TlbStats};
pub use mmu_sync::{RawBlocking, RawLock, RawSpin, RawUnlock};
