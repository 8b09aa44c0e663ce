//! # Simulated MMU Configuration
//!
//! This crate is the single source of truth for the sizes that shape the
//! simulation: page size, simulated physical memory, the virtual address space
//! and the TLB. Every other crate reads them from here, so the arena, the
//! bitmaps and the page-table layout can never disagree.
//!
//! ## Modules
//!
//! ### Memory Defaults ([`memory`])
//! Compile-time defaults matching the classic setup: 4 KiB pages, 1 GiB of
//! simulated RAM, a full 4 GiB virtual space and a 512-entry TLB.
//!
//! ### Runtime Configuration ([`config`])
//! [`MmuConfig`] bundles the four sizes and validates them. Tests and tools
//! shrink the defaults freely; validation guarantees the derived structures
//! stay consistent.
//!
//! ## Example
//! ```rust
//! use mmu_info::MmuConfig;
//!
//! let cfg = MmuConfig::default()
//!     .with_physical_size(256 * 1024)
//!     .with_virtual_size(1024 * 1024);
//! assert!(cfg.validate().is_ok());
//! assert_eq!(cfg.physical_pages(), 64);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod config;
pub mod memory;

pub use crate::config::{ConfigError, MmuConfig};
