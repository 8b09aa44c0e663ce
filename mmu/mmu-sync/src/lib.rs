//! # Synchronization primitives for the simulated MMU
//!
//! One coarse lock guards every shared structure of a simulated address space.
//! [`Mutex`] is generic over the raw lock so the discipline can be chosen per
//! address space:
//!
//! - [`RawSpin`]: busy waiting with bounded backoff, suited to
//!   short critical sections.
//! - [`RawBlocking`]: contending threads sleep on a condition variable instead
//!   of burning CPU. This is the default.
//!
//! [`SyncOnceCell`] provides one-shot lazy initialization.

#![allow(unsafe_code)]

mod mutex;
mod raw_blocking;
mod raw_spin;
mod sync_once_cell;

pub use mutex::{Mutex, MutexGuard};
pub use raw_blocking::RawBlocking;
pub use raw_spin::RawSpin;
pub use sync_once_cell::SyncOnceCell;

pub type SpinMutex<T> = Mutex<T, RawSpin>;
pub type BlockingMutex<T> = Mutex<T, RawBlocking>;

pub trait RawLock {
    fn raw_lock(&self);
    fn raw_try_lock(&self) -> bool;
}

pub trait RawUnlock {
    /// # Safety
    /// The caller must currently hold the lock.
    unsafe fn raw_unlock(&self);
}
