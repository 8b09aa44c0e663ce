use crate::{RawLock, RawUnlock};
use std::hint::spin_loop;
use std::sync::atomic::{AtomicBool, Ordering};

/// Upper bound on the pause loop between two acquisition attempts.
const MAX_BACKOFF: u32 = 64;

/// Busy-waiting raw lock with bounded exponential backoff.
///
/// Waiters poll with plain loads and only retry the exchange once the flag
/// reads clear. There is no fairness.
pub struct RawSpin {
    locked: AtomicBool,
}

impl Default for RawSpin {
    fn default() -> Self {
        Self::new()
    }
}

impl RawSpin {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    fn acquire(&self) -> bool {
        self.locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    pub fn lock(&self) {
        let mut backoff = 1;
        while !self.acquire() {
            while self.locked.load(Ordering::Relaxed) {
                for _ in 0..backoff {
                    spin_loop();
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }

    #[inline]
    pub fn try_lock(&self) -> bool {
        !self.locked.load(Ordering::Relaxed) && !self.locked.swap(true, Ordering::Acquire)
    }

    /// # Safety
    /// Only the current holder may unlock.
    #[inline]
    pub unsafe fn unlock(&self) {
        debug_assert!(self.locked.load(Ordering::Relaxed), "unlock of a free spin lock");
        self.locked.store(false, Ordering::Release);
    }
}

impl RawLock for RawSpin {
    #[inline]
    fn raw_lock(&self) {
        self.lock();
    }

    #[inline]
    fn raw_try_lock(&self) -> bool {
        self.try_lock()
    }
}

impl RawUnlock for RawSpin {
    #[inline]
    unsafe fn raw_unlock(&self) {
        // SAFETY: forwarded from the caller
        unsafe { self.unlock() }
    }
}
