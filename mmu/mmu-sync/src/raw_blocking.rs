use crate::{RawLock, RawUnlock};
use std::sync::{Condvar, Mutex, PoisonError};

/// Raw lock that puts contending threads to sleep.
///
/// The `held` flag is the lock itself; the inner std mutex only protects the
/// flag for the few instructions it takes to test and flip it, so it is never
/// held across user code and cannot be poisoned by it.
pub struct RawBlocking {
    held: Mutex<bool>,
    released: Condvar,
}

impl Default for RawBlocking {
    fn default() -> Self {
        Self::new()
    }
}

impl RawBlocking {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            held: Mutex::new(false),
            released: Condvar::new(),
        }
    }

    pub fn lock(&self) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while *held {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *held = true;
    }

    pub fn try_lock(&self) -> bool {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if *held {
            false
        } else {
            *held = true;
            true
        }
    }

    /// # Safety
    /// The caller must hold the lock.
    pub unsafe fn unlock(&self) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        *held = false;
        drop(held);
        self.released.notify_one();
    }
}

impl RawLock for RawBlocking {
    fn raw_lock(&self) {
        self.lock();
    }

    fn raw_try_lock(&self) -> bool {
        self.try_lock()
    }
}

impl RawUnlock for RawBlocking {
    unsafe fn raw_unlock(&self) {
        unsafe { self.unlock() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn waiter_sleeps_until_release() {
        let raw = Arc::new(RawBlocking::new());
        let acquired = Arc::new(AtomicBool::new(false));
        raw.lock();

        let h = {
            let raw = Arc::clone(&raw);
            let acquired = Arc::clone(&acquired);
            thread::spawn(move || {
                raw.lock();
                acquired.store(true, Ordering::SeqCst);
                unsafe { raw.unlock() };
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert!(!acquired.load(Ordering::SeqCst), "waiter entered a held lock");

        unsafe { raw.unlock() };
        h.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
        assert!(raw.try_lock());
    }
}
