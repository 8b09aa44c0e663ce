use crate::{RawLock, RawUnlock};
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// A value of type `T` guarded by the raw lock `R`.
///
/// The raw lock decides how contending threads wait; the mutex only ties the
/// lock to the data and hands out [`MutexGuard`]s.
pub struct Mutex<T, R> {
    raw: R,
    data: UnsafeCell<T>,
}

// SAFETY: the raw lock serializes every access to `data`.
unsafe impl<T: Send, R: Sync> Sync for Mutex<T, R> {}

impl<T, R> Mutex<T, R> {
    pub const fn from_raw(raw: R, value: T) -> Self {
        Self {
            raw,
            data: UnsafeCell::new(value),
        }
    }
}

impl<T, R: Default> Mutex<T, R> {
    pub fn new(value: T) -> Self {
        Self::from_raw(R::default(), value)
    }
}

impl<T: Default, R: Default> Default for Mutex<T, R> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T, R: RawLock + RawUnlock> Mutex<T, R> {
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, T, R> {
        self.raw.raw_lock();
        // SAFETY: the lock was just taken
        unsafe { MutexGuard::new(self) }
    }

    #[inline]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T, R>> {
        self.raw
            .raw_try_lock()
            // SAFETY: the lock was just taken
            .then(|| unsafe { MutexGuard::new(self) })
    }

    /// Runs `f` with the lock held.
    #[inline]
    pub fn with_lock<U>(&self, f: impl FnOnce(&mut T) -> U) -> U {
        f(&mut self.lock())
    }
}

impl<T, R> fmt::Debug for Mutex<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutex").finish_non_exhaustive()
    }
}

/// Grants access to the guarded value until dropped.
///
/// The lock is released on drop, including while unwinding.
pub struct MutexGuard<'a, T, R: RawUnlock> {
    raw: &'a R,
    data: &'a mut T,
}

impl<'a, T, R: RawUnlock> MutexGuard<'a, T, R> {
    /// # Safety
    /// The caller must hold `mutex.raw` and hand that ownership to the guard.
    unsafe fn new(mutex: &'a Mutex<T, R>) -> Self {
        Self {
            raw: &mutex.raw,
            // SAFETY: the held lock excludes every other reference
            data: unsafe { &mut *mutex.data.get() },
        }
    }
}

impl<T, R: RawUnlock> Deref for MutexGuard<'_, T, R> {
    type Target = T;

    fn deref(&self) -> &T {
        self.data
    }
}

impl<T, R: RawUnlock> DerefMut for MutexGuard<'_, T, R> {
    fn deref_mut(&mut self) -> &mut T {
        self.data
    }
}

impl<T, R: RawUnlock> Drop for MutexGuard<'_, T, R> {
    fn drop(&mut self) {
        // SAFETY: the guard owns the held lock
        unsafe { self.raw.raw_unlock() }
    }
}
