use std::{
    cell::UnsafeCell,
    hint::spin_loop,
    mem::MaybeUninit,
    sync::atomic::{AtomicU8, Ordering},
};

const EMPTY: u8 = 0;
const RUNNING: u8 = 1;
const COMPLETE: u8 = 2;

/// A cell written at most once, by whichever thread gets there first.
///
/// Late arrivals spin until the initializer publishes the value.
pub struct SyncOnceCell<T> {
    phase: AtomicU8,
    slot: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Default for SyncOnceCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SyncOnceCell<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: AtomicU8::new(EMPTY),
            slot: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// # Safety
    /// The phase must have been observed as `COMPLETE` with acquire ordering.
    unsafe fn published(&self) -> &T {
        unsafe { (*self.slot.get()).assume_init_ref() }
    }

    #[inline]
    pub fn get(&self) -> Option<&T> {
        (self.phase.load(Ordering::Acquire) == COMPLETE)
            // SAFETY: checked above
            .then(|| unsafe { self.published() })
    }

    /// Returns the stored value, running `init` first if no thread has yet.
    ///
    /// If `init` panics the cell stays in the running phase and every later
    /// caller spins forever.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> &T {
        match self
            .phase
            .compare_exchange(EMPTY, RUNNING, Ordering::Acquire, Ordering::Acquire)
        {
            Ok(_) => {
                // SAFETY: winning the exchange makes this the only writer
                unsafe { (*self.slot.get()).write(init()) };
                self.phase.store(COMPLETE, Ordering::Release);
            }
            Err(RUNNING) => {
                while self.phase.load(Ordering::Acquire) != COMPLETE {
                    spin_loop();
                }
            }
            Err(_) => {}
        }
        // SAFETY: every branch above ends with the phase at COMPLETE
        unsafe { self.published() }
    }
}

impl<T> Drop for SyncOnceCell<T> {
    fn drop(&mut self) {
        if *self.phase.get_mut() == COMPLETE {
            // SAFETY: the slot holds an initialized value
            unsafe { self.slot.get_mut().assume_init_drop() };
        }
    }
}

// SAFETY: the slot has a single writer and is read only once published.
unsafe impl<T: Sync + Send> Sync for SyncOnceCell<T> {}
unsafe impl<T: Send> Send for SyncOnceCell<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn initializes_once_under_contention() {
        let cell = Arc::new(SyncOnceCell::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let start = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cell = Arc::clone(&cell);
                let calls = Arc::clone(&calls);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    *cell.get_or_init(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        i
                    })
                })
            })
            .collect();

        let seen: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(seen.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(cell.get(), Some(&seen[0]));
    }

    #[test]
    fn empty_cell_reports_none() {
        let cell: SyncOnceCell<String> = SyncOnceCell::new();
        assert!(cell.get().is_none());
        assert_eq!(cell.get_or_init(|| "x".to_owned()), "x");
    }
}
