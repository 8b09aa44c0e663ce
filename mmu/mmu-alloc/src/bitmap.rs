//! Packed page-usage bitmap.
//!
//! Each bit represents one page: 0 = free, 1 = used. Bits are stored
//! least-significant first within each byte.

/// A fixed-capacity bit vector.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Bitmap {
    bytes: Vec<u8>,
    capacity: u32,
}

impl Bitmap {
    /// A bitmap of `capacity` clear bits.
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        Self {
            bytes: vec![0; capacity.div_ceil(8) as usize],
            capacity,
        }
    }

    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// # Panics
    /// If `i` is not below the capacity.
    #[inline]
    #[must_use]
    pub fn get(&self, i: u32) -> bool {
        let (byte, mask) = self.locate(i);
        self.bytes[byte] & mask != 0
    }

    /// # Panics
    /// If `i` is not below the capacity.
    #[inline]
    pub fn set(&mut self, i: u32) {
        let (byte, mask) = self.locate(i);
        self.bytes[byte] |= mask;
    }

    /// # Panics
    /// If `i` is not below the capacity.
    #[inline]
    pub fn clear(&mut self, i: u32) {
        let (byte, mask) = self.locate(i);
        self.bytes[byte] &= !mask;
    }

    /// Set bits `start..start + count`.
    ///
    /// # Panics
    /// If the range reaches past the capacity.
    pub fn set_range(&mut self, start: u32, count: u32) {
        for i in start..start + count {
            self.set(i);
        }
    }

    /// Number of set bits.
    #[must_use]
    pub fn count_set(&self) -> u32 {
        self.bytes.iter().map(|b| b.count_ones()).sum()
    }

    /// Lowest index starting `n` consecutive clear bits (first fit).
    ///
    /// Runs may cross byte boundaries. Fully used bytes are skipped and fully
    /// free bytes are taken whole; everything else is scanned bit by bit.
    /// Returns `None` for `n == 0` or when no run fits before the end.
    #[must_use]
    pub fn find_free_run(&self, n: u32) -> Option<u32> {
        if n == 0 || n > self.capacity {
            return None;
        }

        let mut start = 0;
        let mut run = 0;
        let mut i = 0;
        while i < self.capacity {
            if i % 8 == 0 && i + 8 <= self.capacity {
                match self.bytes[(i / 8) as usize] {
                    0xFF => {
                        run = 0;
                        i += 8;
                        continue;
                    }
                    0x00 => {
                        if run == 0 {
                            start = i;
                        }
                        run += 8;
                        if run >= n {
                            return Some(start);
                        }
                        i += 8;
                        continue;
                    }
                    _ => {}
                }
            }

            if self.get(i) {
                run = 0;
            } else {
                if run == 0 {
                    start = i;
                }
                run += 1;
                if run == n {
                    return Some(start);
                }
            }
            i += 1;
        }
        None
    }

    #[inline]
    fn locate(&self, i: u32) -> (usize, u8) {
        assert!(i < self.capacity, "bit {i} out of range for bitmap of {}", self.capacity);
        ((i / 8) as usize, 1 << (i % 8))
    }
}
