use core::fmt;

/// A power-of-two page size chosen at configuration time.
///
/// Stores only `log2(size)`; the byte size and offset mask are derived.
///
/// ### Examples
/// ```rust
/// # use mmu_addresses::PageSize;
/// let ps = PageSize::new(4096).unwrap();
/// assert_eq!(ps.shift(), 12);
/// assert_eq!(ps.pages_for(1), 1);
/// assert_eq!(ps.pages_for(4096), 1);
/// assert_eq!(ps.pages_for(4097), 2);
/// assert!(PageSize::new(3000).is_none());
/// ```
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PageSize {
    shift: u32,
}

impl PageSize {
    /// The default page size (4 KiB).
    pub const SIZE_4K: Self = Self::from_shift(12);

    /// Build from a byte size; `None` unless `bytes` is a non-zero power of two.
    #[inline]
    #[must_use]
    pub const fn new(bytes: u32) -> Option<Self> {
        if bytes.is_power_of_two() {
            Some(Self::from_shift(bytes.trailing_zeros()))
        } else {
            None
        }
    }

    /// Build from `log2(size)`.
    ///
    /// ### Debug assertions
    /// - Asserts `shift < 32` in debug builds.
    #[inline]
    #[must_use]
    pub const fn from_shift(shift: u32) -> Self {
        debug_assert!(shift < 32);
        Self { shift }
    }

    /// `log2(size)`, i.e. the number of low address bits used for the offset.
    #[inline]
    #[must_use]
    pub const fn shift(self) -> u32 {
        self.shift
    }

    /// Page size in bytes.
    #[inline]
    #[must_use]
    pub const fn bytes(self) -> u64 {
        1 << self.shift
    }

    /// Mask selecting the in-page offset bits.
    #[inline]
    #[must_use]
    pub const fn mask(self) -> u64 {
        self.bytes() - 1
    }

    /// Number of pages needed to hold `len` bytes (ceiling division).
    #[inline]
    #[must_use]
    pub const fn pages_for(self, len: u64) -> u64 {
        len.div_ceil(self.bytes())
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::SIZE_4K
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.bytes();
        if bytes >= 1 << 20 && bytes.is_multiple_of(1 << 20) {
            write!(f, "{}M", bytes >> 20)
        } else if bytes >= 1 << 10 && bytes.is_multiple_of(1 << 10) {
            write!(f, "{}K", bytes >> 10)
        } else {
            write!(f, "{bytes}B")
        }
    }
}

impl fmt::Debug for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageSize({self})")
    }
}
