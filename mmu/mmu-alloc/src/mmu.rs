//! # Simulated MMU Context
//!
//! [`Mmu`] groups the arena, both bitmaps, the page table, the TLB and the
//! fill table behind one coarse lock. Nothing is allocated until the first
//! [`allocate`](Mmu::allocate); [`teardown`](Mmu::teardown) returns the
//! context to that state.
//!
//! Every public operation takes the lock exactly once, so a multi-page
//! [`write`](Mmu::write) or [`read`](Mmu::read) is atomic with respect to other
//! callers.
//!
//! ## Example
//! ```
//! use mmu_alloc::{Mmu, MmuConfig};
//!
//! let config = MmuConfig::default()
//!     .with_physical_size(1 << 20)
//!     .with_virtual_size(1 << 24);
//! let mmu: Mmu = Mmu::new(config)?;
//!
//! let va = mmu.allocate(100)?;
//! mmu.write(va, &[0xAB; 100])?;
//! assert_eq!(mmu.read(va, 100)?, vec![0xAB; 100]);
//! mmu.release(va, 100)?;
//! # Ok::<(), mmu_alloc::MmuError>(())
//! ```

use crate::bitmap::Bitmap;
use crate::fill::PageFillTable;
use crate::frame_alloc::BitmapFrameAlloc;
use log::{debug, warn};
use mmu_addresses::{PageSize, PhysicalAddress, VirtualAddress, VirtualPage};
use mmu_info::{ConfigError, MmuConfig};
use mmu_paging::{
    AddressSpaceLayout, FrameAlloc, PageTable, PageTableError, PhysicalArena, TlbCache, TlbStats,
    Translator,
};
use mmu_sync::{Mutex, RawBlocking, RawLock, RawSpin, RawUnlock, SyncOnceCell};
use std::ops::Range;

/// An [`Mmu`] whose lock busy-waits instead of parking.
pub type SpinMmu = Mmu<RawSpin>;

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum MmuError {
    #[error("zero-sized request")]
    ZeroSize,
    #[error("no run of {pages} free virtual pages")]
    OutOfVirtualMemory { pages: u64 },
    #[error("not enough physical frames to back {pages} pages")]
    OutOfPhysicalMemory { pages: u64 },
    #[error("page at {0} is not allocated")]
    NotMapped(VirtualAddress),
    #[error("access to unmapped page at {0}")]
    Unmapped(VirtualAddress),
    #[error("read up to offset {requested} of page at {va}, but only {filled} bytes were written")]
    ShortRead {
        va: VirtualAddress,
        requested: u64,
        filled: u64,
    },
    #[error("range starting at {0} leaves the virtual address space")]
    OutOfRange(VirtualAddress),
    #[error(transparent)]
    PageTable(#[from] PageTableError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Snapshot of both usage bitmaps.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Occupancy {
    pub physical: Bitmap,
    pub virtual_pages: Bitmap,
}

/// Everything that exists only between first allocation and teardown.
struct MmuState {
    arena: PhysicalArena,
    frames: BitmapFrameAlloc,
    pages: Bitmap,
    table: PageTable,
    tlb: TlbCache,
    fill: PageFillTable,
}

impl MmuState {
    fn new(config: &MmuConfig, layout: AddressSpaceLayout) -> Result<Self, MmuError> {
        let mut arena = PhysicalArena::new(config.physical_size, layout.page_size());
        let mut frames = BitmapFrameAlloc::new(config.physical_pages());
        let table = PageTable::create(&mut arena, &mut frames, layout)?;

        let mut pages = Bitmap::new(config.virtual_pages());
        pages.set(0);

        debug!(
            "MMU initialised: {} frames of {}, {} virtual pages, {}+{}+{} address bits",
            config.physical_pages(),
            layout.page_size(),
            config.virtual_pages(),
            layout.directory_bits(),
            layout.table_bits(),
            layout.offset_bits(),
        );

        Ok(Self {
            arena,
            frames,
            pages,
            table,
            tlb: TlbCache::new(config.tlb_entries),
            fill: PageFillTable::new(config.virtual_pages()),
        })
    }

    fn translator(&mut self) -> Translator<'_> {
        Translator::new(&self.table, &self.arena, &mut self.tlb)
    }

    /// Undo the first `mapped` pages of a failed allocation starting at `first`.
    fn unmap_partial(&mut self, first: u32, mapped: u32, page: PageSize) {
        for i in 0..mapped {
            let va = VirtualPage::new(first + i).base(page);
            if let Ok(frame) = self.table.remove(&mut self.arena, va) {
                self.frames.free(frame);
            }
        }
    }
}

/// One simulated address space.
///
/// `R` selects the raw lock; the default parks contending threads.
pub struct Mmu<R = RawBlocking> {
    config: MmuConfig,
    layout: SyncOnceCell<AddressSpaceLayout>,
    state: Mutex<Option<MmuState>, R>,
}

impl<R> Mmu<R>
where
    R: RawLock + RawUnlock + Default,
{
    /// Validate `config`. The arena itself is allocated lazily.
    ///
    /// # Errors
    /// - Any [`ConfigError`] from [`MmuConfig::validate`].
    /// - [`ConfigError::PhysicalTooSmall`] if the arena cannot hold the page
    ///   directory, one second-level table and one data page.
    pub fn new(config: MmuConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let layout = AddressSpaceLayout::new(config.page());
        let required = u64::from(layout.directory_pages()) + u64::from(layout.table_pages()) + 1;
        let available = u64::from(config.physical_pages());
        if required > available {
            return Err(ConfigError::PhysicalTooSmall { required, available });
        }

        Ok(Self {
            config,
            layout: SyncOnceCell::new(),
            state: Mutex::new(None),
        })
    }
}

impl<R> Mmu<R>
where
    R: RawLock + RawUnlock,
{
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &MmuConfig {
        &self.config
    }

    #[inline]
    pub fn layout(&self) -> &AddressSpaceLayout {
        self.layout.get_or_init(|| AddressSpaceLayout::new(self.config.page()))
    }

    #[inline]
    fn page(&self) -> PageSize {
        self.layout().page_size()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Reserve `bytes` (rounded up to whole pages) of virtual memory, each
    /// page backed by its own physical frame.
    ///
    /// The pages form one contiguous virtual run; their frames need not be
    /// contiguous. On failure nothing stays reserved, although second-level
    /// tables created on the way are kept.
    ///
    /// # Errors
    /// - [`MmuError::ZeroSize`] for `bytes == 0`.
    /// - [`MmuError::OutOfVirtualMemory`] if no free run is large enough.
    /// - [`MmuError::OutOfPhysicalMemory`] if frames or page tables run out.
    pub fn allocate(&self, bytes: u64) -> Result<VirtualAddress, MmuError> {
        if bytes == 0 {
            return Err(MmuError::ZeroSize);
        }
        let layout = *self.layout();
        let page = layout.page_size();
        let pages = page.pages_for(bytes);
        let exhausted = MmuError::OutOfVirtualMemory { pages };
        let count = u32::try_from(pages).map_err(|_| exhausted)?;

        let mut guard = self.state.lock();
        let state = match guard.take() {
            Some(state) => state,
            None => MmuState::new(&self.config, layout)?,
        };
        let state = guard.insert(state);

        let Some(first) = state.pages.find_free_run(count) else {
            warn!("virtual space exhausted: no run of {pages} pages");
            return Err(exhausted);
        };

        for i in 0..count {
            let va = VirtualPage::new(first + i).base(page);
            let Some(frame) = state.frames.alloc_frame() else {
                warn!("physical memory exhausted after {i} of {pages} pages, rolling back");
                state.unmap_partial(first, i, page);
                return Err(MmuError::OutOfPhysicalMemory { pages });
            };
            if let Err(e) = state.table.insert(&mut state.arena, &mut state.frames, va, frame) {
                warn!("mapping {va} failed ({e}), rolling back");
                state.frames.free(frame);
                state.unmap_partial(first, i, page);
                return Err(match e {
                    PageTableError::OutOfMemory => MmuError::OutOfPhysicalMemory { pages },
                    e => e.into(),
                });
            }
        }
        state.pages.set_range(first, count);

        let va = VirtualPage::new(first).base(page);
        debug!("allocated {pages} pages at {va}");
        Ok(va)
    }

    /// Release `bytes` rounded up to whole pages, starting at the page that
    /// holds `va`.
    ///
    /// The in-page offset of `va` is ignored, as [`Self::allocate`] rounds the
    /// same way.
    ///
    /// Either every page is released or, if any of them is not allocated,
    /// nothing changes.
    ///
    /// # Errors
    /// - [`MmuError::ZeroSize`] for `bytes == 0`.
    /// - [`MmuError::OutOfRange`] if the range leaves the virtual space.
    /// - [`MmuError::NotMapped`] naming the first page that is not allocated.
    pub fn release(&self, va: VirtualAddress, bytes: u64) -> Result<(), MmuError> {
        if bytes == 0 {
            return Err(MmuError::ZeroSize);
        }
        let page = self.page();
        let pages = self.whole_pages_from(va, bytes)?;

        let mut guard = self.state.lock();
        let Some(state) = guard.as_mut() else {
            return Err(MmuError::NotMapped(va.page(page).base(page)));
        };

        if let Some(missing) = pages.clone().find(|&p| !state.pages.get(p)) {
            return Err(MmuError::NotMapped(VirtualPage::new(missing).base(page)));
        }

        // Resolve every frame before unmapping anything, so a table that
        // disagrees with the bitmap leaves the range untouched.
        let mut translator = state.translator();
        let frames = pages
            .map(|p| {
                let vp = VirtualPage::new(p);
                let base = vp.base(page);
                translator
                    .translate(base)
                    .map(|pa| (vp, pa.page(page)))
                    .ok_or(PageTableError::NotMapped(base))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (vp, frame) in frames {
            state.table.remove(&mut state.arena, vp.base(page))?;
            state.pages.clear(vp.number());
            state.frames.free(frame);
            state.tlb.invalidate(vp);
            state.fill.reset(vp);
        }

        debug!("released {bytes} bytes at {va}");
        Ok(())
    }

    /// Copy `data` into virtual memory starting at `va`.
    ///
    /// Every spanned page is resolved before the first byte is written, so an
    /// unmapped page leaves memory untouched.
    ///
    /// # Errors
    /// - [`MmuError::OutOfRange`] if the range leaves the virtual space.
    /// - [`MmuError::Unmapped`] naming the first unmapped page.
    pub fn write(&self, va: VirtualAddress, data: &[u8]) -> Result<(), MmuError> {
        if data.is_empty() {
            return Ok(());
        }
        let page = self.page();
        self.pages_of(va, data.len() as u64)?;

        let mut guard = self.state.lock();
        let state = guard.as_mut().ok_or(MmuError::Unmapped(va.page(page).base(page)))?;

        let chunks = Self::resolve(state, page, va, data.len())?;
        for chunk in chunks {
            state.arena.write(chunk.pa, &data[chunk.data.clone()]);
            state.fill.record(chunk.page, chunk.end_in_page);
        }
        Ok(())
    }

    /// Copy `len` bytes of virtual memory starting at `va`.
    ///
    /// # Errors
    /// - [`MmuError::OutOfRange`] if the range leaves the virtual space.
    /// - [`MmuError::Unmapped`] naming the first unmapped page.
    /// - [`MmuError::ShortRead`] if the range reaches past what has been written
    ///   to any spanned page. No data is returned in that case.
    pub fn read(&self, va: VirtualAddress, len: usize) -> Result<Vec<u8>, MmuError> {
        let mut buf = vec![0; len];
        self.read_into(va, &mut buf)?;
        Ok(buf)
    }

    /// Like [`read`](Self::read), filling `buf` in place.
    ///
    /// # Errors
    /// See [`read`](Self::read). `buf` is left untouched on error.
    pub fn read_into(&self, va: VirtualAddress, buf: &mut [u8]) -> Result<(), MmuError> {
        if buf.is_empty() {
            return Ok(());
        }
        let page = self.page();
        self.pages_of(va, buf.len() as u64)?;

        let mut guard = self.state.lock();
        let state = guard.as_mut().ok_or(MmuError::Unmapped(va.page(page).base(page)))?;

        let chunks = Self::resolve(state, page, va, buf.len())?;
        for chunk in &chunks {
            let filled = state.fill.get(chunk.page);
            if chunk.end_in_page > filled {
                return Err(MmuError::ShortRead {
                    va: chunk.va,
                    requested: chunk.end_in_page,
                    filled,
                });
            }
        }
        for chunk in chunks {
            state.arena.read(chunk.pa, &mut buf[chunk.data]);
        }
        Ok(())
    }

    /// Walk the page table for `va` without touching the TLB or its counters.
    pub fn query(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        let page = self.page();
        let guard = self.state.lock();
        let state = guard.as_ref()?;
        let frame = state.table.lookup(&state.arena, va)?;
        Some(frame.base(page) + va.offset(page))
    }

    /// Copies of the physical and virtual bitmaps, `None` before initialisation.
    pub fn occupancy(&self) -> Option<Occupancy> {
        self.state.lock().as_ref().map(|s| Occupancy {
            physical: s.frames.bitmap().clone(),
            virtual_pages: s.pages.clone(),
        })
    }

    /// Cumulative TLB counters; zero before initialisation.
    pub fn tlb_stats(&self) -> TlbStats {
        self.state.lock().as_ref().map(|s| s.tlb.stats()).unwrap_or_default()
    }

    /// Drop all simulated memory. The next [`allocate`](Self::allocate) starts afresh.
    pub fn teardown(&self) {
        if self.state.lock().take().is_some() {
            debug!("MMU torn down");
        }
    }

    /// Virtual page numbers covering `[va, va + bytes)`.
    #[allow(clippy::cast_possible_truncation)]
    fn pages_of(&self, va: VirtualAddress, bytes: u64) -> Result<Range<u32>, MmuError> {
        let end = va
            .as_u64()
            .checked_add(bytes)
            .filter(|&end| end <= self.config.virtual_size)
            .ok_or(MmuError::OutOfRange(va))?;
        let page = self.page();
        let first = va.page(page).number();
        // end <= 2^32, so the last page number fits.
        let last = page.pages_for(end) as u32;
        Ok(first..last)
    }

    /// `ceil(bytes / page size)` pages starting at the page holding `va`.
    ///
    /// Unlike [`Self::pages_of`] the in-page offset of `va` does not widen
    /// the run.
    #[allow(clippy::cast_possible_truncation)]
    fn whole_pages_from(&self, va: VirtualAddress, bytes: u64) -> Result<Range<u32>, MmuError> {
        let page = self.page();
        let first = va.page(page).number();
        let last = u64::from(first) + page.pages_for(bytes);
        if last > u64::from(self.config.virtual_pages()) {
            return Err(MmuError::OutOfRange(va));
        }
        // last <= virtual_pages, a u32
        Ok(first..last as u32)
    }

    /// Translate every page touched by `[va, va + len)` into arena chunks.
    fn resolve(
        state: &mut MmuState,
        page: PageSize,
        va: VirtualAddress,
        len: usize,
    ) -> Result<Vec<Chunk>, MmuError> {
        let mut chunks = Vec::new();
        let mut translator = state.translator();
        let mut done = 0;
        while done < len {
            let chunk_va = va + done as u64;
            let offset = chunk_va.offset(page);
            let take = (len - done).min(usize::try_from(page.bytes() - offset).unwrap_or(usize::MAX));

            let pa = translator
                .translate(chunk_va)
                .ok_or(MmuError::Unmapped(chunk_va.page(page).base(page)))?;
            chunks.push(Chunk {
                va: chunk_va,
                page: chunk_va.page(page),
                pa,
                data: done..done + take,
                end_in_page: offset + take as u64,
            });
            done += take;
        }
        Ok(chunks)
    }
}

/// The part of a transfer that falls into one page.
struct Chunk {
    va: VirtualAddress,
    page: VirtualPage,
    pa: PhysicalAddress,
    data: Range<usize>,
    end_in_page: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> MmuConfig {
        MmuConfig::default()
            .with_physical_size(64 * 4096)
            .with_virtual_size(256 * 4096)
            .with_tlb_entries(16)
    }

    #[test]
    fn rejects_bad_config() {
        let err = Mmu::<RawSpin>::new(small().with_page_size(3000)).err();
        assert_eq!(err, Some(ConfigError::PageSize(3000)));
    }

    #[test]
    fn rejects_arena_too_small_for_tables() {
        let err = Mmu::<RawSpin>::new(small().with_physical_size(4 * 4096)).err();
        assert_eq!(err, Some(ConfigError::PhysicalTooSmall { required: 5, available: 4 }));
        assert!(Mmu::<RawSpin>::new(small().with_physical_size(5 * 4096)).is_ok());
    }

    #[test]
    fn lazily_initialised() {
        let mmu: Mmu = Mmu::new(small()).unwrap();
        assert!(!mmu.is_initialized());
        assert!(mmu.occupancy().is_none());
        assert_eq!(mmu.query(VirtualAddress::new(0x1000)), None);
        let _ = mmu.allocate(1).unwrap();
        assert!(mmu.is_initialized());
    }

    #[test]
    fn directory_occupies_first_frames() {
        let mmu: Mmu = Mmu::new(small()).unwrap();
        let va = mmu.allocate(1).unwrap();
        assert_eq!(va, VirtualAddress::new(0x1000));

        let occ = mmu.occupancy().unwrap();
        // directory (frames 0-1), the data frame (2), then its table (3-4)
        assert_eq!(occ.physical.count_set(), 5);
        assert!(occ.physical.get(0) && occ.physical.get(1));
        assert_eq!(mmu.query(va), Some(PhysicalAddress::new(2 * 4096)));
        assert_eq!(mmu.query(va + 0x123), Some(PhysicalAddress::new(2 * 4096 + 0x123)));
        assert!(occ.virtual_pages.get(0));
    }

    #[test]
    fn zero_sized_requests() {
        let mmu: Mmu = Mmu::new(small()).unwrap();
        assert_eq!(mmu.allocate(0), Err(MmuError::ZeroSize));
        assert_eq!(mmu.release(VirtualAddress::new(0x1000), 0), Err(MmuError::ZeroSize));
        assert_eq!(mmu.write(VirtualAddress::new(0x1000), &[]), Ok(()));
        assert_eq!(mmu.read(VirtualAddress::new(0x1000), 0), Ok(Vec::new()));
    }

    #[test]
    fn access_before_initialisation_is_unmapped() {
        let mmu: Mmu = Mmu::new(small()).unwrap();
        let va = VirtualAddress::new(0x2010);
        assert_eq!(mmu.write(va, &[1]), Err(MmuError::Unmapped(VirtualAddress::new(0x2000))));
        assert_eq!(mmu.read(va, 1), Err(MmuError::Unmapped(VirtualAddress::new(0x2000))));
        assert_eq!(
            mmu.release(va, 1),
            Err(MmuError::NotMapped(VirtualAddress::new(0x2000)))
        );
    }

    #[test]
    fn out_of_range_access() {
        let mmu: Mmu = Mmu::new(small()).unwrap();
        let last = VirtualAddress::new(255 * 4096);
        assert_eq!(mmu.write(last, &[0; 4097]), Err(MmuError::OutOfRange(last)));
        assert_eq!(mmu.release(last, 4097), Err(MmuError::OutOfRange(last)));
        assert_eq!(mmu.release(last + 100, 4096), Err(MmuError::NotMapped(last)));
    }

    #[test]
    fn teardown_resets_everything() {
        let mmu: Mmu = Mmu::new(small()).unwrap();
        let va = mmu.allocate(10).unwrap();
        mmu.write(va, &[1; 10]).unwrap();
        mmu.teardown();
        assert!(!mmu.is_initialized());
        assert_eq!(mmu.tlb_stats(), TlbStats::default());
        assert_eq!(mmu.allocate(10), Ok(va));
        assert!(matches!(mmu.read(va, 10), Err(MmuError::ShortRead { filled: 0, .. })));
    }

    #[test]
    fn release_with_a_stray_virtual_bit_frees_nothing() {
        let mmu: Mmu = Mmu::new(small()).unwrap();
        let va = mmu.allocate(1).unwrap();
        mmu.write(va, &[5; 8]).unwrap();
        mmu.state.lock().as_mut().unwrap().pages.set(2);
        let before = mmu.occupancy().unwrap();

        assert_eq!(
            mmu.release(va, 2 * 4096),
            Err(MmuError::PageTable(PageTableError::NotMapped(va + 4096)))
        );
        assert_eq!(mmu.occupancy().unwrap(), before);
        assert_eq!(mmu.read(va, 8).unwrap(), vec![5; 8]);
    }

    #[test]
    fn physical_exhaustion_rolls_back() {
        // 2 frames directory + 2 frames table + 3 data frames.
        let mmu: Mmu = Mmu::new(small().with_physical_size(7 * 4096)).unwrap();
        let before = {
            let _ = mmu.allocate(1).unwrap();
            mmu.occupancy().unwrap()
        };
        assert_eq!(
            mmu.allocate(3 * 4096),
            Err(MmuError::OutOfPhysicalMemory { pages: 3 })
        );
        assert_eq!(mmu.occupancy().unwrap(), before);
    }
}
