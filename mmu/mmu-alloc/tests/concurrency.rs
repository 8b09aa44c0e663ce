use mmu_alloc::{Mmu, MmuConfig, SpinMmu, VirtualAddress};
use mmu_sync::{RawLock, RawUnlock};
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;

fn config() -> MmuConfig {
    MmuConfig::default()
        .with_physical_size(1 << 20)
        .with_virtual_size(4 << 20)
        .with_tlb_entries(32)
}

fn parallel_allocations_are_disjoint(mmu: &Arc<Mmu<impl RawLock + RawUnlock + Send + Sync + 'static>>) {
    let start = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let mmu = Arc::clone(mmu);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                (0..10)
                    .map(|_| mmu.allocate(4096).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let all: Vec<VirtualAddress> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
    let unique: HashSet<_> = all.iter().copied().collect();
    assert_eq!(unique.len(), THREADS * 10);
    assert!(all.iter().all(|va| !va.is_zero()));

    let occ = mmu.occupancy().unwrap();
    assert_eq!(occ.virtual_pages.count_set() as usize, 1 + THREADS * 10);
}

fn churn_keeps_data_private(mmu: &Arc<Mmu<impl RawLock + RawUnlock + Send + Sync + 'static>>) {
    let start = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let mmu = Arc::clone(mmu);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                for i in 0..50usize {
                    let len = 1 + (t * 977 + i * 131) % (3 * 4096);
                    let tag = u8::try_from((t * 50 + i) % 251).unwrap();
                    let data = vec![tag; len];

                    let va = mmu.allocate(len as u64).unwrap();
                    mmu.write(va, &data).unwrap();
                    thread::yield_now();
                    assert_eq!(mmu.read(va, len).unwrap(), data, "thread {t} iteration {i}");
                    mmu.release(va, len as u64).unwrap();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    let occ = mmu.occupancy().unwrap();
    assert_eq!(occ.virtual_pages.count_set(), 1);
    // Only the directory and the single second-level table remain.
    assert_eq!(occ.physical.count_set(), 4);
    let stats = mmu.tlb_stats();
    assert!(stats.lookups >= (THREADS * 50 * 2) as u64);
    assert!(stats.misses <= stats.lookups);
}

#[test]
fn blocking_parallel_allocations_are_disjoint() {
    let mmu: Mmu = Mmu::new(config()).unwrap();
    parallel_allocations_are_disjoint(&Arc::new(mmu));
}

#[test]
fn spin_parallel_allocations_are_disjoint() {
    let mmu: SpinMmu = Mmu::new(config()).unwrap();
    parallel_allocations_are_disjoint(&Arc::new(mmu));
}

#[test]
fn blocking_churn_keeps_data_private() {
    let mmu: Mmu = Mmu::new(config()).unwrap();
    churn_keeps_data_private(&Arc::new(mmu));
}

#[test]
fn spin_churn_keeps_data_private() {
    let mmu: SpinMmu = Mmu::new(config()).unwrap();
    churn_keeps_data_private(&Arc::new(mmu));
}

#[test]
fn concurrent_first_allocation_initialises_once() {
    let mmu: Arc<Mmu> = Arc::new(Mmu::new(config()).unwrap());
    let start = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let mmu = Arc::clone(&mmu);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                mmu.allocate(1).unwrap()
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let occ = mmu.occupancy().unwrap();
    assert_eq!(occ.physical.count_set() as usize, 4 + THREADS);
}
