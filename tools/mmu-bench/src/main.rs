//! `mmu-bench`: multiply integer matrices inside a simulated address space and
//! report how well the TLB did.

mod logger;
mod matmul;

use crate::logger::StderrLogger;
use clap::{Parser, ValueEnum};
use log::{LevelFilter, info};
use mmu_alloc::{ConfigError, Mmu, MmuConfig, MmuError, RawLock, RawUnlock, SpinMmu};
use mmu_info::memory::{MAX_MEMSIZE, MEMSIZE, PGSIZE, TLB_ENTRIES};
use std::thread;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => Self::Off,
            LogLevel::Error => Self::Error,
            LogLevel::Warn => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
            LogLevel::Trace => Self::Trace,
        }
    }
}

#[derive(Parser)]
#[command(name = "mmu-bench")]
#[command(about = "Matrix multiplication through a simulated MMU")]
struct Cli {
    /// Matrix dimension (n × n)
    #[arg(long, default_value_t = 5)]
    size: u32,

    /// Independent multiplications run concurrently against one MMU
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Page size in bytes (power of two)
    #[arg(long, default_value_t = PGSIZE)]
    page_size: u32,

    /// Simulated physical memory in bytes
    #[arg(long, default_value_t = MEMSIZE)]
    physical_size: u64,

    /// Virtual address space in bytes (at most 4 GiB)
    #[arg(long, default_value_t = MAX_MEMSIZE)]
    virtual_size: u64,

    /// Direct-mapped TLB entries
    #[arg(long, default_value_t = TLB_ENTRIES)]
    tlb_entries: u32,

    /// Busy-wait on the MMU lock instead of parking
    #[arg(long)]
    spin: bool,

    /// Print the product matrix of the first run
    #[arg(long)]
    print: bool,

    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
}

#[derive(Debug, thiserror::Error)]
enum BenchError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Mmu(#[from] MmuError),
    #[error("logger already installed")]
    Logger,
    #[error("run {run}: product differs from the host result at ({row}, {col})")]
    Mismatch { run: usize, row: u32, col: u32 },
}

fn main() -> Result<(), BenchError> {
    let cli = Cli::parse();
    StderrLogger::new(cli.log_level.into())
        .init()
        .map_err(|_| BenchError::Logger)?;

    let config = MmuConfig::default()
        .with_page_size(cli.page_size)
        .with_physical_size(cli.physical_size)
        .with_virtual_size(cli.virtual_size)
        .with_tlb_entries(cli.tlb_entries);

    if cli.spin {
        let mmu: SpinMmu = Mmu::new(config)?;
        run(&cli, &mmu)
    } else {
        let mmu: Mmu = Mmu::new(config)?;
        run(&cli, &mmu)
    }
}

fn run<R>(cli: &Cli, mmu: &Mmu<R>) -> Result<(), BenchError>
where
    R: RawLock + RawUnlock + Sync,
{
    let n = cli.size;
    let a: Vec<u32> = (0..n * n).map(|v| v / n + v % n + 1).collect();
    let b: Vec<u32> = (0..n * n).map(|v| (v / n) * (v % n) + 1).collect();
    let expected = matmul::host_multiply(&a, &b, n);

    let products = thread::scope(|s| {
        let workers: Vec<_> = (0..cli.threads.max(1))
            .map(|_| s.spawn(|| multiply_once(mmu, n, &a, &b)))
            .collect();
        workers
            .into_iter()
            .map(|w| w.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect::<Result<Vec<_>, _>>()
    })?;

    for (run, product) in products.iter().enumerate() {
        if let Some(at) = product.iter().zip(&expected).position(|(x, y)| x != y) {
            let at = u32::try_from(at).unwrap_or(u32::MAX);
            return Err(BenchError::Mismatch {
                run,
                row: at / n,
                col: at % n,
            });
        }
    }
    info!("{} multiplication(s) of {n}×{n} verified", products.len());

    if cli.print
        && let Some(product) = products.first()
    {
        for row in product.chunks(n.max(1) as usize) {
            let line: Vec<String> = row.iter().map(u32::to_string).collect();
            println!("{}", line.join(" "));
        }
    }

    let stats = mmu.tlb_stats();
    eprintln!(
        "TLB miss rate {:.6} ({} hits, {} misses / {} lookups)",
        stats.miss_rate(),
        stats.hits(),
        stats.misses,
        stats.lookups
    );
    mmu.teardown();
    Ok(())
}

/// Store both operands, multiply in simulated memory, read the product back
/// and release everything again.
fn multiply_once<R>(mmu: &Mmu<R>, n: u32, a: &[u32], b: &[u32]) -> Result<Vec<u32>, MmuError>
where
    R: RawLock + RawUnlock,
{
    let bytes = matmul::matrix_bytes(n);
    let va = matmul::store(mmu, n, a)?;
    let vb = matmul::store(mmu, n, b)?;
    let vc = mmu.allocate(bytes)?;

    matmul::multiply(mmu, va, vb, n, vc)?;
    let product = matmul::load(mmu, vc, n)?;

    for v in [va, vb, vc] {
        mmu.release(v, bytes)?;
    }
    Ok(product)
}
