//! Integer matrix multiplication carried out entirely in simulated memory.
//!
//! Matrices are `n × n` row-major `u32` values stored little-endian. The
//! product is computed one element at a time through 4-byte reads and writes,
//! the way any client of the allocator would.

use mmu_alloc::{Mmu, MmuError, RawLock, RawUnlock, VirtualAddress};

const WORD: u64 = size_of::<u32>() as u64;

#[inline]
fn element(base: VirtualAddress, n: u32, row: u32, col: u32) -> VirtualAddress {
    base + (u64::from(row) * u64::from(n) + u64::from(col)) * WORD
}

/// Bytes occupied by one matrix.
#[must_use]
pub fn matrix_bytes(n: u32) -> u64 {
    u64::from(n) * u64::from(n) * WORD
}

/// Allocate a matrix and store `values` (row-major) into it.
///
/// # Errors
/// Allocation or write failures of the [`Mmu`].
pub fn store<R: RawLock + RawUnlock>(mmu: &Mmu<R>, n: u32, values: &[u32]) -> Result<VirtualAddress, MmuError> {
    debug_assert_eq!(values.len() as u64, u64::from(n) * u64::from(n));
    let va = mmu.allocate(matrix_bytes(n))?;
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    mmu.write(va, &bytes)?;
    Ok(va)
}

/// Read a whole matrix back to the host.
///
/// # Errors
/// [`MmuError::ShortRead`] unless every element has been written.
pub fn load<R: RawLock + RawUnlock>(mmu: &Mmu<R>, va: VirtualAddress, n: u32) -> Result<Vec<u32>, MmuError> {
    let len = usize::try_from(matrix_bytes(n)).unwrap_or(usize::MAX);
    let bytes = mmu.read(va, len)?;
    Ok(bytes
        .chunks_exact(size_of::<u32>())
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// `answer = a × b`, element by element, with wrapping `u32` arithmetic.
///
/// `answer` must already be allocated for an `n × n` matrix.
///
/// # Errors
/// Any read or write failure, e.g. an operand that was never stored.
pub fn multiply<R: RawLock + RawUnlock>(
    mmu: &Mmu<R>,
    a: VirtualAddress,
    b: VirtualAddress,
    n: u32,
    answer: VirtualAddress,
) -> Result<(), MmuError> {
    let mut word = [0u8; 4];
    for row in 0..n {
        for col in 0..n {
            let mut sum = 0u32;
            for step in 0..n {
                mmu.read_into(element(a, n, row, step), &mut word)?;
                let lhs = u32::from_le_bytes(word);
                mmu.read_into(element(b, n, step, col), &mut word)?;
                let rhs = u32::from_le_bytes(word);
                sum = sum.wrapping_add(lhs.wrapping_mul(rhs));
            }
            mmu.write(element(answer, n, row, col), &sum.to_le_bytes())?;
        }
    }
    Ok(())
}

/// Reference product computed on the host.
#[must_use]
pub fn host_multiply(a: &[u32], b: &[u32], n: u32) -> Vec<u32> {
    let n = n as usize;
    let mut out = vec![0u32; n * n];
    for row in 0..n {
        for col in 0..n {
            out[row * n + col] = (0..n).fold(0u32, |acc, step| {
                acc.wrapping_add(a[row * n + step].wrapping_mul(b[step * n + col]))
            });
        }
    }
    out
}
