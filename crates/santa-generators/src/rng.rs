//! Cryptographically secure randomness.
//!
//! All generators draw from the operating system CSPRNG; nothing here is
//! seeded or deterministic.

use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use santa_types::{Result, SantaError};

/// Fill a fresh buffer of `len` random bytes.
pub fn bytes(len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| SantaError::Generation(format!("failed to read random bytes: {}", e)))?;
    Ok(buf)
}

/// Fixed-size random array.
pub fn array<const N: usize>() -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| SantaError::Generation(format!("failed to read random bytes: {}", e)))?;
    Ok(buf)
}

/// Uniform index in `0..bound`. `bound` must be non-zero.
///
/// Uses rejection sampling, so no index is favoured.
pub fn index(bound: usize) -> usize {
    OsRng.gen_range(0..bound)
}

/// Uniform integer in the inclusive range `[min, max]`; requires `min <= max`.
///
/// The span is computed in 128-bit arithmetic so the full `i64` range works.
pub fn inclusive_i64(min: i64, max: i64) -> i64 {
    let span = (max as i128 - min as i128) as u64;
    let offset = OsRng.gen_range(0..=span);
    (min as i128 + offset as i128) as i64
}
