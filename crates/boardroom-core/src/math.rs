//! Fixed-width arithmetic helpers
//!
//! Reward shares are `tokens * balance / supply` where both factors can be
//! close to 10^21 base units, so the product needs a 256-bit intermediate.

use crate::error::{BoardroomError, Result};

const LO_MASK: u128 = u64::MAX as u128;

/// Full 256-bit product of two u128 values as (high, low) limbs
pub fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    let (a1, a0) = (a >> 64, a & LO_MASK);
    let (b1, b0) = (b >> 64, b & LO_MASK);

    let p00 = a0 * b0;
    let p01 = a0 * b1;
    let p10 = a1 * b0;
    let p11 = a1 * b1;

    // Each term is below 2^64, so the sum cannot overflow
    let mid = (p00 >> 64) + (p01 & LO_MASK) + (p10 & LO_MASK);
    let lo = (p00 & LO_MASK) | ((mid & LO_MASK) << 64);
    let hi = p11 + (p01 >> 64) + (p10 >> 64) + (mid >> 64);
    (hi, lo)
}

/// floor(a * b / d)
///
/// Fails with `Overflow` when `d` is zero or the quotient does not fit in u128.
pub fn mul_div_floor(a: u128, b: u128, d: u128) -> Result<u128> {
    if d == 0 {
        return Err(BoardroomError::Overflow);
    }
    let (hi, lo) = widening_mul(a, b);
    if hi == 0 {
        return Ok(lo / d);
    }
    if hi >= d {
        return Err(BoardroomError::Overflow);
    }

    // Restoring long division of (hi:lo) by d; remainder starts as hi < d
    let mut rem = hi;
    let mut quot: u128 = 0;
    for i in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> i) & 1);
        quot <<= 1;
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quot |= 1;
        }
    }
    Ok(quot)
}
