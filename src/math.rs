//! Fixed-point numeric core.
//!
//! Every value is an `i128` scaled by 10^18. Independent parties have to agree
//! on prices to the last integer, so nothing here touches floating point and
//! every division truncates toward zero (the same way `i128 /` does).
//!
//! Products go through [`mul_div`], which keeps the intermediate product in
//! 256 bits before dividing back down, so `a * b / SCALE` never overflows just
//! because `a * b` does.
//!
//! The approximations are deliberately cheap:
//! - `exp_approx`: five Taylor terms, saturating at x = 42.
//! - `log2`: integer part by halving plus a two-bucket fractional correction.
//!   This is coarse (errors up to ~0.09 in log2) and is the reference behavior.
//! - `log2_fine`: bit-by-bit binary fraction, opt-in only because it changes
//!   results other parties may be reproducing with the coarse table.
//! - `sqrt`: Babylonian iteration on the scaled value.

use crate::types::Fixed;

pub const SCALE: i128 = Fixed::SCALE;

/// ln(2) scaled by 10^18.
pub const LN2: i128 = 693_147_180_559_945_309;

/// Inputs at or above 42.0 saturate instead of growing further.
pub const EXP_INPUT_CAP: i128 = 42 * SCALE;

/// The five-term series evaluated at the cap: 1_232_020.6
pub const EXP_SATURATION: i128 = 1_232_020_600_000_000_000_000_000;

const EXP_TERMS: i128 = 5;

// two-bucket fractional correction for coarse log2
const LOG2_FRAC_HIGH: i128 = 585_000_000_000_000_000; // remainder >= 1.5
const LOG2_FRAC_LOW: i128 = 322_000_000_000_000_000; // remainder >= 1.25

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("logarithm of non-positive value {0}")]
    Domain(i128),

    #[error("fixed-point overflow")]
    Overflow,

    #[error("division by zero")]
    DivisionByZero,
}

/// `a * b / d` with a 256-bit intermediate, truncated toward zero.
pub fn mul_div(a: i128, b: i128, d: i128) -> Result<i128, MathError> {
    if d == 0 {
        return Err(MathError::DivisionByZero);
    }
    let negative = (a < 0) ^ (b < 0) ^ (d < 0);
    let magnitude = mul_div_u128(a.unsigned_abs(), b.unsigned_abs(), d.unsigned_abs())
        .ok_or(MathError::Overflow)?;
    let magnitude = i128::try_from(magnitude).map_err(|_| MathError::Overflow)?;
    Ok(if negative { -magnitude } else { magnitude })
}

/// Fixed-point multiply: `a * b / SCALE`.
pub fn mul(a: i128, b: i128) -> Result<i128, MathError> {
    mul_div(a, b, SCALE)
}

/// Fixed-point divide: `a * SCALE / b`.
pub fn div(a: i128, b: i128) -> Result<i128, MathError> {
    mul_div(a, SCALE, b)
}

// full 256-bit product as (hi, lo)
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = u64::MAX as u128;
    let (a_hi, a_lo) = (a >> 64, a & MASK);
    let (b_hi, b_lo) = (b >> 64, b & MASK);

    let lo_lo = a_lo * b_lo;
    let lo_hi = a_lo * b_hi;
    let hi_lo = a_hi * b_lo;
    let hi_hi = a_hi * b_hi;

    let mid = (lo_lo >> 64) + (lo_hi & MASK) + (hi_lo & MASK);
    let lo = (lo_lo & MASK) | (mid << 64);
    let hi = hi_hi + (lo_hi >> 64) + (hi_lo >> 64) + (mid >> 64);
    (hi, lo)
}

fn mul_div_u128(a: u128, b: u128, d: u128) -> Option<u128> {
    let (hi, lo) = widening_mul(a, b);
    if hi == 0 {
        return Some(lo / d);
    }
    // quotient would not fit in 128 bits
    if hi >= d {
        return None;
    }

    // restoring long division, one bit of lo at a time. rem < d holds on entry to each step.
    let mut rem = hi;
    let mut quotient: u128 = 0;
    for i in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> i) & 1);
        quotient <<= 1;
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quotient |= 1;
        }
    }
    Some(quotient)
}

/// e^x, five Taylor terms. `exp_approx(0) == SCALE` exactly.
///
/// Inputs at or above [`EXP_INPUT_CAP`] return [`EXP_SATURATION`] (the series at
/// the cap), so the function never decreases. Accuracy falls off well before the
/// cap; callers keep `q / b` moderate by growing `b` with volume.
pub fn exp_approx(x: i128) -> Result<i128, MathError> {
    if x >= EXP_INPUT_CAP {
        return Ok(EXP_SATURATION);
    }

    let mut result = SCALE;
    let mut term = SCALE;
    for n in 1..=EXP_TERMS {
        term = mul_div(term, x, n * SCALE)?;
        result = result.checked_add(term).ok_or(MathError::Overflow)?;
    }

    // odd terms make the truncated series negative for large negative x
    Ok(result.max(0))
}

/// Coarse binary logarithm.
///
/// Integer part by halving while `x >= 2`, then +0.585 if the remainder is at
/// least 1.5, +0.322 if at least 1.25. Values below 1.0 get no integer part and
/// no correction, so anything in (0, 1.25) maps to 0.
pub fn log2(x: i128) -> Result<i128, MathError> {
    if x <= 0 {
        return Err(MathError::Domain(x));
    }

    let mut remainder = x;
    let mut result: i128 = 0;
    while remainder >= 2 * SCALE {
        remainder /= 2;
        result += SCALE;
    }

    if remainder >= 3 * SCALE / 2 {
        result += LOG2_FRAC_HIGH;
    } else if remainder >= 5 * SCALE / 4 {
        result += LOG2_FRAC_LOW;
    }

    Ok(result)
}

/// Natural log via the coarse [`log2`]: `log2(x) * ln(2)`. `ln(SCALE) == 0`.
pub fn ln(x: i128) -> Result<i128, MathError> {
    mul_div(log2(x)?, LN2, SCALE)
}

/// Binary logarithm to full fixed-point precision.
///
/// Normalizes into [1, 2) by halving or doubling, then squares the remainder
/// once per fractional bit: if the square reaches 2 that bit is set.
pub fn log2_fine(x: i128) -> Result<i128, MathError> {
    if x <= 0 {
        return Err(MathError::Domain(x));
    }

    let mut y = x;
    let mut result: i128 = 0;
    while y >= 2 * SCALE {
        y /= 2;
        result += SCALE;
    }
    while y < SCALE {
        y *= 2;
        result -= SCALE;
    }

    // y < 2 * SCALE here, so y * y stays below 4e36
    let mut bit = SCALE / 2;
    while bit > 0 {
        y = y * y / SCALE;
        if y >= 2 * SCALE {
            y /= 2;
            result += bit;
        }
        bit /= 2;
    }

    Ok(result)
}

/// Natural log via [`log2_fine`].
pub fn ln_fine(x: i128) -> Result<i128, MathError> {
    mul_div(log2_fine(x)?, LN2, SCALE)
}

/// Square root of a fixed-point value: `floor(sqrt(x * SCALE))`.
///
/// Babylonian iteration from above, stopping as soon as the iterate stops
/// decreasing. `sqrt(0) == 0`.
pub fn sqrt(x: i128) -> Result<i128, MathError> {
    if x < 0 {
        return Err(MathError::Domain(x));
    }
    if x == 0 {
        return Ok(0);
    }

    // max(x, 1.0) is never below sqrt(x * SCALE)
    let mut guess = x.max(SCALE);
    loop {
        let next = guess
            .checked_add(mul_div(x, SCALE, guess)?)
            .ok_or(MathError::Overflow)?
            / 2;
        if next >= guess {
            return Ok(guess);
        }
        guess = next;
    }
}
