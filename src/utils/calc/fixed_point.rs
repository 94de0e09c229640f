//! Scaled-integer arithmetic
//!
//! No floating point anywhere: identical inputs give bit-identical results on
//! every platform.

use super::big_num::U256;
use crate::common::errors::{CurveError, CurveResult};
use crate::constants::SCALE;

/// (a * b) / SCALE
#[inline]
pub fn scaled_mul(a: u128, b: u128) -> CurveResult<u128> {
    mul_div(a, b, SCALE)
}

/// (a * b) / denominator, floored, with the product kept in 256 bits
#[inline]
pub fn mul_div(a: u128, b: u128, denominator: u128) -> CurveResult<u128> {
    if denominator == 0 {
        return Err(CurveError::ArithmeticOverflow);
    }
    let product = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(CurveError::ArithmeticOverflow)?;
    (product / U256::from(denominator)).try_to_u128()
}

/// Floor of the square root of a 256-bit value.
///
/// Newton's iteration seeded above the root; the iterate decreases
/// monotonically and the loop stops as soon as it no longer does, which
/// leaves exactly `floor(sqrt(x))`.
pub fn isqrt_u256(x: U256) -> U256 {
    if x.is_zero() {
        return U256::zero();
    }
    let mut z = U256::one() << ((x.bits() + 1) / 2);
    loop {
        let y = (z + x / z) >> 1;
        if y >= z {
            return z;
        }
        z = y;
    }
}

/// Floor of the square root of a `u128`
pub fn isqrt(x: u128) -> u128 {
    if x == 0 {
        return 0;
    }
    let bits = 128 - x.leading_zeros();
    let mut z: u128 = 1 << ((bits + 1) / 2);
    loop {
        let y = (z + x / z) >> 1;
        if y >= z {
            return z;
        }
        z = y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_mul() {
        assert_eq!(scaled_mul(2 * SCALE, 3 * SCALE).unwrap(), 6 * SCALE);
        assert_eq!(scaled_mul(SCALE / 2, SCALE / 2).unwrap(), SCALE / 4);
        assert_eq!(scaled_mul(1, 1).unwrap(), 0);
        assert_eq!(scaled_mul(0, u128::MAX).unwrap(), 0);
    }

    #[test]
    fn test_scaled_mul_overflow() {
        assert_eq!(scaled_mul(u128::MAX, u128::MAX), Err(CurveError::ArithmeticOverflow));
        // the product itself fits the working width, only the result is too wide
        assert_eq!(scaled_mul(u128::MAX, 2 * SCALE), Err(CurveError::ArithmeticOverflow));
        assert_eq!(scaled_mul(u128::MAX, SCALE).unwrap(), u128::MAX);
    }

    #[test]
    fn test_mul_div_zero_denominator() {
        assert_eq!(mul_div(1, 1, 0), Err(CurveError::ArithmeticOverflow));
    }

    #[test]
    fn test_isqrt_perfect_squares() {
        for root in [0u128, 1, 2, 3, 10, 1_000_000_007, SCALE, u64::MAX as u128] {
            assert_eq!(isqrt(root * root), root, "root {root}");
            assert_eq!(isqrt_u256(U256::from(root) * U256::from(root)), U256::from(root));
        }
    }

    #[test]
    fn test_isqrt_floors() {
        assert_eq!(isqrt(2), 1);
        assert_eq!(isqrt(3), 1);
        assert_eq!(isqrt(8), 2);
        assert_eq!(isqrt(99), 9);
        assert_eq!(isqrt(SCALE * SCALE - 1), SCALE - 1);
        assert_eq!(isqrt(u128::MAX), u64::MAX as u128);
    }

    #[test]
    fn test_isqrt_u256_large() {
        let max = U256::MAX;
        let root = isqrt_u256(max);
        assert_eq!(root, U256::from(u128::MAX));

        let big = U256::from(u128::MAX) * U256::from(u128::MAX);
        assert_eq!(isqrt_u256(big), U256::from(u128::MAX));
        assert_eq!(isqrt_u256(big - U256::one()), U256::from(u128::MAX - 1));
    }

    #[test]
    fn test_isqrt_matches_u256_variant() {
        let mut x: u128 = 7;
        for _ in 0..60 {
            assert_eq!(U256::from(isqrt(x)), isqrt_u256(U256::from(x)));
            x = x.wrapping_mul(31).wrapping_add(17);
        }
    }
}
