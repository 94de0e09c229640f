//! Linear bonding curve pricing
//!
//! `price(s) = INITIAL_PRICE + s * SLOPE / SCALE`
//!
//! Every function takes the issued total *before* the operation and is pure,
//! so the same code serves trade execution and external quoting.

use super::big_num::U256;
use super::fixed_point::{isqrt_u256, mul_div};
use crate::common::errors::{CurveError, CurveResult};
use crate::constants::{INITIAL_PRICE, SCALE, SLOPE};

/// Price of the next whole unit at the given issued total
#[inline]
pub fn spot_price(issued_total: u128) -> CurveResult<u128> {
    mul_div(issued_total, SLOPE, SCALE)?
        .checked_add(INITIAL_PRICE)
        .ok_or(CurveError::ArithmeticOverflow)
}

/// spot price * issued total, zero for an empty curve
pub fn market_cap(issued_total: u128) -> CurveResult<u128> {
    if issued_total == 0 {
        return Ok(0);
    }
    mul_div(spot_price(issued_total)?, issued_total, SCALE)
}

/// `2 * SCALE^2` times the area under the unfloored price line over
/// `[start, start + amount]`.
///
/// The area is additive in the supply, so splitting a sell into pieces never
/// returns more than the buys that built the supply paid in.
fn scaled_area(start: u128, amount: u128) -> CurveResult<U256> {
    let base = U256::from(INITIAL_PRICE) * U256::from(SCALE) * U256::from(2u8);
    let height = U256::from(SLOPE)
        .checked_mul(U256::from(start) * U256::from(2u8) + U256::from(amount))
        .and_then(|rise| rise.checked_add(base))
        .ok_or(CurveError::ArithmeticOverflow)?;
    height.checked_mul(U256::from(amount)).ok_or(CurveError::ArithmeticOverflow)
}

fn area_denominator() -> U256 {
    U256::from(SCALE) * U256::from(SCALE) * U256::from(2u8)
}

/// Native value under the price line over `[start, start + amount]`, floored once.
fn integral(start: u128, amount: u128) -> CurveResult<u128> {
    if amount == 0 {
        return Ok(0);
    }
    (scaled_area(start, amount)? / area_denominator()).try_to_u128()
}

/// The exact (unfloored) cost of `amount` fits in `payment`
fn affordable(start: u128, amount: u128, payment: u128) -> CurveResult<bool> {
    Ok(scaled_area(start, amount)? <= U256::from(payment) * area_denominator())
}

/// Native value needed to move supply from `issued_total` to `issued_total + amount`
pub fn cost_to_buy(issued_total: u128, amount: u128) -> CurveResult<u128> {
    if amount == 0 {
        return Err(CurveError::InvalidAmount);
    }
    integral(issued_total, amount)
}

/// Native value returned for moving supply from `issued_total` down by `amount`
pub fn proceeds_from_sell(issued_total: u128, amount: u128) -> CurveResult<u128> {
    if amount == 0 {
        return Err(CurveError::InvalidAmount);
    }
    if amount > issued_total {
        return Err(CurveError::InsufficientSupply { requested: amount, issued: issued_total });
    }
    integral(issued_total - amount, amount)
}

/// Units bought by `payment`; `cost_to_buy` of the result never exceeds it.
///
/// Closed form: `(isqrt(p0^2 + 2*SLOPE*payment) - p0) * SCALE / SLOPE` with
/// `p0` the floored spot price. The estimate is clamped down until its exact
/// cost fits in the payment. Returns 0 when the payment cannot lift the price
/// by one native base unit.
pub fn tokens_for_payment(issued_total: u128, payment: u128) -> CurveResult<u128> {
    if payment == 0 {
        return Ok(0);
    }
    let p0 = U256::from(spot_price(issued_total)?);
    let discriminant = (p0 * p0)
        .checked_add(U256::from(2u8) * U256::from(SLOPE) * U256::from(payment))
        .ok_or(CurveError::ArithmeticOverflow)?;
    let root = isqrt_u256(discriminant);
    // root >= p0 since the discriminant >= p0^2
    let price_rise = root - p0;
    let estimate = (price_rise * U256::from(SCALE) / U256::from(SLOPE)).try_to_u128()?;
    if estimate == 0 {
        return Ok(0);
    }

    let headroom = u128::MAX - issued_total;
    let estimate = estimate.min(headroom);
    if affordable(issued_total, estimate, payment)? {
        return Ok(estimate);
    }
    clamp_to_payment(issued_total, payment, estimate)
}

/// Binary search over `[0, upper)` for the largest affordable amount.
/// The area is increasing in the amount, so the search is exact.
fn clamp_to_payment(issued_total: u128, payment: u128, upper: u128) -> CurveResult<u128> {
    let mut lo: u128 = 0;
    let mut hi: u128 = upper;
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if affordable(issued_total, mid, payment)? {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(lo)
}
