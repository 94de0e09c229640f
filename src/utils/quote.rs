//! Quote helpers for the curve.
//!
//! A quote is computed from the issued total alone and never touches curve
//! state, so it can be served to any caller at any time.

use serde::{Deserialize, Serialize};

use super::calc::{cost_to_buy, market_cap, proceeds_from_sell, spot_price, tokens_for_payment};
use crate::common::errors::CurveResult;

const BPS_DENOMINATOR: u128 = 10_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyQuote {
    /// Native value offered
    #[serde(with = "crate::common::serde_u128")]
    pub payment: u128,
    /// Units received, zero when the payment is too small
    #[serde(with = "crate::common::serde_u128")]
    pub amount_out: u128,
    /// Native value actually consumed by `amount_out` (never above `payment`)
    #[serde(with = "crate::common::serde_u128")]
    pub cost: u128,
    #[serde(with = "crate::common::serde_u128")]
    pub price_before: u128,
    #[serde(with = "crate::common::serde_u128")]
    pub price_after: u128,
    #[serde(with = "crate::common::serde_u128")]
    pub market_cap_after: u128,
    /// Spot price movement in basis points
    pub price_impact_bps: Option<u64>,
}

impl BuyQuote {
    pub fn is_empty(&self) -> bool {
        self.amount_out == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellQuote {
    /// Units offered
    #[serde(with = "crate::common::serde_u128")]
    pub amount_in: u128,
    /// Native value returned
    #[serde(with = "crate::common::serde_u128")]
    pub payment_out: u128,
    #[serde(with = "crate::common::serde_u128")]
    pub price_before: u128,
    #[serde(with = "crate::common::serde_u128")]
    pub price_after: u128,
    #[serde(with = "crate::common::serde_u128")]
    pub market_cap_after: u128,
    pub price_impact_bps: Option<u64>,
}

fn impact_bps(before: u128, after: u128) -> Option<u64> {
    if before == 0 {
        return None;
    }
    let moved = before.abs_diff(after).checked_mul(BPS_DENOMINATOR)? / before;
    u64::try_from(moved).ok()
}

pub fn quote_buy(issued_total: u128, payment: u128) -> CurveResult<BuyQuote> {
    let price_before = spot_price(issued_total)?;
    let amount_out = tokens_for_payment(issued_total, payment)?;
    if amount_out == 0 {
        return Ok(BuyQuote {
            payment,
            price_before,
            price_after: price_before,
            market_cap_after: market_cap(issued_total)?,
            price_impact_bps: Some(0),
            ..Default::default()
        });
    }
    let issued_after = issued_total + amount_out;
    let price_after = spot_price(issued_after)?;
    Ok(BuyQuote {
        payment,
        amount_out,
        cost: cost_to_buy(issued_total, amount_out)?,
        price_before,
        price_after,
        market_cap_after: market_cap(issued_after)?,
        price_impact_bps: impact_bps(price_before, price_after),
    })
}

pub fn quote_sell(issued_total: u128, amount: u128) -> CurveResult<SellQuote> {
    let payment_out = proceeds_from_sell(issued_total, amount)?;
    let issued_after = issued_total - amount;
    let price_before = spot_price(issued_total)?;
    let price_after = spot_price(issued_after)?;
    Ok(SellQuote {
        amount_in: amount,
        payment_out,
        price_before,
        price_after,
        market_cap_after: market_cap(issued_after)?,
        price_impact_bps: impact_bps(price_before, price_after),
    })
}
