//! Bonding curve account
//!
//! Persisted layout of a single curve instance. A live curve produces one with
//! `BondingCurve::snapshot` and can be rebuilt from it with
//! `BondingCurve::restore`.
//!
//! # Fields
//!
//! - `address`: Curve address
//! - `creator` / `owner`: Deployer and current owner (owner starts as creator)
//! - `market_cap_threshold`: Market cap that triggers migration, immutable
//! - `created_at`: Creation timestamp (unix seconds), immutable
//! - `phase`: `Open` until the threshold is crossed, then `Migrated` forever
//! - `issued_total`: Units in circulation
//! - `reserve_balance`: Native value held against the issued units
//! - `holder_count` / `holders`: Addresses with a non-zero balance
//!
//! # Methods
//!
//! - `get_buy_price`: Units received for a payment at the current supply
//! - `get_sell_price`: Native value received for selling units
//! - `get_market_cap`: Current market cap
//! - `get_token_price`: Current spot price

use std::path::Path;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use super::errors::{CurveError, CurveResult};
use crate::utils::calc::{market_cap, proceeds_from_sell, spot_price, tokens_for_payment};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TradingPhase {
    #[default]
    Open,
    Migrated,
}

impl TradingPhase {
    pub fn is_open(&self) -> bool {
        matches!(self, TradingPhase::Open)
    }
}

/// Outcome of the external liquidity hand-off
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    #[default]
    NotTriggered,
    /// The migrator is switched off; the reserve stays on the curve
    Disabled,
    Completed,
    Failed(String),
}

impl MigrationStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, MigrationStatus::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct CurveAccount {
    pub address: Pubkey,
    pub creator: Pubkey,
    pub owner: Pubkey,
    pub name: String,
    pub symbol: String,
    #[serde(with = "crate::common::serde_u128")]
    pub market_cap_threshold: u128,
    pub created_at: i64,
    pub phase: TradingPhase,
    #[serde(with = "crate::common::serde_u128")]
    pub issued_total: u128,
    #[serde(with = "crate::common::serde_u128")]
    pub reserve_balance: u128,
    pub holder_count: u64,
    /// Sorted
    pub holders: Vec<Pubkey>,
    pub migration: MigrationStatus,
}

impl CurveAccount {
    /// Units received for `payment` native base units
    pub fn get_buy_price(&self, payment: u128) -> CurveResult<u128> {
        if !self.phase.is_open() {
            return Err(CurveError::TradingClosed);
        }
        tokens_for_payment(self.issued_total, payment)
    }

    /// Native value received for selling `amount` units
    pub fn get_sell_price(&self, amount: u128) -> CurveResult<u128> {
        if !self.phase.is_open() {
            return Err(CurveError::TradingClosed);
        }
        proceeds_from_sell(self.issued_total, amount)
    }

    pub fn get_market_cap(&self) -> CurveResult<u128> {
        market_cap(self.issued_total)
    }

    pub fn get_token_price(&self) -> CurveResult<u128> {
        spot_price(self.issued_total)
    }

    pub fn to_bytes(&self) -> CurveResult<Vec<u8>> {
        borsh::to_vec(self).map_err(|e| CurveError::Persistence(e.to_string()))
    }

    pub fn from_bytes(data: &[u8]) -> CurveResult<Self> {
        Self::try_from_slice(data).map_err(|e| CurveError::Persistence(e.to_string()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> CurveResult<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes).map_err(|e| {
            CurveError::Persistence(format!("write {}: {e}", path.as_ref().display()))
        })
    }

    pub fn load(path: impl AsRef<Path>) -> CurveResult<Self> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| {
            CurveError::Persistence(format!("read {}: {e}", path.as_ref().display()))
        })?;
        Self::from_bytes(&bytes)
    }
}
