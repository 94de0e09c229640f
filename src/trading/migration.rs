//! Liquidity migration hand-off
//!
//! Once a curve crosses its market cap threshold its reserve is meant to seed
//! a pool on an external exchange. That exchange is reached through
//! [`LiquidityMigrator`]; the shipped [`DisabledMigrator`] leaves the reserve
//! on the curve.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::common::{AnyResult, MigrationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRequest {
    pub curve: Pubkey,
    #[serde(with = "crate::common::serde_u128")]
    pub reserve_balance: u128,
    #[serde(with = "crate::common::serde_u128")]
    pub issued_total: u128,
    #[serde(with = "crate::common::serde_u128")]
    pub market_cap: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The target accepted the liquidity
    Completed,
    Disabled,
}

impl From<MigrationOutcome> for MigrationStatus {
    fn from(outcome: MigrationOutcome) -> Self {
        match outcome {
            MigrationOutcome::Completed => MigrationStatus::Completed,
            MigrationOutcome::Disabled => MigrationStatus::Disabled,
        }
    }
}

pub trait LiquidityMigrator: Send + Sync {
    fn migrate(&self, request: &MigrationRequest) -> AnyResult<MigrationOutcome>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledMigrator;

impl LiquidityMigrator for DisabledMigrator {
    fn migrate(&self, _request: &MigrationRequest) -> AnyResult<MigrationOutcome> {
        Ok(MigrationOutcome::Disabled)
    }
}
