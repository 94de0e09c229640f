use serde::{Deserialize, Serialize};

use super::errors::{CurveError, CurveResult};
use crate::constants::{MAX_NAME_LEN, MAX_SYMBOL_LEN};

/// Per-instance settings fixed at creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveConfig {
    pub name: String,
    pub symbol: String,
    /// Market cap (native base units) at which trading migrates
    #[serde(with = "crate::common::serde_u128")]
    pub market_cap_threshold: u128,
}

impl CurveConfig {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, market_cap_threshold: u128) -> Self {
        Self { name: name.into(), symbol: symbol.into(), market_cap_threshold }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    pub fn with_market_cap_threshold(mut self, market_cap_threshold: u128) -> Self {
        self.market_cap_threshold = market_cap_threshold;
        self
    }

    pub fn validate(&self) -> CurveResult<()> {
        if self.market_cap_threshold == 0 {
            return Err(CurveError::InvalidThreshold);
        }
        if self.name.trim().is_empty() || self.name.len() > MAX_NAME_LEN {
            return Err(CurveError::InvalidMetadata(format!(
                "name must be 1..={MAX_NAME_LEN} bytes"
            )));
        }
        if self.symbol.trim().is_empty() || self.symbol.len() > MAX_SYMBOL_LEN {
            return Err(CurveError::InvalidMetadata(format!(
                "symbol must be 1..={MAX_SYMBOL_LEN} bytes"
            )));
        }
        Ok(())
    }
}

pub type AnyResult<T> = anyhow::Result<T>;
