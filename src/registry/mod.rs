//! Curve registry
//!
//! Deploys curve instances, keeps their display metadata and serves paginated
//! listings built from each curve's read-only accessors.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use tracing::{info, warn};

use crate::common::{CurveConfig, CurveError, CurveResult};
use crate::constants::{
    CURVE_PROGRAM_ID, CURVE_SEED_PREFIX, DEFAULT_CREATION_FEE, DEFAULT_MARKET_CAP_THRESHOLD,
    DEFAULT_MAX_PAGE_SIZE, MAX_LOGO_URI_LEN,
};
use crate::trading::{BondingCurve, CurveContext, CurveDetails};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Native base units charged per deployment
    pub creation_fee: u128,
    /// Threshold for curves created without one
    pub default_market_cap_threshold: u128,
    pub max_page_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            creation_fee: DEFAULT_CREATION_FEE,
            default_market_cap_threshold: DEFAULT_MARKET_CAP_THRESHOLD,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl RegistryConfig {
    pub fn with_creation_fee(mut self, creation_fee: u128) -> Self {
        self.creation_fee = creation_fee;
        self
    }

    pub fn with_default_market_cap_threshold(mut self, threshold: u128) -> Self {
        self.default_market_cap_threshold = threshold;
        self
    }

    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateCurveParams {
    pub name: String,
    pub symbol: String,
    pub logo_uri: String,
    /// Falls back to the registry default
    pub market_cap_threshold: Option<u128>,
}

impl CreateCurveParams {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self { name: name.into(), symbol: symbol.into(), ..Default::default() }
    }

    pub fn with_logo_uri(mut self, logo_uri: impl Into<String>) -> Self {
        self.logo_uri = logo_uri.into();
        self
    }

    pub fn with_market_cap_threshold(mut self, threshold: u128) -> Self {
        self.market_cap_threshold = Some(threshold);
        self
    }
}

#[derive(Clone)]
pub struct RegistryEntry {
    pub creator: Pubkey,
    pub logo_uri: String,
    pub curve: Arc<BondingCurve>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveListing {
    pub creator: Pubkey,
    pub logo_uri: String,
    pub created_at: i64,
    pub details: CurveDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurvePage {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub items: Vec<CurveListing>,
}

impl CurvePage {
    pub fn has_next(&self) -> bool {
        (self.page + 1).saturating_mul(self.page_size) < self.total
    }
}

pub struct CurveRegistry {
    config: RegistryConfig,
    ctx: CurveContext,
    index: DashMap<Pubkey, usize>,
    entries: RwLock<Vec<RegistryEntry>>,
    collected_fees: Mutex<u128>,
}

impl CurveRegistry {
    /// Every curve deployed here shares `ctx`
    pub fn new(config: RegistryConfig, ctx: CurveContext) -> Self {
        Self {
            config,
            ctx,
            index: DashMap::new(),
            entries: RwLock::new(Vec::new()),
            collected_fees: Mutex::new(0),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn create_curve(
        &self,
        creator: Pubkey,
        fee_paid: u128,
        params: CreateCurveParams,
    ) -> CurveResult<Arc<BondingCurve>> {
        if params.logo_uri.len() > MAX_LOGO_URI_LEN {
            return Err(CurveError::InvalidMetadata(format!(
                "logo uri must be at most {MAX_LOGO_URI_LEN} bytes"
            )));
        }
        let config = CurveConfig::new(
            params.name,
            params.symbol,
            params.market_cap_threshold.unwrap_or(self.config.default_market_cap_threshold),
        );
        config.validate()?;
        if fee_paid < self.config.creation_fee {
            warn!(creator = %creator, fee_paid, required = self.config.creation_fee, "creation fee too low");
            return Err(CurveError::CreationFeeTooLow {
                required: self.config.creation_fee,
                provided: fee_paid,
            });
        }

        let mut entries = self.entries.write();
        let position = entries.len();
        let seed = format!("{CURVE_SEED_PREFIX}{position}");
        let address = Pubkey::create_with_seed(&creator, &seed, &CURVE_PROGRAM_ID)
            .map_err(|e| CurveError::InvalidMetadata(format!("address derivation: {e}")))?;
        let curve = Arc::new(BondingCurve::new(address, creator, config, self.ctx.clone())?);

        {
            let mut fees = self.collected_fees.lock();
            *fees = fees.checked_add(fee_paid).ok_or(CurveError::ArithmeticOverflow)?;
        }
        entries.push(RegistryEntry { creator, logo_uri: params.logo_uri, curve: curve.clone() });
        self.index.insert(address, position);
        info!(curve = %address, creator = %creator, position, fee_paid, "curve registered");
        Ok(curve)
    }

    pub fn get_curve(&self, address: &Pubkey) -> CurveResult<Arc<BondingCurve>> {
        let position = self.index.get(address).map(|p| *p).ok_or(CurveError::CurveNotFound(*address))?;
        self.entries
            .read()
            .get(position)
            .map(|e| e.curve.clone())
            .ok_or(CurveError::CurveNotFound(*address))
    }

    /// In creation order
    pub fn curves_by_creator(&self, creator: &Pubkey) -> Vec<Arc<BondingCurve>> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.creator == *creator)
            .map(|e| e.curve.clone())
            .collect()
    }

    pub fn curve_count(&self) -> usize {
        self.entries.read().len()
    }

    pub fn collected_fees(&self) -> u128 {
        *self.collected_fees.lock()
    }

    /// Zero-based page of listings in creation order. `page_size` is clamped
    /// to `1..=max_page_size`.
    pub fn list_curves(&self, page: usize, page_size: usize) -> CurveResult<CurvePage> {
        let page_size = page_size.clamp(1, self.config.max_page_size.max(1));
        let (total, entries): (usize, Vec<RegistryEntry>) = {
            let entries = self.entries.read();
            let slice = entries
                .iter()
                .skip(page.saturating_mul(page_size))
                .take(page_size)
                .cloned()
                .collect();
            (entries.len(), slice)
        };

        let items = entries
            .into_iter()
            .map(|e| {
                Ok(CurveListing {
                    creator: e.creator,
                    created_at: e.curve.get_created_at(),
                    details: e.curve.get_details()?,
                    logo_uri: e.logo_uri,
                })
            })
            .collect::<CurveResult<Vec<_>>>()?;

        Ok(CurvePage { page, page_size, total, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SCALE;

    fn registry() -> CurveRegistry {
        CurveRegistry::new(
            RegistryConfig::default().with_creation_fee(100).with_max_page_size(2),
            CurveContext::default(),
        )
    }

    #[test]
    fn test_addresses_are_unique_per_position() {
        let registry = registry();
        let creator = Pubkey::new_unique();
        let a = registry.create_curve(creator, 100, CreateCurveParams::new("A", "A")).unwrap();
        let b = registry.create_curve(creator, 100, CreateCurveParams::new("B", "B")).unwrap();
        assert_ne!(a.address(), b.address());
        assert_eq!(
            a.address(),
            Pubkey::create_with_seed(&creator, "curve-0", &CURVE_PROGRAM_ID).unwrap()
        );
        assert_eq!(a.market_cap_threshold(), DEFAULT_MARKET_CAP_THRESHOLD);
    }

    #[test]
    fn test_fee_and_metadata_checks() {
        let registry = registry();
        let creator = Pubkey::new_unique();
        assert_eq!(
            registry.create_curve(creator, 99, CreateCurveParams::new("A", "A")).err(),
            Some(CurveError::CreationFeeTooLow { required: 100, provided: 99 })
        );
        assert!(matches!(
            registry.create_curve(creator, 100, CreateCurveParams::new("A", "")),
            Err(CurveError::InvalidMetadata(_))
        ));
        assert!(matches!(
            registry.create_curve(
                creator,
                100,
                CreateCurveParams::new("A", "A").with_logo_uri("x".repeat(201))
            ),
            Err(CurveError::InvalidMetadata(_))
        ));
        assert_eq!(
            registry
                .create_curve(creator, 100, CreateCurveParams::new("A", "A").with_market_cap_threshold(0))
                .err(),
            Some(CurveError::InvalidThreshold)
        );
        assert_eq!(registry.curve_count(), 0);
        assert_eq!(registry.collected_fees(), 0);

        registry
            .create_curve(creator, 150, CreateCurveParams::new("A", "A").with_market_cap_threshold(SCALE))
            .unwrap();
        assert_eq!(registry.collected_fees(), 150);
    }

    #[test]
    fn test_page_size_is_clamped() {
        let registry = registry();
        let creator = Pubkey::new_unique();
        for i in 0..3 {
            registry
                .create_curve(creator, 100, CreateCurveParams::new(format!("C{i}"), "C"))
                .unwrap();
        }
        let page = registry.list_curves(0, 50).unwrap();
        assert_eq!(page.page_size, 2);
        assert_eq!(page.items.len(), 2);
        assert!(page.has_next());

        let last = registry.list_curves(1, 2).unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].details.name, "C2");
        assert!(!last.has_next());
    }

    #[test]
    fn test_total_matches_listing_during_creation() {
        let registry = CurveRegistry::new(
            RegistryConfig::default().with_creation_fee(100).with_max_page_size(100),
            CurveContext::default(),
        );
        let creator = Pubkey::new_unique();
        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..50 {
                    registry
                        .create_curve(creator, 100, CreateCurveParams::new(format!("C{i}"), "C"))
                        .unwrap();
                }
            });
            for _ in 0..200 {
                let page = registry.list_curves(0, 100).unwrap();
                assert_eq!(page.total, page.items.len());
            }
        });
        assert_eq!(registry.list_curves(0, 100).unwrap().total, 50);
    }
}
