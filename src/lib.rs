pub mod common;
pub mod constants;
pub mod registry;
pub mod trading;
pub mod utils;

pub use crate::common::{
    Clock, CurveAccount, CurveConfig, CurveError, CurveResult, FungibleLedger, InMemoryLedger,
    ManualClock, MigrationStatus, SystemClock, TradingPhase,
};
pub use crate::registry::{CreateCurveParams, CurvePage, CurveRegistry, RegistryConfig};
pub use crate::trading::{
    BondingCurve, CurveContext, CurveDetails, CurveEvent, CurveEventListener, LiquidityMigrator,
    NativeTransfer,
};
pub use crate::utils::quote::{BuyQuote, SellQuote};
