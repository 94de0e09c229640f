pub mod bonding_curve;
pub mod clock;
pub mod errors;
pub mod holders;
pub mod ledger;
pub mod serde_u128;
pub mod types;

pub use bonding_curve::{CurveAccount, MigrationStatus, TradingPhase};
pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{CurveError, CurveResult};
pub use holders::{HolderChange, HolderTracker};
pub use ledger::{FungibleLedger, InMemoryLedger, LedgerError};
pub use types::{AnyResult, CurveConfig};
