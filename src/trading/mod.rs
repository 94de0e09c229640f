pub mod curve;
pub mod custody;
pub mod lifecycle;
pub mod migration;
pub mod transfer;

pub use curve::{BondingCurve, BuyReceipt, CurveContext, CurveDetails, RecoveryReceipt, SellReceipt};
pub use custody::{CallGuard, ReentrancyGuard};
pub use lifecycle::{
    CurveEvent, CurveEventListener, ListenerRef, NoopListener, RecordingListener, TracingListener,
};
pub use migration::{DisabledMigrator, LiquidityMigrator, MigrationOutcome, MigrationRequest};
pub use transfer::{NativeTransfer, NativeVault};
