//! Linear bonding curve constants
//!
//! Pricing constants are fixed at design time and shared by every curve
//! instance. All scaled quantities are real values multiplied by [`SCALE`].

use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;

/// Fixed point scale (18 decimals)
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// Price of the first whole unit, in native base units
pub const INITIAL_PRICE: u128 = 10_000_000_000;

/// Price increase per whole unit issued, in native base units
pub const SLOPE: u128 = 1_000_000_000;

/// Seconds an owner must wait after creation before `recover_funds`
pub const RECOVERY_TIMELOCK_SECS: i64 = 30 * 24 * 60 * 60;

/// Owner of every curve address derived by the registry
pub const CURVE_PROGRAM_ID: Pubkey = pubkey!("CurveLaunch111111111111111111111111111111111");

/// Seed prefix for curve address derivation (`curve-<index>`)
pub const CURVE_SEED_PREFIX: &str = "curve-";

/// Token metadata limits
pub const MAX_NAME_LEN: usize = 32;
pub const MAX_SYMBOL_LEN: usize = 10;
pub const MAX_LOGO_URI_LEN: usize = 200;
