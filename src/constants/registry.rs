use super::curve::SCALE;

/// Default fee charged by the registry for deploying a curve (0.02 native)
pub const DEFAULT_CREATION_FEE: u128 = 20_000_000_000_000_000;

/// Default market cap at which a curve migrates (100 native)
pub const DEFAULT_MARKET_CAP_THRESHOLD: u128 = 100 * SCALE;

/// Upper bound for one page of `list_curves`
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;
