pub mod big_num;
pub mod fixed_point;
pub mod linear_curve;

pub use big_num::U256;
pub use fixed_point::{isqrt, isqrt_u256, mul_div, scaled_mul};
pub use linear_curve::{cost_to_buy, market_cap, proceeds_from_sell, spot_price, tokens_for_payment};
