//! 256-bit working integer for curve math
//!
//! Every product of two `u128` operands fits, so intermediate overflow can
//! only show up when a result is narrowed back to `u128`.

use uint::construct_uint;

use crate::common::errors::{CurveError, CurveResult};

construct_uint! {
    pub struct U256(4);
}

impl U256 {
    /// Narrow back to `u128`, failing with `ArithmeticOverflow` when it does not fit
    #[inline]
    pub fn try_to_u128(self) -> CurveResult<u128> {
        if self.bits() > 128 {
            return Err(CurveError::ArithmeticOverflow);
        }
        Ok(self.as_u128())
    }
}
