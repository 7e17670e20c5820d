// 3.2: dynamic liquidity. b grows with traded volume and trade count so later trades
// move the price less. b = b0 * (1 + alpha*sqrt(V/V0) + beta*ln(1+n))

use super::core::LmsrEngine;
use super::results::LmsrError;
use crate::math::{self, MathError, SCALE};
use crate::types::Fixed;

impl LmsrEngine {
    pub fn dynamic_b(&self, total_volume: Fixed, tx_count: u64) -> Result<Fixed, LmsrError> {
        let params = &self.config.params;

        // day one liquidity stays exactly at the configured base
        if total_volume.is_zero() && tx_count == 0 {
            return Ok(params.b0);
        }
        if total_volume.is_negative() {
            return Err(LmsrError::NegativeVolume(total_volume));
        }

        let volume_ratio = math::div(total_volume.raw(), params.v0.raw())?;
        let volume_term = math::mul(params.alpha.raw(), math::sqrt(volume_ratio)?)?;

        // u64::MAX * SCALE still fits in i128
        let trades = (tx_count as i128 + 1) * SCALE;
        let count_term = math::mul(params.beta.raw(), self.ln(trades)?)?;

        let factor = SCALE
            .checked_add(volume_term)
            .and_then(|f| f.checked_add(count_term))
            .ok_or(MathError::Overflow)?;

        Ok(Fixed::from_raw(math::mul(params.b0.raw(), factor)?))
    }
}
