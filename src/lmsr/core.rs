// 3.0 lmsr/core.rs: the pricing engine. holds only immutable config.
// every operation takes the full market state as arguments and returns a new value.

use super::config::{EngineConfig, LmsrParams, LogPrecision};
use super::results::LmsrError;
use crate::math::{self, MathError};
use crate::types::{Fixed, MarketQuantities, Outcome};

/** 3.1: stateless LMSR engine. Send + Sync, share it behind an Arc freely */
#[derive(Debug, Clone)]
pub struct LmsrEngine {
    pub(super) config: EngineConfig,
}

impl LmsrEngine {
    pub fn new(config: EngineConfig) -> Result<Self, LmsrError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn params(&self) -> &LmsrParams {
        &self.config.params
    }

    // natural log under the configured precision
    pub(super) fn ln(&self, x: i128) -> Result<i128, MathError> {
        match self.config.log_precision {
            LogPrecision::Coarse => math::ln(x),
            LogPrecision::Fine => math::ln_fine(x),
        }
    }

    // e^(q/b) for one outcome. a ratio too large for i128 is far past the cap
    pub(super) fn exp_ratio(&self, q: Fixed, b: Fixed) -> Result<i128, MathError> {
        let ratio = match math::div(q.raw(), b.raw()) {
            Ok(ratio) => ratio,
            Err(MathError::Overflow) => math::EXP_INPUT_CAP,
            Err(err) => return Err(err),
        };
        math::exp_approx(ratio)
    }

    pub(super) fn check_state(q: &MarketQuantities, b: Fixed) -> Result<(), LmsrError> {
        if !b.is_positive() {
            return Err(LmsrError::NonPositiveLiquidity(b));
        }
        for outcome in [Outcome::Yes, Outcome::No] {
            let value = q.get(outcome);
            if value.is_negative() {
                return Err(LmsrError::NegativeQuantity { outcome, value });
            }
        }
        Ok(())
    }
}
