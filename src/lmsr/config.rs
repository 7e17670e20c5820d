//! Pricing engine configuration. Supplied once, never mutated.

use super::results::LmsrError;
use crate::types::Fixed;
use serde::{Deserialize, Serialize};

/// Dynamic liquidity parameters: `b = b0 * (1 + alpha*sqrt(V/V0) + beta*ln(1+n))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LmsrParams {
    /// Day-one liquidity, must be positive.
    pub b0: Fixed,
    /// Sensitivity to traded volume.
    pub alpha: Fixed,
    /// Sensitivity to trade count.
    pub beta: Fixed,
    /// Reference volume the traded volume is normalized by, must be positive.
    pub v0: Fixed,
}

impl Default for LmsrParams {
    fn default() -> Self {
        Self {
            b0: Fixed::from_units(100),
            alpha: Fixed::from_raw(50_000_000_000_000_000), // 0.05
            beta: Fixed::from_raw(20_000_000_000_000_000),  // 0.02
            v0: Fixed::from_units(1_000_000),
        }
    }
}

/// Which logarithm the cost function and dynamic b use.
///
/// `Coarse` is the two-bucket log2 every counterparty reproduces. `Fine` is far
/// more accurate but yields different integers, so both sides of a channel have
/// to agree on it up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogPrecision {
    #[default]
    Coarse,
    Fine,
}

/// Share solver bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Upper search bound as a multiple of the payment.
    pub bound_multiplier: u32,
    /// Binary search iteration cap.
    pub max_iterations: u32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            bound_multiplier: 10,
            max_iterations: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub params: LmsrParams,
    #[serde(default)]
    pub log_precision: LogPrecision,
    #[serde(default)]
    pub search: SearchParams,
}

impl EngineConfig {
    /// Reject parameters the pricing functions cannot work with.
    pub fn validate(&self) -> Result<(), LmsrError> {
        let params = &self.params;
        if !params.b0.is_positive() {
            return Err(LmsrError::InvalidParams {
                reason: format!("b0 must be positive, got {}", params.b0),
            });
        }
        if !params.v0.is_positive() {
            return Err(LmsrError::InvalidParams {
                reason: format!("v0 must be positive, got {}", params.v0),
            });
        }
        if params.alpha.is_negative() || params.beta.is_negative() {
            return Err(LmsrError::InvalidParams {
                reason: "alpha and beta must not be negative".to_string(),
            });
        }
        if self.search.bound_multiplier == 0 || self.search.max_iterations == 0 {
            return Err(LmsrError::InvalidParams {
                reason: "search bound and iteration cap must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}
