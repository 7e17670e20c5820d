// 3.0.2: result types and errors for pricing operations.

use crate::math::MathError;
use crate::types::{Bps, Fixed, Outcome};
use serde::{Deserialize, Serialize};

/// Marginal price of each outcome, both in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePair {
    pub yes: Fixed,
    pub no: Fixed,
}

impl PricePair {
    pub fn even() -> Self {
        Self {
            yes: Fixed::HALF,
            no: Fixed::HALF,
        }
    }

    pub fn get(&self, outcome: Outcome) -> Fixed {
        match outcome {
            Outcome::Yes => self.yes,
            Outcome::No => self.no,
        }
    }

    pub fn sum(&self) -> Fixed {
        self.yes.saturating_add(self.no)
    }
}

/// Advisory result of a hypothetical trade. Nothing is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradePreview {
    pub outcome: Outcome,
    pub expected_shares: Fixed,
    pub current_price: Fixed,
    pub new_price: Fixed,
    /// (new - current) / current, signed.
    pub price_impact: Fixed,
    /// net_amount / expected_shares, zero when no shares.
    pub avg_price: Fixed,
    pub fee: Fixed,
    pub net_amount: Fixed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LmsrError {
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    #[error("Liquidity parameter must be positive, got {0}")]
    NonPositiveLiquidity(Fixed),

    #[error("Negative {outcome} quantity {value}")]
    NegativeQuantity { outcome: Outcome, value: Fixed },

    #[error("Payment must not be negative, got {0}")]
    NegativePayment(Fixed),

    #[error("Traded volume must not be negative, got {0}")]
    NegativeVolume(Fixed),

    #[error("Share search hit its bound {bound} for payment {payment}")]
    SearchBoundExceeded { payment: Fixed, bound: Fixed },

    #[error("Fee rate {0} exceeds 100%")]
    InvalidFeeRate(Bps),

    #[error("Invalid pricing params: {reason}")]
    InvalidParams { reason: String },
}
