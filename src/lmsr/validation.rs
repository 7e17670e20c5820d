// 3.5: state sanity check. called by the ledger after building a new snapshot,
// before it commits. never invoked by the pricing operations themselves.

use super::core::LmsrEngine;
use crate::types::{Fixed, MarketQuantities};

/// Allowed drift of p_yes + p_no away from 1.0 (0.1%).
pub const PRICE_SUM_TOLERANCE: Fixed = Fixed::from_raw(1_000_000_000_000_000);

impl LmsrEngine {
    pub fn validate_state(&self, q: &MarketQuantities, b: Fixed) -> bool {
        match self.price(q, b) {
            Ok(prices) => {
                let drift = prices.yes.raw() + prices.no.raw() - Fixed::SCALE;
                drift.abs() < PRICE_SUM_TOLERANCE.raw()
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lmsr::EngineConfig;

    fn engine() -> LmsrEngine {
        LmsrEngine::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn fresh_market_is_valid() {
        assert!(engine().validate_state(&MarketQuantities::zero(), Fixed::from_units(100)));
    }

    #[test]
    fn skewed_market_is_valid() {
        let q = MarketQuantities::new(Fixed::from_units(300), Fixed::ZERO);
        assert!(engine().validate_state(&q, Fixed::from_units(100)));
    }

    #[test]
    fn one_wei_liquidity_is_valid() {
        let q = MarketQuantities::new(Fixed::from_units(1_000), Fixed::ZERO);
        assert!(engine().validate_state(&q, Fixed::from_raw(1)));
    }

    #[test]
    fn negative_quantity_is_invalid() {
        let q = MarketQuantities::new(Fixed::from_units(-1), Fixed::ZERO);
        assert!(!engine().validate_state(&q, Fixed::from_units(100)));
    }

    #[test]
    fn zero_liquidity_is_invalid() {
        assert!(!engine().validate_state(&MarketQuantities::zero(), Fixed::ZERO));
    }
}
