//! Cost function and marginal prices.
//!
//! C(q) = b * ln(e^(q_yes/b) + e^(q_no/b))
//! p_yes = e^(q_yes/b) / (e^(q_yes/b) + e^(q_no/b))

use super::core::LmsrEngine;
use super::results::{LmsrError, PricePair};
use crate::math::{self, MathError, LN2};
use crate::types::{Fixed, MarketQuantities};

impl LmsrEngine {
    /// Total cost of the outstanding quantities.
    pub fn cost(&self, q: &MarketQuantities, b: Fixed) -> Result<Fixed, LmsrError> {
        Self::check_state(q, b)?;

        // ln(e^0 + e^0) = ln 2, exact without going through the approximations
        if q.is_zero() {
            return Ok(Fixed::from_raw(math::mul(b.raw(), LN2)?));
        }

        let sum = self.exp_sum(q, b)?;
        let ln_sum = self.ln(sum.0.checked_add(sum.1).ok_or(MathError::Overflow)?)?;
        Ok(Fixed::from_raw(math::mul(b.raw(), ln_sum)?))
    }

    /// Marginal price of each outcome.
    pub fn price(&self, q: &MarketQuantities, b: Fixed) -> Result<PricePair, LmsrError> {
        Self::check_state(q, b)?;

        if q.is_zero() {
            return Ok(PricePair::even());
        }

        let (exp_yes, exp_no) = self.exp_sum(q, b)?;
        let total = exp_yes.checked_add(exp_no).ok_or(MathError::Overflow)?;
        if total == 0 {
            return Ok(PricePair::even());
        }

        Ok(PricePair {
            yes: Fixed::from_raw(math::div(exp_yes, total)?),
            no: Fixed::from_raw(math::div(exp_no, total)?),
        })
    }

    // (e^(q_yes/b), e^(q_no/b))
    fn exp_sum(&self, q: &MarketQuantities, b: Fixed) -> Result<(i128, i128), MathError> {
        Ok((self.exp_ratio(q.q_yes, b)?, self.exp_ratio(q.q_no, b)?))
    }
}
