// 3.3: share solver. finds the largest share count whose cost fits the payment.
// binary search over [0, pay * bound_multiplier] with an iteration cap. every step
// keeps `lo` on the affordable side, so a search that runs out of iterations returns
// fewer shares than the payment justifies, never more.

use super::core::LmsrEngine;
use super::results::LmsrError;
use crate::math::MathError;
use crate::types::{Fixed, MarketQuantities, Outcome};
use tracing::debug;

impl LmsrEngine {
    pub fn solve_shares(
        &self,
        pay_amount: Fixed,
        outcome: Outcome,
        q: &MarketQuantities,
        b: Fixed,
    ) -> Result<Fixed, LmsrError> {
        Self::check_state(q, b)?;
        if pay_amount.is_negative() {
            return Err(LmsrError::NegativePayment(pay_amount));
        }
        if pay_amount.is_zero() {
            return Ok(Fixed::ZERO);
        }

        let search = &self.config.search;
        let base_cost = self.cost(q, b)?;
        let affordable = |shares: i128| -> Result<bool, LmsrError> {
            let after = q
                .with_added(outcome, Fixed::from_raw(shares))
                .ok_or(MathError::Overflow)?;
            let delta = self
                .cost(&after, b)?
                .checked_sub(base_cost)
                .ok_or(MathError::Overflow)?;
            Ok(delta <= pay_amount)
        };

        let upper = pay_amount
            .raw()
            .checked_mul(search.bound_multiplier as i128)
            .ok_or(MathError::Overflow)?;

        // the answer is not bracketed, report it rather than under-pricing silently
        if affordable(upper)? {
            debug!(%pay_amount, %outcome, %b, "share search bound reached");
            return Err(LmsrError::SearchBoundExceeded {
                payment: pay_amount,
                bound: Fixed::from_raw(upper),
            });
        }

        let mut lo: i128 = 0;
        let mut hi: i128 = upper;
        for _ in 0..search.max_iterations {
            if lo >= hi {
                break;
            }
            // upper midpoint so the loop always makes progress
            let mid = lo + (hi - lo + 1) / 2;
            if affordable(mid)? {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }

        Ok(Fixed::from_raw(lo))
    }
}
