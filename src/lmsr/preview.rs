// 3.4: trade preview. fee split, share count, price before/after and impact.
// advisory only, the caller decides whether to commit.

use super::core::LmsrEngine;
use super::results::{LmsrError, TradePreview};
use crate::math::{self, MathError, SCALE};
use crate::types::{Bps, Fixed, MarketQuantities, Outcome};

impl LmsrEngine {
    pub fn preview_trade(
        &self,
        pay_amount: Fixed,
        outcome: Outcome,
        q: &MarketQuantities,
        b: Fixed,
        fee_rate: Bps,
    ) -> Result<TradePreview, LmsrError> {
        if fee_rate.value() > Bps::MAX {
            return Err(LmsrError::InvalidFeeRate(fee_rate));
        }
        if pay_amount.is_negative() {
            return Err(LmsrError::NegativePayment(pay_amount));
        }

        let fee = fee_rate.apply(pay_amount).ok_or(MathError::Overflow)?;
        let net_amount = pay_amount.checked_sub(fee).ok_or(MathError::Overflow)?;

        let expected_shares = self.solve_shares(net_amount, outcome, q, b)?;

        let current_price = self.price(q, b)?.get(outcome);
        let after = q
            .with_added(outcome, expected_shares)
            .ok_or(MathError::Overflow)?;
        let new_price = self.price(&after, b)?.get(outcome);

        let price_impact = if current_price.is_zero() {
            Fixed::ZERO
        } else {
            let moved = new_price.raw() - current_price.raw();
            Fixed::from_raw(math::mul_div(moved, SCALE, current_price.raw())?)
        };

        let avg_price = if expected_shares.is_zero() {
            Fixed::ZERO
        } else {
            Fixed::from_raw(math::div(net_amount.raw(), expected_shares.raw())?)
        };

        Ok(TradePreview {
            outcome,
            expected_shares,
            current_price,
            new_price,
            price_impact,
            avg_price,
            fee,
            net_amount,
        })
    }
}
