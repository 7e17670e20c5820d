// 4.0: per-account holdings in one market. shares only ever grow, there is no sell path.
// 4.1 marks holdings to the current prices, 4.2 is the unsettled delta.

use crate::lmsr::PricePair;
use crate::math::{self, MathError};
use crate::types::{Fixed, MarketId, Outcome, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub market_id: MarketId,
    pub yes_shares: Fixed,
    pub no_shares: Fixed,
    // gross payments, fees included
    pub total_paid: Fixed,
    pub fees_paid: Fixed,
    pub trade_count: u64,
    pub opened_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Position {
    pub fn new(market_id: MarketId, timestamp: Timestamp) -> Self {
        Self {
            market_id,
            yes_shares: Fixed::ZERO,
            no_shares: Fixed::ZERO,
            total_paid: Fixed::ZERO,
            fees_paid: Fixed::ZERO,
            trade_count: 0,
            opened_at: timestamp,
            updated_at: timestamp,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.yes_shares.is_zero() && self.no_shares.is_zero()
    }

    pub fn shares(&self, outcome: Outcome) -> Fixed {
        match outcome {
            Outcome::Yes => self.yes_shares,
            Outcome::No => self.no_shares,
        }
    }

    /// Payout if `outcome` resolves true. one unit per winning share.
    pub fn payout_if(&self, outcome: Outcome) -> Fixed {
        self.shares(outcome)
    }

    pub fn record_fill(
        &mut self,
        outcome: Outcome,
        shares: Fixed,
        paid: Fixed,
        fee: Fixed,
        timestamp: Timestamp,
    ) -> Option<()> {
        match outcome {
            Outcome::Yes => self.yes_shares = self.yes_shares.checked_add(shares)?,
            Outcome::No => self.no_shares = self.no_shares.checked_add(shares)?,
        }
        self.total_paid = self.total_paid.checked_add(paid)?;
        self.fees_paid = self.fees_paid.checked_add(fee)?;
        self.trade_count += 1;
        self.updated_at = timestamp;
        Some(())
    }

    // 4.1: holdings valued at the current marginal prices
    pub fn mark_value(&self, prices: &PricePair) -> Result<Fixed, MathError> {
        let yes = math::mul(self.yes_shares.raw(), prices.yes.raw())?;
        let no = math::mul(self.no_shares.raw(), prices.no.raw())?;
        Ok(Fixed::from_raw(yes.checked_add(no).ok_or(MathError::Overflow)?))
    }
}

/** 4.2: shares and payments not yet handed to settlement */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PositionDelta {
    pub yes_shares: Fixed,
    pub no_shares: Fixed,
    pub paid: Fixed,
}

impl PositionDelta {
    pub fn is_empty(&self) -> bool {
        self.yes_shares.is_zero() && self.no_shares.is_zero() && self.paid.is_zero()
    }

    pub fn record(&mut self, outcome: Outcome, shares: Fixed, paid: Fixed) -> Option<()> {
        match outcome {
            Outcome::Yes => self.yes_shares = self.yes_shares.checked_add(shares)?,
            Outcome::No => self.no_shares = self.no_shares.checked_add(shares)?,
        }
        self.paid = self.paid.checked_add(paid)?;
        Some(())
    }

    /// Fold another delta into this one.
    pub fn merge(&mut self, other: &PositionDelta) -> Option<()> {
        let yes_shares = self.yes_shares.checked_add(other.yes_shares)?;
        let no_shares = self.no_shares.checked_add(other.no_shares)?;
        let paid = self.paid.checked_add(other.paid)?;
        *self = PositionDelta { yes_shares, no_shares, paid };
        Some(())
    }
}
