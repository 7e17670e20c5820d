//! Market state.
//!
//! A market is one YES/NO question with its own outstanding quantities,
//! traded volume and fee pool. Pricing never reads this struct directly, the
//! ledger hands the engine an immutable [`MarketSnapshot`] instead.

use crate::types::{Fixed, MarketId, MarketQuantities, Outcome, Timestamp};
use serde::{Deserialize, Serialize};

/// Market status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MarketStatus {
    /// Market is open for trading
    #[default]
    Active,
    /// Trading paused (e.g., pending resolution or emergency)
    Paused,
}

/// Everything the pricing engine needs about a market at one version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub market_id: MarketId,
    pub quantities: MarketQuantities,
    /// Gross payments received, fees included
    pub total_volume: Fixed,
    pub tx_count: u64,
    /// Bumped on every committed trade
    pub version: u64,
}

impl MarketSnapshot {
    pub fn genesis(market_id: MarketId) -> Self {
        Self {
            market_id,
            quantities: MarketQuantities::zero(),
            total_volume: Fixed::ZERO,
            tx_count: 0,
            version: 0,
        }
    }

    /// Snapshot after issuing `shares` of `outcome` for a gross payment of `paid`.
    /// None on overflow.
    pub fn after_trade(&self, outcome: Outcome, shares: Fixed, paid: Fixed) -> Option<Self> {
        Some(Self {
            market_id: self.market_id,
            quantities: self.quantities.with_added(outcome, shares)?,
            total_volume: self.total_volume.checked_add(paid)?,
            tx_count: self.tx_count.checked_add(1)?,
            version: self.version.checked_add(1)?,
        })
    }
}

/// Runtime state the ledger keeps per market
#[derive(Debug, Clone)]
pub struct MarketState {
    pub name: String,
    pub status: MarketStatus,
    pub snapshot: MarketSnapshot,
    /// Fees accrued since the last settlement sweep
    pub unswept_fees: Fixed,
    /// Fees accrued over the market's lifetime
    pub collected_fees: Fixed,
    pub opened_at: Timestamp,
    pub last_updated: Timestamp,
}

impl MarketState {
    pub fn new(market_id: MarketId, name: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            name: name.into(),
            status: MarketStatus::Active,
            snapshot: MarketSnapshot::genesis(market_id),
            unswept_fees: Fixed::ZERO,
            collected_fees: Fixed::ZERO,
            opened_at: timestamp,
            last_updated: timestamp,
        }
    }

    pub fn id(&self) -> MarketId {
        self.snapshot.market_id
    }

    pub fn is_active(&self) -> bool {
        self.status == MarketStatus::Active
    }

    /// Install a validated snapshot and accrue its fee
    pub fn commit(&mut self, snapshot: MarketSnapshot, fee: Fixed, timestamp: Timestamp) -> Option<()> {
        let unswept = self.unswept_fees.checked_add(fee)?;
        let collected = self.collected_fees.checked_add(fee)?;
        self.unswept_fees = unswept;
        self.collected_fees = collected;
        self.snapshot = snapshot;
        self.last_updated = timestamp;
        Some(())
    }

    /// Take the fees accrued since the last sweep
    pub fn sweep_fees(&mut self) -> Fixed {
        std::mem::take(&mut self.unswept_fees)
    }
}
