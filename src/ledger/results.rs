// 8.0.2: requests, receipts and errors for ledger operations.

use crate::config::ConfigError;
use crate::lmsr::{LmsrError, TradePreview};
use crate::market::MarketSnapshot;
use crate::settlement::{BatchId, SettlementError};
use crate::types::{AccountId, Fixed, MarketId, Outcome};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub market_id: MarketId,
    pub account_id: AccountId,
    pub outcome: Outcome,
    // gross, the fee is taken out of it
    pub pay_amount: Fixed,
    // version the caller quoted against. None trades at whatever is current
    pub expected_version: Option<u64>,
}

impl TradeRequest {
    pub fn new(market_id: MarketId, account_id: AccountId, outcome: Outcome, pay_amount: Fixed) -> Self {
        Self {
            market_id,
            account_id,
            outcome,
            pay_amount,
            expected_version: None,
        }
    }

    pub fn at_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeReceipt {
    pub preview: TradePreview,
    // state after the trade
    pub snapshot: MarketSnapshot,
    // b the trade was priced with
    pub liquidity: Fixed,
    // batches queued by automatic settlement, if this trade triggered it
    pub settlement_batches: Vec<BatchId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub committed: Vec<(BatchId, String)>,
    pub failed: Vec<BatchId>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Market {0:?} not found")]
    MarketNotFound(MarketId),

    #[error("Market {0:?} already exists")]
    MarketExists(MarketId),

    #[error("Market {0:?} is not active")]
    MarketNotActive(MarketId),

    #[error("Market {market_id:?} moved to version {actual}, trade quoted at {expected}")]
    StaleVersion { market_id: MarketId, expected: u64, actual: u64 },

    #[error("Payment {pay_amount} buys no shares")]
    TradeTooSmall { pay_amount: Fixed },

    #[error("Market {market_id:?} would fail the price sum check at version {version}")]
    InvariantViolation { market_id: MarketId, version: u64 },

    #[error("Arithmetic overflow updating ledger state")]
    Overflow,

    #[error("Pricing error: {0}")]
    Pricing(#[from] LmsrError),

    #[error("Settlement error: {0}")]
    Settlement(#[from] SettlementError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}
