// 11.0: every state change produces an event. used for audit trails and for
// replaying a market from genesis. the EventPayload enum lists all event types.

use crate::market::MarketStatus;
use crate::settlement::BatchId;
use crate::types::{AccountId, Fixed, MarketId, Outcome, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Market lifecycle
    MarketOpened(MarketOpenedEvent),
    MarketStatusChanged(MarketStatusChangedEvent),

    // Trade events
    TradeExecuted(TradeExecutedEvent),
    TradeRejected(TradeRejectedEvent),

    // Settlement events
    SettlementCommitted(SettlementCommittedEvent),
    SettlementExecuted(SettlementExecutedEvent),
    SettlementFailed(SettlementFailedEvent),
}

impl EventPayload {
    pub fn market_id(&self) -> Option<MarketId> {
        match self {
            EventPayload::MarketOpened(e) => Some(e.market_id),
            EventPayload::MarketStatusChanged(e) => Some(e.market_id),
            EventPayload::TradeExecuted(e) => Some(e.market_id),
            EventPayload::TradeRejected(e) => Some(e.market_id),
            EventPayload::SettlementCommitted(e) => Some(e.market_id),
            EventPayload::SettlementExecuted(_) | EventPayload::SettlementFailed(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketOpenedEvent {
    pub market_id: MarketId,
    pub name: String,
    pub liquidity: Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketStatusChangedEvent {
    pub market_id: MarketId,
    pub old_status: MarketStatus,
    pub new_status: MarketStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeExecutedEvent {
    pub market_id: MarketId,
    pub account_id: AccountId,
    pub outcome: Outcome,
    pub pay_amount: Fixed,
    pub fee: Fixed,
    pub shares: Fixed,
    pub new_price: Fixed,
    // b the trade was priced with
    pub liquidity: Fixed,
    pub version: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRejectedEvent {
    pub market_id: MarketId,
    pub account_id: AccountId,
    pub outcome: Outcome,
    pub pay_amount: Fixed,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementCommittedEvent {
    pub market_id: MarketId,
    pub batch_id: BatchId,
    pub instruction_count: usize,
    pub fees_swept: Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementExecutedEvent {
    pub batch_id: BatchId,
    pub commitment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementFailedEvent {
    pub batch_id: BatchId,
    pub reason: String,
}
