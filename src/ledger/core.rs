// 8.0 ledger/core.rs: the market ledger. owns every market's state, positions and
// the settlement queue. the pricing engine only ever sees snapshots handed out here.

use super::results::LedgerError;
use crate::config::LedgerConfig;
use crate::events::{Event, EventId, EventPayload, MarketOpenedEvent, MarketStatusChangedEvent};
use crate::lmsr::{LmsrEngine, PricePair};
use crate::market::{MarketSnapshot, MarketState, MarketStatus};
use crate::position::{Position, PositionDelta};
use crate::settlement::SettlementManager;
use crate::types::{AccountId, Fixed, MarketId, Timestamp};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/** 8.1: main ledger struct. all mutable state lives here, callers serialize access */
#[derive(Debug)]
pub struct MarketLedger {
    pub(super) config: LedgerConfig,
    pub(super) engine: LmsrEngine,
    pub(super) markets: HashMap<MarketId, MarketState>,
    pub(super) positions: HashMap<(AccountId, MarketId), Position>,
    // ordered so settlement batches come out the same on every run
    pub(super) unsettled: BTreeMap<(MarketId, AccountId), PositionDelta>,
    pub(super) settlements: SettlementManager,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) current_time: Timestamp,
}

impl MarketLedger {
    pub fn new(config: LedgerConfig) -> Result<Self, LedgerError> {
        config.validate()?;
        let engine = LmsrEngine::new(config.engine)?;
        let settlements = SettlementManager::new(config.settlement.max_batch_size);

        Ok(Self {
            config,
            engine,
            markets: HashMap::new(),
            positions: HashMap::new(),
            unsettled: BTreeMap::new(),
            settlements,
            events: Vec::new(),
            next_event_id: 1,
            current_time: Timestamp::from_millis(0),
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn engine(&self) -> &LmsrEngine {
        &self.engine
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis() + millis);
    }

    pub fn open_market(&mut self, market_id: MarketId, name: impl Into<String>) -> Result<MarketSnapshot, LedgerError> {
        if self.markets.contains_key(&market_id) {
            return Err(LedgerError::MarketExists(market_id));
        }

        let state = MarketState::new(market_id, name, self.current_time);
        let snapshot = state.snapshot;
        let name = state.name.clone();
        self.markets.insert(market_id, state);

        let liquidity = self.engine.params().b0;
        info!("Opened market {:?} '{}' with b = {}", market_id, name, liquidity);
        self.emit_event(EventPayload::MarketOpened(MarketOpenedEvent {
            market_id,
            name,
            liquidity,
        }));

        Ok(snapshot)
    }

    pub fn pause_market(&mut self, market_id: MarketId) -> Result<(), LedgerError> {
        self.set_status(market_id, MarketStatus::Paused)
    }

    pub fn resume_market(&mut self, market_id: MarketId) -> Result<(), LedgerError> {
        self.set_status(market_id, MarketStatus::Active)
    }

    fn set_status(&mut self, market_id: MarketId, new_status: MarketStatus) -> Result<(), LedgerError> {
        let market = self
            .markets
            .get_mut(&market_id)
            .ok_or(LedgerError::MarketNotFound(market_id))?;

        let old_status = market.status;
        if old_status == new_status {
            return Ok(());
        }
        market.status = new_status;
        market.last_updated = self.current_time;

        info!("Market {:?} {:?} -> {:?}", market_id, old_status, new_status);
        self.emit_event(EventPayload::MarketStatusChanged(MarketStatusChangedEvent {
            market_id,
            old_status,
            new_status,
        }));
        Ok(())
    }

    pub fn market(&self, market_id: MarketId) -> Option<&MarketState> {
        self.markets.get(&market_id)
    }

    pub fn snapshot(&self, market_id: MarketId) -> Result<MarketSnapshot, LedgerError> {
        self.markets
            .get(&market_id)
            .map(|m| m.snapshot)
            .ok_or(LedgerError::MarketNotFound(market_id))
    }

    /// Current dynamic b of a market
    pub fn liquidity(&self, market_id: MarketId) -> Result<Fixed, LedgerError> {
        let snapshot = self.snapshot(market_id)?;
        Ok(self.engine.dynamic_b(snapshot.total_volume, snapshot.tx_count)?)
    }

    pub fn prices(&self, market_id: MarketId) -> Result<PricePair, LedgerError> {
        let snapshot = self.snapshot(market_id)?;
        let b = self.engine.dynamic_b(snapshot.total_volume, snapshot.tx_count)?;
        Ok(self.engine.price(&snapshot.quantities, b)?)
    }

    pub fn position(&self, account_id: AccountId, market_id: MarketId) -> Option<&Position> {
        self.positions.get(&(account_id, market_id))
    }

    pub fn positions_for(&self, account_id: AccountId) -> impl Iterator<Item = &Position> {
        self.positions
            .iter()
            .filter(move |((account, _), _)| *account == account_id)
            .map(|(_, position)| position)
    }

    /// Shares and net payments not yet handed to settlement
    pub fn unsettled(&self, account_id: AccountId, market_id: MarketId) -> PositionDelta {
        self.unsettled
            .get(&(market_id, account_id))
            .copied()
            .unwrap_or_default()
    }

    pub fn settlements(&self) -> &SettlementManager {
        &self.settlements
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        debug!("[Event {}] {:?}", event.id.0, event.payload);

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}
