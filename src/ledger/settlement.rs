//! Settlement hand-off.
//!
//! Unsettled per-account deltas and swept fees leave the ledger as batches
//! queued on the [`SettlementManager`]; a [`SettlementBackend`] makes them final.
//! A batch the backend rejects goes back to the unsettled set and rides along
//! with the market's next settlement.

use super::core::MarketLedger;
use super::results::{FlushReport, LedgerError};
use crate::events::{
    EventPayload, SettlementCommittedEvent, SettlementExecutedEvent, SettlementFailedEvent,
};
use crate::position::PositionDelta;
use crate::settlement::{BatchId, SettlementBackend, SettlementBatch, SettlementInstruction};
use crate::types::{AccountId, Fixed, MarketId};
use tracing::{info, warn};

impl MarketLedger {
    /// Queue every unsettled delta of a market, plus its accrued fees, for settlement.
    /// Splits into several batches when the instruction count exceeds the batch size.
    /// Returns the queued batch ids, empty when there was nothing to settle.
    pub fn settle_market(&mut self, market_id: MarketId) -> Result<Vec<BatchId>, LedgerError> {
        let market = self
            .markets
            .get(&market_id)
            .ok_or(LedgerError::MarketNotFound(market_id))?;
        let fees = market.unswept_fees;

        let range = (market_id, AccountId(0))..=(market_id, AccountId(u64::MAX));
        let mut instructions: Vec<SettlementInstruction> = self
            .unsettled
            .range(range)
            .filter(|(_, delta)| !delta.is_empty())
            .map(|(&(market, account), delta)| SettlementInstruction::Position {
                account,
                market,
                yes_shares: delta.yes_shares,
                no_shares: delta.no_shares,
                paid: delta.paid,
            })
            .collect();
        if fees.is_positive() {
            instructions.push(SettlementInstruction::FeeSweep { market: market_id, amount: fees });
        }
        if instructions.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_size = self.settlements.max_batch_size();
        let mut batch_ids = Vec::new();
        for chunk in instructions.chunks(chunk_size) {
            self.settlements.begin_batch(self.current_time);
            for instruction in chunk {
                if let Err(err) = self.settlements.add_instruction(instruction.clone()) {
                    self.settlements.abort_batch();
                    return Err(err.into());
                }
            }
            let batch_id = self.settlements.commit_batch()?;
            let fees_swept: Fixed = chunk
                .iter()
                .map(|i| match i {
                    SettlementInstruction::FeeSweep { amount, .. } => *amount,
                    SettlementInstruction::Position { .. } => Fixed::ZERO,
                })
                .sum();

            info!(
                "Queued settlement batch {} for market {:?}: {} instructions",
                batch_id,
                market_id,
                chunk.len()
            );
            self.emit_event(EventPayload::SettlementCommitted(SettlementCommittedEvent {
                market_id,
                batch_id,
                instruction_count: chunk.len(),
                fees_swept,
            }));
            batch_ids.push(batch_id);
        }

        // queued, so the ledger no longer owes these
        self.unsettled.retain(|(market, _), _| *market != market_id);
        if let Some(market) = self.markets.get_mut(&market_id) {
            market.sweep_fees();
        }

        Ok(batch_ids)
    }

    /// Queue settlement for every market with something outstanding.
    pub fn settle_all(&mut self) -> Result<Vec<BatchId>, LedgerError> {
        let mut market_ids: Vec<MarketId> = self.markets.keys().copied().collect();
        market_ids.sort();

        let mut batch_ids = Vec::new();
        for market_id in market_ids {
            batch_ids.extend(self.settle_market(market_id)?);
        }
        Ok(batch_ids)
    }

    /// Execute every pending batch on `backend`. failed batches stay in the audit trail.
    pub fn flush_settlements(&mut self, backend: &mut dyn SettlementBackend) -> FlushReport {
        let mut report = FlushReport::default();

        while let Some(batch) = self.settlements.next_pending() {
            let batch_id = batch.batch_id;
            match backend.execute(&batch) {
                Ok(commitment) => {
                    info!(
                        "Settled batch {} on {} backend: {}",
                        batch_id,
                        backend.backend_type(),
                        commitment
                    );
                    self.settlements.mark_completed(batch, commitment.clone(), self.current_time);
                    self.emit_event(EventPayload::SettlementExecuted(SettlementExecutedEvent {
                        batch_id,
                        commitment: commitment.clone(),
                    }));
                    report.committed.push((batch_id, commitment));
                }
                Err(err) => {
                    warn!("Settlement batch {} failed: {}, returning it to unsettled", batch_id, err);
                    self.restore_unsettled(&batch);
                    self.settlements.mark_failed(batch, self.current_time);
                    self.emit_event(EventPayload::SettlementFailed(SettlementFailedEvent {
                        batch_id,
                        reason: err.to_string(),
                    }));
                    report.failed.push(batch_id);
                }
            }
        }

        report
    }

    // put a failed batch back so the next settle_market picks it up again
    fn restore_unsettled(&mut self, batch: &SettlementBatch) {
        for instruction in &batch.instructions {
            match instruction {
                SettlementInstruction::Position { account, market, yes_shares, no_shares, paid } => {
                    let returned = PositionDelta {
                        yes_shares: *yes_shares,
                        no_shares: *no_shares,
                        paid: *paid,
                    };
                    let delta = self.unsettled.entry((*market, *account)).or_default();
                    if delta.merge(&returned).is_none() {
                        warn!("Could not restore delta for {:?} on market {:?}: overflow", account, market);
                    }
                }
                SettlementInstruction::FeeSweep { market, amount } => {
                    if let Some(state) = self.markets.get_mut(market) {
                        state.unswept_fees = state.unswept_fees.saturating_add(*amount);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::ledger::TradeRequest;
    use crate::settlement::{BatchStatus, InMemorySettlement, SettlementError};
    use crate::types::Outcome;

    const MARKET: MarketId = MarketId(1);

    fn ledger(settle_every: u64, max_batch: usize) -> MarketLedger {
        let mut config = LedgerConfig::default();
        config.settlement.settle_every_trades = settle_every;
        config.settlement.max_batch_size = max_batch;
        let mut ledger = MarketLedger::new(config).unwrap();
        ledger.open_market(MARKET, "m").unwrap();
        ledger
    }

    fn buy(ledger: &mut MarketLedger, account: u64, outcome: Outcome, pay: i64) {
        ledger
            .execute_trade(TradeRequest::new(MARKET, AccountId(account), outcome, Fixed::from_units(pay)))
            .unwrap();
    }

    struct OfflineBackend;

    impl SettlementBackend for OfflineBackend {
        fn execute(&mut self, _batch: &SettlementBatch) -> Result<String, SettlementError> {
            Err(SettlementError::BackendUnavailable {
                message: "offline".to_string(),
            })
        }

        fn check_status(&self, _commitment: &str) -> BatchStatus {
            BatchStatus::Pending
        }

        fn backend_type(&self) -> &str {
            "offline"
        }
    }

    #[test]
    fn nothing_to_settle() {
        let mut ledger = ledger(0, 100);
        assert!(ledger.settle_market(MARKET).unwrap().is_empty());
        assert_eq!(ledger.settlements().pending_count(), 0);
    }

    #[test]
    fn settle_drains_deltas_and_fees() {
        let mut ledger = ledger(0, 100);
        buy(&mut ledger, 1, Outcome::Yes, 10);
        buy(&mut ledger, 2, Outcome::No, 5);
        buy(&mut ledger, 1, Outcome::No, 3);

        let alice = ledger.unsettled(AccountId(1), MARKET);
        let fees = ledger.market(MARKET).unwrap().unswept_fees;

        let batches = ledger.settle_market(MARKET).unwrap();
        assert_eq!(batches, vec![1]);
        assert_eq!(ledger.unsettled(AccountId(1), MARKET), PositionDelta::default());
        assert_eq!(ledger.market(MARKET).unwrap().unswept_fees, Fixed::ZERO);

        let mut backend = InMemorySettlement::new();
        let report = ledger.flush_settlements(&mut backend);
        assert_eq!(report.committed, vec![(1, "batch-1".to_string())]);
        assert!(report.failed.is_empty());

        let holding = backend.holding(AccountId(1), MARKET);
        assert_eq!(holding.yes_shares, alice.yes_shares);
        assert_eq!(holding.no_shares, alice.no_shares);
        assert_eq!(holding.paid, alice.paid);
        assert_eq!(backend.fee_pool(MARKET), fees);
    }

    #[test]
    fn net_payments_plus_fees_equal_volume() {
        let mut ledger = ledger(0, 100);
        buy(&mut ledger, 1, Outcome::Yes, 10);
        buy(&mut ledger, 2, Outcome::No, 7);
        buy(&mut ledger, 3, Outcome::Yes, 4);
        ledger.settle_market(MARKET).unwrap();

        let mut backend = InMemorySettlement::new();
        ledger.flush_settlements(&mut backend);

        let paid: Fixed = (1..=3).map(|a| backend.holding(AccountId(a), MARKET).paid).sum();
        let total = paid.checked_add(backend.fee_pool(MARKET)).unwrap();
        assert_eq!(total, ledger.snapshot(MARKET).unwrap().total_volume);
    }

    #[test]
    fn large_settlement_splits_batches() {
        let mut ledger = ledger(0, 2);
        for account in 1..=3 {
            buy(&mut ledger, account, Outcome::Yes, 10);
        }

        // 3 positions + 1 fee sweep at 2 per batch
        let batches = ledger.settle_market(MARKET).unwrap();
        assert_eq!(batches, vec![1, 2]);
        assert_eq!(ledger.settlements().pending_count(), 2);
    }

    #[test]
    fn trades_trigger_automatic_settlement() {
        let mut ledger = ledger(2, 100);
        let first = ledger
            .execute_trade(TradeRequest::new(MARKET, AccountId(1), Outcome::Yes, Fixed::from_units(10)))
            .unwrap();
        let second = ledger
            .execute_trade(TradeRequest::new(MARKET, AccountId(2), Outcome::No, Fixed::from_units(10)))
            .unwrap();

        assert!(first.settlement_batches.is_empty());
        assert_eq!(second.settlement_batches, vec![1]);
        assert_eq!(ledger.settlements().pending_count(), 1);
    }

    #[test]
    fn failed_batches_are_recorded() {
        let mut ledger = ledger(0, 100);
        buy(&mut ledger, 1, Outcome::Yes, 10);
        ledger.settle_market(MARKET).unwrap();

        let report = ledger.flush_settlements(&mut OfflineBackend);
        assert_eq!(report.failed, vec![1]);
        assert_eq!(ledger.settlements().completed()[0].status, BatchStatus::Failed);
        assert!(matches!(
            ledger.events().last().unwrap().payload,
            EventPayload::SettlementFailed(_)
        ));
    }

    #[test]
    fn failed_batch_is_settled_on_retry() {
        let mut ledger = ledger(0, 100);
        buy(&mut ledger, 1, Outcome::Yes, 10);
        let owed = ledger.unsettled(AccountId(1), MARKET);
        let fees = ledger.market(MARKET).unwrap().unswept_fees;

        ledger.settle_market(MARKET).unwrap();
        ledger.flush_settlements(&mut OfflineBackend);

        // everything the rejected batch carried is owed again
        assert_eq!(ledger.unsettled(AccountId(1), MARKET), owed);
        assert_eq!(ledger.market(MARKET).unwrap().unswept_fees, fees);

        assert_eq!(ledger.settle_market(MARKET).unwrap(), vec![2]);
        let mut backend = InMemorySettlement::new();
        let report = ledger.flush_settlements(&mut backend);
        assert_eq!(report.committed, vec![(2, "batch-2".to_string())]);

        let position = ledger.position(AccountId(1), MARKET).unwrap();
        let holding = backend.holding(AccountId(1), MARKET);
        assert_eq!(holding.yes_shares, position.yes_shares);
        assert_eq!(holding.paid, owed.paid);
        assert_eq!(backend.fee_pool(MARKET), fees);
        assert_eq!(ledger.settlements().completed()[0].status, BatchStatus::Failed);
    }

    #[test]
    fn settle_all_covers_every_market() {
        let mut ledger = ledger(0, 100);
        ledger.open_market(MarketId(2), "other").unwrap();
        buy(&mut ledger, 1, Outcome::Yes, 5);
        ledger
            .execute_trade(TradeRequest::new(MarketId(2), AccountId(1), Outcome::No, Fixed::from_units(5)))
            .unwrap();

        let batches = ledger.settle_all().unwrap();
        assert_eq!(batches.len(), 2);
        assert!(ledger.settle_all().unwrap().is_empty());
    }
}
