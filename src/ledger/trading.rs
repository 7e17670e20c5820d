//! Quoting and trade execution.
//!
//! A trade is a read-compute-commit cycle against one market: read the
//! current snapshot, price it with the engine, check the resulting state
//! and only then install it. Nothing is written if any step fails.

use super::core::MarketLedger;
use super::results::{LedgerError, TradeReceipt, TradeRequest};
use crate::events::{EventPayload, TradeExecutedEvent, TradeRejectedEvent};
use crate::lmsr::TradePreview;
use crate::market::MarketSnapshot;
use crate::position::Position;
use crate::settlement::BatchId;
use crate::types::{Fixed, MarketId, Outcome};
use tracing::{debug, warn};

// everything a trade will write, computed before anything is written
struct TradePlan {
    preview: TradePreview,
    liquidity: Fixed,
    snapshot: MarketSnapshot,
}

impl MarketLedger {
    /// Preview a trade at the market's current snapshot with the configured fee.
    pub fn quote(&self, market_id: MarketId, outcome: Outcome, pay_amount: Fixed) -> Result<TradePreview, LedgerError> {
        let snapshot = self.snapshot(market_id)?;
        let b = self.engine.dynamic_b(snapshot.total_volume, snapshot.tx_count)?;
        Ok(self.engine.preview_trade(pay_amount, outcome, &snapshot.quantities, b, self.config.fees.trade_fee)?)
    }

    /// Execute a trade and commit the new market state.
    pub fn execute_trade(&mut self, request: TradeRequest) -> Result<TradeReceipt, LedgerError> {
        let plan = match self.plan_trade(&request) {
            Ok(plan) => plan,
            Err(err) => {
                warn!(
                    "Rejected {} trade of {} on market {:?} for account {:?}: {}",
                    request.outcome, request.pay_amount, request.market_id, request.account_id, err
                );
                if !matches!(err, LedgerError::MarketNotFound(_)) {
                    self.emit_event(EventPayload::TradeRejected(TradeRejectedEvent {
                        market_id: request.market_id,
                        account_id: request.account_id,
                        outcome: request.outcome,
                        pay_amount: request.pay_amount,
                        reason: err.to_string(),
                    }));
                }
                return Err(err);
            }
        };

        self.commit_trade(&request, &plan)?;

        // the trade is committed at this point, a settlement failure leaves its delta unsettled
        let settlement_batches = match self.config.settlement.settle_every_trades {
            0 => Vec::new(),
            every if plan.snapshot.tx_count % every == 0 => self.auto_settle(request.market_id),
            _ => Vec::new(),
        };

        Ok(TradeReceipt {
            preview: plan.preview,
            snapshot: plan.snapshot,
            liquidity: plan.liquidity,
            settlement_batches,
        })
    }

    fn auto_settle(&mut self, market_id: MarketId) -> Vec<BatchId> {
        match self.settle_market(market_id) {
            Ok(batches) => batches,
            Err(err) => {
                warn!("Automatic settlement of market {:?} failed: {}", market_id, err);
                Vec::new()
            }
        }
    }

    fn plan_trade(&self, request: &TradeRequest) -> Result<TradePlan, LedgerError> {
        let market = self
            .markets
            .get(&request.market_id)
            .ok_or(LedgerError::MarketNotFound(request.market_id))?;

        if !market.is_active() {
            return Err(LedgerError::MarketNotActive(request.market_id));
        }

        let current = market.snapshot;
        if let Some(expected) = request.expected_version {
            if expected != current.version {
                return Err(LedgerError::StaleVersion {
                    market_id: request.market_id,
                    expected,
                    actual: current.version,
                });
            }
        }

        let liquidity = self.engine.dynamic_b(current.total_volume, current.tx_count)?;
        let preview = self.engine.preview_trade(
            request.pay_amount,
            request.outcome,
            &current.quantities,
            liquidity,
            self.config.fees.trade_fee,
        )?;

        if preview.expected_shares.is_zero() {
            return Err(LedgerError::TradeTooSmall {
                pay_amount: request.pay_amount,
            });
        }

        let snapshot = current
            .after_trade(request.outcome, preview.expected_shares, request.pay_amount)
            .ok_or(LedgerError::Overflow)?;

        // the next trade is priced at the post-trade b, so check against that
        let next_b = self.engine.dynamic_b(snapshot.total_volume, snapshot.tx_count)?;
        if !self.engine.validate_state(&snapshot.quantities, next_b) {
            return Err(LedgerError::InvariantViolation {
                market_id: request.market_id,
                version: snapshot.version,
            });
        }

        Ok(TradePlan {
            preview,
            liquidity,
            snapshot,
        })
    }

    fn commit_trade(&mut self, request: &TradeRequest, plan: &TradePlan) -> Result<(), LedgerError> {
        let now = self.current_time;
        let preview = &plan.preview;
        let position_key = (request.account_id, request.market_id);
        let delta_key = (request.market_id, request.account_id);

        // stage every update first so an overflow leaves the ledger untouched
        let mut position = self
            .positions
            .get(&position_key)
            .cloned()
            .unwrap_or_else(|| Position::new(request.market_id, now));
        position
            .record_fill(request.outcome, preview.expected_shares, request.pay_amount, preview.fee, now)
            .ok_or(LedgerError::Overflow)?;

        let mut delta = self.unsettled.get(&delta_key).copied().unwrap_or_default();
        delta
            .record(request.outcome, preview.expected_shares, preview.net_amount)
            .ok_or(LedgerError::Overflow)?;

        let market = self
            .markets
            .get_mut(&request.market_id)
            .ok_or(LedgerError::MarketNotFound(request.market_id))?;
        market
            .commit(plan.snapshot, preview.fee, now)
            .ok_or(LedgerError::Overflow)?;

        self.positions.insert(position_key, position);
        self.unsettled.insert(delta_key, delta);

        debug!(
            "Market {:?} v{}: {:?} bought {} {} for {} (fee {}), price {} -> {}",
            request.market_id,
            plan.snapshot.version,
            request.account_id,
            preview.expected_shares,
            request.outcome,
            request.pay_amount,
            preview.fee,
            preview.current_price,
            preview.new_price
        );
        self.emit_event(EventPayload::TradeExecuted(TradeExecutedEvent {
            market_id: request.market_id,
            account_id: request.account_id,
            outcome: request.outcome,
            pay_amount: request.pay_amount,
            fee: preview.fee,
            shares: preview.expected_shares,
            new_price: preview.new_price,
            liquidity: plan.liquidity,
            version: plan.snapshot.version,
        }));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::lmsr::LmsrError;
    use crate::types::AccountId;

    const MARKET: MarketId = MarketId(1);
    const ALICE: AccountId = AccountId(1);

    fn ledger() -> MarketLedger {
        let mut config = LedgerConfig::default();
        config.settlement.settle_every_trades = 0;
        let mut ledger = MarketLedger::new(config).unwrap();
        ledger.open_market(MARKET, "m").unwrap();
        ledger
    }

    fn units(n: i64) -> Fixed {
        Fixed::from_units(n)
    }

    #[test]
    fn first_trade_matches_quote() {
        let mut ledger = ledger();
        let quote = ledger.quote(MARKET, Outcome::Yes, units(10)).unwrap();
        let receipt = ledger
            .execute_trade(TradeRequest::new(MARKET, ALICE, Outcome::Yes, units(10)).at_version(0))
            .unwrap();

        assert_eq!(receipt.preview, quote);
        assert_eq!(receipt.liquidity, units(100));
        assert_eq!(receipt.snapshot.version, 1);
        assert_eq!(receipt.snapshot.tx_count, 1);
        assert_eq!(receipt.snapshot.total_volume, units(10));
        assert_eq!(receipt.snapshot.quantities.q_yes, quote.expected_shares);
        assert!(receipt.settlement_batches.is_empty());
        assert_eq!(ledger.snapshot(MARKET).unwrap(), receipt.snapshot);
    }

    #[test]
    fn position_and_fees_recorded() {
        let mut ledger = ledger();
        let receipt = ledger
            .execute_trade(TradeRequest::new(MARKET, ALICE, Outcome::No, units(10)))
            .unwrap();

        let position = ledger.position(ALICE, MARKET).unwrap();
        assert_eq!(position.no_shares, receipt.preview.expected_shares);
        assert_eq!(position.total_paid, units(10));
        assert_eq!(position.fees_paid, receipt.preview.fee);
        assert_eq!(position.trade_count, 1);

        let delta = ledger.unsettled(ALICE, MARKET);
        assert_eq!(delta.no_shares, receipt.preview.expected_shares);
        assert_eq!(delta.paid, receipt.preview.net_amount);

        let market = ledger.market(MARKET).unwrap();
        assert_eq!(market.collected_fees, receipt.preview.fee);
        assert_eq!(market.unswept_fees, receipt.preview.fee);
    }

    #[test]
    fn stale_version_rejected_without_changes() {
        let mut ledger = ledger();
        ledger
            .execute_trade(TradeRequest::new(MARKET, ALICE, Outcome::Yes, units(10)))
            .unwrap();
        let before = ledger.snapshot(MARKET).unwrap();

        let result = ledger.execute_trade(TradeRequest::new(MARKET, AccountId(2), Outcome::No, units(10)).at_version(0));
        assert_eq!(
            result,
            Err(LedgerError::StaleVersion { market_id: MARKET, expected: 0, actual: 1 })
        );
        assert_eq!(ledger.snapshot(MARKET).unwrap(), before);
        assert!(ledger.position(AccountId(2), MARKET).is_none());
        assert!(matches!(
            ledger.events().last().unwrap().payload,
            EventPayload::TradeRejected(_)
        ));
    }

    #[test]
    fn paused_market_rejects() {
        let mut ledger = ledger();
        ledger.pause_market(MARKET).unwrap();
        let result = ledger.execute_trade(TradeRequest::new(MARKET, ALICE, Outcome::Yes, units(10)));
        assert_eq!(result, Err(LedgerError::MarketNotActive(MARKET)));
    }

    #[test]
    fn zero_payment_is_too_small() {
        let mut ledger = ledger();
        let result = ledger.execute_trade(TradeRequest::new(MARKET, ALICE, Outcome::Yes, Fixed::ZERO));
        assert_eq!(result, Err(LedgerError::TradeTooSmall { pay_amount: Fixed::ZERO }));
        assert_eq!(ledger.snapshot(MARKET).unwrap().version, 0);
    }

    #[test]
    fn negative_payment_is_a_pricing_error() {
        let mut ledger = ledger();
        let result = ledger.execute_trade(TradeRequest::new(MARKET, ALICE, Outcome::Yes, units(-5)));
        assert!(matches!(
            result,
            Err(LedgerError::Pricing(LmsrError::NegativePayment(_)))
        ));
    }

    #[test]
    fn unknown_market_emits_nothing() {
        let mut ledger = ledger();
        let events_before = ledger.events().len();
        let result = ledger.execute_trade(TradeRequest::new(MarketId(9), ALICE, Outcome::Yes, units(1)));
        assert_eq!(result, Err(LedgerError::MarketNotFound(MarketId(9))));
        assert_eq!(ledger.events().len(), events_before);
    }

    #[test]
    fn liquidity_grows_after_trades() {
        let mut ledger = ledger();
        let before = ledger.liquidity(MARKET).unwrap();
        ledger
            .execute_trade(TradeRequest::new(MARKET, ALICE, Outcome::Yes, units(10)))
            .unwrap();
        assert!(ledger.liquidity(MARKET).unwrap() > before);
    }

    #[test]
    fn buying_yes_raises_yes_price() {
        let mut ledger = ledger();
        let receipt = ledger
            .execute_trade(TradeRequest::new(MARKET, ALICE, Outcome::Yes, units(10)))
            .unwrap();
        assert!(receipt.preview.new_price > receipt.preview.current_price);
        let prices = ledger.prices(MARKET).unwrap();
        assert!(prices.yes > prices.no);
    }

    #[test]
    fn failed_auto_settlement_keeps_the_trade() {
        let mut ledger = ledger();
        ledger
            .execute_trade(TradeRequest::new(MARKET, ALICE, Outcome::Yes, units(10)))
            .unwrap();
        let owed = ledger.unsettled(ALICE, MARKET);

        // settling a market the ledger does not know fails, the helper swallows it
        assert!(ledger.auto_settle(MarketId(99)).is_empty());
        assert_eq!(ledger.unsettled(ALICE, MARKET), owed);
        assert_eq!(ledger.snapshot(MARKET).unwrap().tx_count, 1);

        assert_eq!(ledger.auto_settle(MARKET), vec![1]);
        assert!(ledger.unsettled(ALICE, MARKET).is_empty());
    }
}
