//! Prediction Market Pricing Simulation.
//!
//! Walks the LMSR engine and the market ledger through their lifecycle:
//! pricing a fresh market, trading, lost-update detection, liquidity growth,
//! settlement and concurrent callers. `RUST_LOG=debug` shows every event.

use lmsr_core::*;
use std::sync::{Arc, Mutex};
use std::thread;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), LedgerError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("LMSR Prediction Market Simulation");
    println!("Binary YES/NO Markets, Fixed-Point Pricing\n");

    scenario_1_fresh_market_pricing()?;
    scenario_2_alice_and_bob()?;
    scenario_3_lost_update()?;
    scenario_4_liquidity_growth()?;
    scenario_5_settlement()?;
    scenario_6_log_precision()?;
    scenario_7_concurrent_callers()?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

const MARKET: MarketId = MarketId(1);
const ALICE: AccountId = AccountId(1);
const BOB: AccountId = AccountId(2);
const CAROL: AccountId = AccountId(3);

fn units(n: i64) -> Fixed {
    Fixed::from_units(n)
}

/// The pure engine on its own: cost, prices and a preview.
fn scenario_1_fresh_market_pricing() -> Result<(), LedgerError> {
    println!("Scenario 1: Pricing a Fresh Market\n");

    let engine = LmsrEngine::new(EngineConfig::default())?;
    let b = engine.dynamic_b(Fixed::ZERO, 0)?;
    let q = MarketQuantities::zero();

    let prices = engine.price(&q, b)?;
    println!("  b = {}, cost = {}", b, engine.cost(&q, b)?);
    println!("  YES {} / NO {}", prices.yes, prices.no);

    let preview = engine.preview_trade(units(10), Outcome::Yes, &q, b, Bps::new(50))?;
    println!("  Preview: pay 10 for YES at 50bps");
    println!("    fee {}, net {}", preview.fee, preview.net_amount);
    println!("    shares {} at avg {}", preview.expected_shares, preview.avg_price);
    println!(
        "    YES {} -> {} (impact {})",
        preview.current_price, preview.new_price, preview.price_impact
    );
    println!("  State valid: {}\n", engine.validate_state(&q, b));
    Ok(())
}

/// Two traders taking opposite sides through the ledger.
fn scenario_2_alice_and_bob() -> Result<(), LedgerError> {
    println!("Scenario 2: Alice and Bob Trade\n");

    let mut config = LedgerConfig::default();
    config.settlement.settle_every_trades = 0;
    let mut ledger = MarketLedger::new(config)?;
    ledger.open_market(MARKET, "Will it rain tomorrow?")?;

    let trades = [
        (ALICE, Outcome::Yes, 10),
        (BOB, Outcome::No, 50),
        (ALICE, Outcome::Yes, 100),
        (BOB, Outcome::No, 25),
    ];

    for (account, outcome, pay) in trades {
        let receipt = ledger.execute_trade(TradeRequest::new(MARKET, account, outcome, units(pay)))?;
        let prices = ledger.prices(MARKET)?;
        println!(
            "  {:?} pays {} for {}: {} shares (b = {})",
            account, pay, outcome, receipt.preview.expected_shares, receipt.liquidity
        );
        println!("    now YES {} / NO {}", prices.yes, prices.no);
    }

    for account in [ALICE, BOB] {
        if let Some(position) = ledger.position(account, MARKET) {
            println!(
                "  {:?}: pays {} if YES, {} if NO, paid {} (fees {})",
                account,
                position.payout_if(Outcome::Yes),
                position.payout_if(Outcome::No),
                position.total_paid,
                position.fees_paid
            );
        }
    }

    let market = ledger.market(MARKET).ok_or(LedgerError::MarketNotFound(MARKET))?;
    println!("  Market fees collected: {}\n", market.collected_fees);
    Ok(())
}

/// A quote taken at one version cannot be executed after the market moved.
fn scenario_3_lost_update() -> Result<(), LedgerError> {
    println!("Scenario 3: Lost Update Detection\n");

    let mut ledger = MarketLedger::new(LedgerConfig::default())?;
    ledger.open_market(MARKET, "Will the launch slip?")?;

    let version = ledger.snapshot(MARKET)?.version;
    let quote = ledger.quote(MARKET, Outcome::Yes, units(20))?;
    println!("  Alice quotes 20 on YES at v{}: {} shares", version, quote.expected_shares);

    ledger.execute_trade(TradeRequest::new(MARKET, BOB, Outcome::No, units(10)))?;
    println!("  Bob trades first, market moves to v{}", ledger.snapshot(MARKET)?.version);

    match ledger.execute_trade(TradeRequest::new(MARKET, ALICE, Outcome::Yes, units(20)).at_version(version)) {
        Err(err) => println!("  Alice's stale trade rejected: {}", err),
        Ok(_) => println!("  Alice's stale trade went through (unexpected)"),
    }

    let version = ledger.snapshot(MARKET)?.version;
    let receipt =
        ledger.execute_trade(TradeRequest::new(MARKET, ALICE, Outcome::Yes, units(20)).at_version(version))?;
    println!(
        "  Requoted at v{}: {} shares, market now v{}\n",
        version, receipt.preview.expected_shares, receipt.snapshot.version
    );
    Ok(())
}

/// How b grows with traded volume and trade count.
fn scenario_4_liquidity_growth() -> Result<(), LedgerError> {
    println!("Scenario 4: Dynamic Liquidity\n");

    let engine = LmsrEngine::new(EngineConfig::default())?;
    for (volume, trades) in [(0, 0), (0, 1), (250_000, 0), (1_000_000, 10), (4_000_000, 1_000)] {
        let b = engine.dynamic_b(units(volume), trades)?;
        println!("  volume {:>9}, {:>5} trades: b = {}", volume, trades, b);
    }
    println!();
    Ok(())
}

/// Testnet settles after every trade; batches land in the in-memory backend.
fn scenario_5_settlement() -> Result<(), LedgerError> {
    println!("Scenario 5: Settlement\n");

    let mut ledger = MarketLedger::new(Environment::Testnet.config())?;
    let mut backend = InMemorySettlement::new();
    ledger.set_time(Timestamp::now());
    ledger.open_market(MARKET, "Will the bill pass?")?;

    for (account, outcome, pay) in [(ALICE, Outcome::Yes, 25), (BOB, Outcome::No, 25), (CAROL, Outcome::Yes, 40)] {
        ledger.advance_time(1_000);
        let receipt = ledger.execute_trade(TradeRequest::new(MARKET, account, outcome, units(pay)))?;
        println!("  {:?} buys {} {}, queued batches {:?}", account, receipt.preview.expected_shares, outcome, receipt.settlement_batches);
    }

    let report = ledger.flush_settlements(&mut backend);
    println!("  Flushed {} batches, {} failed", report.committed.len(), report.failed.len());

    for account in [ALICE, BOB, CAROL] {
        let holding = backend.holding(account, MARKET);
        println!(
            "  {:?} settled: YES {}, NO {}, paid {}",
            account, holding.yes_shares, holding.no_shares, holding.paid
        );
    }
    println!("  Fee pool: {}\n", backend.fee_pool(MARKET));
    Ok(())
}

/// Same trades under the coarse and fine logarithm.
fn scenario_6_log_precision() -> Result<(), LedgerError> {
    println!("Scenario 6: Coarse vs Fine Logarithm\n");

    for precision in [LogPrecision::Coarse, LogPrecision::Fine] {
        let mut config = LedgerConfig::default();
        config.engine.log_precision = precision;
        config.settlement.settle_every_trades = 0;
        let mut ledger = MarketLedger::new(config)?;
        ledger.open_market(MARKET, "precision")?;

        print!("  {:?}:", precision);
        for (account, outcome, pay) in [(ALICE, Outcome::Yes, 10), (BOB, Outcome::No, 50), (ALICE, Outcome::Yes, 100)] {
            let receipt = ledger.execute_trade(TradeRequest::new(MARKET, account, outcome, units(pay)))?;
            print!(" {}", receipt.preview.expected_shares);
        }
        println!();
    }

    // a tiny payment into a deep market flattens out under the coarse log
    let engine = LmsrEngine::new(EngineConfig::default())?;
    match engine.solve_shares(units(1), Outcome::Yes, &MarketQuantities::zero(), units(10_000)) {
        Err(err) => println!("  Coarse, b = 10000, pay 1: {}", err),
        Ok(shares) => println!("  Coarse, b = 10000, pay 1: {} shares", shares),
    }
    let deep = LmsrEngine::new(LedgerConfig::deep_liquidity().engine)?;
    let shares = deep.solve_shares(units(1), Outcome::Yes, &MarketQuantities::zero(), units(10_000))?;
    println!("  Fine,   b = 10000, pay 1: {} shares\n", shares);
    Ok(())
}

/// Many callers sharing one ledger behind a mutex.
fn scenario_7_concurrent_callers() -> Result<(), LedgerError> {
    println!("Scenario 7: Concurrent Callers\n");

    let mut config = LedgerConfig::default();
    config.engine.log_precision = LogPrecision::Fine;
    let ledger = Arc::new(Mutex::new(MarketLedger::new(config)?));
    if let Ok(mut guard) = ledger.lock() {
        guard.open_market(MARKET, "concurrent")?;
    }

    let handles: Vec<_> = (1..=4u64)
        .map(|trader| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                let outcome = if trader % 2 == 0 { Outcome::No } else { Outcome::Yes };
                let mut executed = 0;
                for _ in 0..5 {
                    let Ok(mut guard) = ledger.lock() else { break };
                    let request = TradeRequest::new(MARKET, AccountId(trader), outcome, units(10));
                    if guard.execute_trade(request).is_ok() {
                        executed += 1;
                    }
                }
                executed
            })
        })
        .collect();

    let executed: u64 = handles.into_iter().filter_map(|h| h.join().ok()).sum();
    if let Ok(guard) = ledger.lock() {
        let snapshot = guard.snapshot(MARKET)?;
        println!("  {} trades executed, market at v{} with {} trades", executed, snapshot.version, snapshot.tx_count);
        let prices = guard.prices(MARKET)?;
        println!("  YES {} / NO {}", prices.yes, prices.no);
    }
    Ok(())
}
