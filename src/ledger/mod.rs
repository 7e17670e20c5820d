// 8.0: market ledger. the stateful side around the pure pricing engine: snapshots,
// optimistic versioning, positions, fees, events and settlement hand-off.
// deterministic, driven by an explicit clock, no external I/O.

mod core;
mod results;
mod settlement;
mod trading;

pub use core::MarketLedger;
pub use results::{FlushReport, LedgerError, TradeReceipt, TradeRequest};
