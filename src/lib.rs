// lmsr-core: binary prediction market pricing engine.
// pricing-first architecture: the LMSR engine is pure, the ledger around it owns state.
// all computation is deterministic fixed-point with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: MarketId, Outcome, Fixed, Bps, Timestamp
//   2.x  math.rs: 1e18 fixed-point mul/div, exp, log2/ln, sqrt
//   3.x  lmsr/: cost, prices, dynamic b, share solver, preview, validation
//   4.x  position.rs: per-account holdings and unsettled deltas
//   7.x  config.rs: pricing params, fees, settlement cadence, env presets
//   8.x  ledger/: market ledger: snapshots, versioned trades, settlement hand-off
//   9.1  settlement.rs: settlement batching (mocked)
//   11.x events.rs: state transition events for audit
//   12.x market.rs: market snapshot + runtime state

// pricing
pub mod lmsr;
pub mod math;
pub mod types;

// ledger
pub mod events;
pub mod ledger;
pub mod market;
pub mod position;

// integration
pub mod config;
pub mod settlement;

// re exports for convenience
pub use events::*;
pub use ledger::*;
pub use lmsr::*;
pub use market::*;
pub use position::*;
pub use types::*;
pub use config::{ConfigError, Environment, FeeConfig, LedgerConfig, SettlementConfig};
pub use math::MathError;
pub use settlement::{
    BatchId, BatchStatus, InMemorySettlement, SettlementBackend, SettlementBatch, SettlementError,
    SettlementInstruction, SettlementManager,
};
