// 3.x: LMSR pricing engine. cost, prices, dynamic liquidity, share solver,
// trade preview and state validation. pure functions over caller-supplied state.

mod config;
mod core;
mod liquidity;
mod preview;
mod pricing;
mod results;
mod shares;
mod validation;

pub use config::{EngineConfig, LmsrParams, LogPrecision, SearchParams};
pub use core::LmsrEngine;
pub use results::{LmsrError, PricePair, TradePreview};
pub use validation::PRICE_SUM_TOLERANCE;
