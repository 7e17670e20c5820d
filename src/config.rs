// 7.0 config.rs: all settings in one place. pricing params, fees, settlement cadence.
// 7.1 FeeConfig is a single flat trade fee. no volume tiers or referrals yet.

use serde::{Deserialize, Serialize};

use crate::lmsr::{EngineConfig, LmsrError, LmsrParams, LogPrecision};
use crate::types::{Bps, Fixed};

/** 7.2: fee settings in bps. 100 bps = 1% */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    // Fee withheld from every payment before it is converted to shares
    pub trade_fee: Bps,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            trade_fee: Bps::new(50), // 0.5%
        }
    }
}

// Settlement batching cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementConfig {
    // Settle a market automatically after this many trades, 0 = manual only
    pub settle_every_trades: u64,
    // Maximum instructions per batch
    pub max_batch_size: usize,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            settle_every_trades: 10,
            max_batch_size: 1000,
        }
    }
}

// The complete ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub engine: EngineConfig,
    pub fees: FeeConfig,
    pub settlement: SettlementConfig,
    // Oldest events are dropped beyond this
    pub max_events: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            fees: FeeConfig::default(),
            settlement: SettlementConfig::default(),
            max_events: 10_000,
        }
    }
}

impl LedgerConfig {
    // Create a configuration preset for testnet
    pub fn testnet() -> Self {
        let mut config = Self::default();
        config.fees.trade_fee = Bps::new(10); // minimal fee
        config.settlement.settle_every_trades = 1; // settle every trade
        config
    }

    // Deep markets: large base liquidity, needs the fine logarithm
    // since the coarse one flattens small cost deltas to zero at high b
    pub fn deep_liquidity() -> Self {
        let mut config = Self::default();
        config.engine.params = LmsrParams {
            b0: Fixed::from_units(10_000),
            alpha: Fixed::from_raw(100_000_000_000_000_000), // 0.1
            beta: Fixed::from_raw(20_000_000_000_000_000),   // 0.02
            v0: Fixed::from_units(10_000_000),
        };
        config.engine.log_precision = LogPrecision::Fine;
        config.fees.trade_fee = Bps::new(20);
        config.settlement.settle_every_trades = 100;
        config
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate().map_err(|err| match err {
            LmsrError::InvalidParams { reason } => ConfigError::InvalidPricing { reason },
            other => ConfigError::InvalidPricing {
                reason: other.to_string(),
            },
        })?;

        if self.fees.trade_fee.value() > Bps::MAX {
            return Err(ConfigError::InvalidFees {
                reason: format!("trade fee {} exceeds 100%", self.fees.trade_fee),
            });
        }

        if self.settlement.max_batch_size == 0 {
            return Err(ConfigError::InvalidSettlement {
                reason: "max batch size must be at least 1".to_string(),
            });
        }

        if self.max_events == 0 {
            return Err(ConfigError::InvalidSettlement {
                reason: "event log must hold at least 1 event".to_string(),
            });
        }

        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid pricing config: {reason}")]
    InvalidPricing { reason: String },

    #[error("Invalid fee config: {reason}")]
    InvalidFees { reason: String },

    #[error("Invalid settlement config: {reason}")]
    InvalidSettlement { reason: String },
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn config(&self) -> LedgerConfig {
        match self {
            Environment::Development => LedgerConfig::default(),
            Environment::Testnet => LedgerConfig::testnet(),
            Environment::Mainnet => LedgerConfig::deep_liquidity(),
        }
    }
}
