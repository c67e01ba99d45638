// bonding-curve/src/config.rs

use crate::{ExchangeError, ExchangeResult};
use curve_core::Amount;
use serde::{Deserialize, Serialize};

/// Default price increment: 0.01 currency units per token
pub const DEFAULT_PRICE_INCREMENT: u64 = 10_000_000_000_000_000;

/// Default sell cooldown in seconds
pub const DEFAULT_COOLDOWN_SECONDS: u64 = 60;

/// Curve configuration, fixed for the lifetime of an exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveConfig {
    /// Currency base units added to the price per token of supply
    pub price_increment: Amount,
    /// Minimum seconds between two sells by the same account
    pub cooldown_seconds: u64,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            price_increment: Amount::from_u64(DEFAULT_PRICE_INCREMENT),
            cooldown_seconds: DEFAULT_COOLDOWN_SECONDS,
        }
    }
}

impl CurveConfig {
    /// Build from a decimal increment such as `"0.01"`
    pub fn from_decimal(price_increment: &str, cooldown_seconds: u64) -> ExchangeResult<Self> {
        let price_increment = Amount::from_decimal_str(price_increment)
            .map_err(|e| ExchangeError::InvalidConfiguration(e.to_string()))?;
        let config = Self { price_increment, cooldown_seconds };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ExchangeResult<()> {
        if self.price_increment.is_zero() {
            return Err(ExchangeError::InvalidConfiguration(
                "price increment must be positive".into()
            ));
        }
        Ok(())
    }
}
