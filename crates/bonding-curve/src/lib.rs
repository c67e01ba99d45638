// bonding-curve/src/lib.rs

//! Bonding-Curve Settlement
//!
//! This crate implements minting and redeeming a token against a linear
//! price curve:
//! - Price curve (cost to buy, revenue for sell)
//! - Buy/sell settlement with slippage bounds
//! - Per-account sell cooldown
//! - Treasury with an admin-only full withdrawal
//!
//! Supply is path dependent, so every operation runs to completion against
//! exclusive state (`&mut Exchange`) and is rolled back as a whole on error.

pub mod config;
pub mod clock;
pub mod curve;
pub mod rate_limiter;
pub mod payments;
pub mod treasury;
pub mod settlement;
pub mod snapshot;

pub use config::CurveConfig;
pub use clock::{Clock, ManualClock, SystemClock};
pub use curve::PriceCurve;
pub use rate_limiter::RateLimiter;
pub use payments::{CurrencyAccounts, CurrencyTransfer, TransferError};
pub use treasury::{Treasury, TreasuryStats};
pub use settlement::{BuyReceipt, Exchange, SellReceipt};
pub use snapshot::ExchangeSnapshot;

use curve_core::{Amount, CoreError, Role, Timestamp};
use curve_crypto::Address;

/// Result type for exchange operations
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// Errors that abort an exchange operation. No partial state survives any of them.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("Slippage exceeded: quoted {quoted}, bound {bound}")]
    SlippageExceeded { quoted: Amount, bound: Amount },

    #[error("Insufficient payment: required {required}, sent {sent}")]
    InsufficientPayment { required: Amount, sent: Amount },

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("Rate limited: {account} may sell again at {retry_at}")]
    RateLimited { account: Address, retry_at: Timestamp },

    #[error("Unauthorized: {account} is missing role {role}")]
    Unauthorized { account: Address, role: Role },

    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(String),

    #[error("Arithmetic underflow: {0}")]
    ArithmeticUnderflow(String),

    #[error("Insufficient treasury: required {required}, available {available}")]
    InsufficientTreasury { required: Amount, available: Amount },

    #[error("Transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Ledger error: {0}")]
    Ledger(CoreError),
}

impl From<CoreError> for ExchangeError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientBalance { required, available } => {
                ExchangeError::InsufficientBalance { required, available }
            }
            CoreError::Overflow(msg) => ExchangeError::ArithmeticOverflow(msg),
            CoreError::Underflow(msg) => ExchangeError::ArithmeticUnderflow(msg),
            CoreError::Unauthorized { account, role } => {
                ExchangeError::Unauthorized { account, role }
            }
            other => ExchangeError::Ledger(other),
        }
    }
}
