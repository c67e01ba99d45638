// curve-core/src/lib.rs

//! Core data structures for the bonding-curve exchange
//!
//! This crate provides:
//! - Bounded token and currency amounts
//! - The balance ledger (supply, balances, mint/burn, rollback)
//! - Role-based access control

pub mod types;
pub mod ledger;
pub mod access;

pub use types::*;
pub use ledger::{BalanceLedger, TokenLedger};
pub use access::{AccessControl, Role, RoleStore};

use curve_crypto::Address;

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the ledger, role store and amount arithmetic
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    #[error("Arithmetic underflow: {0}")]
    Underflow(String),

    #[error("Account {account} is missing role {role}")]
    Unauthorized { account: Address, role: Role },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("State error: {0}")]
    StateError(String),

    #[error("Cryptographic error: {0}")]
    CryptoError(#[from] curve_crypto::CryptoError),
}
