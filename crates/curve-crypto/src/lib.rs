// curve-crypto/src/lib.rs

//! Identity primitives for the bonding-curve exchange
//!
//! This crate provides:
//! - Keccak-256 hashing
//! - Account addresses

pub mod hash;
pub mod address;

pub use hash::{keccak256, Hash};
pub use address::Address;

/// Result type for cryptographic operations
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur during cryptographic operations
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}
