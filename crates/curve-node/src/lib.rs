// curve-node/src/lib.rs
pub mod config;
pub mod runtime;

pub use config::NodeConfig;
pub use runtime::{ExchangeService, ExchangeStatus, PersistedState};
