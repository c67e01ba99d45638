// curve-node/src/config.rs
use bonding_curve::CurveConfig;
use curve_crypto::Address;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the state file inside `data_dir`
pub const STATE_FILE: &str = "state.json";

/// Lock file held while a service has the data directory open
pub const LOCK_FILE: &str = "state.lock";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub data_dir: String,
    /// Hex address that receives the admin role on a fresh exchange
    pub admin: String,
    pub curve: CurveSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveSection {
    /// Currency per unit of supply, as a decimal string ("0.01")
    pub price_increment: String,
    pub cooldown_seconds: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".into(),
            admin: Address::zero().to_hex(),
            curve: CurveSection {
                price_increment: "0.01".into(),
                cooldown_seconds: 60,
            },
        }
    }
}

impl NodeConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Parsed and validated curve parameters
    pub fn curve_config(&self) -> anyhow::Result<CurveConfig> {
        Ok(CurveConfig::from_decimal(
            &self.curve.price_increment,
            self.curve.cooldown_seconds,
        )?)
    }

    pub fn admin_address(&self) -> anyhow::Result<Address> {
        Ok(Address::from_hex(&self.admin)?)
    }

    pub fn state_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(STATE_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(LOCK_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve_core::Amount;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        let curve = config.curve_config().unwrap();
        assert_eq!(curve.price_increment, Amount::from_decimal_str("0.01").unwrap());
        assert_eq!(curve.cooldown_seconds, 60);
        assert!(config.admin_address().unwrap().is_zero());
        assert!(config.state_path().ends_with("state.json"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = NodeConfig {
            admin: Address::derive(b"admin").to_hex(),
            ..Default::default()
        };
        let parsed: NodeConfig = toml::from_str(&toml::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(parsed.admin, config.admin);
        assert_eq!(parsed.curve.price_increment, "0.01");
    }

    #[test]
    fn test_zero_increment_rejected() {
        let mut config = NodeConfig::default();
        config.curve.price_increment = "0".into();
        assert!(config.curve_config().is_err());
    }

    #[test]
    fn test_bad_admin_rejected() {
        let config = NodeConfig {
            admin: "not-an-address".into(),
            ..Default::default()
        };
        assert!(config.admin_address().is_err());
    }
}
