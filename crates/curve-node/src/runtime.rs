// curve-node/src/runtime.rs
use crate::NodeConfig;
use bonding_curve::{
    BuyReceipt, Clock, CurrencyAccounts, Exchange, ExchangeResult, ExchangeSnapshot,
    SellReceipt, SystemClock, TreasuryStats,
};
use curve_core::{Amount, Role, Timestamp};
use curve_crypto::Address;
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Contents of `state.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    pub exchange: ExchangeSnapshot,
    /// Currency sent out by the exchange, per recipient
    pub payouts: Vec<(Address, Amount)>,
}

/// Read-only view for `status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeStatus {
    pub total_supply: Amount,
    pub spot_price: Amount,
    pub price_increment: Amount,
    pub cooldown_seconds: u64,
    pub treasury: TreasuryStats,
    pub holders: usize,
}

/// Shared exchange behind a single async mutex.
///
/// Every call takes the lock for the whole operation, so quotes and trades
/// from concurrent tasks see a supply no other task is changing. A service
/// opened on a data directory also holds an exclusive file lock on it until
/// the last clone is dropped, so other processes wait instead of loading a
/// state that is about to be overwritten.
#[derive(Clone)]
pub struct ExchangeService {
    exchange: Arc<Mutex<Exchange>>,
    state_path: PathBuf,
    _dir_lock: Option<Arc<File>>,
}

impl ExchangeService {
    pub fn new(exchange: Exchange, state_path: impl Into<PathBuf>) -> Self {
        Self {
            exchange: Arc::new(Mutex::new(exchange)),
            state_path: state_path.into(),
            _dir_lock: None,
        }
    }

    /// Load `state.json` from the data directory, or start a fresh exchange
    pub fn open(config: &NodeConfig) -> anyhow::Result<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    /// Blocks until no other service holds the data directory
    pub fn open_with_clock(config: &NodeConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let dir_lock = lock_data_dir(&config.lock_path())?;
        let state_path = config.state_path();

        let exchange = if state_path.exists() {
            let state = load_state(&state_path)?;
            tracing::info!("Loading exchange state from {}", state_path.display());
            Exchange::restore(
                state.exchange,
                CurrencyAccounts::from_entries(state.payouts),
                clock,
            )?
        } else {
            tracing::info!("No state at {}, starting a fresh exchange", state_path.display());
            Exchange::new(
                &config.curve_config()?,
                config.admin_address()?,
                CurrencyAccounts::new(),
                clock,
            )?
        };

        Ok(Self {
            _dir_lock: Some(Arc::new(dir_lock)),
            ..Self::new(exchange, state_path)
        })
    }

    pub async fn buy(
        &self,
        caller: Address,
        quantity: &Amount,
        max_cost: &Amount,
        payment: &Amount,
    ) -> ExchangeResult<BuyReceipt> {
        self.exchange.lock().await.buy(caller, quantity, max_cost, payment)
    }

    pub async fn sell(
        &self,
        caller: Address,
        quantity: &Amount,
        min_revenue: &Amount,
    ) -> ExchangeResult<SellReceipt> {
        self.exchange.lock().await.sell(caller, quantity, min_revenue)
    }

    pub async fn withdraw(&self, caller: Address) -> ExchangeResult<Amount> {
        self.exchange.lock().await.withdraw(caller)
    }

    pub async fn grant_role(&self, granter: Address, account: Address, role: Role) -> ExchangeResult<bool> {
        self.exchange.lock().await.grant_role(granter, account, role)
    }

    pub async fn quote_buy(&self, quantity: &Amount) -> ExchangeResult<Amount> {
        self.exchange.lock().await.quote_buy(quantity)
    }

    pub async fn quote_sell(&self, quantity: &Amount) -> ExchangeResult<Amount> {
        self.exchange.lock().await.quote_sell(quantity)
    }

    pub async fn balance_of(&self, account: &Address) -> Amount {
        self.exchange.lock().await.balance_of(account)
    }

    pub async fn received(&self, account: &Address) -> Amount {
        self.exchange.lock().await.transfers().received(account)
    }

    /// When `account` may next sell, if it is cooling down
    pub async fn next_sell_at(&self, account: &Address) -> Option<Timestamp> {
        let exchange = self.exchange.lock().await;
        exchange.last_action(account)
            .map(|last| last.saturating_add(exchange.cooldown()))
    }

    pub async fn status(&self) -> ExchangeResult<ExchangeStatus> {
        let exchange = self.exchange.lock().await;
        Ok(ExchangeStatus {
            total_supply: exchange.total_supply(),
            spot_price: exchange.spot_price()?,
            price_increment: exchange.price_increment().clone(),
            cooldown_seconds: exchange.cooldown(),
            treasury: exchange.treasury_stats(),
            holders: exchange.ledger().holder_count(),
        })
    }

    /// Write the current state to `state.json`
    pub async fn save(&self) -> anyhow::Result<()> {
        let state = {
            let exchange = self.exchange.lock().await;
            PersistedState {
                exchange: exchange.snapshot(),
                payouts: exchange.transfers().entries(),
            }
        };
        save_state(&self.state_path, &state)?;
        tracing::debug!("Exchange state saved to {}", self.state_path.display());
        Ok(())
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }
}

fn lock_data_dir(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?;

    tracing::debug!("Waiting for lock on {}", path.display());
    file.lock_exclusive()?;
    Ok(file)
}

fn load_state(path: &Path) -> anyhow::Result<PersistedState> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Write through a temporary file so a crash never leaves half a state file
fn save_state(path: &Path, state: &PersistedState) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_string_pretty(state)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bonding_curve::{ExchangeError, ManualClock};

    fn cents(n: u64) -> Amount {
        Amount::from_u64(n * 10_000_000_000_000_000)
    }

    fn test_config(dir: &Path) -> NodeConfig {
        NodeConfig {
            data_dir: dir.to_string_lossy().into_owned(),
            admin: Address::derive(b"admin").to_hex(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fresh_service() {
        let dir = tempfile::tempdir().unwrap();
        let service = ExchangeService::open_with_clock(
            &test_config(dir.path()),
            Arc::new(ManualClock::new(1_000)),
        ).unwrap();

        let status = service.status().await.unwrap();
        assert!(status.total_supply.is_zero());
        assert_eq!(status.spot_price, cents(1));
        assert_eq!(status.cooldown_seconds, 60);
        assert_eq!(status.holders, 0);
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let clock = ManualClock::new(1_000);
        let alice = Address::derive(b"alice");

        let service = ExchangeService::open_with_clock(&config, Arc::new(clock.clone())).unwrap();
        service.buy(alice, &Amount::from_u64(4), &cents(10), &cents(12)).await.unwrap();
        service.save().await.unwrap();
        assert!(config.state_path().exists());
        drop(service);

        let reopened = ExchangeService::open_with_clock(&config, Arc::new(clock.clone())).unwrap();
        assert_eq!(reopened.balance_of(&alice).await, Amount::from_u64(4));
        assert_eq!(reopened.received(&alice).await, cents(2));
        assert_eq!(reopened.next_sell_at(&alice).await, Some(1_060));

        let err = reopened.sell(alice, &Amount::from_u64(1), &Amount::zero()).await.unwrap_err();
        assert!(matches!(err, ExchangeError::RateLimited { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_second_service_waits_for_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let clock = ManualClock::new(1_000);
        let alice = Address::derive(b"alice");
        let bob = Address::derive(b"bob");

        let first = ExchangeService::open_with_clock(&config, Arc::new(clock.clone())).unwrap();

        let second = {
            let config = config.clone();
            let clock = clock.clone();
            tokio::task::spawn_blocking(move || {
                ExchangeService::open_with_clock(&config, Arc::new(clock))
            })
        };

        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert!(!second.is_finished());

        let receipt = first.buy(alice, &Amount::from_u64(1), &cents(1), &cents(1)).await.unwrap();
        assert_eq!(receipt.cost, cents(1));
        first.save().await.unwrap();
        drop(first);

        // Loaded after the first save, so bob pays for the second unit
        let second = second.await.unwrap().unwrap();
        let receipt = second.buy(bob, &Amount::from_u64(1), &cents(2), &cents(2)).await.unwrap();
        assert_eq!(receipt.cost, cents(2));
        second.save().await.unwrap();
        drop(second);

        let reopened = ExchangeService::open_with_clock(&config, Arc::new(clock)).unwrap();
        assert_eq!(reopened.status().await.unwrap().total_supply, Amount::from_u64(2));
        assert_eq!(reopened.balance_of(&alice).await, Amount::from_u64(1));
        assert_eq!(reopened.balance_of(&bob).await, Amount::from_u64(1));
    }

    #[tokio::test]
    async fn test_concurrent_buys_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let service = ExchangeService::open_with_clock(
            &test_config(dir.path()),
            Arc::new(ManualClock::new(1_000)),
        ).unwrap();

        let mut handles = Vec::new();
        for i in 0..20u8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let buyer = Address::derive(&[i]);
                // Enough for the most expensive slot
                service.buy(buyer, &Amount::from_u64(1), &cents(20), &cents(20)).await
            }));
        }

        let mut total_cost = Amount::zero();
        for handle in handles {
            let receipt = handle.await.unwrap().unwrap();
            total_cost = total_cost.checked_add(&receipt.cost).unwrap();
        }

        // Each buy priced a distinct supply level: 1 + 2 + ... + 20 cents
        assert_eq!(total_cost, cents(210));
        let status = service.status().await.unwrap();
        assert_eq!(status.total_supply, Amount::from_u64(20));
        assert_eq!(status.treasury.balance, cents(210));
    }
}
