// bonding-curve/src/snapshot.rs

use crate::{
    clock::Clock,
    config::CurveConfig,
    curve::PriceCurve,
    payments::CurrencyTransfer,
    rate_limiter::RateLimiter,
    settlement::Exchange,
    treasury::Treasury,
    ExchangeError, ExchangeResult,
};
use curve_core::{AccessControl, Amount, BalanceLedger, Role, Timestamp, TokenLedger};
use curve_crypto::Address;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Persisted state surface of an exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeSnapshot {
    pub config: CurveConfig,
    pub total_supply: Amount,
    pub balances: Vec<(Address, Amount)>,
    pub last_actions: Vec<(Address, Timestamp)>,
    pub roles: Vec<(Address, Role)>,
    pub treasury: Treasury,
}

impl ExchangeSnapshot {
    pub fn to_json(&self) -> ExchangeResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ExchangeError::InvalidSnapshot(e.to_string()))
    }

    pub fn from_json(json: &str) -> ExchangeResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ExchangeError::InvalidSnapshot(e.to_string()))
    }
}

impl<T: CurrencyTransfer> Exchange<T> {
    /// Capture the full state surface
    pub fn snapshot(&self) -> ExchangeSnapshot {
        ExchangeSnapshot {
            config: CurveConfig {
                price_increment: self.price_increment().clone(),
                cooldown_seconds: self.cooldown(),
            },
            total_supply: self.total_supply(),
            balances: self.ledger().balances(),
            last_actions: self.limiter().entries(),
            roles: self.roles().entries(),
            treasury: self.treasury().clone(),
        }
    }

    /// Rebuild an exchange, checking that balances add up to the supply, that
    /// the treasury reconciles and that at least one admin exists
    pub fn restore(
        snapshot: ExchangeSnapshot,
        transfers: T,
        clock: Arc<dyn Clock>,
    ) -> ExchangeResult<Self> {
        snapshot.config.validate()?;

        let ledger = TokenLedger::from_balances(snapshot.balances)
            .map_err(|e| ExchangeError::InvalidSnapshot(e.to_string()))?;

        if ledger.total_supply() != snapshot.total_supply {
            return Err(ExchangeError::InvalidSnapshot(format!(
                "balances sum to {} but supply is {}",
                ledger.total_supply(),
                snapshot.total_supply
            )));
        }

        if !snapshot.treasury.is_reconciled() {
            return Err(ExchangeError::InvalidSnapshot(
                "treasury balance does not match its deposits, payouts and withdrawals".into()
            ));
        }

        let roles = AccessControl::from_entries(snapshot.roles);
        if roles.members(Role::ADMIN).is_empty() {
            return Err(ExchangeError::InvalidSnapshot("no admin account".into()));
        }

        tracing::info!(
            supply = %snapshot.total_supply,
            holders = ledger.holder_count(),
            "exchange restored from snapshot"
        );

        Ok(Exchange::with_stores(
            PriceCurve::new(snapshot.config.price_increment)?,
            RateLimiter::from_entries(snapshot.config.cooldown_seconds, snapshot.last_actions),
            ledger,
            roles,
            snapshot.treasury,
            transfers,
            clock,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, payments::CurrencyAccounts};

    fn cents(n: u64) -> Amount {
        Amount::from_u64(n * 10_000_000_000_000_000)
    }

    fn populated() -> (Exchange, ManualClock) {
        let clock = ManualClock::new(500);
        let mut exchange = Exchange::new(
            &CurveConfig::default(),
            Address::derive(b"admin"),
            CurrencyAccounts::new(),
            Arc::new(clock.clone()),
        ).unwrap();

        let alice = Address::derive(b"alice");
        let bob = Address::derive(b"bob");
        exchange.buy(alice, &Amount::from_u64(3), &cents(6), &cents(6)).unwrap();
        exchange.buy(bob, &Amount::from_u64(2), &cents(9), &cents(9)).unwrap();
        clock.advance(60);
        exchange.sell(alice, &Amount::from_u64(1), &Amount::zero()).unwrap();
        (exchange, clock)
    }

    #[test]
    fn test_snapshot_restore() {
        let (exchange, clock) = populated();
        let snapshot = exchange.snapshot();

        let json = snapshot.to_json().unwrap();
        let parsed = ExchangeSnapshot::from_json(&json).unwrap();
        assert_eq!(parsed, snapshot);

        let restored = Exchange::restore(parsed, CurrencyAccounts::new(), Arc::new(clock)).unwrap();
        assert_eq!(restored.total_supply(), exchange.total_supply());
        assert_eq!(restored.treasury_balance(), exchange.treasury_balance());
        assert_eq!(
            restored.last_action(&Address::derive(b"alice")),
            Some(560)
        );
        assert!(restored.has_role(&Address::derive(b"admin"), Role::ADMIN));
        assert_eq!(restored.snapshot(), snapshot);
    }

    #[test]
    fn test_restored_cooldown_still_applies() {
        let (exchange, clock) = populated();
        let bob = Address::derive(b"bob");
        let mut restored = Exchange::restore(
            exchange.snapshot(),
            CurrencyAccounts::new(),
            Arc::new(clock.clone()),
        ).unwrap();

        clock.advance(30);
        let err = restored
            .sell(Address::derive(b"alice"), &Amount::from_u64(1), &Amount::zero())
            .unwrap_err();
        assert!(matches!(err, ExchangeError::RateLimited { retry_at: 620, .. }));

        // Bob last bought at 500, so his cooldown has run out
        assert!(restored.sell(bob, &Amount::from_u64(1), &Amount::zero()).is_ok());
    }

    #[test]
    fn test_restore_rejects_broken_conservation() {
        let (exchange, clock) = populated();
        let mut snapshot = exchange.snapshot();
        snapshot.total_supply = Amount::from_u64(99);

        let err = Exchange::restore(snapshot, CurrencyAccounts::new(), Arc::new(clock)).err().unwrap();
        assert!(matches!(err, ExchangeError::InvalidSnapshot(_)));
    }

    #[test]
    fn test_restore_rejects_unreconciled_treasury() {
        let (exchange, clock) = populated();
        let mut json: serde_json::Value =
            serde_json::from_str(&exchange.snapshot().to_json().unwrap()).unwrap();
        // Inflate the balance without a matching deposit
        json["treasury"]["balance"] = serde_json::to_value(cents(500)).unwrap();

        let snapshot = ExchangeSnapshot::from_json(&json.to_string()).unwrap();
        let err = Exchange::restore(snapshot, CurrencyAccounts::new(), Arc::new(clock)).err().unwrap();
        assert!(matches!(err, ExchangeError::InvalidSnapshot(_)));
    }

    #[test]
    fn test_out_of_range_amount_rejected_on_load() {
        let (exchange, _) = populated();
        let mut json: serde_json::Value =
            serde_json::from_str(&exchange.snapshot().to_json().unwrap()).unwrap();
        let over = num_bigint::BigUint::from(1u32) << 256u32;
        json["config"]["price_increment"] = serde_json::to_value(over).unwrap();

        let err = ExchangeSnapshot::from_json(&json.to_string()).unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidSnapshot(_)));
    }

    #[test]
    fn test_restore_requires_admin() {
        let (exchange, clock) = populated();
        let mut snapshot = exchange.snapshot();
        snapshot.roles.clear();

        let err = Exchange::restore(snapshot, CurrencyAccounts::new(), Arc::new(clock)).err().unwrap();
        assert!(matches!(err, ExchangeError::InvalidSnapshot(_)));
    }
}
