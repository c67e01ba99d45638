// bonding-curve/src/rate_limiter.rs

use crate::{ExchangeError, ExchangeResult};
use curve_core::Timestamp;
use curve_crypto::Address;
use std::collections::HashMap;

/// Per-account cooldown between rate-limited actions
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Minimum seconds between two actions
    cooldown: u64,
    /// Last action per account; zero means never acted
    last_action: HashMap<Address, Timestamp>,
}

impl RateLimiter {
    pub fn new(cooldown: u64) -> Self {
        Self {
            cooldown,
            last_action: HashMap::new(),
        }
    }

    /// Rebuild from recorded (account, timestamp) pairs
    pub fn from_entries<I>(cooldown: u64, entries: I) -> Self
    where
        I: IntoIterator<Item = (Address, Timestamp)>,
    {
        Self {
            cooldown,
            last_action: entries.into_iter().collect(),
        }
    }

    pub fn cooldown(&self) -> u64 {
        self.cooldown
    }

    /// Last recorded action, `None` if the account never acted
    pub fn last_action(&self, account: &Address) -> Option<Timestamp> {
        self.last_action.get(account).copied().filter(|t| *t != 0)
    }

    /// Earliest time `account` may act again
    pub fn next_allowed(&self, account: &Address) -> Option<Timestamp> {
        self.last_action(account).map(|last| last.saturating_add(self.cooldown))
    }

    /// Fail with `RateLimited` while the account is cooling down
    pub fn check(&self, account: &Address, now: Timestamp) -> ExchangeResult<()> {
        match self.next_allowed(account) {
            Some(retry_at) if now < retry_at => Err(ExchangeError::RateLimited {
                account: *account,
                retry_at,
            }),
            _ => Ok(()),
        }
    }

    /// Record an action at `now`, returning the previous raw entry for rollback
    pub fn record(&mut self, account: Address, now: Timestamp) -> Option<Timestamp> {
        self.last_action.insert(account, now)
    }

    /// Put back the entry returned by [`RateLimiter::record`]
    pub fn restore(&mut self, account: Address, previous: Option<Timestamp>) {
        match previous {
            Some(t) => {
                self.last_action.insert(account, t);
            }
            None => {
                self.last_action.remove(&account);
            }
        }
    }

    /// All recorded entries, sorted by address
    pub fn entries(&self) -> Vec<(Address, Timestamp)> {
        let mut entries: Vec<_> = self.last_action.iter().map(|(a, t)| (*a, *t)).collect();
        entries.sort_by_key(|(a, _)| *a);
        entries
    }
}
