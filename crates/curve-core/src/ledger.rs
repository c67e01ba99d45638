// curve-core/src/ledger.rs

use crate::{types::*, CoreError, CoreResult};
use curve_crypto::Address;
use std::collections::HashMap;

/// Balance ledger consumed by settlement.
///
/// Implementations own total supply and per-account balances and must keep
/// `sum(balances) == total_supply` after every call, including failed ones.
pub trait BalanceLedger {
    fn total_supply(&self) -> Amount;

    fn balance_of(&self, account: &Address) -> Amount;

    /// Credit `quantity` new units to `to`
    fn mint(&mut self, to: &Address, quantity: &Amount) -> CoreResult<()>;

    /// Destroy `quantity` units held by `from`
    fn burn(&mut self, from: &Address, quantity: &Amount) -> CoreResult<()>;

    /// Open a rollback scope
    fn checkpoint(&mut self);

    /// Keep every change since the last checkpoint
    fn commit(&mut self);

    /// Undo every change since the last checkpoint
    fn rollback(&mut self);
}

/// In-memory token ledger
#[derive(Debug, Clone, Default)]
pub struct TokenLedger {
    /// Non-zero balances
    balances: HashMap<Address, Amount>,
    /// Total supply
    total_supply: Amount,
    /// State modifications (for rollback)
    modifications: Vec<LedgerModification>,
}

impl TokenLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from balance entries, deriving the supply
    pub fn from_balances<I>(entries: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = (Address, Amount)>,
    {
        let mut ledger = Self::new();
        for (address, amount) in entries {
            if amount.is_zero() {
                continue;
            }
            if ledger.balances.contains_key(&address) {
                return Err(CoreError::StateError(format!("Duplicate balance entry for {}", address)));
            }
            ledger.total_supply = ledger.total_supply.checked_add(&amount)
                .ok_or_else(|| CoreError::Overflow("Total supply overflow".into()))?;
            ledger.balances.insert(address, amount);
        }
        Ok(ledger)
    }

    /// Non-zero balances, sorted by address
    pub fn balances(&self) -> Vec<(Address, Amount)> {
        let mut entries: Vec<_> = self.balances.iter()
            .map(|(addr, amount)| (*addr, amount.clone()))
            .collect();
        entries.sort_by_key(|(addr, _)| *addr);
        entries
    }

    /// Number of accounts with a non-zero balance
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Check `sum(balances) == total_supply`
    pub fn is_conserved(&self) -> bool {
        let sum = self.balances.values()
            .try_fold(Amount::zero(), |acc, b| acc.checked_add(b));
        sum.as_ref() == Some(&self.total_supply)
    }

    fn set_balance(&mut self, address: Address, amount: Amount) {
        self.record_balance_modification(address);
        if amount.is_zero() {
            self.balances.remove(&address);
        } else {
            self.balances.insert(address, amount);
        }
    }

    fn set_supply(&mut self, supply: Amount) {
        self.record_supply_modification();
        self.total_supply = supply;
    }

    /// Record the pre-checkpoint balance of `address` once per scope
    fn record_balance_modification(&mut self, address: Address) {
        if self.modifications.is_empty() {
            return;
        }
        for entry in self.modifications.iter().rev() {
            match entry {
                LedgerModification::Checkpoint => break,
                LedgerModification::BalanceSet { address: a, .. } if *a == address => return,
                _ => {}
            }
        }

        let old = self.balances.get(&address).cloned();
        self.modifications.push(LedgerModification::BalanceSet {
            address,
            old_balance: old,
        });
    }

    fn record_supply_modification(&mut self) {
        if self.modifications.is_empty() {
            return;
        }
        for entry in self.modifications.iter().rev() {
            match entry {
                LedgerModification::Checkpoint => break,
                LedgerModification::SupplySet { .. } => return,
                _ => {}
            }
        }

        self.modifications.push(LedgerModification::SupplySet {
            old_supply: self.total_supply.clone(),
        });
    }
}

impl BalanceLedger for TokenLedger {
    fn total_supply(&self) -> Amount {
        self.total_supply.clone()
    }

    fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).cloned().unwrap_or_else(Amount::zero)
    }

    fn mint(&mut self, to: &Address, quantity: &Amount) -> CoreResult<()> {
        let new_balance = self.balance_of(to).checked_add(quantity)
            .ok_or_else(|| CoreError::Overflow("Balance overflow".into()))?;
        let new_supply = self.total_supply.checked_add(quantity)
            .ok_or_else(|| CoreError::Overflow("Total supply overflow".into()))?;

        self.set_balance(*to, new_balance);
        self.set_supply(new_supply);

        tracing::trace!(account = %to, %quantity, "minted");
        Ok(())
    }

    fn burn(&mut self, from: &Address, quantity: &Amount) -> CoreResult<()> {
        let balance = self.balance_of(from);
        let new_balance = balance.checked_sub(quantity)
            .ok_or_else(|| CoreError::InsufficientBalance {
                required: quantity.clone(),
                available: balance.clone(),
            })?;
        let new_supply = self.total_supply.checked_sub(quantity)
            .ok_or_else(|| CoreError::Underflow("Total supply underflow".into()))?;

        self.set_balance(*from, new_balance);
        self.set_supply(new_supply);

        tracing::trace!(account = %from, %quantity, "burned");
        Ok(())
    }

    fn checkpoint(&mut self) {
        self.modifications.push(LedgerModification::Checkpoint);
    }

    fn commit(&mut self) {
        // Drop modifications up to the last checkpoint
        while let Some(entry) = self.modifications.pop() {
            if matches!(entry, LedgerModification::Checkpoint) {
                break;
            }
        }
    }

    fn rollback(&mut self) {
        while let Some(entry) = self.modifications.pop() {
            match entry {
                LedgerModification::Checkpoint => break,
                LedgerModification::BalanceSet { address, old_balance } => {
                    match old_balance {
                        Some(old) => {
                            self.balances.insert(address, old);
                        }
                        None => {
                            self.balances.remove(&address);
                        }
                    }
                }
                LedgerModification::SupplySet { old_supply } => {
                    self.total_supply = old_supply;
                }
            }
        }
    }
}

/// Ledger modification for rollback support
#[derive(Debug, Clone)]
enum LedgerModification {
    Checkpoint,
    BalanceSet {
        address: Address,
        old_balance: Option<Amount>,
    },
    SupplySet {
        old_supply: Amount,
    },
}
