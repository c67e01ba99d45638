// bonding-curve/src/payments.rs

use curve_core::Amount;
use curve_crypto::Address;
use std::collections::{BTreeSet, HashMap};

/// Outbound currency transfer failures
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Recipient {0} cannot receive currency")]
    Rejected(Address),

    #[error("Recipient balance overflow for {0}")]
    Overflow(Address),
}

/// Outbound currency transfers (refunds, sell payouts, withdrawals).
///
/// A transfer either fully succeeds or leaves nothing behind; settlement
/// rolls back the enclosing operation when it fails.
pub trait CurrencyTransfer {
    fn transfer(&mut self, to: &Address, amount: &Amount) -> Result<(), TransferError>;
}

/// In-memory currency accounts receiving outbound transfers
#[derive(Debug, Clone, Default)]
pub struct CurrencyAccounts {
    /// Currency received per address
    received: HashMap<Address, Amount>,
    /// Addresses that refuse incoming transfers
    rejecting: BTreeSet<Address>,
}

impl CurrencyAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from (address, received) pairs
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Address, Amount)>,
    {
        Self {
            received: entries.into_iter().collect(),
            rejecting: BTreeSet::new(),
        }
    }

    /// Make `address` refuse every incoming transfer
    pub fn reject(&mut self, address: Address) {
        self.rejecting.insert(address);
    }

    /// Let `address` receive transfers again
    pub fn accept(&mut self, address: Address) {
        self.rejecting.remove(&address);
    }

    /// Total currency received by `address`
    pub fn received(&self, address: &Address) -> Amount {
        self.received.get(address).cloned().unwrap_or_else(Amount::zero)
    }

    /// All recipients, sorted by address
    pub fn entries(&self) -> Vec<(Address, Amount)> {
        let mut entries: Vec<_> = self.received.iter()
            .map(|(a, amount)| (*a, amount.clone()))
            .collect();
        entries.sort_by_key(|(a, _)| *a);
        entries
    }
}

impl CurrencyTransfer for CurrencyAccounts {
    fn transfer(&mut self, to: &Address, amount: &Amount) -> Result<(), TransferError> {
        if self.rejecting.contains(to) {
            return Err(TransferError::Rejected(*to));
        }

        let updated = self.received(to).checked_add(amount)
            .ok_or(TransferError::Overflow(*to))?;
        self.received.insert(*to, updated);

        tracing::debug!(recipient = %to, %amount, "currency transferred");
        Ok(())
    }
}
