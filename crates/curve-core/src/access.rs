// curve-core/src/access.rs

use crate::{CoreError, CoreResult};
use curve_crypto::{keccak256, Address, Hash};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// 32-byte role identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Role([u8; 32]);

impl Role {
    /// Administrative role (all zero bytes)
    pub const ADMIN: Role = Role([0u8; 32]);

    /// Role identified by the Keccak-256 digest of its name
    pub fn named(name: &str) -> Self {
        Self(keccak256(name.as_bytes()).to_bytes())
    }

    pub fn to_hash(&self) -> Hash {
        Hash::new(self.0)
    }

    pub fn is_admin(&self) -> bool {
        *self == Self::ADMIN
    }
}

impl fmt::Debug for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_admin() {
            write!(f, "Role(ADMIN)")
        } else {
            write!(f, "Role({:?})", self.to_hash())
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_admin() {
            write!(f, "ADMIN")
        } else {
            write!(f, "0x{}", self.to_hash().to_hex())
        }
    }
}

/// Role membership check consumed by settlement and treasury
pub trait RoleStore {
    fn has_role(&self, account: &Address, role: Role) -> bool;

    /// Grant `role` to `account`. The granter must hold the admin role.
    /// Returns `false` when the account already held the role.
    fn grant_role(&mut self, granter: &Address, account: Address, role: Role) -> CoreResult<bool>;
}

/// Flat role registry. Grants are permanent.
#[derive(Debug, Clone, Default)]
pub struct AccessControl {
    members: BTreeMap<Role, BTreeSet<Address>>,
}

impl AccessControl {
    /// Registry with `admin` holding the administrative role
    pub fn with_admin(admin: Address) -> Self {
        let mut access = Self::default();
        access.insert(admin, Role::ADMIN);
        tracing::debug!(%admin, "admin role granted at initialization");
        access
    }

    /// Rebuild from (account, role) pairs
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Address, Role)>,
    {
        let mut access = Self::default();
        for (account, role) in entries {
            access.insert(account, role);
        }
        access
    }

    /// All (account, role) pairs in deterministic order
    pub fn entries(&self) -> Vec<(Address, Role)> {
        self.members.iter()
            .flat_map(|(role, accounts)| accounts.iter().map(move |a| (*a, *role)))
            .collect()
    }

    /// Accounts holding `role`
    pub fn members(&self, role: Role) -> Vec<Address> {
        self.members.get(&role)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Fail with `Unauthorized` unless `account` holds `role`
    pub fn require(&self, account: &Address, role: Role) -> CoreResult<()> {
        if self.has_role(account, role) {
            Ok(())
        } else {
            Err(CoreError::Unauthorized { account: *account, role })
        }
    }

    fn insert(&mut self, account: Address, role: Role) -> bool {
        self.members.entry(role).or_default().insert(account)
    }
}

impl RoleStore for AccessControl {
    fn has_role(&self, account: &Address, role: Role) -> bool {
        self.members.get(&role)
            .map(|set| set.contains(account))
            .unwrap_or(false)
    }

    fn grant_role(&mut self, granter: &Address, account: Address, role: Role) -> CoreResult<bool> {
        self.require(granter, Role::ADMIN)?;
        let granted = self.insert(account, role);
        if granted {
            tracing::info!(%granter, %account, %role, "role granted");
        }
        Ok(granted)
    }
}
