// bonding-curve/src/treasury.rs

use crate::{payments::CurrencyTransfer, ExchangeError, ExchangeResult};
use curve_core::{Amount, Role, RoleStore};
use curve_crypto::Address;
use serde::{Deserialize, Serialize};

/// Currency held by the exchange
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treasury {
    /// Current holdings
    balance: Amount,
    /// Total credited by buys
    total_deposited: Amount,
    /// Total paid to sellers
    total_paid_out: Amount,
    /// Total drained by admins
    total_withdrawn: Amount,
}

/// Treasury accounting totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryStats {
    pub balance: Amount,
    pub total_deposited: Amount,
    pub total_paid_out: Amount,
    pub total_withdrawn: Amount,
}

impl Treasury {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current holdings
    pub fn balance(&self) -> &Amount {
        &self.balance
    }

    /// Credit buy proceeds
    pub fn deposit(&mut self, amount: &Amount) -> ExchangeResult<()> {
        let balance = self.balance.checked_add(amount)
            .ok_or_else(|| ExchangeError::ArithmeticOverflow("Treasury balance overflow".into()))?;
        let total = self.total_deposited.checked_add(amount)
            .ok_or_else(|| ExchangeError::ArithmeticOverflow("Total deposited overflow".into()))?;

        self.balance = balance;
        self.total_deposited = total;
        Ok(())
    }

    /// Debit a sell payout
    pub fn pay_out(&mut self, amount: &Amount) -> ExchangeResult<()> {
        let balance = self.balance.checked_sub(amount)
            .ok_or_else(|| ExchangeError::InsufficientTreasury {
                required: amount.clone(),
                available: self.balance.clone(),
            })?;
        let total = self.total_paid_out.checked_add(amount)
            .ok_or_else(|| ExchangeError::ArithmeticOverflow("Total paid out overflow".into()))?;

        self.balance = balance;
        self.total_paid_out = total;
        Ok(())
    }

    /// Drain the whole balance to `caller`, who must hold the admin role.
    ///
    /// The balance is only zeroed once the transfer has gone through.
    pub fn withdraw_all<R, T>(
        &mut self,
        caller: &Address,
        roles: &R,
        transfers: &mut T,
    ) -> ExchangeResult<Amount>
    where
        R: RoleStore + ?Sized,
        T: CurrencyTransfer + ?Sized,
    {
        if !roles.has_role(caller, Role::ADMIN) {
            tracing::warn!(%caller, "withdrawal attempted without admin role");
            return Err(ExchangeError::Unauthorized {
                account: *caller,
                role: Role::ADMIN,
            });
        }

        let amount = self.balance.clone();
        if amount.is_zero() {
            return Ok(amount);
        }

        let total = self.total_withdrawn.checked_add(&amount)
            .ok_or_else(|| ExchangeError::ArithmeticOverflow("Total withdrawn overflow".into()))?;

        transfers.transfer(caller, &amount)?;

        self.balance = Amount::zero();
        self.total_withdrawn = total;

        tracing::info!(%caller, amount = %amount.to_decimal_string(), "treasury withdrawn");
        Ok(amount)
    }

    /// Deposits minus payouts minus withdrawals equals the balance
    pub fn is_reconciled(&self) -> bool {
        self.total_deposited
            .checked_sub(&self.total_paid_out)
            .and_then(|rest| rest.checked_sub(&self.total_withdrawn))
            .map_or(false, |expected| expected == self.balance)
    }

    pub fn stats(&self) -> TreasuryStats {
        TreasuryStats {
            balance: self.balance.clone(),
            total_deposited: self.total_deposited.clone(),
            total_paid_out: self.total_paid_out.clone(),
            total_withdrawn: self.total_withdrawn.clone(),
        }
    }
}
