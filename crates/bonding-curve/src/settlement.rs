// bonding-curve/src/settlement.rs

use crate::{
    clock::Clock,
    config::CurveConfig,
    curve::PriceCurve,
    payments::{CurrencyAccounts, CurrencyTransfer},
    rate_limiter::RateLimiter,
    treasury::{Treasury, TreasuryStats},
    ExchangeError, ExchangeResult,
};
use curve_core::{AccessControl, Amount, BalanceLedger, Role, RoleStore, Timestamp, TokenLedger};
use curve_crypto::Address;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result of a committed buy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyReceipt {
    pub buyer: Address,
    /// Units minted to the buyer
    pub minted: Amount,
    /// Currency kept by the treasury
    pub cost: Amount,
    /// Change returned to the buyer
    pub refund: Amount,
    pub supply_after: Amount,
    /// Time recorded against the buyer's cooldown
    pub timestamp: Timestamp,
}

/// Result of a committed sell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellReceipt {
    pub seller: Address,
    /// Units burned from the seller
    pub burned: Amount,
    /// Currency paid to the seller
    pub payout: Amount,
    pub supply_after: Amount,
    /// Time recorded against the seller's cooldown
    pub timestamp: Timestamp,
}

/// Buy/sell settlement against the price curve.
///
/// Every operation takes `&mut self`, so price computation and the supply
/// change it depends on can never interleave with another operation. Checks
/// run before any mutation; mutations run under a ledger checkpoint and are
/// undone together with treasury and cooldown changes on any error.
pub struct Exchange<T = CurrencyAccounts, L = TokenLedger, R = AccessControl> {
    curve: PriceCurve,
    limiter: RateLimiter,
    ledger: L,
    roles: R,
    treasury: Treasury,
    transfers: T,
    clock: Arc<dyn Clock>,
}

impl<T: CurrencyTransfer> Exchange<T> {
    /// Fresh exchange with empty supply and `admin` holding the admin role
    pub fn new(
        config: &CurveConfig,
        admin: Address,
        transfers: T,
        clock: Arc<dyn Clock>,
    ) -> ExchangeResult<Self> {
        config.validate()?;

        tracing::info!(
            %admin,
            increment = %config.price_increment.to_decimal_string(),
            cooldown = config.cooldown_seconds,
            "exchange initialized"
        );

        Ok(Self::with_stores(
            PriceCurve::new(config.price_increment.clone())?,
            RateLimiter::new(config.cooldown_seconds),
            TokenLedger::new(),
            AccessControl::with_admin(admin),
            Treasury::new(),
            transfers,
            clock,
        ))
    }
}

impl<T, L, R> Exchange<T, L, R>
where
    T: CurrencyTransfer,
    L: BalanceLedger,
    R: RoleStore,
{
    /// Assemble an exchange over existing stores
    pub fn with_stores(
        curve: PriceCurve,
        limiter: RateLimiter,
        ledger: L,
        roles: R,
        treasury: Treasury,
        transfers: T,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            curve,
            limiter,
            ledger,
            roles,
            treasury,
            transfers,
            clock,
        }
    }

    /// Mint `quantity` units to `caller` against an attached `payment`.
    ///
    /// Buys are never held back by the cooldown, but they do start it: a
    /// buyer cannot sell until the cooldown has elapsed. Change above the
    /// cost is refunded; a failed refund aborts the buy.
    pub fn buy(
        &mut self,
        caller: Address,
        quantity: &Amount,
        max_cost: &Amount,
        payment: &Amount,
    ) -> ExchangeResult<BuyReceipt> {
        ensure_positive(quantity)?;

        let now = self.clock.now();
        let supply = self.ledger.total_supply();
        let cost = self.curve.cost_to_buy(&supply, quantity)?;

        if &cost > max_cost {
            return Err(ExchangeError::SlippageExceeded {
                quoted: cost,
                bound: max_cost.clone(),
            });
        }

        let refund = payment.checked_sub(&cost)
            .ok_or_else(|| ExchangeError::InsufficientPayment {
                required: cost.clone(),
                sent: payment.clone(),
            })?;

        let treasury_before = self.treasury.clone();
        self.ledger.checkpoint();
        let previous_action = self.limiter.record(caller, now);

        let result = self.apply_buy(&caller, quantity, &cost, &refund);
        if let Err(err) = result {
            self.ledger.rollback();
            self.treasury = treasury_before;
            self.limiter.restore(caller, previous_action);
            tracing::warn!(buyer = %caller, %quantity, error = %err, "buy rolled back");
            return Err(err);
        }
        self.ledger.commit();

        let receipt = BuyReceipt {
            buyer: caller,
            minted: quantity.clone(),
            cost,
            refund,
            supply_after: self.ledger.total_supply(),
            timestamp: now,
        };

        tracing::info!(
            buyer = %caller,
            minted = %receipt.minted,
            cost = %receipt.cost.to_decimal_string(),
            supply = %receipt.supply_after,
            "buy settled"
        );

        Ok(receipt)
    }

    fn apply_buy(
        &mut self,
        caller: &Address,
        quantity: &Amount,
        cost: &Amount,
        refund: &Amount,
    ) -> ExchangeResult<()> {
        self.ledger.mint(caller, quantity)?;
        self.treasury.deposit(cost)?;
        if !refund.is_zero() {
            self.transfers.transfer(caller, refund)?;
        }
        Ok(())
    }

    /// Burn `quantity` units from `caller` and pay out the curve revenue.
    ///
    /// Checked in order: cooldown, balance, slippage.
    pub fn sell(
        &mut self,
        caller: Address,
        quantity: &Amount,
        min_revenue: &Amount,
    ) -> ExchangeResult<SellReceipt> {
        ensure_positive(quantity)?;

        let now = self.clock.now();
        self.limiter.check(&caller, now)?;

        let balance = self.ledger.balance_of(&caller);
        if &balance < quantity {
            return Err(ExchangeError::InsufficientBalance {
                required: quantity.clone(),
                available: balance,
            });
        }

        let supply = self.ledger.total_supply();
        let revenue = self.curve.revenue_for_sell(&supply, quantity)?;

        if &revenue < min_revenue {
            return Err(ExchangeError::SlippageExceeded {
                quoted: revenue,
                bound: min_revenue.clone(),
            });
        }

        let treasury_before = self.treasury.clone();
        self.ledger.checkpoint();
        let previous_action = self.limiter.record(caller, now);

        let result = self.apply_sell(&caller, quantity, &revenue);
        if let Err(err) = result {
            self.ledger.rollback();
            self.treasury = treasury_before;
            self.limiter.restore(caller, previous_action);
            tracing::warn!(seller = %caller, %quantity, error = %err, "sell rolled back");
            return Err(err);
        }
        self.ledger.commit();

        let receipt = SellReceipt {
            seller: caller,
            burned: quantity.clone(),
            payout: revenue,
            supply_after: self.ledger.total_supply(),
            timestamp: now,
        };

        tracing::info!(
            seller = %caller,
            burned = %receipt.burned,
            payout = %receipt.payout.to_decimal_string(),
            supply = %receipt.supply_after,
            "sell settled"
        );

        Ok(receipt)
    }

    fn apply_sell(
        &mut self,
        caller: &Address,
        quantity: &Amount,
        revenue: &Amount,
    ) -> ExchangeResult<()> {
        self.ledger.burn(caller, quantity)?;
        self.treasury.pay_out(revenue)?;
        self.transfers.transfer(caller, revenue)?;
        Ok(())
    }

    /// Drain the treasury to an admin caller
    pub fn withdraw(&mut self, caller: Address) -> ExchangeResult<Amount> {
        self.treasury.withdraw_all(&caller, &self.roles, &mut self.transfers)
    }

    /// Grant `role` to `account`; `granter` must be an admin
    pub fn grant_role(&mut self, granter: Address, account: Address, role: Role) -> ExchangeResult<bool> {
        Ok(self.roles.grant_role(&granter, account, role)?)
    }

    /// Cost of buying `quantity` units at the current supply
    pub fn quote_buy(&self, quantity: &Amount) -> ExchangeResult<Amount> {
        let cost = self.curve.cost_to_buy(&self.ledger.total_supply(), quantity)?;
        tracing::debug!(%quantity, cost = %cost.to_decimal_string(), "buy quoted");
        Ok(cost)
    }

    /// Revenue from selling `quantity` units at the current supply
    pub fn quote_sell(&self, quantity: &Amount) -> ExchangeResult<Amount> {
        let revenue = self.curve.revenue_for_sell(&self.ledger.total_supply(), quantity)?;
        tracing::debug!(%quantity, revenue = %revenue.to_decimal_string(), "sell quoted");
        Ok(revenue)
    }

    /// Price of the next unit
    pub fn spot_price(&self) -> ExchangeResult<Amount> {
        self.curve.spot_price(&self.ledger.total_supply())
    }

    pub fn price_increment(&self) -> &Amount {
        self.curve.increment()
    }

    /// Sell cooldown in seconds
    pub fn cooldown(&self) -> u64 {
        self.limiter.cooldown()
    }

    pub fn total_supply(&self) -> Amount {
        self.ledger.total_supply()
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.ledger.balance_of(account)
    }

    pub fn treasury_balance(&self) -> &Amount {
        self.treasury.balance()
    }

    pub fn treasury_stats(&self) -> TreasuryStats {
        self.treasury.stats()
    }

    pub fn last_action(&self, account: &Address) -> Option<Timestamp> {
        self.limiter.last_action(account)
    }

    pub fn has_role(&self, account: &Address, role: Role) -> bool {
        self.roles.has_role(account, role)
    }

    pub fn transfers(&self) -> &T {
        &self.transfers
    }

    pub fn transfers_mut(&mut self) -> &mut T {
        &mut self.transfers
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn roles(&self) -> &R {
        &self.roles
    }

    pub(crate) fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub(crate) fn treasury(&self) -> &Treasury {
        &self.treasury
    }
}

fn ensure_positive(quantity: &Amount) -> ExchangeResult<()> {
    if quantity.is_zero() {
        return Err(ExchangeError::InvalidQuantity("quantity must be positive".into()));
    }
    Ok(())
}
