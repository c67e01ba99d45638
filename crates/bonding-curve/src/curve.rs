// bonding-curve/src/curve.rs

use crate::{ExchangeError, ExchangeResult};
use curve_core::Amount;
use num_bigint::BigUint;
use num_traits::One;

/// Linear bonding curve: the n-th token costs `increment * n`.
///
/// Closed forms are evaluated on unbounded integers and only the final value
/// is checked against the amount range, so results are identical to summing
/// the per-unit prices one by one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceCurve {
    increment: Amount,
}

impl PriceCurve {
    /// Create a curve with a positive price increment
    pub fn new(increment: Amount) -> ExchangeResult<Self> {
        if increment.is_zero() {
            return Err(ExchangeError::InvalidConfiguration(
                "price increment must be positive".into()
            ));
        }
        Ok(Self { increment })
    }

    pub fn increment(&self) -> &Amount {
        &self.increment
    }

    /// Cost of minting `quantity` units at `supply`
    /// C = inc × Σ_{i=1..q} (s + i) = inc × (q·s + q(q+1)/2)
    pub fn cost_to_buy(&self, supply: &Amount, quantity: &Amount) -> ExchangeResult<Amount> {
        let s = supply.inner();
        let q = quantity.inner();

        let triangular = q * (q + BigUint::one()) >> 1u32;
        let units = q * s + triangular;

        self.price_units(units, "cost to buy")
    }

    /// Revenue from burning `quantity` units at `supply`
    /// R = inc × Σ_{i=0..q-1} (s − i) = inc × (q·s − q(q−1)/2)
    pub fn revenue_for_sell(&self, supply: &Amount, quantity: &Amount) -> ExchangeResult<Amount> {
        if quantity > supply {
            return Err(ExchangeError::ArithmeticUnderflow(format!(
                "cannot sell {} units from a supply of {}", quantity, supply
            )));
        }
        if quantity.is_zero() {
            return Ok(Amount::zero());
        }

        let s = supply.inner();
        let q = quantity.inner();

        let triangular = q * (q - BigUint::one()) >> 1u32;
        let units = q * s - triangular;

        self.price_units(units, "revenue for sell")
    }

    /// Price of the next unit minted at `supply`
    pub fn spot_price(&self, supply: &Amount) -> ExchangeResult<Amount> {
        self.price_units(supply.inner() + BigUint::one(), "spot price")
    }

    fn price_units(&self, units: BigUint, what: &str) -> ExchangeResult<Amount> {
        Amount::new(units * self.increment.inner())
            .ok_or_else(|| ExchangeError::ArithmeticOverflow(format!("{} exceeds 256 bits", what)))
    }
}
