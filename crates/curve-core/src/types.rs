// curve-core/src/types.rs

use crate::{CoreError, CoreResult};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Timestamp in Unix epoch seconds
pub type Timestamp = u64;

/// Number of decimal places of the reference currency (1 unit = 10^18 base units)
pub const CURRENCY_DECIMALS: u32 = 18;

/// Width of the representable range in bits
pub const AMOUNT_BITS: u64 = 256;

/// Unsigned amount bounded to 256 bits.
///
/// Used for both currency (in base units) and token quantities. Every
/// arithmetic operation is checked against the bound; none of them wrap.
/// Deserialization applies the same bound.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "BigUint", into = "BigUint")]
pub struct Amount(BigUint);

fn limit() -> BigUint {
    (BigUint::one() << AMOUNT_BITS) - BigUint::one()
}

impl Amount {
    /// Wrap a raw value, rejecting anything above the 256-bit bound
    pub fn new(value: BigUint) -> Option<Self> {
        if value > limit() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    /// Largest representable amount (2^256 - 1)
    pub fn max_value() -> Self {
        Self(limit())
    }

    pub fn from_u64(value: u64) -> Self {
        Self(BigUint::from(value))
    }

    /// Parse a decimal currency string such as `"0.01"` into base units
    pub fn from_decimal_str(s: &str) -> CoreResult<Self> {
        let value = Decimal::from_str(s.trim())
            .map_err(|e| CoreError::InvalidAmount(format!("{}: {}", s, e)))?;

        if value.is_sign_negative() && !value.is_zero() {
            return Err(CoreError::InvalidAmount(format!("{} is negative", s)));
        }

        let value = value.normalize();
        if value.scale() > CURRENCY_DECIMALS {
            return Err(CoreError::InvalidAmount(format!(
                "{} has more than {} decimal places", s, CURRENCY_DECIMALS
            )));
        }

        let mantissa = BigUint::from(value.mantissa().unsigned_abs());
        let factor = BigUint::from(10u64).pow(CURRENCY_DECIMALS - value.scale());

        Self::new(mantissa * factor)
            .ok_or_else(|| CoreError::Overflow(format!("{} exceeds the amount range", s)))
    }

    /// Render base units as a decimal currency string, trailing zeros trimmed
    pub fn to_decimal_string(&self) -> String {
        let unit = BigUint::from(10u64).pow(CURRENCY_DECIMALS);
        let whole = &self.0 / &unit;
        let frac = &self.0 % &unit;

        if frac.is_zero() {
            return whole.to_string();
        }

        let mut frac_str = format!(
            "{:0>width$}",
            frac.to_string(),
            width = CURRENCY_DECIMALS as usize
        );
        while frac_str.ends_with('0') {
            frac_str.pop();
        }

        format!("{}.{}", whole, frac_str)
    }

    pub fn inner(&self) -> &BigUint {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(&self, other: &Amount) -> Option<Amount> {
        Self::new(&self.0 + &other.0)
    }

    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        if self.0 < other.0 {
            None
        } else {
            Some(Amount(&self.0 - &other.0))
        }
    }

    pub fn checked_mul(&self, other: &Amount) -> Option<Amount> {
        Self::new(&self.0 * &other.0)
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<BigUint> for Amount {
    type Error = CoreError;

    fn try_from(value: BigUint) -> CoreResult<Self> {
        Self::new(value)
            .ok_or_else(|| CoreError::Overflow(format!("amount exceeds {} bits", AMOUNT_BITS)))
    }
}

impl From<Amount> for BigUint {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_arithmetic() {
        let a = Amount::from_u64(100);
        let b = Amount::from_u64(50);

        let sum = a.checked_add(&b).unwrap();
        assert_eq!(sum, Amount::from_u64(150));

        let diff = sum.checked_sub(&b).unwrap();
        assert_eq!(diff, Amount::from_u64(100));

        assert_eq!(a.checked_mul(&b).unwrap(), Amount::from_u64(5000));
    }

    #[test]
    fn test_amount_underflow() {
        let a = Amount::from_u64(50);
        let b = Amount::from_u64(100);

        assert!(a.checked_sub(&b).is_none());
    }

    #[test]
    fn test_amount_bound() {
        let max = Amount::max_value();
        assert!(max.checked_add(&Amount::from_u64(1)).is_none());
        assert!(max.checked_mul(&Amount::from_u64(2)).is_none());
        assert_eq!(max.checked_add(&Amount::zero()), Some(max.clone()));
        assert!(Amount::new(limit() + BigUint::one()).is_none());
    }

    #[test]
    fn test_decimal_parsing() {
        assert_eq!(
            Amount::from_decimal_str("0.01").unwrap(),
            Amount::from_u64(10_000_000_000_000_000)
        );
        assert_eq!(Amount::from_decimal_str("2").unwrap(), Amount::from_u64(2_000_000_000_000_000_000));
        assert_eq!(Amount::from_decimal_str("0.000000000000000001").unwrap(), Amount::from_u64(1));
        assert!(Amount::from_decimal_str("-1").is_err());
        assert!(Amount::from_decimal_str("0.0000000000000000001").is_err());
        assert!(Amount::from_decimal_str("abc").is_err());
    }

    #[test]
    fn test_decimal_formatting() {
        assert_eq!(Amount::from_decimal_str("0.55").unwrap().to_decimal_string(), "0.55");
        assert_eq!(Amount::from_u64(3_000_000_000_000_000_000).to_decimal_string(), "3");
        assert_eq!(Amount::from_u64(1).to_decimal_string(), "0.000000000000000001");
        assert_eq!(Amount::zero().to_decimal_string(), "0");
    }

    #[test]
    fn test_amount_serde() {
        let amount = Amount::from_decimal_str("7").unwrap();
        let json = serde_json::to_string(&amount).unwrap();
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(amount, back);
    }

    #[test]
    fn test_deserialize_enforces_bound() {
        let max = serde_json::to_string(&limit()).unwrap();
        assert_eq!(serde_json::from_str::<Amount>(&max).unwrap(), Amount::max_value());

        let over = serde_json::to_string(&(limit() + BigUint::one())).unwrap();
        assert!(serde_json::from_str::<Amount>(&over).is_err());
    }
}
