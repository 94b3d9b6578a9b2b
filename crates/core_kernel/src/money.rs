//! Money types with precise decimal arithmetic
//!
//! Claim amounts, coverage limits and payouts are all carried as `Money`:
//! a `rust_decimal` amount tagged with its ISO 4217 currency. Comparisons
//! across currencies are errors, never silent conversions.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Currency codes following ISO 4217
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    INR,
    USD,
    EUR,
    GBP,
}

impl Currency {
    /// Returns the number of decimal places for this currency
    pub fn decimal_places(&self) -> u32 {
        2
    }

    /// Returns the currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::INR => "₹",
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
        }
    }

    /// Returns the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::INR => "INR",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
        }
    }

    /// Parses an ISO 4217 code (case-insensitive)
    pub fn from_code(code: &str) -> Result<Self, MoneyError> {
        match code.to_ascii_uppercase().as_str() {
            "INR" => Ok(Currency::INR),
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            other => Err(MoneyError::UnknownCurrency(other.to_string())),
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::INR
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot operate on {0} and {1}")]
    CurrencyMismatch(String, String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),
}

/// A monetary amount with associated currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value, rounded to 4 decimal places
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: amount.round_dp(4),
            currency,
        }
    }

    /// Shorthand for rupee amounts, the platform's settlement currency
    pub fn inr(amount: Decimal) -> Self {
        Self::new(amount, Currency::INR)
    }

    /// Creates a zero amount in the specified currency
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: dec!(0),
            currency,
        }
    }

    /// Returns the amount
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Returns the currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }

    /// Rounds to the currency's standard decimal places
    pub fn round_to_currency(&self) -> Self {
        Self {
            amount: self.amount.round_dp(self.currency.decimal_places()),
            currency: self.currency,
        }
    }

    /// Compares two amounts of the same currency
    pub fn checked_cmp(&self, other: &Money) -> Result<Ordering, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(self.amount.cmp(&other.amount))
    }

    /// True when `0 < self <= limit`
    pub fn is_within(&self, limit: &Money) -> Result<bool, MoneyError> {
        Ok(self.is_positive() && self.checked_cmp(limit)? != Ordering::Greater)
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dp = self.currency.decimal_places();
        write!(
            f,
            "{}{:.dp$}",
            self.currency.symbol(),
            self.amount,
            dp = dp as usize
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_creation() {
        let m = Money::inr(dec!(500000));
        assert_eq!(m.amount(), dec!(500000));
        assert_eq!(m.currency(), Currency::INR);
    }

    #[test]
    fn test_display_uses_symbol() {
        let m = Money::inr(dec!(1250.5));
        assert_eq!(m.to_string(), "₹1250.50");
    }

    #[test]
    fn test_is_within_boundaries() {
        let limit = Money::inr(dec!(500000));
        assert!(Money::inr(dec!(500000)).is_within(&limit).unwrap());
        assert!(Money::inr(dec!(0.01)).is_within(&limit).unwrap());
        assert!(!Money::inr(dec!(0)).is_within(&limit).unwrap());
        assert!(!Money::inr(dec!(500000.01)).is_within(&limit).unwrap());
        assert!(!Money::inr(dec!(-10)).is_within(&limit).unwrap());
    }

    #[test]
    fn test_currency_mismatch() {
        let inr = Money::inr(dec!(100));
        let usd = Money::new(dec!(100), Currency::USD);

        assert!(matches!(inr.is_within(&usd), Err(MoneyError::CurrencyMismatch(_, _))));
        assert!(matches!(inr.checked_cmp(&usd), Err(MoneyError::CurrencyMismatch(_, _))));
    }

    #[test]
    fn test_currency_from_code() {
        assert_eq!(Currency::from_code("inr").unwrap(), Currency::INR);
        assert!(Currency::from_code("XYZ").is_err());
    }
}
