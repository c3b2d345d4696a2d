//! Monetary amounts and currency codes.
//!
//! Amounts arrive from clients in major units (e.g. `19.99` dollars) and are
//! handed to the payment provider in minor units (e.g. `1999` cents). The
//! conversion is exact: decimal arithmetic, no floating point, and inputs
//! with more fractional digits than the currency supports are rejected
//! rather than rounded.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors that can occur when validating or converting a [`Money`] value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Amount is zero or negative.
    #[error("amount must be greater than zero")]
    NotPositive,
    /// Amount has more decimal places than the currency allows.
    #[error("amount has more than {max} decimal places for {currency}")]
    TooPrecise {
        /// Currency the amount was given in.
        currency: CurrencyCode,
        /// Decimal places the currency allows.
        max: u32,
    },
    /// Amount does not fit in a 64-bit count of minor units.
    #[error("amount is too large")]
    Overflow,
    /// Currency code is not supported.
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),
}

/// ISO 4217 currency codes accepted for payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyCode {
    #[default]
    Usd,
    Eur,
    Gbp,
    Cad,
    Aud,
    Jpy,
}

impl CurrencyCode {
    /// Lowercase ISO code, the form the payment provider expects.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Usd => "usd",
            Self::Eur => "eur",
            Self::Gbp => "gbp",
            Self::Cad => "cad",
            Self::Aud => "aud",
            Self::Jpy => "jpy",
        }
    }

    /// Number of minor-unit digits (ISO 4217 exponent).
    #[must_use]
    pub const fn exponent(self) -> u32 {
        match self {
            Self::Jpy => 0,
            Self::Usd | Self::Eur | Self::Gbp | Self::Cad | Self::Aud => 2,
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = MoneyError;

    /// Parse a currency code, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usd" => Ok(Self::Usd),
            "eur" => Ok(Self::Eur),
            "gbp" => Ok(Self::Gbp),
            "cad" => Ok(Self::Cad),
            "aud" => Ok(Self::Aud),
            "jpy" => Ok(Self::Jpy),
            _ => Err(MoneyError::UnsupportedCurrency(s.to_string())),
        }
    }
}

/// A positive amount in major units with its currency.
///
/// Deserialization goes through [`Money::new`], so the same checks apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedMoney")]
pub struct Money {
    amount: Decimal,
    currency: CurrencyCode,
}

#[derive(Deserialize)]
struct UncheckedMoney {
    amount: Decimal,
    currency: CurrencyCode,
}

impl TryFrom<UncheckedMoney> for Money {
    type Error = MoneyError;

    fn try_from(raw: UncheckedMoney) -> Result<Self, Self::Error> {
        Self::new(raw.amount, raw.currency)
    }
}

impl Money {
    /// Create a validated amount.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::NotPositive`] for zero or negative amounts and
    /// [`MoneyError::TooPrecise`] when the amount has more fractional digits
    /// than the currency allows.
    pub fn new(amount: Decimal, currency: CurrencyCode) -> Result<Self, MoneyError> {
        if amount <= Decimal::ZERO {
            return Err(MoneyError::NotPositive);
        }

        let max = currency.exponent();
        if amount.normalize().scale() > max {
            return Err(MoneyError::TooPrecise { currency, max });
        }

        Ok(Self { amount, currency })
    }

    /// Build from a count of minor units (e.g. cents).
    #[must_use]
    pub fn from_minor_units(minor: i64, currency: CurrencyCode) -> Self {
        Self {
            amount: Decimal::new(minor, currency.exponent()),
            currency,
        }
    }

    /// Amount in major units.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// Currency of the amount.
    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Convert to the smallest currency unit, exactly.
    ///
    /// ```
    /// use bookstore_core::{CurrencyCode, Money};
    /// use rust_decimal::Decimal;
    ///
    /// let price = Money::new(Decimal::new(1999, 2), CurrencyCode::Usd).unwrap();
    /// assert_eq!(price.to_minor_units().unwrap(), 1999);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the result does not fit in `i64`.
    pub fn to_minor_units(&self) -> Result<i64, MoneyError> {
        let factor = Decimal::from(10_i64.pow(self.currency.exponent()));
        let minor = self
            .amount
            .checked_mul(factor)
            .ok_or(MoneyError::Overflow)?;

        // Money::new guarantees no fractional minor units remain.
        minor.trunc().to_i64().ok_or(MoneyError::Overflow)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let places = self.currency.exponent() as usize;
        write!(
            f,
            "{:.places$} {}",
            self.amount,
            self.currency.as_str().to_uppercase()
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_minor_units_exact() {
        let money = Money::new(dec("19.99"), CurrencyCode::Usd).unwrap();
        assert_eq!(money.to_minor_units().unwrap(), 1999);

        let money = Money::new(dec("0.01"), CurrencyCode::Eur).unwrap();
        assert_eq!(money.to_minor_units().unwrap(), 1);

        let money = Money::new(dec("10"), CurrencyCode::Gbp).unwrap();
        assert_eq!(money.to_minor_units().unwrap(), 1000);
    }

    #[test]
    fn test_minor_units_trailing_zeros_are_not_extra_precision() {
        let money = Money::new(dec("12.500"), CurrencyCode::Usd).unwrap();
        assert_eq!(money.to_minor_units().unwrap(), 1250);
    }

    #[test]
    fn test_minor_units_zero_decimal_currency() {
        let money = Money::new(dec("500"), CurrencyCode::Jpy).unwrap();
        assert_eq!(money.to_minor_units().unwrap(), 500);

        assert_eq!(
            Money::new(dec("500.5"), CurrencyCode::Jpy),
            Err(MoneyError::TooPrecise {
                currency: CurrencyCode::Jpy,
                max: 0
            })
        );
    }

    #[test]
    fn test_rejects_non_positive() {
        assert_eq!(
            Money::new(Decimal::ZERO, CurrencyCode::Usd),
            Err(MoneyError::NotPositive)
        );
        assert_eq!(
            Money::new(dec("-5.00"), CurrencyCode::Usd),
            Err(MoneyError::NotPositive)
        );
    }

    #[test]
    fn test_rejects_sub_cent_amounts() {
        assert!(matches!(
            Money::new(dec("19.999"), CurrencyCode::Usd),
            Err(MoneyError::TooPrecise { max: 2, .. })
        ));
    }

    #[test]
    fn test_overflow() {
        let money = Money::new(Decimal::MAX, CurrencyCode::Usd).unwrap();
        assert_eq!(money.to_minor_units(), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_from_minor_units() {
        let money = Money::from_minor_units(1999, CurrencyCode::Usd);
        assert_eq!(money.amount(), dec("19.99"));
        assert_eq!(money.to_string(), "19.99 USD");
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("USD".parse::<CurrencyCode>().unwrap(), CurrencyCode::Usd);
        assert_eq!(" eur ".parse::<CurrencyCode>().unwrap(), CurrencyCode::Eur);
        assert!(matches!(
            "xyz".parse::<CurrencyCode>(),
            Err(MoneyError::UnsupportedCurrency(_))
        ));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Money = serde_json::from_str(r#"{"amount":"19.99","currency":"usd"}"#).unwrap();
        assert_eq!(ok.to_minor_units().unwrap(), 1999);

        assert!(serde_json::from_str::<Money>(r#"{"amount":"0","currency":"usd"}"#).is_err());
        assert!(serde_json::from_str::<Money>(r#"{"amount":"1.005","currency":"usd"}"#).is_err());
        assert!(serde_json::from_str::<Money>(r#"{"amount":"1.5","currency":"jpy"}"#).is_err());
    }

    #[test]
    fn test_currency_serde_lowercase() {
        let json = serde_json::to_string(&CurrencyCode::Cad).unwrap();
        assert_eq!(json, "\"cad\"");
    }
}
