//! # Money Types
//!
//! Currency and price types for the reconciliation ledger.
//! Amounts are stored in the smallest currency unit (paise for INR)
//! so ledger arithmetic never touches floating point.

use serde::{Deserialize, Serialize};

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    INR,
    USD,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::INR => "INR",
            Currency::USD => "USD",
        }
    }

    /// Returns the number of decimal places for this currency
    pub fn decimal_places(&self) -> u8 {
        2
    }

    /// Convert a decimal amount to the smallest currency unit
    pub fn to_minor_units(&self, amount: f64) -> i64 {
        let multiplier = 10_f64.powi(self.decimal_places() as i32);
        (amount * multiplier).round() as i64
    }

    /// Convert from smallest unit back to decimal
    pub fn from_minor_units(&self, amount: i64) -> f64 {
        let divisor = 10_f64.powi(self.decimal_places() as i32);
        amount as f64 / divisor
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::INR
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Price with amount in smallest currency unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in smallest currency unit (paise for INR)
    pub amount_minor: i64,
    /// Currency
    pub currency: Currency,
}

impl Price {
    /// Create a new price from a decimal amount
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self {
            amount_minor: currency.to_minor_units(amount),
            currency,
        }
    }

    /// Create a price from the smallest unit (paise)
    pub fn from_minor(amount_minor: i64, currency: Currency) -> Self {
        Self {
            amount_minor,
            currency,
        }
    }

    /// Get the decimal amount
    pub fn as_decimal(&self) -> f64 {
        self.currency.from_minor_units(self.amount_minor)
    }

    /// Two-decimal string, the form UPI intent links expect ("499.00")
    pub fn to_upi_amount(&self) -> String {
        format!("{:.2}", self.as_decimal())
    }

    /// Format for display (e.g., "INR 499.00")
    pub fn display(&self) -> String {
        format!("{} {:.2}", self.currency, self.as_decimal())
    }

    /// Whether a submitted decimal price agrees with this one within
    /// the given tolerance (order creation uses 0.01).
    pub fn matches(&self, submitted: f64, tolerance: f64) -> bool {
        (self.as_decimal() - submitted).abs() <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_unit_conversion() {
        let inr = Currency::INR;
        assert_eq!(inr.to_minor_units(499.0), 49900);
        assert_eq!(inr.to_minor_units(10.99), 1099);
        assert_eq!(inr.from_minor_units(49900), 499.0);
    }

    #[test]
    fn test_price_display() {
        let price = Price::new(499.0, Currency::INR);
        assert_eq!(price.display(), "INR 499.00");
        assert_eq!(price.to_upi_amount(), "499.00");
    }

    #[test]
    fn test_price_tolerance() {
        let price = Price::new(499.0, Currency::INR);
        assert!(price.matches(499.0, 0.01));
        assert!(price.matches(499.01, 0.01));
        assert!(price.matches(498.99, 0.01));
        assert!(!price.matches(499.02, 0.01));
        assert!(!price.matches(498.0, 0.01));
    }
}
