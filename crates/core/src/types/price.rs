//! Type-safe price representation using decimal arithmetic.
//!
//! Amounts are stored in the currency's standard unit. The store sells in
//! Vietnamese dong by default, which has no minor unit, so display rounds to
//! whole numbers for `VND` and to two places for everything else.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Format for display, e.g. `"1,250,000 ₫"` or `"$19.99"`.
    #[must_use]
    pub fn display(&self) -> String {
        let places = self.currency_code.minor_units();
        let rounded = self.amount.round_dp(places);
        let text = format!("{rounded:.prec$}", prec = places as usize);
        let (int_part, frac_part) = text.split_once('.').map_or((text.as_str(), None), |(i, f)| (i, Some(f)));
        let (sign, digits) = int_part
            .strip_prefix('-')
            .map_or(("", int_part), |d| ("-", d));
        let grouped = group_thousands(digits);
        let number = frac_part.map_or_else(|| grouped.clone(), |f| format!("{grouped}.{f}"));

        match self.currency_code {
            CurrencyCode::VND => format!("{sign}{number} {}", self.currency_code.symbol()),
            _ => format!("{sign}{}{number}", self.currency_code.symbol()),
        }
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    VND,
    USD,
    EUR,
}

impl CurrencyCode {
    /// Currency symbol used for display.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::VND => "₫",
            Self::USD => "$",
            Self::EUR => "€",
        }
    }

    /// Number of decimal places shown for this currency.
    #[must_use]
    pub const fn minor_units(self) -> u32 {
        match self {
            Self::VND => 0,
            Self::USD | Self::EUR => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_vnd_groups_thousands() {
        let price = Price::new(Decimal::new(1_250_000, 0), CurrencyCode::VND);
        assert_eq!(price.display(), "1,250,000 ₫");
    }

    #[test]
    fn test_display_usd_two_places() {
        let price = Price::new(Decimal::new(1999, 2), CurrencyCode::USD);
        assert_eq!(price.display(), "$19.99");
    }

    #[test]
    fn test_display_small_amount() {
        let price = Price::new(Decimal::new(999, 0), CurrencyCode::VND);
        assert_eq!(price.display(), "999 ₫");
    }

    #[test]
    fn test_zero() {
        assert_eq!(Price::zero(CurrencyCode::VND).display(), "0 ₫");
    }
}
