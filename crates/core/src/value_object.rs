//! Value objects: equality by value, not identity.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DomainError;

/// Largest amount a price column can hold: 10 digits, 2 of them decimals.
const MAX_CENTS: u64 = 99_999_999_99;

/// An amount of money in the smallest currency unit (cents).
///
/// Serialized as a decimal string with two places (`"12.50"`), the way a
/// `DECIMAL(10, 2)` column reads back.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub fn cents(self) -> u64 {
        self.0
    }

    /// Multiply by a whole quantity (e.g. booked hours).
    pub fn times(self, quantity: u64) -> Self {
        Self(self.0.saturating_mul(quantity))
    }

    /// Take `percent` of this amount, rounding half up to the cent.
    pub fn percent(self, percent: u64) -> Self {
        let scaled = (self.0 as u128) * (percent as u128);
        Self(((scaled + 50) / 100) as u64)
    }

    /// Dollar rendering used in user-facing messages (`$12.50`).
    pub fn display_usd(self) -> String {
        format!("${self}")
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Money {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || DomainError::validation(format!("invalid amount '{s}'"));

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac.len() > 2 {
            return Err(DomainError::validation(
                "ensure that there are no more than 2 decimal places",
            ));
        }

        let whole: u64 = whole.parse().map_err(|_| invalid())?;
        let mut frac_cents: u64 = if frac.is_empty() { 0 } else { frac.parse().map_err(|_| invalid())? };
        if frac.len() == 1 {
            frac_cents *= 10;
        }

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_cents))
            .filter(|c| *c <= MAX_CENTS)
            .ok_or_else(|| {
                DomainError::validation("ensure that there are no more than 10 digits in total")
            })?;
        Ok(Self(cents))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Accept both "12.50" and 12.5 so admin clients can send either.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        let text = match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s,
            Raw::Number(n) => n.to_string(),
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_strings() {
        assert_eq!("12.34".parse::<Money>().unwrap(), Money::from_cents(1234));
        assert_eq!("12".parse::<Money>().unwrap(), Money::from_cents(1200));
        assert_eq!("0.5".parse::<Money>().unwrap(), Money::from_cents(50));
    }

    #[test]
    fn rejects_malformed_amounts() {
        for bad in ["", "-1", "1.234", "abc", ".5", "1e3"] {
            assert!(bad.parse::<Money>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn rejects_more_than_ten_digits() {
        assert!("99999999.99".parse::<Money>().is_ok());
        assert!("100000000.00".parse::<Money>().is_err());
    }

    #[test]
    fn displays_two_decimal_places() {
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(12_000).display_usd(), "$120.00");
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(Money::from_cents(1000).percent(80), Money::from_cents(800));
        // 0.80 * 0.05 = 0.04
        assert_eq!(Money::from_cents(5).percent(80), Money::from_cents(4));
        // 0.80 * 0.13 = 0.104 -> 0.10
        assert_eq!(Money::from_cents(13).percent(80), Money::from_cents(10));
    }

    #[test]
    fn serde_uses_decimal_strings() {
        let json = serde_json::to_string(&Money::from_cents(4550)).unwrap();
        assert_eq!(json, "\"45.50\"");

        let from_text: Money = serde_json::from_str("\"45.5\"").unwrap();
        let from_number: Money = serde_json::from_str("45.5").unwrap();
        assert_eq!(from_text, Money::from_cents(4550));
        assert_eq!(from_number, Money::from_cents(4550));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn display_parses_back(cents in 0u64..=MAX_CENTS) {
                let money = Money::from_cents(cents);
                prop_assert_eq!(money.to_string().parse::<Money>().unwrap(), money);
            }

            #[test]
            fn discount_never_exceeds_list_price(cents in 0u64..=MAX_CENTS, percent in 0u64..=100) {
                let money = Money::from_cents(cents);
                prop_assert!(money.percent(percent) <= money);
                prop_assert_eq!(money.percent(100), money);
            }
        }
    }
}
