use crate::error::MarketError;
use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, StrExt};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Delimiter between the base and quote symbols in the canonical string form.
pub const PAIR_DELIMITER: char = '/';

/// Canonical identifier for a trading pair.
///
/// The canonical string form is `BASE/QUOTE`, both uppercase, slash-delimited
/// (eg/ `"BTC/USD"`). Venue specific symbols (eg/ `"XXBTZUSD"`) never appear here -
/// those are off-chain tickers carried by a [`ProviderConfig`](crate::market::ProviderConfig).
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub struct CurrencyPair {
    pub base: SmolStr,
    pub quote: SmolStr,
}

impl CurrencyPair {
    /// Construct a new uppercase [`Self`] from the provided base and quote symbols.
    pub fn new<S>(base: S, quote: S) -> Self
    where
        S: AsRef<str>,
    {
        Self {
            base: base.as_ref().to_uppercase_smolstr(),
            quote: quote.as_ref().to_uppercase_smolstr(),
        }
    }

    /// Check the base and quote symbols are non-empty and contain no lowercase characters.
    pub fn validate(&self) -> Result<(), MarketError> {
        for (side, symbol) in [("base", &self.base), ("quote", &self.quote)] {
            if symbol.is_empty() {
                return Err(MarketError::InvalidPair {
                    pair: self.to_string(),
                    reason: format!("{side} symbol is empty"),
                });
            }
            if symbol.chars().any(|c| c.is_lowercase()) {
                return Err(MarketError::InvalidPair {
                    pair: self.to_string(),
                    reason: format!("{side} symbol is not uppercase"),
                });
            }
        }
        Ok(())
    }
}

impl Display for CurrencyPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.base, PAIR_DELIMITER, self.quote)
    }
}

impl FromStr for CurrencyPair {
    type Err = MarketError;

    /// Strict parse of the canonical `BASE/QUOTE` form. Lowercase input, empty halves, or
    /// additional delimiters are rejected rather than repaired.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut split = s.split(PAIR_DELIMITER);
        let (base, quote) = match (split.next(), split.next(), split.next()) {
            (Some(base), Some(quote), None) => (base, quote),
            _ => {
                return Err(MarketError::InvalidPair {
                    pair: s.to_string(),
                    reason: format!("expected exactly one '{PAIR_DELIMITER}' delimiter"),
                });
            }
        };

        let pair = Self {
            base: SmolStr::new(base),
            quote: SmolStr::new(quote),
        };
        pair.validate()?;
        Ok(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_pair_parse_format_round_trip() {
        struct TestCase {
            input: &'static str,
            expected: Option<CurrencyPair>,
        }

        let cases = vec![
            TestCase {
                // TC0: canonical pair round-trips
                input: "BTC/USD",
                expected: Some(CurrencyPair::new("BTC", "USD")),
            },
            TestCase {
                // TC1: numeric symbols are valid
                input: "1000PEPE/USDT",
                expected: Some(CurrencyPair::new("1000PEPE", "USDT")),
            },
            TestCase {
                // TC2: lowercase is rejected, not repaired
                input: "btc/usd",
                expected: None,
            },
            TestCase {
                // TC3: missing delimiter
                input: "BTCUSD",
                expected: None,
            },
            TestCase {
                // TC4: too many delimiters
                input: "BTC/USD/T",
                expected: None,
            },
            TestCase {
                // TC5: empty quote
                input: "BTC/",
                expected: None,
            },
        ];

        for (index, test) in cases.into_iter().enumerate() {
            let actual = CurrencyPair::from_str(test.input);
            match (actual, test.expected) {
                (Ok(actual), Some(expected)) => {
                    assert_eq!(actual, expected, "TC{index} failed");
                    assert_eq!(actual.to_string(), test.input, "TC{index} format failed");
                }
                (Err(_), None) => {
                    // Test passed
                }
                (actual, expected) => {
                    panic!("TC{index} failed. \nActual: {actual:?}\nExpected: {expected:?}\n")
                }
            }
        }
    }

    #[test]
    fn test_currency_pair_new_uppercases() {
        let pair = CurrencyPair::new("btc", "usd");
        assert_eq!(pair.to_string(), "BTC/USD");
        assert!(pair.validate().is_ok());
    }
}
