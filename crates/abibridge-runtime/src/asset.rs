//! Fixed-point token amounts.
//!
//! Amounts are held as integer units so that `10.0000 EOS` round-trips to the
//! exact same text regardless of how many operations were applied to it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const MAX_PRECISION: u8 = 18;
const MAX_SYMBOL_CODE_LEN: usize = 7;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("malformed asset {input:?}: {reason}")]
    Malformed { input: String, reason: &'static str },

    #[error("invalid symbol {0:?}: expected 1-7 uppercase letters")]
    InvalidSymbol(String),

    #[error("precision {0} exceeds the maximum of 18")]
    Precision(u8),

    #[error("differing symbol: cannot combine {left} with {right}")]
    DifferingSymbol { left: String, right: String },

    #[error("differing precision: cannot combine {left} with {right}")]
    DifferingPrecision { left: String, right: String },

    #[error("asset amount overflow")]
    Overflow,
}

/// A token symbol: decimal precision plus a code such as `EOS`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol {
    precision: u8,
    code: String,
}

impl Symbol {
    pub fn new(precision: u8, code: &str) -> Result<Self, AssetError> {
        if precision > MAX_PRECISION {
            return Err(AssetError::Precision(precision));
        }
        let valid = !code.is_empty()
            && code.len() <= MAX_SYMBOL_CODE_LEN
            && code.bytes().all(|b| b.is_ascii_uppercase());
        if !valid {
            return Err(AssetError::InvalidSymbol(code.to_string()));
        }
        Ok(Symbol {
            precision,
            code: code.to_string(),
        })
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    fn scale(&self) -> i64 {
        10i64.pow(u32::from(self.precision))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.precision, self.code)
    }
}

impl FromStr for Symbol {
    type Err = AssetError;

    /// `4,EOS`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason| AssetError::Malformed {
            input: s.to_string(),
            reason,
        };
        let (precision, code) = s
            .split_once(',')
            .ok_or_else(|| malformed("expected `<precision>,<code>`"))?;
        let precision: u8 = precision
            .parse()
            .map_err(|_| malformed("precision is not a small integer"))?;
        Symbol::new(precision, code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Asset {
    amount: i64,
    symbol: Symbol,
}

impl Asset {
    /// `amount` is in integer units of the symbol's precision: `Asset::new(12345, 4,EOS)`
    /// is `1.2345 EOS`.
    pub fn new(amount: i64, symbol: Symbol) -> Self {
        Asset { amount, symbol }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn precision(&self) -> u8 {
        self.symbol.precision
    }

    pub fn amount_raw(&self) -> i64 {
        self.amount
    }

    /// Lossy decimal view of the amount.
    pub fn amount(&self) -> f64 {
        self.amount as f64 / self.symbol.scale() as f64
    }

    fn check_same(&self, other: &Asset) -> Result<(), AssetError> {
        if self.symbol.code != other.symbol.code {
            return Err(AssetError::DifferingSymbol {
                left: self.to_string(),
                right: other.to_string(),
            });
        }
        if self.symbol.precision != other.symbol.precision {
            return Err(AssetError::DifferingPrecision {
                left: self.to_string(),
                right: other.to_string(),
            });
        }
        Ok(())
    }

    pub fn checked_add(&self, other: &Asset) -> Result<Asset, AssetError> {
        self.check_same(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(AssetError::Overflow)?;
        Ok(Asset::new(amount, self.symbol.clone()))
    }

    pub fn checked_sub(&self, other: &Asset) -> Result<Asset, AssetError> {
        self.check_same(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or(AssetError::Overflow)?;
        Ok(Asset::new(amount, self.symbol.clone()))
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        let precision = usize::from(self.symbol.precision);
        if precision == 0 {
            return write!(f, "{sign}{abs} {}", self.symbol.code);
        }
        let scale = self.symbol.scale().unsigned_abs();
        write!(
            f,
            "{sign}{}.{:0precision$} {}",
            abs / scale,
            abs % scale,
            self.symbol.code
        )
    }
}

impl FromStr for Asset {
    type Err = AssetError;

    /// `10.0000 EOS`; the precision is the number of decimals written.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason| AssetError::Malformed {
            input: s.to_string(),
            reason,
        };
        let (amount, code) = s
            .trim()
            .split_once(' ')
            .ok_or_else(|| malformed("expected `<amount> <symbol>`"))?;

        let (negative, digits) = match amount.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, amount),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) if !f.is_empty() => (i, f),
            Some(_) => return Err(malformed("missing decimals after `.`")),
            None => (digits, ""),
        };
        let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
        if int_part.is_empty() || !all_digits(int_part) || !all_digits(frac_part) {
            return Err(malformed("amount is not a decimal number"));
        }
        let precision =
            u8::try_from(frac_part.len()).map_err(|_| malformed("too many decimals"))?;
        let symbol = Symbol::new(precision, code)?;

        let int: i64 = int_part.parse().map_err(|_| AssetError::Overflow)?;
        let frac: i64 = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse().map_err(|_| AssetError::Overflow)?
        };
        let units = int
            .checked_mul(symbol.scale())
            .and_then(|v| v.checked_add(frac))
            .ok_or(AssetError::Overflow)?;
        Ok(Asset::new(if negative { -units } else { units }, symbol))
    }
}

impl Serialize for Asset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtendedAsset {
    pub quantity: Asset,
    pub contract: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtendedSymbol {
    pub sym: Symbol,
    pub contract: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(s: &str) -> Asset {
        s.parse().expect("asset")
    }

    #[test]
    fn parses_precision_from_decimals() {
        let a = asset("10.12345 TLM");
        assert_eq!(a.precision(), 5);
        assert_eq!(a.symbol().code(), "TLM");
        assert_eq!(a.amount_raw(), 1_012_345);
        assert_eq!(a.to_string(), "10.12345 TLM");
    }

    #[test]
    fn keeps_trailing_zeros_and_whole_amounts() {
        assert_eq!(asset("10.0000 EOS").to_string(), "10.0000 EOS");
        assert_eq!(asset("0.0001 EOS").amount_raw(), 1);
        assert_eq!(asset("7 NFT").to_string(), "7 NFT");
        assert_eq!(asset("-1.5000 EOS").to_string(), "-1.5000 EOS");
        assert_eq!(asset("-0.5000 EOS").to_string(), "-0.5000 EOS");
    }

    #[test]
    fn add_and_sub_require_matching_symbols() {
        let a = asset("1.0000 EOS");
        let b = asset("2.5000 EOS");
        assert_eq!(a.checked_add(&b).unwrap().to_string(), "3.5000 EOS");
        assert_eq!(a.checked_sub(&b).unwrap().to_string(), "-1.5000 EOS");

        let err = a.checked_add(&asset("1.0000 TLM")).unwrap_err();
        assert!(matches!(err, AssetError::DifferingSymbol { .. }));
        let err = a.checked_add(&asset("1.00 EOS")).unwrap_err();
        assert!(matches!(err, AssetError::DifferingPrecision { .. }));
    }

    #[test]
    fn rejects_malformed_text() {
        for bad in ["", "10.0000", "10.0000 eos", "1.2.3 EOS", "abc EOS", "10. EOS", "1.0 TOOLONGX"] {
            assert!(bad.parse::<Asset>().is_err(), "{bad:?}");
        }
    }

    #[test]
    fn symbols_and_extended_values_use_chain_json() {
        let sym: Symbol = "4,EOS".parse().unwrap();
        assert_eq!(sym.to_string(), "4,EOS");
        let ext = ExtendedSymbol {
            sym,
            contract: "eosio.token".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&ext).unwrap(),
            serde_json::json!({"sym": "4,EOS", "contract": "eosio.token"})
        );

        let ext: ExtendedAsset = serde_json::from_value(serde_json::json!({
            "quantity": "1.0000 EOS",
            "contract": "eosio.token"
        }))
        .unwrap();
        assert_eq!(ext.quantity.amount_raw(), 10_000);
    }
}
