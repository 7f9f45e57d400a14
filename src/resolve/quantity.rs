//! Resource quantities (`500m`, `2`, `128Gi`, `1e3`)
//!
//! Accepts the usual orchestrator quantity grammar: a signed decimal number
//! followed by an optional binary-SI, decimal-SI or exponent suffix.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

static QUANTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+))([eE][+-]?[0-9]+|Ki|Mi|Gi|Ti|Pi|Ei|n|u|m|k|M|G|T|P|E)?$",
    )
    .expect("quantity regex is valid")
});

/// A validated quantity, kept in the form it was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quantity {
    raw: String,
}

impl Quantity {
    /// `None` if the string is not a quantity
    pub fn parse(input: &str) -> Option<Self> {
        let raw = input.trim();
        QUANTITY_RE.is_match(raw).then(|| Self {
            raw: raw.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepts(input: &str) -> bool {
        Quantity::parse(input).is_some()
    }

    #[test]
    fn plain_numbers() {
        assert!(accepts("2"));
        assert!(accepts("0.5"));
        assert!(accepts(".5"));
        assert!(accepts("-1"));
    }

    #[test]
    fn binary_and_decimal_suffixes() {
        for q in ["128Gi", "1Ki", "500m", "1k", "1E", "250M"] {
            assert!(accepts(q), "{q} should parse");
        }
    }

    #[test]
    fn exponent_suffix() {
        assert!(accepts("1e3"));
        assert_eq!(Quantity::parse("12E-1").unwrap().as_str(), "12E-1");
    }

    #[test]
    fn keeps_written_form() {
        assert_eq!(Quantity::parse(" 46 ").unwrap().to_string(), "46");
    }

    #[test]
    fn rejects_garbage() {
        assert!(Quantity::parse("").is_none());
        assert!(Quantity::parse("lots").is_none());
        assert!(Quantity::parse("1GB").is_none());
        assert!(Quantity::parse("1.2.3").is_none());
        assert!(Quantity::parse("Gi").is_none());
    }
}
