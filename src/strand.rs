//! Strand orientation of annotated features.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Strand a feature is transcribed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Strand {
    #[default]
    #[serde(rename = "+", alias = "POSITIVE", alias = "plus")]
    Plus,
    #[serde(rename = "-", alias = "NEGATIVE", alias = "minus")]
    Minus,
}

impl Strand {
    /// Parse from GFF column 7. "-" is minus; everything else (including ".") is plus.
    #[must_use]
    pub fn from_gff(s: &str) -> Self {
        if s == "-" { Self::Minus } else { Self::Plus }
    }

    #[must_use]
    pub fn is_minus(self) -> bool {
        self == Self::Minus
    }

    /// The opposite strand.
    #[must_use]
    pub fn flip(self) -> Self {
        match self {
            Self::Plus => Self::Minus,
            Self::Minus => Self::Plus,
        }
    }
}

impl FromStr for Strand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" | "plus" | "POSITIVE" => Ok(Self::Plus),
            "-" | "minus" | "NEGATIVE" => Ok(Self::Minus),
            _ => Err(Error::Parse(format!("invalid strand: '{s}'"))),
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_gff() {
        assert_eq!(Strand::from_gff("+"), Strand::Plus);
        assert_eq!(Strand::from_gff("-"), Strand::Minus);
        assert_eq!(Strand::from_gff("."), Strand::Plus);
    }

    #[test]
    fn parse_names() {
        assert_eq!("NEGATIVE".parse::<Strand>().unwrap(), Strand::Minus);
        assert_eq!("plus".parse::<Strand>().unwrap(), Strand::Plus);
        assert!("?".parse::<Strand>().is_err());
    }

    #[test]
    fn flip_twice_is_identity() {
        for strand in [Strand::Plus, Strand::Minus] {
            assert_eq!(strand.flip().flip(), strand);
        }
        assert!(Strand::Plus.flip().is_minus());
    }

    #[test]
    fn serde_symbols() {
        let json = serde_json::to_string(&Strand::Minus).unwrap();
        assert_eq!(json, "\"-\"");
        let back: Strand = serde_json::from_str("\"NEGATIVE\"").unwrap();
        assert_eq!(back, Strand::Minus);
    }
}
