// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier types and their textual forms.
//!
//! Object and class identifiers are stable 64-bit values assigned by the
//! process that captured the snapshot. Query inputs accept either a `0x`
//! prefixed hexadecimal form or plain decimal; output is always rendered as
//! `0x`-prefixed lowercase hex so that every surface agrees on one spelling.
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Dense internal index of an object or class inside a [`HeapGraph`](crate::HeapGraph).
///
/// Slots are assigned in ascending identifier order when the store is built.
pub type Slot = u32;

/// Sentinel for "no slot" (unresolved edge target, absent superclass).
pub(crate) const NO_SLOT: Slot = Slot::MAX;

/// Stable identifier of a heap object.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct ObjectId(pub u64);

/// Stable identifier of a class.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct ClassId(pub u64);

/// Error returned when an identifier string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    /// The input was empty (after trimming whitespace).
    #[error("identifier is empty")]
    Empty,
    /// The input was not a valid hex (`0x…`) or decimal number.
    #[error("malformed identifier {0:?}")]
    Malformed(String),
}

/// Parses `0x`-prefixed hex or decimal text into a raw `u64`.
///
/// # Errors
///
/// Returns [`IdParseError::Empty`] for blank input and
/// [`IdParseError::Malformed`] when the digits do not parse.
pub fn parse_id_text(text: &str) -> Result<u64, IdParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(IdParseError::Empty);
    }
    let malformed = || IdParseError::Malformed(trimmed.to_owned());
    // Integer parsing would otherwise accept a leading `+`.
    match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(digits) if digits.bytes().all(|b| b.is_ascii_hexdigit()) => {
            u64::from_str_radix(digits, 16).map_err(|_| malformed())
        }
        None if trimmed.bytes().all(|b| b.is_ascii_digit()) => {
            trimmed.parse::<u64>().map_err(|_| malformed())
        }
        _ => Err(malformed()),
    }
}

macro_rules! id_text_impls {
    ($ty:ident) => {
        impl $ty {
            /// Returns the raw 64-bit value.
            #[must_use]
            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }

        impl FromStr for $ty {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_id_text(s).map(Self)
            }
        }

        impl From<u64> for $ty {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }
    };
}

id_text_impls!(ObjectId);
id_text_impls!(ClassId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_decimal() {
        assert_eq!("0x1f".parse::<ObjectId>().unwrap(), ObjectId(31));
        assert_eq!("0X1F".parse::<ObjectId>().unwrap(), ObjectId(31));
        assert_eq!("31".parse::<ObjectId>().unwrap(), ObjectId(31));
        assert_eq!("  42 ".parse::<ClassId>().unwrap(), ClassId(42));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!("".parse::<ObjectId>(), Err(IdParseError::Empty));
        assert!(matches!(
            "0xzz".parse::<ObjectId>(),
            Err(IdParseError::Malformed(_))
        ));
        assert!(matches!(
            "-5".parse::<ObjectId>(),
            Err(IdParseError::Malformed(_))
        ));
        assert!(matches!(
            "1f".parse::<ObjectId>(),
            Err(IdParseError::Malformed(_))
        ));
        assert!(matches!("0x".parse::<ObjectId>(), Err(IdParseError::Malformed(_))));
    }

    #[test]
    fn rejects_signs() {
        for text in ["+5", "0x+ff", "0X+1", "+0x10", "-0x1"] {
            assert_eq!(
                parse_id_text(text),
                Err(IdParseError::Malformed(text.to_owned())),
                "{text:?}"
            );
        }
        assert_eq!(parse_id_text("18446744073709551615"), Ok(u64::MAX));
        assert!(matches!(
            parse_id_text("18446744073709551616"),
            Err(IdParseError::Malformed(_))
        ));
    }

    #[test]
    fn renders_prefixed_hex() {
        assert_eq!(ObjectId(255).to_string(), "0xff");
        assert_eq!(ClassId(0).to_string(), "0x0");
        let json = serde_json::to_string(&ObjectId(4096)).unwrap();
        assert_eq!(json, "\"0x1000\"");
    }
}
