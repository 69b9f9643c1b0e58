//! Semantic newtypes for domain identifiers
//!
//! # Parse-at-Boundaries Pattern
//!
//! Each identifier type:
//! - Validates its input on construction (parse-once pattern)
//! - Trims whitespace before validation (boundary sanitization)
//! - Cannot represent invalid states
//! - Implements serde serialization/deserialization with validation
//!
//! Hive and inspection ids are owned by external systems, so their rules are
//! deliberately loose: anything printable without whitespace is accepted.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for identifier validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// Identifier is empty or contains only whitespace
    #[error("{kind} cannot be empty")]
    Empty {
        /// Which identifier failed
        kind: &'static str,
    },

    /// Identifier exceeds maximum length
    #[error("{kind} too long: {actual} characters (max {max})")]
    TooLong {
        kind: &'static str,
        max: usize,
        actual: usize,
    },

    /// Identifier contains whitespace or control characters
    #[error("{kind} contains invalid characters: {value:?}")]
    InvalidCharacters { kind: &'static str, value: String },
}

fn validate(kind: &'static str, max: usize, raw: &str) -> Result<String, IdentifierError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(IdentifierError::Empty { kind });
    }

    let actual = trimmed.chars().count();
    if actual > max {
        return Err(IdentifierError::TooLong { kind, max, actual });
    }

    if trimmed
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || c == '/')
    {
        return Err(IdentifierError::InvalidCharacters {
            kind,
            value: trimmed.to_string(),
        });
    }

    Ok(trimmed.to_string())
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal, $max:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Maximum accepted length in characters.
            pub const MAX_LEN: usize = $max;

            /// Parse and validate an identifier.
            ///
            /// # Errors
            ///
            /// Returns `IdentifierError` if the value is empty, too long or
            /// contains whitespace, control characters or `/`.
            pub fn parse(s: impl AsRef<str>) -> Result<Self, IdentifierError> {
                validate($kind, Self::MAX_LEN, s.as_ref()).map(Self)
            }

            /// Get the identifier as a string slice
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdentifierError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::parse(s)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = IdentifierError;

            fn try_from(s: &str) -> Result<Self, Self::Error> {
                Self::parse(s)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdentifierError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

identifier!(
    /// Identifier of a batch inspection session.
    BatchId,
    "batch id",
    64
);

identifier!(
    /// Reference to a hive owned by the hive directory.
    HiveId,
    "hive id",
    64
);

identifier!(
    /// Opaque id returned by the inspection service.
    InspectionId,
    "inspection id",
    128
);

impl BatchId {
    /// Generate a fresh random batch id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl InspectionId {
    /// Generate a fresh random inspection id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hive_id_trims_whitespace() {
        let id = HiveId::parse("  hive-7 ").expect("valid hive id");
        assert_eq!(id.as_str(), "hive-7");
    }

    #[test]
    fn test_empty_identifier_rejected() {
        assert_eq!(
            HiveId::parse("   "),
            Err(IdentifierError::Empty { kind: "hive id" })
        );
    }

    #[test]
    fn test_identifier_with_inner_space_rejected() {
        assert!(matches!(
            BatchId::parse("spring round"),
            Err(IdentifierError::InvalidCharacters { .. })
        ));
    }

    #[test]
    fn test_identifier_with_slash_rejected() {
        assert!(HiveId::parse("yard/1").is_err());
    }

    #[test]
    fn test_identifier_too_long() {
        let long = "h".repeat(HiveId::MAX_LEN + 1);
        assert!(matches!(
            HiveId::parse(&long),
            Err(IdentifierError::TooLong { max: 64, .. })
        ));
    }

    #[test]
    fn test_generated_batch_id_parses_back() {
        let id = BatchId::generate();
        assert_eq!(BatchId::parse(id.as_str()), Ok(id));
    }

    #[test]
    fn test_serde_rejects_invalid_identifier() {
        let result: Result<HiveId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());

        let id: HiveId = serde_json::from_str("\"H1\"").expect("valid json id");
        assert_eq!(id.as_str(), "H1");
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "\"H1\"");
    }
}
