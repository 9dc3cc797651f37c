// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identifier newtypes for domains and keys.
//!
//! A stored value is addressed by a `(ConfigDomain, ConfigKey)` pair. Both are thin wrappers
//! around `String` so the two cannot be swapped by accident at call sites that take both.

use crate::domain::errors::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest identifier, in characters, the backing table accepts for a domain or key.
pub const MAX_IDENTIFIER_LEN: usize = 255;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from a `String`.
            pub fn new(value: String) -> Self {
                $name(value)
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Converts the identifier into its inner `String`.
            pub fn into_string(self) -> String {
                self.0
            }

            /// Checks that the identifier fits the backing table.
            pub fn validate(&self) -> Result<()> {
                let len = self.0.chars().count();
                if len > MAX_IDENTIFIER_LEN {
                    return Err(ConfigError::InvalidIdentifier {
                        kind: $kind,
                        value: self.0.clone(),
                        reason: format!(
                            "{} characters exceeds the maximum of {}",
                            len, MAX_IDENTIFIER_LEN
                        ),
                    });
                }
                Ok(())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl From<&$name> for $name {
            fn from(s: &$name) -> Self {
                s.clone()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

identifier!(
    /// A key, unique within its domain.
    ///
    /// # Examples
    ///
    /// ```
    /// use verscfg::domain::ConfigKey;
    ///
    /// let key = ConfigKey::from("database.pool");
    /// assert_eq!(key.as_str(), "database.pool");
    /// ```
    ConfigKey,
    "key"
);

identifier!(
    /// A namespace scoping a set of keys, comparable to a configuration section.
    ///
    /// # Examples
    ///
    /// ```
    /// use verscfg::domain::ConfigDomain;
    ///
    /// let domain = ConfigDomain::from("billing");
    /// assert_eq!(domain.to_string(), "billing");
    /// ```
    ConfigDomain,
    "domain"
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_key_from_str() {
        let key = ConfigKey::from("test.key");
        assert_eq!(key.as_str(), "test.key");
        assert_eq!(key.into_string(), "test.key");
    }

    #[test]
    fn test_config_domain_display() {
        let domain = ConfigDomain::from("billing".to_string());
        assert_eq!(format!("{}", domain), "billing");
    }

    #[test]
    fn test_identifier_debug() {
        let key = ConfigKey::from("k");
        assert_eq!(format!("{:?}", key), "ConfigKey(\"k\")");
        let domain = ConfigDomain::from("d");
        assert_eq!(format!("{:?}", domain), "ConfigDomain(\"d\")");
    }

    #[test]
    fn test_identifier_hash() {
        let mut map = HashMap::new();
        map.insert(ConfigDomain::from("a"), 1);
        assert_eq!(map.get(&ConfigDomain::from("a")), Some(&1));
        assert_eq!(map.get(&ConfigDomain::from("b")), None);
    }

    #[test]
    fn test_validate_accepts_empty_and_max_length() {
        assert!(ConfigKey::from("").validate().is_ok());
        let longest = "x".repeat(MAX_IDENTIFIER_LEN);
        assert!(ConfigKey::from(longest).validate().is_ok());
    }

    #[test]
    fn test_validate_counts_characters_not_bytes() {
        let wide = "é".repeat(MAX_IDENTIFIER_LEN);
        assert!(ConfigDomain::from(wide).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_too_long() {
        let too_long = "x".repeat(MAX_IDENTIFIER_LEN + 1);
        let err = ConfigDomain::from(too_long).validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidIdentifier { kind: "domain", .. }
        ));
    }

    #[test]
    fn test_string_round_trip() {
        let key = ConfigKey::from("app.debug");
        let s: String = key.clone().into();
        assert_eq!(ConfigKey::from(s), key);
    }
}
