//! Remote table name type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// Maximum length of a table name (the Postgres identifier limit).
const MAX_LEN: usize = 63;

/// A validated name of a remote collection/table.
///
/// Table names are what the hosted backend routes writes by, so they are
/// restricted to lowercase identifiers that need no quoting in a URL path.
///
/// # Example
///
/// ```
/// use domsync_core::TableName;
///
/// let table = TableName::new("players").unwrap();
/// assert_eq!(table.as_str(), "players");
/// assert!(TableName::new("Players").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    /// Create a new table name from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, longer than 63 characters,
    /// or contains anything but lowercase ASCII letters, digits and `_`.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    /// Returns the table name string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), Error> {
        let invalid = |reason: &str| -> Error {
            InvalidInputError::TableName {
                value: s.to_string(),
                reason: reason.to_string(),
            }
            .into()
        };

        let first = s.chars().next().ok_or_else(|| invalid("cannot be empty"))?;

        if s.len() > MAX_LEN {
            return Err(invalid("exceeds 63 characters"));
        }

        if !(first.is_ascii_lowercase() || first == '_') {
            return Err(invalid("must start with a lowercase letter or underscore"));
        }

        if !s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(invalid(
                "may only contain lowercase letters, digits and underscores",
            ));
        }

        Ok(())
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TableName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TableName {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<TableName> for String {
    fn from(table: TableName) -> Self {
        table.0
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_table_names() {
        for name in ["players", "communities", "game_scores", "_internal", "t1"] {
            assert!(TableName::new(name).is_ok(), "{} should be valid", name);
        }
    }

    #[test]
    fn invalid_empty() {
        assert!(TableName::new("").is_err());
    }

    #[test]
    fn invalid_uppercase() {
        assert!(TableName::new("Players").is_err());
    }

    #[test]
    fn invalid_starts_with_digit() {
        assert!(TableName::new("1players").is_err());
    }

    #[test]
    fn invalid_path_characters() {
        assert!(TableName::new("players/../secrets").is_err());
        assert!(TableName::new("players?select=*").is_err());
    }

    #[test]
    fn invalid_too_long() {
        let name = "a".repeat(64);
        assert!(TableName::new(name).is_err());
        assert!(TableName::new("a".repeat(63)).is_ok());
    }

    #[test]
    fn deserialize_validates() {
        let ok: TableName = serde_json::from_str("\"matches\"").unwrap();
        assert_eq!(ok.as_str(), "matches");

        let bad: Result<TableName, _> = serde_json::from_str("\"Matches\"");
        assert!(bad.is_err());
    }
}
