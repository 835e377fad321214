//! Channel identifiers
//!
//! Channel logins are case-insensitive. Every lookup goes through
//! [`ChannelId`], which trims surrounding whitespace and lower-cases the
//! login so that `"  ShrouD "` and `"shroud"` address the same cache rows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Normalized channel login (trimmed, lower-case, non-empty)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelId(String);

impl ChannelId {
    /// Normalize a raw login
    ///
    /// Returns `Error::InvalidInput` when nothing is left after trimming.
    pub fn new(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(Error::InvalidInput("channel login must not be empty".to_string()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ChannelId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ChannelId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<ChannelId> for String {
    fn from(value: ChannelId) -> Self {
        value.0
    }
}

impl AsRef<str> for ChannelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_case_and_whitespace() {
        let a = ChannelId::new("  ShrouD ").unwrap();
        let b = ChannelId::new("shroud").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "shroud");
    }

    #[test]
    fn test_rejects_blank() {
        assert!(ChannelId::new("").is_err());
        assert!(ChannelId::new("   \t").is_err());
    }

    #[test]
    fn test_serde_normalizes() {
        let id: ChannelId = serde_json::from_str("\" Gaules\"").unwrap();
        assert_eq!(id.as_str(), "gaules");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"gaules\"");
        assert!(serde_json::from_str::<ChannelId>("\"  \"").is_err());
    }
}
