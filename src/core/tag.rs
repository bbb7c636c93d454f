//! Tag identifier - normalized hex UID of a physical token.
//!
//! Readers deliver UIDs in whatever shape their transport produces
//! (lowercase hex, trailing newline, padded with spaces). Everything past the
//! device layer works with [`TagUid`], which is always trimmed and uppercase.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Rejected UID input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagUidError {
    #[error("UID must not be empty")]
    Empty,
    #[error("UID \"{0}\" is not a hexadecimal string")]
    NotHex(String),
}

/// Normalized tag identifier (uppercase hex, no surrounding whitespace).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagUid(String);

impl TagUid {
    /// Normalize raw reader/user input into a UID.
    pub fn parse(raw: &str) -> Result<Self, TagUidError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TagUidError::Empty);
        }
        if !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TagUidError::NotHex(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TagUid {
    type Err = TagUidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TagUid {
    type Error = TagUidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TagUid> for String {
    fn from(uid: TagUid) -> Self {
        uid.0
    }
}

impl fmt::Display for TagUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
