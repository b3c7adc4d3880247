use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::alphabet;
use crate::error::KeyGenError;

/// Hard upper bound on key length. Generators may be configured lower.
pub const MAX_KEY_LENGTH: usize = 256;

/// A validated, immutable order key.
///
/// Keys compare lexicographically; because the alphabet is ASCII and already
/// sorted, the derived `Ord` on the inner string is the board order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderKey(String);

impl OrderKey {
    /// Validate `raw` as a key: non-empty, alphabet-only, at most
    /// [`MAX_KEY_LENGTH`] symbols.
    pub fn new(raw: impl Into<String>) -> Result<Self, KeyGenError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(KeyGenError::InvalidKey {
                key: raw,
                reason: "key is empty".to_string(),
            });
        }
        if raw.len() > MAX_KEY_LENGTH {
            return Err(KeyGenError::InvalidKey {
                reason: format!("key is longer than {} symbols", MAX_KEY_LENGTH),
                key: raw,
            });
        }
        if let Some(bad) = raw.chars().find(|c| !alphabet::contains(*c)) {
            return Err(KeyGenError::InvalidKey {
                reason: format!("symbol '{}' is not in the alphabet", bad),
                key: raw,
            });
        }
        Ok(Self(raw))
    }

    /// Build a key the generator has already shaped. Callers guarantee the
    /// alphabet and length invariants.
    pub(crate) fn from_generated(raw: String) -> Self {
        debug_assert!(!raw.is_empty() && raw.chars().all(alphabet::contains));
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OrderKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderKey {
    type Err = KeyGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for OrderKey {
    type Error = KeyGenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OrderKey> for String {
    fn from(key: OrderKey) -> Self {
        key.0
    }
}
