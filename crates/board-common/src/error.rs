use thiserror::Error;

/// Failures raised while validating or generating order keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyGenError {
    /// No key fits between the bounds within the length limit. The column
    /// needs a rebalance before another key can be placed here.
    #[error("Order key space exhausted: no key fits within {max_len} symbols")]
    KeyExhausted { max_len: usize },

    #[error("Invalid bounds: left '{left}' must sort strictly before right '{right}'")]
    InvalidBounds { left: String, right: String },

    #[error("Invalid order key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },
}

impl KeyGenError {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::KeyExhausted { .. })
    }
}
