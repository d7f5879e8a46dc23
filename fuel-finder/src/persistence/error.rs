//! Persistence error types.

use super::StoreKey;

/// Errors from the key/value persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Storage cannot be reached or written (permissions, quota, missing disk)
    #[error("storage unavailable: {message}")]
    Unavailable { message: String },

    /// A stored value exists but does not decode
    #[error("corrupt entry under {key}: {message}")]
    Corrupt { key: StoreKey, message: String },

    /// A value could not be encoded for storage
    #[error("failed to serialize value for {key}: {message}")]
    Serialize { key: StoreKey, message: String },
}

impl PersistenceError {
    pub(crate) fn unavailable(context: &str, err: impl std::fmt::Display) -> Self {
        PersistenceError::Unavailable {
            message: format!("{context}: {err}"),
        }
    }

    /// Whether the backing storage itself is unusable, as opposed to a
    /// single bad value.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, PersistenceError::Unavailable { .. })
    }
}
