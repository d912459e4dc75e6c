/// Errors produced by the consistency store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsistencyError {
    /// No committed value exists for the key.
    #[error("Key not found: {key}")]
    KeyNotFound {
        /// The key that was read.
        key: String,
    },
}

impl ConsistencyError {
    /// The message carried in a failed response envelope.
    pub(crate) fn envelope_message(&self) -> &'static str {
        match self {
            ConsistencyError::KeyNotFound { .. } => "Key not found",
        }
    }
}
