use crate::error::ConsistencyError;
use std::fmt;
use std::time::SystemTime;

/// Consistency level of a single read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ConsistencyLevel {
    /// Reads always reflect the most recent committed write.
    Strong,
    /// Reads may be stale for the propagation window after a write.
    Eventual,
}

impl ConsistencyLevel {
    /// Lowercase name, as used in metric labels and envelopes.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsistencyLevel::Strong => "strong",
            ConsistencyLevel::Eventual => "eventual",
        }
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope returned by every store operation.
///
/// Reads that miss come back with `success: false` and an `error` message
/// rather than as a Rust error, so callers must check `success` (or use
/// [`into_result`](Self::into_result)).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConsistencyResponse<V> {
    /// Whether the operation completed.
    pub success: bool,
    /// Key the operation addressed.
    pub key: String,
    /// Value read or written, if any.
    pub value: Option<V>,
    /// Level the operation ran at.
    pub consistency: ConsistencyLevel,
    /// Wall-clock time the response was built.
    pub timestamp: SystemTime,
    /// Failure message when `success` is false.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub error: Option<String>,
}

impl<V> ConsistencyResponse<V> {
    pub(crate) fn ok(key: &str, value: V, consistency: ConsistencyLevel) -> Self {
        Self {
            success: true,
            key: key.to_string(),
            value: Some(value),
            consistency,
            timestamp: SystemTime::now(),
            error: None,
        }
    }

    pub(crate) fn failed(key: &str, consistency: ConsistencyLevel, error: &ConsistencyError) -> Self {
        Self {
            success: false,
            key: key.to_string(),
            value: None,
            consistency,
            timestamp: SystemTime::now(),
            error: Some(error.envelope_message().to_string()),
        }
    }

    /// Converts the envelope into a `Result`.
    ///
    /// ```rust
    /// use campus_resilience_consistency::{ConsistencyError, ConsistencyStore};
    ///
    /// let store: ConsistencyStore<u32> = ConsistencyStore::default();
    /// let err = store.read_strong("likes:42").into_result().unwrap_err();
    /// assert!(matches!(err, ConsistencyError::KeyNotFound { .. }));
    /// ```
    pub fn into_result(self) -> Result<V, ConsistencyError> {
        match self.value {
            Some(value) if self.success => Ok(value),
            _ => Err(ConsistencyError::KeyNotFound { key: self.key }),
        }
    }
}
