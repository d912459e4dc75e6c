//! Key/value facade with per-operation consistency levels.
//!
//! Data-access code reads and writes through [`ConsistencyStore`], choosing
//! per call whether it needs the latest value ([`ConsistencyLevel::Strong`])
//! or can tolerate a bounded staleness window ([`ConsistencyLevel::Eventual`]).
//! The store counts operations and validation failures so the health endpoint
//! can report a consistency rate.
//!
//! Replication is simulated: an eventual write is held back for the
//! configured propagation delay before any read can observe it.
//!
//! ```rust
//! use campus_resilience_consistency::{ConsistencyLevel, ConsistencyStore};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let store = ConsistencyStore::builder()
//!     .name("profiles")
//!     .propagation_delay(Duration::from_millis(50))
//!     .build();
//!
//! store.write_strong("user:7:email", "ada@campus.edu".to_string());
//! store.write_eventual("user:7:followers", "128".to_string());
//!
//! // The follower count may not be visible yet.
//! let followers = store.read_eventual("user:7:followers");
//! if !followers.success {
//!     store.settle().await;
//! }
//!
//! assert!(store.validate_consistency(
//!     "user:7:email",
//!     &"ada@campus.edu".to_string(),
//!     ConsistencyLevel::Strong,
//! ));
//! println!("{:?}", store.consistency_status());
//! # }
//! ```
//!
//! ## Feature Flags
//! - `metrics`: enables metrics collection using the `metrics` crate
//! - `tracing`: enables logging and tracing using the `tracing` crate
//! - `serde`: enables `Serialize` for envelopes and status snapshots

#[cfg(feature = "metrics")]
use metrics::describe_counter;
#[cfg(feature = "metrics")]
use std::sync::Once;

pub use config::{ConsistencyConfig, ConsistencyConfigBuilder};
pub use error::ConsistencyError;
pub use events::ConsistencyEvent;
pub use response::{ConsistencyLevel, ConsistencyResponse};
pub use stats::{consistency_rate, ConsistencyStatus};
pub use store::ConsistencyStore;

mod config;
mod error;
mod events;
mod response;
mod stats;
mod store;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

#[cfg(feature = "metrics")]
pub(crate) fn describe_metrics() {
    METRICS_INIT.call_once(|| {
        describe_counter!(
            "consistency_operations_total",
            "Total number of consistency store reads and writes by level"
        );
        describe_counter!(
            "consistency_violations_total",
            "Total number of failed consistency validations"
        );
    });
}
