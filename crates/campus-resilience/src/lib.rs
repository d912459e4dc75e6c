//! Resilience layer for the campus social network backend.
//!
//! `campus-resilience` bundles three patterns, each also available as its
//! own crate:
//!
//! - **Circuit Breaker** (`circuitbreaker` feature): stops calling a failing
//!   dependency (email, media CDN, search) until it recovers, answering with
//!   fallback content meanwhile
//! - **Bulkhead** (`bulkhead` feature): per-service task queues that bound
//!   concurrency and queue depth, with admission-control middleware that
//!   answers "503 Service overloaded" instead of piling up work
//! - **Consistency** (`consistency` feature): a key/value facade where each
//!   read or write chooses strong or eventual consistency
//!
//! With `full`, [`Resilience`] ties them together as the one per-process
//! context handlers share.
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! campus-resilience = { version = "0.1", features = ["full", "tracing"] }
//! ```
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "full")]
//! # async fn example() {
//! use campus_resilience::Resilience;
//! use std::time::Duration;
//!
//! let resilience: Resilience<String> = Resilience::builder().build();
//!
//! resilience.breakers().get_breaker_with("email", |b| {
//!     b.failure_threshold(3).timeout(Duration::from_secs(5))
//! });
//!
//! let delivered = resilience
//!     .breakers()
//!     .execute("email", || async { Err::<bool, &str>("smtp down") }, || async { false })
//!     .await;
//! assert!(!delivered);
//!
//! let health = resilience.health();
//! assert_eq!(health.breakers["email"].failure_count, 1);
//! # }
//! ```

// Re-export core (always available)
pub use campus_resilience_core as core;
pub use campus_resilience_core::ResilienceError;

// Re-export patterns based on features
#[cfg(feature = "circuitbreaker")]
pub use campus_resilience_circuitbreaker as circuitbreaker;

#[cfg(feature = "bulkhead")]
pub use campus_resilience_bulkhead as bulkhead;

#[cfg(feature = "consistency")]
pub use campus_resilience_consistency as consistency;

#[cfg(all(feature = "circuitbreaker", feature = "bulkhead", feature = "consistency"))]
mod context;

#[cfg(all(feature = "circuitbreaker", feature = "bulkhead", feature = "consistency"))]
pub use context::{HealthReport, Resilience, ResilienceBuilder};
