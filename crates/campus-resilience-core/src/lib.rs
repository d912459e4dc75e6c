//! Core infrastructure for campus-resilience.
//!
//! This crate provides the pieces shared by every resilience pattern in the
//! workspace:
//! - Event system for observability (the error-reporting channel of the
//!   breaker, the task queues and the consistency store)
//! - [`ResilienceError`], a unified error type for layered services

pub mod error;
pub mod events;

pub use error::ResilienceError;
pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
