//! Property-based tests for the campus resilience patterns.
//!
//! Run with: cargo test --test property_tests

pub mod consistency;
