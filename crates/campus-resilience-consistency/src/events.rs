use crate::ConsistencyLevel;
use campus_resilience_core::ResilienceEvent;
use std::time::Instant;

/// Events emitted by a consistency store.
#[derive(Debug, Clone)]
pub enum ConsistencyEvent {
    /// A write was accepted. Eventual writes become visible later.
    WriteAccepted {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        level: ConsistencyLevel,
        version: u64,
    },
    /// A read found no committed value.
    ReadMissed {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        level: ConsistencyLevel,
    },
    /// A propagating eventual write lost to a newer committed write.
    WriteSuperseded {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        version: u64,
    },
    /// A validation read did not match the expected value.
    ViolationDetected {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        level: ConsistencyLevel,
    },
}

impl ResilienceEvent for ConsistencyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ConsistencyEvent::WriteAccepted { .. } => "write_accepted",
            ConsistencyEvent::ReadMissed { .. } => "read_missed",
            ConsistencyEvent::WriteSuperseded { .. } => "write_superseded",
            ConsistencyEvent::ViolationDetected { .. } => "violation_detected",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ConsistencyEvent::WriteAccepted { timestamp, .. }
            | ConsistencyEvent::ReadMissed { timestamp, .. }
            | ConsistencyEvent::WriteSuperseded { timestamp, .. }
            | ConsistencyEvent::ViolationDetected { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            ConsistencyEvent::WriteAccepted { pattern_name, .. }
            | ConsistencyEvent::ReadMissed { pattern_name, .. }
            | ConsistencyEvent::WriteSuperseded { pattern_name, .. }
            | ConsistencyEvent::ViolationDetected { pattern_name, .. } => pattern_name,
        }
    }
}
