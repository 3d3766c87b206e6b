#![forbid(unsafe_code)]

//! Replica-side durability monitoring for a leader-follower replicated
//! key/value store.
//!
//! The active node streams prepares (SyncWrites) to replicas inside snapshot
//! windows. For every partition a [`monitor::PassiveDurabilityMonitor`] tracks
//! the in-flight prepares, decides when they become locally durable (the high
//! prepared seqno), applies the active's completion decisions in seqno order,
//! and reconciles in-memory tracking after a storage rollback.

pub mod core;
pub mod error;
pub mod monitor;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

// Re-export the domain surface at the crate root for convenience.
pub use crate::core::{
    DocKey, Level, LevelParseError, Monotonic, MonotonicityViolation, Resolution, RollbackResult,
    SeqNo, SyncWrite, Timeout,
};
pub use crate::monitor::{
    MonitorError, PartitionState, PassiveDurabilityMonitor, ReplicaPartition, Vbid,
};
