//! Core domain types for durability tracking.
//!
//! Module order follows type dependency:
//! - seqno: sequence-number primitives and the checked-monotonic wrapper
//! - durability: levels, timeouts, completion resolutions
//! - prepare: document keys and tracked prepare records
//! - rollback: the reconciliation input handed over by storage

pub mod durability;
pub mod prepare;
pub mod rollback;
pub mod seqno;

pub use durability::{Level, LevelParseError, Resolution, Timeout};
pub use prepare::{DocKey, SyncWrite};
pub use rollback::RollbackResult;
pub use seqno::{Monotonic, MonotonicityViolation, SeqNo};
