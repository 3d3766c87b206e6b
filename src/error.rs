//! Crate-level convenience error.
//!
//! Not a "god error": a thin wrapper over the capability errors of this
//! crate, for hosts that want a single error type at the boundary.

use thiserror::Error;

use crate::core::durability::LevelParseError;
use crate::core::seqno::MonotonicityViolation;
use crate::monitor::MonitorError;
use crate::monitor::tracked::TrackedWritesError;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error(transparent)]
    LevelParse(#[from] LevelParseError),

    #[error(transparent)]
    Monotonicity(#[from] MonotonicityViolation),

    #[error(transparent)]
    Tracked(#[from] TrackedWritesError),
}
