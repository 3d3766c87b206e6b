//! Sequence-number primitives.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Position in a partition's mutation sequence. Zero means "nothing yet".
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeqNo(u64);

impl SeqNo {
    pub const ZERO: SeqNo = SeqNo(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for SeqNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeqNo({})", self.0)
    }
}

impl fmt::Display for SeqNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SeqNo> for u64 {
    fn from(value: SeqNo) -> u64 {
        value.0
    }
}

/// A write below the current value was refused; the value is untouched.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("non-monotonic seqno write: current {current}, attempted {attempted}")]
pub struct MonotonicityViolation {
    pub current: SeqNo,
    pub attempted: SeqNo,
}

/// Weakly-monotonic seqno: assignments below the current value are refused.
///
/// `reset` is the single unchecked escape hatch, reserved for rollback, which
/// is allowed to move the value backwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Monotonic(SeqNo);

impl Monotonic {
    pub fn get(self) -> SeqNo {
        self.0
    }

    pub fn try_set(&mut self, value: SeqNo) -> Result<(), MonotonicityViolation> {
        if value < self.0 {
            return Err(MonotonicityViolation {
                current: self.0,
                attempted: value,
            });
        }
        self.0 = value;
        Ok(())
    }

    pub fn reset(&mut self, value: SeqNo) {
        self.0 = value;
    }
}
