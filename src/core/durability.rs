//! Durability levels, timeouts, and completion resolutions.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Durability contract a prepare was issued under.
///
/// `None` exists on the wire but is never trackable: the monitor refuses it at
/// ingest. On the replica, `PersistToMajority` is the only level that fences
/// high-prepared-seqno advancement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    None,
    Majority,
    MajorityAndPersistOnMaster,
    PersistToMajority,
}

impl Level {
    pub fn parse(raw: &str) -> Result<Self, LevelParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LevelParseError::Empty);
        }
        match trimmed.to_lowercase().replace('-', "_").as_str() {
            "none" => Ok(Level::None),
            "majority" => Ok(Level::Majority),
            "majority_and_persist_on_master" => Ok(Level::MajorityAndPersistOnMaster),
            "persist_to_majority" => Ok(Level::PersistToMajority),
            _ => Err(LevelParseError::Unsupported {
                raw: trimmed.to_string(),
            }),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::None => write!(f, "none"),
            Level::Majority => write!(f, "majority"),
            Level::MajorityAndPersistOnMaster => write!(f, "majority_and_persist_on_master"),
            Level::PersistToMajority => write!(f, "persist_to_majority"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LevelParseError {
    #[error("durability level cannot be empty")]
    Empty,

    #[error("unsupported durability level: {raw}")]
    Unsupported { raw: String },
}

/// SyncWrite timeout as dictated by the active node.
///
/// The replica never expires prepares itself; the value is carried only so
/// the default marker (meaning "the active never chose a value") can be
/// refused at ingest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeout {
    Default,
    Infinite,
    After { ms: u64 },
}

impl Timeout {
    pub fn is_default(self) -> bool {
        matches!(self, Timeout::Default)
    }
}

/// The active's decision for the prepare next in completion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Commit,
    Abort,
    /// The active collapsed the prepare's outcome into a later mutation; the
    /// replica observes the replacement through the normal stream.
    CompletionWasDeduped,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Commit => write!(f, "commit"),
            Resolution::Abort => write!(f, "abort"),
            Resolution::CompletionWasDeduped => write!(f, "completionWasDeduped"),
        }
    }
}
