//! Document keys and tracked prepare records.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::durability::{Level, Timeout};
use super::seqno::SeqNo;

/// Opaque document key, compared by value.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocKey(Bytes);

impl DocKey {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for DocKey {
    fn from(value: &str) -> Self {
        Self(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl fmt::Debug for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocKey({})", self)
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// A mutation tentatively applied at the replica, awaiting the active's
/// commit or abort decision. Immutable once tracked.
///
/// On the passive side the record carries no client cookie, no chain topology
/// and no ack bitmap; the replica only needs the key for in-order completion
/// checks and the seqno/level pair for watermark advancement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncWrite {
    key: DocKey,
    seqno: SeqNo,
    level: Level,
    timeout: Timeout,
    deleted: bool,
}

impl SyncWrite {
    pub fn new(key: DocKey, seqno: SeqNo, level: Level, timeout: Timeout) -> Self {
        Self {
            key,
            seqno,
            level,
            timeout,
            deleted: false,
        }
    }

    /// A prepared deletion; tracked identically to a prepared mutation.
    pub fn deletion(key: DocKey, seqno: SeqNo, level: Level, timeout: Timeout) -> Self {
        Self {
            deleted: true,
            ..Self::new(key, seqno, level, timeout)
        }
    }

    pub fn key(&self) -> &DocKey {
        &self.key
    }

    pub fn seqno(&self) -> SeqNo {
        self.seqno
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn timeout(&self) -> Timeout {
        self.timeout
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl fmt::Display for SyncWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "prepare{{key:{} seqno:{} level:{} deleted:{}}}",
            self.key, self.seqno, self.level, self.deleted
        )
    }
}
