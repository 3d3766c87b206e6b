//! Interface to the owning replicated partition (vBucket).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::SeqNo;

/// Replicated-partition identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vbid(u16);

impl Vbid {
    pub fn new(id: u16) -> Self {
        Self(id)
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for Vbid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vbid({})", self.0)
    }
}

impl fmt::Display for Vbid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of the owning partition, as reported in stats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartitionState {
    Active,
    Replica,
    Pending,
    Dead,
}

impl fmt::Display for PartitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionState::Active => write!(f, "active"),
            PartitionState::Replica => write!(f, "replica"),
            PartitionState::Pending => write!(f, "pending"),
            PartitionState::Dead => write!(f, "dead"),
        }
    }
}

/// The owning partition as seen by the monitor.
///
/// Implementations expose the persistence seqno maintained by the flusher and
/// forward seqno acknowledgements upstream to the active node.
pub trait ReplicaPartition: Send + Sync {
    fn id(&self) -> Vbid;

    fn state(&self) -> PartitionState;

    /// Highest seqno the flusher has made durable locally. Monotonic.
    fn persistence_seqno(&self) -> SeqNo;

    /// Fire-and-forget acknowledgement towards the active node.
    fn send_seqno_ack(&self, seqno: SeqNo);
}
