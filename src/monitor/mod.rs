//! Passive durability monitor: the replica-side SyncWrite state machine.
//!
//! One monitor per replicated partition. The replication decoder feeds it
//! prepares, snapshot boundaries and completion decisions; the flusher
//! notifies it when local persistence advances; whenever the high prepared
//! seqno strictly increases the monitor acknowledges the new value to the
//! active node through the owning partition.

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use crate::core::{
    DocKey, MonotonicityViolation, Resolution, RollbackResult, SeqNo, SyncWrite,
};

pub mod partition;
mod position;
mod state;
pub mod tracked;

pub use partition::{PartitionState, ReplicaPartition, Vbid};
pub use tracked::{Cursor, TrackedWrites, TrackedWritesError};

use state::{HpsAdvance, State};

/// Errors surfaced by the monitor, in three policy classes.
///
/// Refused inputs (`LevelIsNone`, `DefaultTimeout`) leave the monitor
/// untouched and are reported by [`MonitorError::is_invalid_input`].
/// Broken expectations on trusted collaborators (`WarmupMissingTimeout`,
/// `RollbackOutOfOrder`) are programmer errors, reported by
/// [`MonitorError::is_expectation_violation`]. Every other kind signals a
/// broken replication stream or state machine; the host is expected to treat
/// both of the latter classes as fatal for the partition.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MonitorError {
    #[error("cannot track prepare for {key}: durability level is none")]
    LevelIsNone { key: DocKey },

    #[error(
        "cannot track prepare for {key}: timeout is default (the active must supply an explicit value)"
    )]
    DefaultTimeout { key: DocKey },

    #[error(
        "warmup prepare for {key} is missing an explicit timeout (the active supplied one when it was streamed)"
    )]
    WarmupMissingTimeout { key: DocKey },

    #[error("nothing tracked, but received {resolution} for key {key}")]
    NothingTracked { key: DocKey, resolution: Resolution },

    #[error("no prepare awaiting completion, but received {resolution} for key {key}")]
    NoPrepareAwaitingCompletion { key: DocKey, resolution: Resolution },

    #[error("pending resolution for `{expected}`, but received unexpected {resolution} for key {key}")]
    CompletionOutOfOrder {
        expected: Box<SyncWrite>,
        key: DocKey,
        resolution: Resolution,
    },

    #[error("durability level none encountered in tracked writes at seqno {seqno}")]
    TrackedLevelIsNone { seqno: SeqNo },

    #[error(
        "rollback result out of order: high completed {high_completed}, high prepared {high_prepared}, high seqno {high_seqno}"
    )]
    RollbackOutOfOrder {
        high_completed: SeqNo,
        high_prepared: SeqNo,
        high_seqno: SeqNo,
    },

    #[error(transparent)]
    Monotonicity(#[from] MonotonicityViolation),

    #[error(transparent)]
    Tracked(#[from] TrackedWritesError),
}

impl MonitorError {
    /// Whether the error is a refused input rather than a state-machine
    /// violation. Refused inputs never change monitor state.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            MonitorError::LevelIsNone { .. } | MonitorError::DefaultTimeout { .. }
        )
    }

    /// Whether the error is a broken expectation on a trusted collaborator
    /// (warmup handing over a prepare without its timeout, the rollback
    /// engine handing over misordered watermarks): a programmer error the
    /// host should treat as fatal, never as a refusable caller input.
    pub fn is_expectation_violation(&self) -> bool {
        matches!(
            self,
            MonitorError::WarmupMissingTimeout { .. } | MonitorError::RollbackOutOfOrder { .. }
        )
    }
}

/// Result type for the fallible stat emission callback.
pub type StatResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Replica-side durability monitor for a single partition.
///
/// All operations are thread-safe: state lives behind one readers-writer
/// lock, and seqno acknowledgements are emitted after the lock is released so
/// the partition's own locking can never deadlock against the monitor.
pub struct PassiveDurabilityMonitor {
    partition: Arc<dyn ReplicaPartition>,
    state: RwLock<State>,
}

impl PassiveDurabilityMonitor {
    pub fn new(partition: Arc<dyn ReplicaPartition>) -> Self {
        Self {
            partition,
            state: RwLock::new(State::new()),
        }
    }

    /// Warmup path: prepares read back from storage are tracked as-is.
    ///
    /// Each prepare must already carry the explicit timeout the active
    /// supplied when it was first streamed.
    pub fn with_outstanding_prepares(
        partition: Arc<dyn ReplicaPartition>,
        outstanding: Vec<SyncWrite>,
    ) -> Result<Self, MonitorError> {
        let monitor = Self::new(partition);
        {
            let mut state = monitor.write_state();
            for write in outstanding {
                state.track_outstanding(write)?;
            }
        }
        Ok(monitor)
    }

    /// Tracks a prepare streamed by the active node.
    ///
    /// The high prepared seqno is not moved here: prepares become locally
    /// satisfiable only on snapshot-end or persistence events.
    pub fn add_sync_write(&self, write: SyncWrite) -> Result<(), MonitorError> {
        self.write_state().add_sync_write(write)
    }

    /// Applies the active's decision to the prepare next in completion order.
    pub fn complete_sync_write(
        &self,
        key: &DocKey,
        resolution: Resolution,
    ) -> Result<(), MonitorError> {
        self.write_state().complete_sync_write(key, resolution)
    }

    /// Records a snapshot boundary and acks the high prepared seqno if the
    /// now-complete snapshot unblocked any prepares.
    pub fn notify_snapshot_end_received(&self, snapshot_end: SeqNo) -> Result<(), MonitorError> {
        let advance = {
            let mut state = self.write_state();
            state.note_snapshot_end(snapshot_end);
            state.update_high_prepared_seqno(self.partition.persistence_seqno())?
        };
        self.ack_if_advanced(advance);
        Ok(())
    }

    /// Reacts to the flusher having advanced the persistence seqno, which may
    /// dissolve a durability fence.
    pub fn notify_local_persistence(&self) -> Result<(), MonitorError> {
        let advance = {
            let mut state = self.write_state();
            state.update_high_prepared_seqno(self.partition.persistence_seqno())?
        };
        self.ack_if_advanced(advance);
        Ok(())
    }

    /// Reconciles in-memory tracking with the result of a storage rollback.
    pub fn post_process_rollback(&self, rollback: RollbackResult) -> Result<(), MonitorError> {
        tracing::debug!(
            vb = %self.partition.id(),
            high_completed = %rollback.high_completed_seqno,
            high_prepared = %rollback.high_prepared_seqno,
            high_seqno = %rollback.high_seqno,
            reinstating = rollback.prepares_to_add.len(),
            "reconciling rollback"
        );
        self.write_state().post_process_rollback(rollback)
    }

    pub fn high_prepared_seqno(&self) -> SeqNo {
        self.read_state().high_prepared()
    }

    pub fn high_completed_seqno(&self) -> SeqNo {
        self.read_state().high_completed()
    }

    pub fn num_tracked(&self) -> usize {
        self.read_state().num_tracked()
    }

    pub fn num_accepted(&self) -> u64 {
        self.read_state().total_accepted()
    }

    pub fn num_committed(&self) -> u64 {
        self.read_state().total_committed()
    }

    pub fn num_aborted(&self) -> u64 {
        self.read_state().total_aborted()
    }

    /// Emits the monitor's stats through `add_stat`.
    ///
    /// Emission failures are logged and swallowed; observability never takes
    /// the monitor down.
    pub fn add_stats(&self, add_stat: &mut dyn FnMut(&str, &str) -> StatResult) {
        let vbid = self.partition.id();
        let partition_state = self.partition.state();
        let (high_prepared, high_completed) = {
            let state = self.read_state();
            (state.high_prepared(), state.high_completed())
        };

        let result = add_stat(&format!("vb_{vbid}:state"), &partition_state.to_string())
            .and_then(|()| {
                add_stat(
                    &format!("vb_{vbid}:high_prepared_seqno"),
                    &high_prepared.to_string(),
                )
            })
            .and_then(|()| {
                add_stat(
                    &format!("vb_{vbid}:high_completed_seqno"),
                    &high_completed.to_string(),
                )
            });
        if let Err(error) = result {
            tracing::warn!(vb = %vbid, %error, "error building durability stats");
        }
    }

    fn ack_if_advanced(&self, advance: HpsAdvance) {
        // The ack goes out after the state lock is released; values emitted
        // from one monitor are strictly increasing because every advance is.
        if advance.advanced() {
            tracing::debug!(
                vb = %self.partition.id(),
                seqno = %advance.new,
                "acking high prepared seqno"
            );
            self.partition.send_seqno_ack(advance.new);
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().expect("monitor state lock poisoned")
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().expect("monitor state lock poisoned")
    }
}

impl fmt::Debug for PassiveDurabilityMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassiveDurabilityMonitor")
            .field("vb", &self.partition.id())
            .field("high_prepared_seqno", &self.high_prepared_seqno())
            .field("high_completed_seqno", &self.high_completed_seqno())
            .field("num_tracked", &self.num_tracked())
            .finish()
    }
}

impl fmt::Display for PassiveDurabilityMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PassiveDurabilityMonitor[vb:{}] high_prepared_seqno:{}",
            self.partition.id(),
            self.high_prepared_seqno()
        )
    }
}
