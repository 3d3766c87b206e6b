//! Monitor state: tracked prepares and watermark advancement.

use crate::core::{DocKey, Level, Resolution, RollbackResult, SeqNo, SyncWrite};

use super::MonitorError;
use super::position::Position;
use super::tracked::{Cursor, TrackedWrites};

/// Outcome of a high-prepared-seqno advancement pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct HpsAdvance {
    pub prev: SeqNo,
    pub new: SeqNo,
}

impl HpsAdvance {
    pub fn advanced(self) -> bool {
        self.new > self.prev
    }
}

#[derive(Debug, Default)]
pub(crate) struct State {
    tracked_writes: TrackedWrites,
    high_prepared_seqno: Position,
    high_completed_seqno: Position,
    /// Largest snapshot boundary the active has declared complete.
    snapshot_end: SeqNo,
    total_accepted: u64,
    total_committed: u64,
    total_aborted: u64,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn high_prepared(&self) -> SeqNo {
        self.high_prepared_seqno.seqno()
    }

    pub fn high_completed(&self) -> SeqNo {
        self.high_completed_seqno.seqno()
    }

    pub fn num_tracked(&self) -> usize {
        self.tracked_writes.len()
    }

    pub fn total_accepted(&self) -> u64 {
        self.total_accepted
    }

    pub fn total_committed(&self) -> u64 {
        self.total_committed
    }

    pub fn total_aborted(&self) -> u64 {
        self.total_aborted
    }

    /// Tracks a freshly streamed prepare.
    ///
    /// The high prepared seqno does not move here: prepares become locally
    /// satisfiable only on snapshot-end or persistence events.
    pub fn add_sync_write(&mut self, write: SyncWrite) -> Result<(), MonitorError> {
        if write.level() == Level::None {
            return Err(MonitorError::LevelIsNone {
                key: write.key().clone(),
            });
        }
        if write.timeout().is_default() {
            return Err(MonitorError::DefaultTimeout {
                key: write.key().clone(),
            });
        }
        self.tracked_writes.push_back(write)?;
        self.total_accepted += 1;
        Ok(())
    }

    /// Tracks a prepare recovered from storage (warmup or rollback paths).
    /// Recovered prepares do not count towards `total_accepted`.
    ///
    /// A recovered prepare without an explicit timeout was mishandled before
    /// it ever reached the monitor, so this surfaces as an expectation
    /// violation rather than the refusable input error of `add_sync_write`.
    pub fn track_outstanding(&mut self, write: SyncWrite) -> Result<(), MonitorError> {
        if write.timeout().is_default() {
            return Err(MonitorError::WarmupMissingTimeout {
                key: write.key().clone(),
            });
        }
        self.tracked_writes.push_back(write)?;
        Ok(())
    }

    /// A non-increasing boundary is a no-op.
    pub fn note_snapshot_end(&mut self, snapshot_end: SeqNo) {
        if snapshot_end > self.snapshot_end {
            self.snapshot_end = snapshot_end;
        }
    }

    /// Moves the high prepared seqno as far as snapshot and persistence state
    /// allow, and returns the `(prev, new)` pair for the ack decision.
    ///
    /// The HPS moves under these constraints:
    /// - nothing is satisfied before its complete snapshot is received;
    /// - `Majority` and `MajorityAndPersistOnMaster` prepares are satisfied as
    ///   soon as their snapshot is complete;
    /// - the first unpersisted `PersistToMajority` prepare is a durability
    ///   fence, which dissolves only once the whole enclosing snapshot is
    ///   persisted.
    pub fn update_high_prepared_seqno(
        &mut self,
        persisted: SeqNo,
    ) -> Result<HpsAdvance, MonitorError> {
        let prev = self.high_prepared_seqno.seqno();
        if self.tracked_writes.is_empty() {
            return Ok(HpsAdvance { prev, new: prev });
        }

        // Phase 1: persistence of the complete snapshot satisfies every
        // prepare in it, whatever its level, so the fence moves with it.
        if persisted >= self.snapshot_end {
            loop {
                let next = self.tracked_writes.next(self.high_prepared_seqno.cursor())?;
                let Some(write) = self.tracked_writes.get(next) else {
                    break;
                };
                if write.seqno() > self.snapshot_end {
                    break;
                }
                let seqno = write.seqno();
                self.high_prepared_seqno.advance_to(seqno, next)?;
            }
        }

        // Phase 2: within the latest complete snapshot received, advance over
        // the levels that need no local persistence, up to the next fence.
        loop {
            let next = self.tracked_writes.next(self.high_prepared_seqno.cursor())?;
            let Some(write) = self.tracked_writes.get(next) else {
                break;
            };
            if write.seqno() > self.snapshot_end {
                break;
            }
            match write.level() {
                Level::None => {
                    return Err(MonitorError::TrackedLevelIsNone {
                        seqno: write.seqno(),
                    });
                }
                Level::PersistToMajority => break,
                Level::Majority | Level::MajorityAndPersistOnMaster => {}
            }
            let seqno = write.seqno();
            self.high_prepared_seqno.advance_to(seqno, next)?;
        }

        let new = self.high_prepared_seqno.seqno();
        if new > prev {
            self.check_for_and_remove_prepares()?;
        }
        Ok(HpsAdvance { prev, new })
    }

    /// Applies the active's decision to the prepare next in completion order.
    ///
    /// The active resolves prepares in the exact seqno order it streamed
    /// them; the replica never searches the container by key.
    pub fn complete_sync_write(
        &mut self,
        key: &DocKey,
        resolution: Resolution,
    ) -> Result<(), MonitorError> {
        if self.tracked_writes.is_empty() {
            return Err(MonitorError::NothingTracked {
                key: key.clone(),
                resolution,
            });
        }

        let next = self.tracked_writes.next(self.high_completed_seqno.cursor())?;
        let Some(write) = self.tracked_writes.get(next) else {
            return Err(MonitorError::NoPrepareAwaitingCompletion {
                key: key.clone(),
                resolution,
            });
        };

        if write.key() != key {
            return Err(MonitorError::CompletionOutOfOrder {
                expected: Box::new(write.clone()),
                key: key.clone(),
                resolution,
            });
        }

        // Seqno before cursor: a refused monotonicity check leaves the state
        // untouched.
        let seqno = write.seqno();
        self.high_completed_seqno.advance_to(seqno, next)?;

        self.check_for_and_remove_prepares()?;

        match resolution {
            Resolution::Commit => self.total_committed += 1,
            Resolution::Abort => self.total_aborted += 1,
            // The replica counts the collapsed replacement when it arrives
            // through the normal stream.
            Resolution::CompletionWasDeduped => {}
        }
        Ok(())
    }

    /// Removes every prepare both watermarks have passed.
    pub fn check_for_and_remove_prepares(&mut self) -> Result<(), MonitorError> {
        if self.tracked_writes.is_empty() {
            return Ok(());
        }
        let fence = self
            .high_completed_seqno
            .seqno()
            .min(self.high_prepared_seqno.seqno());

        let mut cursor = self.tracked_writes.front_cursor();
        loop {
            let Some(write) = self.tracked_writes.get(cursor) else {
                break;
            };
            if write.seqno() > fence {
                break;
            }
            // Park any watermark cursor addressing this entry at the end
            // sentinel; the cyclic successor rule resumes it from the new
            // front.
            if cursor == self.high_completed_seqno.cursor() {
                self.high_completed_seqno.set_cursor(Cursor::END);
            }
            if cursor == self.high_prepared_seqno.cursor() {
                self.high_prepared_seqno.set_cursor(Cursor::END);
            }
            cursor = self.tracked_writes.erase(cursor)?;
        }
        Ok(())
    }

    /// Reconciles in-memory tracking with what survived a storage rollback.
    pub fn post_process_rollback(&mut self, rollback: RollbackResult) -> Result<(), MonitorError> {
        if rollback.high_completed_seqno > rollback.high_prepared_seqno
            || rollback.high_prepared_seqno > rollback.high_seqno
        {
            return Err(MonitorError::RollbackOutOfOrder {
                high_completed: rollback.high_completed_seqno,
                high_prepared: rollback.high_prepared_seqno,
                high_seqno: rollback.high_seqno,
            });
        }

        // Prepares whose completions were rolled back are reinstated at the
        // front, iterating in reverse so each prefix carries the smallest
        // seqno yet seen. Storage supplies only prepares the monitor is
        // missing; anything at or beyond the current front is already
        // tracked and is skipped.
        for write in rollback.prepares_to_add.into_iter().rev() {
            if write.seqno() <= rollback.high_completed_seqno {
                continue;
            }
            if let Some(front) = self.tracked_writes.front()
                && write.seqno() >= front.seqno()
            {
                continue;
            }
            self.tracked_writes.push_front(write)?;
        }

        // Drop everything past the rollback point.
        while self
            .tracked_writes
            .back()
            .is_some_and(|write| write.seqno() > rollback.high_seqno)
        {
            self.tracked_writes.pop_back();
        }

        // No tracked prepare is completed after a rollback.
        self.high_completed_seqno
            .reset(rollback.high_completed_seqno, Cursor::END);

        // Every surviving prepare was re-read from disk, hence locally
        // satisfied: the high prepared seqno sits on the last tracked entry.
        let back = self.tracked_writes.back_cursor();
        self.high_prepared_seqno
            .reset(rollback.high_prepared_seqno, back);
        Ok(())
    }

    #[cfg(test)]
    fn tracked_seqnos(&self) -> Vec<u64> {
        self.tracked_writes.iter().map(|w| w.seqno().get()).collect()
    }
}
