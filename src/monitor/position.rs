//! Seqno/cursor watermarks over the tracked-writes container.

use crate::core::{Monotonic, MonotonicityViolation, SeqNo};

use super::tracked::Cursor;

/// A watermark into the tracked-writes container.
///
/// The seqno is written before the cursor, so a refused (non-monotonic) write
/// leaves the whole position untouched and an observer never sees a cursor
/// ahead of its seqno.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Position {
    last_write_seqno: Monotonic,
    cursor: Cursor,
}

impl Position {
    pub fn seqno(&self) -> SeqNo {
        self.last_write_seqno.get()
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn advance_to(&mut self, seqno: SeqNo, cursor: Cursor) -> Result<(), MonotonicityViolation> {
        self.last_write_seqno.try_set(seqno)?;
        self.cursor = cursor;
        Ok(())
    }

    /// Parks or repoints the cursor without touching the seqno; used when the
    /// addressed entry is about to be removed.
    pub fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    /// Rollback-only: the seqno may go backwards here.
    pub fn reset(&mut self, seqno: SeqNo, cursor: Cursor) {
        self.last_write_seqno.reset(seqno);
        self.cursor = cursor;
    }
}
