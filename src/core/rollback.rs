//! Storage rollback reconciliation input.

use serde::{Deserialize, Serialize};

use super::prepare::SyncWrite;
use super::seqno::SeqNo;

/// Outcome of a storage-layer rollback, handed to the monitor so in-memory
/// tracking can be rebuilt from what survived on disk.
///
/// `prepares_to_add` holds the prepares whose completions were rolled back,
/// in increasing seqno order; storage supplies only prepares the monitor is
/// missing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackResult {
    pub high_completed_seqno: SeqNo,
    pub high_prepared_seqno: SeqNo,
    pub high_seqno: SeqNo,
    pub prepares_to_add: Vec<SyncWrite>,
}
