//! Shared test support: a scripted partition double.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use durmon::{
    DocKey, Level, PartitionState, ReplicaPartition, SeqNo, SyncWrite, Timeout, Vbid,
};

pub struct FakePartition {
    vbid: Vbid,
    state: PartitionState,
    persistence: AtomicU64,
    acks: Mutex<Vec<SeqNo>>,
}

impl FakePartition {
    pub fn new(vbid: u16) -> Self {
        Self {
            vbid: Vbid::new(vbid),
            state: PartitionState::Replica,
            persistence: AtomicU64::new(0),
            acks: Mutex::new(Vec::new()),
        }
    }

    pub fn set_persistence_seqno(&self, seqno: u64) {
        self.persistence.store(seqno, Ordering::SeqCst);
    }

    pub fn acks(&self) -> Vec<SeqNo> {
        self.acks.lock().expect("acks lock poisoned").clone()
    }
}

impl ReplicaPartition for FakePartition {
    fn id(&self) -> Vbid {
        self.vbid
    }

    fn state(&self) -> PartitionState {
        self.state
    }

    fn persistence_seqno(&self) -> SeqNo {
        SeqNo::new(self.persistence.load(Ordering::SeqCst))
    }

    fn send_seqno_ack(&self, seqno: SeqNo) {
        self.acks.lock().expect("acks lock poisoned").push(seqno);
    }
}

pub fn prepare(key: &str, seqno: u64, level: Level) -> SyncWrite {
    SyncWrite::new(
        DocKey::from(key),
        SeqNo::new(seqno),
        level,
        Timeout::After { ms: 30_000 },
    )
}

pub fn assert_strictly_increasing(acks: &[SeqNo]) {
    for pair in acks.windows(2) {
        assert!(pair[0] < pair[1], "acks not strictly increasing: {acks:?}");
    }
}
