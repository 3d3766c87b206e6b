//! End-to-end monitor scenarios driven through the public API.

mod common;

use std::sync::Arc;

use durmon::{
    DocKey, Level, MonitorError, PassiveDurabilityMonitor, Resolution, RollbackResult, SeqNo,
    Timeout,
};

use common::{FakePartition, assert_strictly_increasing, prepare};

fn monitor() -> (Arc<FakePartition>, PassiveDurabilityMonitor) {
    let partition = Arc::new(FakePartition::new(7));
    let monitor = PassiveDurabilityMonitor::new(partition.clone());
    (partition, monitor)
}

#[test]
fn majority_prepares_ack_at_the_snapshot_end() {
    let (partition, monitor) = monitor();
    monitor.add_sync_write(prepare("a", 1, Level::Majority)).unwrap();
    monitor.add_sync_write(prepare("b", 2, Level::Majority)).unwrap();
    assert!(partition.acks().is_empty());

    monitor.notify_snapshot_end_received(SeqNo::new(2)).unwrap();

    assert_eq!(monitor.high_prepared_seqno(), SeqNo::new(2));
    assert_eq!(monitor.high_completed_seqno(), SeqNo::ZERO);
    assert_eq!(partition.acks(), vec![SeqNo::new(2)]);
}

#[test]
fn persist_fence_blocks_then_persistence_releases() {
    let (partition, monitor) = monitor();
    monitor.add_sync_write(prepare("a", 1, Level::Majority)).unwrap();
    monitor
        .add_sync_write(prepare("b", 2, Level::PersistToMajority))
        .unwrap();
    monitor.add_sync_write(prepare("c", 3, Level::Majority)).unwrap();

    monitor.notify_snapshot_end_received(SeqNo::new(3)).unwrap();
    assert_eq!(monitor.high_prepared_seqno(), SeqNo::new(1));
    assert_eq!(partition.acks(), vec![SeqNo::new(1)]);

    partition.set_persistence_seqno(3);
    monitor.notify_local_persistence().unwrap();
    assert_eq!(monitor.high_prepared_seqno(), SeqNo::new(3));
    assert_eq!(partition.acks(), vec![SeqNo::new(1), SeqNo::new(3)]);
}

#[test]
fn completions_apply_in_seqno_order() {
    let (_, monitor) = monitor();
    monitor.add_sync_write(prepare("a", 1, Level::Majority)).unwrap();
    monitor.add_sync_write(prepare("b", 2, Level::Majority)).unwrap();
    monitor.notify_snapshot_end_received(SeqNo::new(2)).unwrap();

    monitor
        .complete_sync_write(&DocKey::from("a"), Resolution::Commit)
        .unwrap();
    monitor
        .complete_sync_write(&DocKey::from("b"), Resolution::Commit)
        .unwrap();

    assert_eq!(monitor.high_completed_seqno(), SeqNo::new(2));
    assert_eq!(monitor.num_tracked(), 0);
    assert_eq!(monitor.num_committed(), 2);

    let err = monitor
        .complete_sync_write(&DocKey::from("c"), Resolution::Commit)
        .unwrap_err();
    assert!(matches!(err, MonitorError::NothingTracked { .. }));
    assert!(!err.is_invalid_input());
}

#[test]
fn completion_for_the_wrong_key_is_refused() {
    let (_, monitor) = monitor();
    monitor.add_sync_write(prepare("a", 1, Level::Majority)).unwrap();
    monitor.add_sync_write(prepare("b", 2, Level::Majority)).unwrap();

    let err = monitor
        .complete_sync_write(&DocKey::from("b"), Resolution::Commit)
        .unwrap_err();
    let (expected, key) = match err {
        MonitorError::CompletionOutOfOrder { expected, key, .. } => (expected, key),
        other => panic!("expected an in-order violation, got {other}"),
    };
    assert_eq!(expected.key(), &DocKey::from("a"));
    assert_eq!(key, DocKey::from("b"));
    assert_eq!(monitor.high_completed_seqno(), SeqNo::ZERO);
}

#[test]
fn deduped_completion_advances_without_counting() {
    let (_, monitor) = monitor();
    monitor.add_sync_write(prepare("a", 1, Level::Majority)).unwrap();
    monitor.add_sync_write(prepare("b", 2, Level::Majority)).unwrap();
    monitor.notify_snapshot_end_received(SeqNo::new(2)).unwrap();

    monitor
        .complete_sync_write(&DocKey::from("a"), Resolution::CompletionWasDeduped)
        .unwrap();

    assert_eq!(monitor.high_completed_seqno(), SeqNo::new(1));
    assert_eq!(monitor.num_tracked(), 1);
    assert_eq!(monitor.num_committed(), 0);
    assert_eq!(monitor.num_aborted(), 0);
}

#[test]
fn rollback_reinstates_and_truncates() {
    let partition = Arc::new(FakePartition::new(7));
    let monitor = PassiveDurabilityMonitor::with_outstanding_prepares(
        partition,
        vec![
            prepare("a", 3, Level::Majority),
            prepare("b", 5, Level::Majority),
            prepare("c", 7, Level::Majority),
        ],
    )
    .unwrap();

    monitor
        .post_process_rollback(RollbackResult {
            high_completed_seqno: SeqNo::new(4),
            high_prepared_seqno: SeqNo::new(6),
            high_seqno: SeqNo::new(6),
            prepares_to_add: vec![prepare("b", 5, Level::Majority)],
        })
        .unwrap();

    assert_eq!(monitor.num_tracked(), 2);
    assert_eq!(monitor.high_prepared_seqno(), SeqNo::new(6));
    assert_eq!(monitor.high_completed_seqno(), SeqNo::new(4));
}

#[test]
fn rollback_preconditions_are_refused() {
    let (_, monitor) = monitor();
    let err = monitor
        .post_process_rollback(RollbackResult {
            high_completed_seqno: SeqNo::new(3),
            high_prepared_seqno: SeqNo::new(2),
            high_seqno: SeqNo::new(5),
            prepares_to_add: Vec::new(),
        })
        .unwrap_err();
    assert!(matches!(err, MonitorError::RollbackOutOfOrder { .. }));
    assert!(err.is_expectation_violation());
    assert!(!err.is_invalid_input());
}

#[test]
fn unchanged_persistence_notifications_emit_nothing() {
    let (partition, monitor) = monitor();
    monitor.add_sync_write(prepare("a", 1, Level::Majority)).unwrap();
    monitor.notify_snapshot_end_received(SeqNo::new(1)).unwrap();
    assert_eq!(partition.acks(), vec![SeqNo::new(1)]);

    monitor.notify_local_persistence().unwrap();
    monitor.notify_local_persistence().unwrap();
    assert_eq!(partition.acks(), vec![SeqNo::new(1)]);
    assert_eq!(monitor.high_prepared_seqno(), SeqNo::new(1));
}

#[test]
fn snapshot_end_regressions_are_noops() {
    let (partition, monitor) = monitor();
    monitor.add_sync_write(prepare("a", 1, Level::Majority)).unwrap();
    monitor.add_sync_write(prepare("b", 2, Level::Majority)).unwrap();
    monitor.notify_snapshot_end_received(SeqNo::new(2)).unwrap();

    monitor.notify_snapshot_end_received(SeqNo::new(1)).unwrap();
    assert_eq!(monitor.high_prepared_seqno(), SeqNo::new(2));
    assert_eq!(partition.acks(), vec![SeqNo::new(2)]);
}

#[test]
fn ingest_refuses_untrackable_prepares() {
    let (_, monitor) = monitor();
    let err = monitor
        .add_sync_write(prepare("a", 1, Level::None))
        .unwrap_err();
    assert!(matches!(err, MonitorError::LevelIsNone { .. }));
    assert!(err.is_invalid_input());

    let err = monitor
        .add_sync_write(prepare_with_default_timeout("b", 2))
        .unwrap_err();
    assert!(matches!(err, MonitorError::DefaultTimeout { .. }));
    assert!(err.is_invalid_input());
    assert!(!err.is_expectation_violation());
    assert_eq!(monitor.num_accepted(), 0);
    assert_eq!(monitor.num_tracked(), 0);
}

fn prepare_with_default_timeout(key: &str, seqno: u64) -> durmon::SyncWrite {
    durmon::SyncWrite::new(
        DocKey::from(key),
        SeqNo::new(seqno),
        Level::Majority,
        Timeout::Default,
    )
}

#[test]
fn warmup_refuses_default_timeouts_as_expectation_violations() {
    let partition = Arc::new(FakePartition::new(7));
    let err = PassiveDurabilityMonitor::with_outstanding_prepares(
        partition,
        vec![prepare_with_default_timeout("a", 1)],
    )
    .unwrap_err();
    // Unlike the same check on the live ingest path, a recovered prepare
    // without its timeout is a programmer error, not a refusable input.
    assert!(matches!(err, MonitorError::WarmupMissingTimeout { .. }));
    assert!(err.is_expectation_violation());
    assert!(!err.is_invalid_input());
}

#[test]
fn warmup_prepares_are_tracked_but_not_counted() {
    let partition = Arc::new(FakePartition::new(7));
    let monitor = PassiveDurabilityMonitor::with_outstanding_prepares(
        partition,
        vec![
            prepare("a", 1, Level::PersistToMajority),
            prepare("b", 2, Level::Majority),
        ],
    )
    .unwrap();
    assert_eq!(monitor.num_tracked(), 2);
    assert_eq!(monitor.num_accepted(), 0);
}

#[test]
fn full_drain_balances_the_books() {
    let (partition, monitor) = monitor();
    let resolutions = [
        Resolution::Commit,
        Resolution::Abort,
        Resolution::CompletionWasDeduped,
        Resolution::Commit,
        Resolution::Abort,
        Resolution::Commit,
    ];
    for (index, _) in resolutions.iter().enumerate() {
        let seqno = index as u64 + 1;
        let level = if seqno % 3 == 0 {
            Level::PersistToMajority
        } else {
            Level::Majority
        };
        monitor
            .add_sync_write(prepare(&format!("key-{seqno}"), seqno, level))
            .unwrap();
    }

    monitor
        .notify_snapshot_end_received(SeqNo::new(resolutions.len() as u64))
        .unwrap();
    partition.set_persistence_seqno(resolutions.len() as u64);
    monitor.notify_local_persistence().unwrap();

    for (index, resolution) in resolutions.iter().enumerate() {
        let key = DocKey::from(format!("key-{}", index + 1).as_str());
        monitor.complete_sync_write(&key, *resolution).unwrap();
    }

    assert_eq!(monitor.num_tracked(), 0);
    let deduped = 1;
    assert_eq!(
        monitor.num_accepted(),
        monitor.num_committed() + monitor.num_aborted() + deduped
    );
    assert_strictly_increasing(&partition.acks());
}

#[test]
fn stats_are_emitted_per_partition() {
    let (_partition, monitor) = monitor();
    monitor.add_sync_write(prepare("a", 1, Level::Majority)).unwrap();
    monitor.notify_snapshot_end_received(SeqNo::new(1)).unwrap();
    monitor
        .complete_sync_write(&DocKey::from("a"), Resolution::Commit)
        .unwrap();

    let mut collected = Vec::new();
    monitor.add_stats(&mut |key, value| {
        collected.push((key.to_string(), value.to_string()));
        Ok(())
    });

    assert_eq!(
        collected,
        vec![
            ("vb_7:state".to_string(), "replica".to_string()),
            ("vb_7:high_prepared_seqno".to_string(), "1".to_string()),
            ("vb_7:high_completed_seqno".to_string(), "1".to_string()),
        ]
    );
}

#[test]
fn stat_emission_failures_are_swallowed() {
    let (_, monitor) = monitor();
    let mut calls = 0usize;
    monitor.add_stats(&mut |_, _| {
        calls += 1;
        Err("sink unavailable".into())
    });
    // The first failure stops emission; the monitor stays usable.
    assert_eq!(calls, 1);
    monitor.add_sync_write(prepare("a", 1, Level::Majority)).unwrap();
    assert_eq!(monitor.num_tracked(), 1);
}

#[test]
fn monitor_renders_its_high_prepared_seqno() {
    let (_, monitor) = monitor();
    monitor.add_sync_write(prepare("a", 1, Level::Majority)).unwrap();
    monitor.notify_snapshot_end_received(SeqNo::new(1)).unwrap();

    let rendered = monitor.to_string();
    assert!(rendered.contains("vb:7"));
    assert!(rendered.contains("high_prepared_seqno:1"));
}
