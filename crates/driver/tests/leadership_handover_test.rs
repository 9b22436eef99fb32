//! Leadership handover: no entry is lost or duplicated when the leader
//! changes, and a stale leader is fenced off by its successor's recovery.

mod common;

use common::{Collector, ScriptedProducer, assert_gapless, fast_config};

use std::time::Duration;

use chainlog_driver::LogDriver;
use chainlog_leadership::{Candidacy, Election, RoleSignal};
use chainlog_leadership_memory::MemoryElection;
use chainlog_metastore_memory::MemoryMetaStore;
use chainlog_segment::SegmentStore;
use chainlog_segment_memory::MemorySegmentStore;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_clean_handover_loses_and_duplicates_nothing() {
    let meta = MemoryMetaStore::new();
    let segments = MemorySegmentStore::new();
    let election = MemoryElection::new();

    let candidacy_a = election.enroll("elect").await.unwrap();
    let candidacy_b = election.enroll("elect").await.unwrap();

    let collector_a = Collector::new();
    let collector_b = Collector::new();
    let cancel_b = CancellationToken::new();

    let mut driver_a = LogDriver::new(
        meta.clone(),
        segments.clone(),
        candidacy_a.signal(),
        ScriptedProducer::new(&[4, 2, 6]),
        collector_a.clone(),
        fast_config(),
        CancellationToken::new(),
    );

    // A leads until deposed.
    let handle_a = tokio::spawn(async move { driver_a.lead(None).await });
    collector_a.wait_for(3).await;
    election.depose("elect").await;

    let cursor_a = tokio::time::timeout(Duration::from_secs(10), handle_a)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let led_by_a = collector_a.snapshot();
    assert_eq!(cursor_a, led_by_a.last().map(|(id, _, _)| *id));

    // B takes over: catch-up must replay exactly A's entries, ending at
    // A's cursor, before B appends anything of its own.
    assert!(candidacy_b.signal().is_leader());

    let mut driver_b = LogDriver::new(
        meta.clone(),
        segments.clone(),
        candidacy_b.signal(),
        ScriptedProducer::new(&[9]),
        collector_b.clone(),
        fast_config(),
        cancel_b.clone(),
    );

    let handle_b = tokio::spawn(async move { driver_b.lead(None).await });
    collector_b.wait_for(led_by_a.len() + 1).await;
    cancel_b.cancel();
    tokio::time::timeout(Duration::from_secs(10), handle_b)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let seen_by_b = collector_b.snapshot();
    for (replayed, original) in seen_by_b.iter().zip(led_by_a.iter()) {
        assert_eq!(replayed.0, original.0);
        assert_eq!(replayed.1, original.1);
    }

    let first_own = seen_by_b[led_by_a.len()];
    assert_eq!(first_own.1, 9);
    assert_eq!(first_own.0.offset, 0);
    assert!(first_own.0.segment > cursor_a.unwrap().segment);
    assert_gapless(&seen_by_b);

    // A's abandoned segment was sealed by B's recovery.
    assert!(segments.is_closed(cursor_a.unwrap().segment).await.unwrap());
}

#[tokio::test]
async fn test_stale_leader_is_fenced_by_successor() {
    let meta = MemoryMetaStore::new();
    let segments = MemorySegmentStore::new();

    let collector_a = Collector::new();
    let collector_b = Collector::new();
    let cancel_b = CancellationToken::new();

    // A believes it is leader and never learns otherwise; only fencing can
    // stop it.
    let mut driver_a = LogDriver::new(
        meta.clone(),
        segments.clone(),
        RoleSignal::fixed(true),
        ScriptedProducer::new(&[1, 2, 3]),
        collector_a.clone(),
        fast_config(),
        CancellationToken::new(),
    );

    let handle_a = tokio::spawn(async move { driver_a.lead(None).await });
    collector_a.wait_for(2).await;

    let mut driver_b = LogDriver::new(
        meta.clone(),
        segments.clone(),
        RoleSignal::fixed(true),
        ScriptedProducer::new(&[7]),
        collector_b.clone(),
        fast_config(),
        cancel_b.clone(),
    );

    let handle_b = tokio::spawn(async move { driver_b.lead(None).await });

    // A's next append after B's recovery open fails with Fenced, ending
    // A's tenure even though A still thinks it leads.
    let cursor_a = tokio::time::timeout(Duration::from_secs(10), handle_a)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    collector_b.wait_for(collector_a.len() + 1).await;
    cancel_b.cancel();
    tokio::time::timeout(Duration::from_secs(10), handle_b)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    // B replayed exactly what A managed to get acknowledged.
    let acked_by_a = collector_a.snapshot();
    let seen_by_b = collector_b.snapshot();
    assert_eq!(cursor_a, acked_by_a.last().map(|(id, _, _)| *id));
    for (replayed, original) in seen_by_b.iter().zip(acked_by_a.iter()) {
        assert_eq!(replayed.0, original.0);
        assert_eq!(replayed.1, original.1);
    }
    assert!(seen_by_b.len() > acked_by_a.len());
    assert_gapless(&seen_by_b);
}
