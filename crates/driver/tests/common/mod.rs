//! Shared fixtures for driver integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use chainlog_driver::{DriverConfig, EntryId, RecordConsumer, RecordProducer, RetryPolicy, Role};

/// Produces a scripted prefix of values, then counts upward from 100 so the
/// log keeps growing for as long as the test leads.
pub struct ScriptedProducer {
    script: VecDeque<i32>,
    next: i32,
}

impl ScriptedProducer {
    pub fn new(script: &[i32]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            next: 100,
        }
    }
}

impl RecordProducer for ScriptedProducer {
    fn produce(&mut self) -> Bytes {
        let value = self.script.pop_front().unwrap_or_else(|| {
            let value = self.next;
            self.next += 1;
            value
        });

        Bytes::copy_from_slice(&value.to_be_bytes())
    }
}

/// Records every delivery so tests can assert on the exact sequence.
#[derive(Clone, Default)]
pub struct Collector {
    entries: Arc<Mutex<Vec<(EntryId, i32, Role)>>>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn snapshot(&self) -> Vec<(EntryId, i32, Role)> {
        self.entries.lock().unwrap().clone()
    }

    /// Polls until at least `count` entries have been delivered.
    pub async fn wait_for(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while self.len() < count {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("timed out waiting for deliveries");
    }
}

impl RecordConsumer for Collector {
    fn consume(&mut self, id: EntryId, payload: &[u8], role: Role) {
        let value = i32::from_be_bytes(payload.try_into().expect("4-byte payload"));
        self.entries.lock().unwrap().push((id, value, role));
    }
}

/// Driver config with millisecond cadences so tests finish quickly.
pub fn fast_config() -> DriverConfig {
    DriverConfig {
        append_interval: Duration::from_millis(5),
        poll_interval: Duration::from_millis(5),
        meta_retry: RetryPolicy::new(5, Duration::from_millis(1), Duration::from_millis(5)),
        list_wait: RetryPolicy::new(500, Duration::from_millis(5), Duration::from_millis(5)),
        ..DriverConfig::default()
    }
}

/// Asserts strictly increasing ids with no gaps: offsets within a segment
/// are consecutive and every later segment starts at offset 0.
pub fn assert_gapless(entries: &[(EntryId, i32, Role)]) {
    let mut prev: Option<EntryId> = None;

    for (id, _, _) in entries {
        if let Some(prev) = prev {
            if prev.segment == id.segment {
                assert_eq!(id.offset, prev.offset + 1, "gap after {prev}");
            } else {
                assert!(id.segment > prev.segment, "segment order violated at {id}");
                assert_eq!(id.offset, 0, "new segment {id} did not start at offset 0");
            }
        }
        prev = Some(*id);
    }
}
