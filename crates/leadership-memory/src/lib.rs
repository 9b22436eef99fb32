//! In-memory (single node) implementation of leader election for local
//! development and tests. Candidates are elected in enrollment order; a
//! deposed leader is re-queued automatically, matching the fail-open
//! behavior expected of the real election service.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chainlog_leadership::{Candidacy, Election, RoleSignal};
use tokio::sync::{Mutex, watch};

struct Candidate {
    id: u64,
    tx: watch::Sender<bool>,
}

#[derive(Default)]
struct Inner {
    // Per-namespace queues; the front of each queue is its current leader.
    queues: HashMap<String, Vec<Candidate>>,
    next_id: u64,
}

fn elect_front(queue: &[Candidate]) {
    if let Some(front) = queue.first() {
        let _ = front.tx.send(true);
    }
}

/// In-memory election coordinator. Clones share the same candidate queues.
#[derive(Clone, Default)]
pub struct MemoryElection {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryElection {
    /// Creates a new `MemoryElection`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Deposes the current leader under `namespace`, re-queueing it behind
    /// the other candidates, and elects the next one.
    pub async fn depose(&self, namespace: &str) {
        let mut inner = self.inner.lock().await;

        let Some(queue) = inner.queues.get_mut(namespace) else {
            return;
        };

        if queue.is_empty() {
            return;
        }

        let deposed = queue.remove(0);
        let _ = deposed.tx.send(false);
        queue.push(deposed);
        elect_front(queue);
    }
}

/// A candidacy enrolled with a [`MemoryElection`].
pub struct MemoryCandidacy {
    id: u64,
    namespace: String,
    rx: watch::Receiver<bool>,
    inner: Arc<Mutex<Inner>>,
}

#[async_trait]
impl Candidacy for MemoryCandidacy {
    type Error = Error;

    fn signal(&self) -> RoleSignal {
        RoleSignal::new(self.rx.clone())
    }

    async fn resign(&self) -> Result<(), Self::Error> {
        let mut inner = self.inner.lock().await;

        let Some(queue) = inner.queues.get_mut(&self.namespace) else {
            return Ok(());
        };

        let Some(position) = queue.iter().position(|c| c.id == self.id) else {
            return Ok(());
        };

        let removed = queue.remove(position);
        let _ = removed.tx.send(false);

        if position == 0 {
            elect_front(queue);
        }

        Ok(())
    }
}

#[async_trait]
impl Election for MemoryElection {
    type Error = Error;
    type Candidacy = MemoryCandidacy;

    async fn enroll<N: Into<String> + Send>(
        &self,
        namespace: N,
    ) -> Result<Self::Candidacy, Self::Error> {
        let namespace = namespace.into();
        let mut inner = self.inner.lock().await;

        let id = inner.next_id;
        inner.next_id += 1;

        let (tx, rx) = watch::channel(false);
        let queue = inner.queues.entry(namespace.clone()).or_default();
        queue.push(Candidate { id, tx });

        if queue.len() == 1 {
            elect_front(queue);
        }

        Ok(MemoryCandidacy {
            id,
            namespace,
            rx,
            inner: self.inner.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_candidate_is_elected() {
        let election = MemoryElection::new();

        let first = election.enroll("elect").await.unwrap();
        let second = election.enroll("elect").await.unwrap();

        assert!(first.signal().is_leader());
        assert!(!second.signal().is_leader());
    }

    #[tokio::test]
    async fn test_depose_hands_over_and_requeues() {
        let election = MemoryElection::new();

        let first = election.enroll("elect").await.unwrap();
        let second = election.enroll("elect").await.unwrap();

        election.depose("elect").await;
        assert!(!first.signal().is_leader());
        assert!(second.signal().is_leader());

        // The deposed candidate stays enrolled and gets another turn.
        election.depose("elect").await;
        assert!(first.signal().is_leader());
        assert!(!second.signal().is_leader());
    }

    #[tokio::test]
    async fn test_resign_promotes_next_candidate() {
        let election = MemoryElection::new();

        let first = election.enroll("elect").await.unwrap();
        let second = election.enroll("elect").await.unwrap();

        first.resign().await.unwrap();
        assert!(!first.signal().is_leader());
        assert!(second.signal().is_leader());

        // Resigning while not enrolled is a no-op.
        first.resign().await.unwrap();
        assert!(second.signal().is_leader());
    }

    #[tokio::test]
    async fn test_namespaces_elect_independently() {
        let election = MemoryElection::new();

        let first = election.enroll("elect-a").await.unwrap();
        let second = election.enroll("elect-b").await.unwrap();

        assert!(first.signal().is_leader());
        assert!(second.signal().is_leader());

        election.depose("elect-a").await;
        assert!(second.signal().is_leader());
    }

    #[tokio::test]
    async fn test_signal_observes_changes() {
        let election = MemoryElection::new();

        let first = election.enroll("elect").await.unwrap();
        let second = election.enroll("elect").await.unwrap();
        let mut signal = second.signal();

        let waiter = tokio::spawn(async move {
            signal.changed().await;
            signal.is_leader()
        });

        election.depose("elect").await;
        assert!(waiter.await.unwrap());
        let _ = first;
    }
}
