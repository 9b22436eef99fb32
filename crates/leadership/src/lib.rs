//! Abstract interface for the leader-election service. At most one enrolled
//! candidate observes itself as leader at a time; deposed candidates are
//! automatically re-queued (fail-open).
//!
//! Leadership is exposed as a [`RoleSignal`] backed by a watch channel
//! rather than a shared mutable flag: the election service's notification
//! path only writes the channel, and the log driver polls or awaits it.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::error::Error;
use std::fmt::Debug;

use async_trait::async_trait;
use tokio::sync::watch;

/// Marker trait for election errors.
pub trait ElectionError: Debug + Error + Send + Sync + 'static {}

/// A live view of this process's role, updated by the election service.
#[derive(Clone, Debug)]
pub struct RoleSignal {
    rx: watch::Receiver<bool>,
    // Keeps a fixed signal's channel open; None for election-backed signals.
    _tx: Option<std::sync::Arc<watch::Sender<bool>>>,
}

impl RoleSignal {
    /// Wraps a watch receiver whose value is "this process is leader".
    #[must_use]
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx, _tx: None }
    }

    /// Creates a signal that never changes. Useful in tests and tools that
    /// pin a process to one role.
    #[must_use]
    pub fn fixed(leader: bool) -> Self {
        let (tx, rx) = watch::channel(leader);
        Self {
            rx,
            _tx: Some(std::sync::Arc::new(tx)),
        }
    }

    /// Whether this process currently believes it is leader.
    #[must_use]
    pub fn is_leader(&self) -> bool {
        *self.rx.borrow()
    }

    /// Waits until the role changes. If the election service has gone away
    /// the role can never change again, so the future never resolves.
    pub async fn changed(&mut self) {
        if self.rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// An enrolled candidacy. Dropping it without resigning leaves the
/// candidacy registered; call [`Candidacy::resign`] on shutdown.
#[async_trait]
pub trait Candidacy: Send + Sync + 'static {
    /// The error type for candidacy operations.
    type Error: ElectionError;

    /// The role signal tracking this candidacy.
    fn signal(&self) -> RoleSignal;

    /// Withdraws from the election, releasing leadership if held.
    async fn resign(&self) -> Result<(), Self::Error>;
}

/// A trait representing a leader-election service.
#[async_trait]
pub trait Election: Clone + Send + Sync + 'static {
    /// The error type for election operations.
    type Error: ElectionError;

    /// The candidacy type returned by [`Election::enroll`].
    type Candidacy: Candidacy<Error = Self::Error>;

    /// Registers this process as a candidate under the given coordination
    /// path. Candidates enrolled under different paths are independent.
    async fn enroll<N: Into<String> + Send>(
        &self,
        namespace: N,
    ) -> Result<Self::Candidacy, Self::Error>;
}
