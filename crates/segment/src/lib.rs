//! Abstract interface for the durable segment store: bounded, replicated,
//! append-only storage units with fencing semantics. The store's internal
//! replication and quorum protocol is behind these traits; the log
//! orchestration layer only consumes them.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::error::Error;
use std::fmt::{self, Debug, Display};

use async_trait::async_trait;
use bytes::Bytes;

/// Marker trait for segment store errors.
pub trait SegmentError: Debug + Error + Send + Sync + 'static {
    /// Whether the failure is transient (segment not yet visible, replica
    /// temporarily unreachable) and the call may be retried.
    fn is_transient(&self) -> bool;
}

/// Identifier of a single segment. Stores allocate ids monotonically, so id
/// order matches creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId(pub u64);

impl Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Replication parameters supplied at segment creation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplicationConfig {
    /// Number of replicas each entry is written to.
    pub replicas: u32,

    /// Number of replicas that participate in each write.
    pub write_quorum: u32,

    /// Number of acknowledgements required before a write is confirmed.
    pub ack_quorum: u32,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            replicas: 3,
            write_quorum: 3,
            ack_quorum: 2,
        }
    }
}

/// Result of appending to an open segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The entry was durably acknowledged at the given offset.
    Appended {
        /// Offset assigned to the entry, starting at 0.
        offset: u64,
    },

    /// Another process has sealed the segment. The writer must stop leading;
    /// further appends can never succeed.
    Fenced,
}

/// Result of opening a segment with recovery.
#[derive(Debug)]
pub enum RecoverOutcome<R> {
    /// The segment is sealed (now, or already) and readable.
    Sealed(R),

    /// The store could not reconcile the segment's replicas. The caller
    /// gives up on this stream position and reports truncation.
    Unrecoverable,
}

/// A handle for appending to a segment this process created.
#[async_trait]
pub trait SegmentAppender: Send + Sync + 'static {
    /// The error type for appender operations.
    type Error: SegmentError;

    /// The id of the segment being appended to.
    fn id(&self) -> SegmentId;

    /// Appends a payload, returning its offset once acknowledged, or
    /// [`AppendOutcome::Fenced`] if the segment was sealed underneath us.
    async fn append(&self, payload: Bytes) -> Result<AppendOutcome, Self::Error>;

    /// Explicitly seals the segment. Idempotent.
    async fn close(&self) -> Result<(), Self::Error>;
}

/// A read-only handle on a segment.
#[async_trait]
pub trait SegmentReader: Send + Sync + 'static {
    /// The error type for reader operations.
    type Error: SegmentError;

    /// The id of the segment being read.
    fn id(&self) -> SegmentId;

    /// Highest durably acknowledged offset, or `None` if the segment has no
    /// confirmed entries.
    async fn last_confirmed(&self) -> Result<Option<u64>, Self::Error>;

    /// Reads the inclusive offset range `from..=to` in ascending order.
    async fn read(&self, from: u64, to: u64) -> Result<Vec<Bytes>, Self::Error>;
}

/// A trait representing a segment store with asynchronous operations.
#[async_trait]
pub trait SegmentStore: Clone + Send + Sync + 'static {
    /// The error type for store operations.
    type Error: SegmentError;

    /// The handle type for appending.
    type Appender: SegmentAppender<Error = Self::Error>;

    /// The handle type for reading.
    type Reader: SegmentReader<Error = Self::Error>;

    /// Creates a new segment, open for append by this process only.
    async fn create(&self, config: ReplicationConfig) -> Result<Self::Appender, Self::Error>;

    /// Opens a segment for reading, sealing it first if it is still open.
    /// This is the fencing path: after it returns, the segment's original
    /// creator can no longer append.
    async fn open_with_recovery(
        &self,
        id: SegmentId,
    ) -> Result<RecoverOutcome<Self::Reader>, Self::Error>;

    /// Opens a segment for reading without sealing it. Used for live
    /// tailing so a follower never fences a valid leader.
    async fn open_no_recovery(&self, id: SegmentId) -> Result<Self::Reader, Self::Error>;

    /// Whether the segment is sealed.
    async fn is_closed(&self, id: SegmentId) -> Result<bool, Self::Error>;
}
