use std::fmt::{self, Display};

use bytes::Bytes;

use crate::entry::EntryId;

/// The role a process held when it delivered an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// The process appended the entry itself.
    Leader,

    /// The process replayed the entry from the shared log.
    Follower,
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leader => write!(f, "leader"),
            Self::Follower => write!(f, "follower"),
        }
    }
}

/// Produces the next record to append. Called once per cadence tick, only
/// while leading.
pub trait RecordProducer: Send + 'static {
    /// Returns the next payload.
    fn produce(&mut self) -> Bytes;
}

/// Receives every delivered entry, leading or following, in strictly
/// increasing [`EntryId`] order with no gaps and no duplicates.
///
/// The resume cursor is not persisted, so a restarted process redelivers
/// from the start of the log; consumers must be idempotent under
/// redelivery.
pub trait RecordConsumer: Send + 'static {
    /// Delivers one entry.
    fn consume(&mut self, id: EntryId, payload: &[u8], role: Role);
}
