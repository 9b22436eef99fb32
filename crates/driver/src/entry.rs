use std::fmt::{self, Display};

pub use chainlog_segment::SegmentId;

/// Identifies one entry in the logical stream: a segment and an offset
/// within it.
///
/// The derived order (segment-major, offset-minor) matches stream order
/// because segment ids are allocated monotonically and the segment list is
/// append-only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId {
    /// The segment holding the entry.
    pub segment: SegmentId,

    /// The entry's offset within the segment, starting at 0.
    pub offset: u64,
}

impl EntryId {
    /// Creates an `EntryId`.
    #[must_use]
    pub const fn new(segment: SegmentId, offset: u64) -> Self {
        Self { segment, offset }
    }
}

impl Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.segment, self.offset)
    }
}

/// The last entry delivered to the consumer; `None` means nothing has been
/// read yet. Carried across Lead/Follow calls and role switches, never
/// persisted: a restarted process replays from the start of the log.
pub type Cursor = Option<EntryId>;
