use chainlog_segment::{SegmentError, SegmentId};
use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Clone, Debug, Error)]
pub enum Error {
    /// The segment is not (yet) known to the store.
    #[error("unknown segment: {0}")]
    UnknownSegment(SegmentId),

    /// A read addressed offsets beyond the confirmed range.
    #[error("offset range {from}..={to} out of bounds for segment {segment}")]
    RangeOutOfBounds {
        /// The segment being read.
        segment: SegmentId,
        /// First requested offset.
        from: u64,
        /// Last requested offset.
        to: u64,
    },
}

impl SegmentError for Error {
    fn is_transient(&self) -> bool {
        // A segment published in the shared list may not be visible to this
        // client yet. Out-of-range reads never become valid by retrying.
        matches!(self, Self::UnknownSegment(_))
    }
}
