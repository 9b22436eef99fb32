use chainlog_metastore::MetaStoreError;
use chainlog_segment::SegmentError;
use thiserror::Error;

use crate::codec::CorruptMetadata;
use crate::retry::RetryError;

/// Errors that terminate the log driver. Transient conditions and lost
/// races are absorbed inside Lead/Follow; only unrecoverable failures
/// surface here.
#[derive(Debug, Error)]
pub enum DriverError<ME, SE>
where
    ME: MetaStoreError,
    SE: SegmentError,
{
    /// The metadata store failed non-transiently.
    #[error("metadata store: {0}")]
    Meta(#[source] ME),

    /// The metadata store stayed unavailable beyond the retry budget.
    #[error("metadata store unavailable after {attempts} attempts")]
    MetaRetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The last transient error observed.
        #[source]
        source: ME,
    },

    /// The segment store failed non-transiently.
    #[error("segment store: {0}")]
    Segment(#[source] SE),

    /// The stored segment list could not be decoded.
    #[error(transparent)]
    CorruptMetadata(#[from] CorruptMetadata),

    /// The segment list never appeared within the follower's wait budget.
    #[error("segment list not created after {attempts} attempts")]
    ListWaitExhausted {
        /// Number of attempts made.
        attempts: u32,
    },
}

impl<ME, SE> DriverError<ME, SE>
where
    ME: MetaStoreError,
    SE: SegmentError,
{
    pub(crate) fn from_meta_retry(error: RetryError<ME>) -> Self {
        match error {
            RetryError::Fatal(error) => Self::Meta(error),
            RetryError::Exhausted { attempts, last } => Self::MetaRetriesExhausted {
                attempts,
                source: last,
            },
        }
    }
}
