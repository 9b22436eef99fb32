use std::time::Duration;

use chainlog_segment::ReplicationConfig;

use crate::retry::RetryPolicy;

/// Well-known metadata key holding the encoded segment list.
pub const DEFAULT_LOG_KEY: &str = "/chainlog-log";

/// Tuning knobs for the log driver.
#[derive(Clone, Debug)]
pub struct DriverConfig {
    /// Metadata key under which the segment list is stored.
    pub log_key: String,

    /// Replication parameters passed to the segment store on creation.
    pub replication: ReplicationConfig,

    /// Cadence of the leader's append loop.
    pub append_interval: Duration,

    /// How long a follower waits between polls of an open segment.
    pub poll_interval: Duration,

    /// Budget for retrying transiently unavailable metadata-store calls.
    pub meta_retry: RetryPolicy,

    /// Budget for waiting on the segment list to be created by the first
    /// leader.
    pub list_wait: RetryPolicy,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            log_key: DEFAULT_LOG_KEY.to_string(),
            replication: ReplicationConfig::default(),
            append_interval: Duration::from_secs(1),
            poll_interval: Duration::from_secs(1),
            meta_retry: RetryPolicy::default(),
            list_wait: RetryPolicy::new(300, Duration::from_secs(1), Duration::from_secs(1)),
        }
    }
}
