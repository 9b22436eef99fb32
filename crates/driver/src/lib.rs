//! Orchestration core for chainlog: a single-writer, crash-tolerant
//! replicated append log. One elected leader appends a totally ordered
//! stream of records across a chain of segments; followers replay the same
//! stream in the same order and take over on election.
//!
//! Consensus, segment replication, and leader election live behind the
//! `chainlog-metastore`, `chainlog-segment`, and `chainlog-leadership`
//! traits; this crate implements the protocol on top of them: leader
//! catch-up and handover, optimistic segment-list publication, fencing of
//! stale leaders, and follower tailing.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Segment list wire format.
pub mod codec;

/// Driver tuning knobs.
pub mod config;

/// The Lead/Follow state machine.
pub mod driver;

/// Entry identifiers and the resume cursor.
pub mod entry;

/// Driver-fatal errors.
pub mod error;

/// Pluggable record producer/consumer seam.
pub mod record;

/// Bounded-backoff retry policies.
pub mod retry;

pub use codec::CorruptMetadata;
pub use config::DriverConfig;
pub use driver::LogDriver;
pub use entry::{Cursor, EntryId};
pub use error::DriverError;
pub use record::{RecordConsumer, RecordProducer, Role};
pub use retry::RetryPolicy;
