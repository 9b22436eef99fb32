//! Abstract interface for the strongly-consistent coordination metadata
//! store. Values are opaque blobs guarded by a version number; all writers
//! use optimistic concurrency and never blind-overwrite.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::error::Error;
use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;

/// Marker trait for `MetaStore` errors.
pub trait MetaStoreError: Debug + Error + Send + Sync + 'static {
    /// Whether the failure is transient and the call may be retried.
    ///
    /// Non-transient errors (lost connection, exceeded session budget) must
    /// propagate to process termination.
    fn is_transient(&self) -> bool;
}

/// A value read from the store together with the version guarding it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionedValue {
    /// The stored payload.
    pub bytes: Bytes,

    /// The version to present on a subsequent `compare_and_swap`.
    pub version: u64,
}

/// Result of a conditional create.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The key was created by this call.
    Created,

    /// Another writer created the key first.
    AlreadyExists,
}

/// Result of a compare-and-swap update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SwapOutcome {
    /// The update was applied; the key now carries the returned version.
    Applied {
        /// The new version of the key.
        version: u64,
    },

    /// The stored version no longer matched. The caller must re-read and
    /// recompute rather than retry with the same payload.
    VersionConflict,
}

/// A trait representing a versioned key-value metadata store with
/// asynchronous operations.
#[async_trait]
pub trait MetaStore: Clone + Send + Sync + 'static {
    /// The error type for store operations.
    type Error: MetaStoreError;

    /// Reads a key and its current version. Returns `None` if the key is
    /// absent.
    async fn read<K: Into<String> + Send>(
        &self,
        key: K,
    ) -> Result<Option<VersionedValue>, Self::Error>;

    /// Creates a key only if it does not exist yet.
    async fn create_if_absent<K: Into<String> + Send>(
        &self,
        key: K,
        bytes: Bytes,
    ) -> Result<CreateOutcome, Self::Error>;

    /// Replaces a key's value only if its version still matches
    /// `expected_version`.
    async fn compare_and_swap<K: Into<String> + Send>(
        &self,
        key: K,
        bytes: Bytes,
        expected_version: u64,
    ) -> Result<SwapOutcome, Self::Error>;
}
