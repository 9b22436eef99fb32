//! In-memory (single node) implementation of the versioned metadata store
//! for local development and tests.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chainlog_metastore::{CreateOutcome, MetaStore, SwapOutcome, VersionedValue};
use tokio::sync::Mutex;

/// In-memory versioned key-value store.
#[derive(Clone, Debug, Default)]
pub struct MemoryMetaStore {
    map: Arc<Mutex<HashMap<String, VersionedValue>>>,
}

impl MemoryMetaStore {
    /// Creates a new `MemoryMetaStore`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            map: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl MetaStore for MemoryMetaStore {
    type Error = Error;

    async fn read<K: Into<String> + Send>(
        &self,
        key: K,
    ) -> Result<Option<VersionedValue>, Self::Error> {
        let map = self.map.lock().await;
        Ok(map.get(&key.into()).cloned())
    }

    async fn create_if_absent<K: Into<String> + Send>(
        &self,
        key: K,
        bytes: Bytes,
    ) -> Result<CreateOutcome, Self::Error> {
        let mut map = self.map.lock().await;
        let key = key.into();

        if map.contains_key(&key) {
            return Ok(CreateOutcome::AlreadyExists);
        }

        map.insert(key, VersionedValue { bytes, version: 0 });

        Ok(CreateOutcome::Created)
    }

    async fn compare_and_swap<K: Into<String> + Send>(
        &self,
        key: K,
        bytes: Bytes,
        expected_version: u64,
    ) -> Result<SwapOutcome, Self::Error> {
        let mut map = self.map.lock().await;
        let key = key.into();

        match map.get_mut(&key) {
            Some(value) if value.version == expected_version => {
                value.bytes = bytes;
                value.version += 1;

                Ok(SwapOutcome::Applied {
                    version: value.version,
                })
            }
            _ => Ok(SwapOutcome::VersionConflict),
        }
    }
}
