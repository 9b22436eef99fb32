//! In-memory (single node) implementation of the segment store for local
//! development and tests. Replication parameters are accepted but there is
//! only one replica; sealing and fencing semantics are faithful.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chainlog_segment::{
    AppendOutcome, RecoverOutcome, ReplicationConfig, SegmentAppender, SegmentId, SegmentReader,
    SegmentStore,
};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct SegmentState {
    entries: Vec<Bytes>,
    closed: bool,
    fenced: bool,
    unrecoverable: bool,
}

type SharedSegments = Arc<Mutex<HashMap<SegmentId, SegmentState>>>;

/// In-memory segment store.
#[derive(Clone, Debug, Default)]
pub struct MemorySegmentStore {
    segments: SharedSegments,
    next_id: Arc<AtomicU64>,
}

impl MemorySegmentStore {
    /// Creates a new `MemorySegmentStore`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            segments: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Marks a segment so that recovery opens report it unrecoverable.
    ///
    /// Test hook for exercising truncated catch-up.
    pub async fn fail_recovery(&self, id: SegmentId) {
        if let Some(state) = self.segments.lock().await.get_mut(&id) {
            state.unrecoverable = true;
        }
    }
}

/// Append handle for a segment created through [`MemorySegmentStore`].
#[derive(Debug)]
pub struct MemorySegmentAppender {
    id: SegmentId,
    segments: SharedSegments,
}

#[async_trait]
impl SegmentAppender for MemorySegmentAppender {
    type Error = Error;

    fn id(&self) -> SegmentId {
        self.id
    }

    async fn append(&self, payload: Bytes) -> Result<AppendOutcome, Self::Error> {
        let mut segments = self.segments.lock().await;
        let state = segments
            .get_mut(&self.id)
            .ok_or(Error::UnknownSegment(self.id))?;

        if state.fenced || state.closed {
            return Ok(AppendOutcome::Fenced);
        }

        state.entries.push(payload);

        Ok(AppendOutcome::Appended {
            offset: state.entries.len() as u64 - 1,
        })
    }

    async fn close(&self) -> Result<(), Self::Error> {
        let mut segments = self.segments.lock().await;
        let state = segments
            .get_mut(&self.id)
            .ok_or(Error::UnknownSegment(self.id))?;

        state.closed = true;

        Ok(())
    }
}

/// Read handle on a segment held in a [`MemorySegmentStore`].
#[derive(Debug)]
pub struct MemorySegmentReader {
    id: SegmentId,
    segments: SharedSegments,
}

#[async_trait]
impl SegmentReader for MemorySegmentReader {
    type Error = Error;

    fn id(&self) -> SegmentId {
        self.id
    }

    async fn last_confirmed(&self) -> Result<Option<u64>, Self::Error> {
        let segments = self.segments.lock().await;
        let state = segments
            .get(&self.id)
            .ok_or(Error::UnknownSegment(self.id))?;

        Ok((state.entries.len() as u64).checked_sub(1))
    }

    async fn read(&self, from: u64, to: u64) -> Result<Vec<Bytes>, Self::Error> {
        let segments = self.segments.lock().await;
        let state = segments
            .get(&self.id)
            .ok_or(Error::UnknownSegment(self.id))?;

        if from > to || to >= state.entries.len() as u64 {
            return Err(Error::RangeOutOfBounds {
                segment: self.id,
                from,
                to,
            });
        }

        Ok(state.entries[from as usize..=to as usize].to_vec())
    }
}

#[async_trait]
impl SegmentStore for MemorySegmentStore {
    type Error = Error;
    type Appender = MemorySegmentAppender;
    type Reader = MemorySegmentReader;

    async fn create(&self, _config: ReplicationConfig) -> Result<Self::Appender, Self::Error> {
        let id = SegmentId(self.next_id.fetch_add(1, Ordering::SeqCst));

        self.segments
            .lock()
            .await
            .insert(id, SegmentState::default());

        Ok(MemorySegmentAppender {
            id,
            segments: self.segments.clone(),
        })
    }

    async fn open_with_recovery(
        &self,
        id: SegmentId,
    ) -> Result<RecoverOutcome<Self::Reader>, Self::Error> {
        let mut segments = self.segments.lock().await;
        let state = segments.get_mut(&id).ok_or(Error::UnknownSegment(id))?;

        if state.unrecoverable {
            return Ok(RecoverOutcome::Unrecoverable);
        }

        // Sealing invalidates the creator's handle.
        state.closed = true;
        state.fenced = true;

        Ok(RecoverOutcome::Sealed(MemorySegmentReader {
            id,
            segments: self.segments.clone(),
        }))
    }

    async fn open_no_recovery(&self, id: SegmentId) -> Result<Self::Reader, Self::Error> {
        let segments = self.segments.lock().await;

        if !segments.contains_key(&id) {
            return Err(Error::UnknownSegment(id));
        }

        Ok(MemorySegmentReader {
            id,
            segments: self.segments.clone(),
        })
    }

    async fn is_closed(&self, id: SegmentId) -> Result<bool, Self::Error> {
        let segments = self.segments.lock().await;
        let state = segments.get(&id).ok_or(Error::UnknownSegment(id))?;

        Ok(state.closed)
    }
}
