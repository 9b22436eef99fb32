use std::time::Duration;

use chainlog_leadership::RoleSignal;
use chainlog_metastore::{CreateOutcome, MetaStore, MetaStoreError, SwapOutcome};
use chainlog_segment::{
    AppendOutcome, RecoverOutcome, SegmentAppender, SegmentError, SegmentId, SegmentReader,
    SegmentStore,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec;
use crate::config::DriverConfig;
use crate::entry::{Cursor, EntryId};
use crate::error::DriverError;
use crate::record::{RecordConsumer, RecordProducer, Role};
use crate::retry::with_backoff;

/// The central state machine: leads while elected, follows otherwise, and
/// carries the resume cursor across every role switch.
///
/// A single driver task performs all log I/O. The election service only
/// writes the role signal; the driver observes it between blocking steps,
/// so a deposed leader stops appending within one tick (and the segment
/// store's fencing stops it regardless).
pub struct LogDriver<M, S, P, C>
where
    M: MetaStore,
    S: SegmentStore,
    P: RecordProducer,
    C: RecordConsumer,
{
    meta: M,
    segments: S,
    producer: P,
    consumer: C,
    signal: RoleSignal,
    config: DriverConfig,
    cancel: CancellationToken,
}

impl<M, S, P, C> LogDriver<M, S, P, C>
where
    M: MetaStore,
    S: SegmentStore,
    P: RecordProducer,
    C: RecordConsumer,
{
    /// Creates a driver. `signal` should come from an enrolled candidacy;
    /// `cancel` stops the driver at the next blocking point.
    pub fn new(
        meta: M,
        segments: S,
        signal: RoleSignal,
        producer: P,
        consumer: C,
        config: DriverConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            meta,
            segments,
            producer,
            consumer,
            signal,
            config,
            cancel,
        }
    }

    /// Runs the Lead/Follow loop until cancelled or a fatal error occurs.
    /// Returns the last delivered cursor.
    pub async fn run(mut self) -> Result<Cursor, DriverError<M::Error, S::Error>> {
        let mut cursor: Cursor = None;

        while !self.cancel.is_cancelled() {
            cursor = if self.signal.is_leader() {
                info!("assuming leader role");
                self.lead(cursor).await?
            } else {
                info!("assuming follower role");
                self.follow(cursor).await?
            };
        }

        Ok(cursor)
    }

    /// One leadership tenure: catch up on everything previous leaders
    /// wrote, publish a fresh segment, and append on a fixed cadence until
    /// deposed, fenced, or cancelled.
    ///
    /// The belief that this process is leader can go stale at any point;
    /// every step that would extend the log is guarded by the metadata CAS
    /// or by append-time fencing, and losing either race abandons the
    /// tenure with the cursor intact.
    pub async fn lead(
        &mut self,
        mut cursor: Cursor,
    ) -> Result<Cursor, DriverError<M::Error, S::Error>> {
        let (mut list, version) = match self.read_segment_list().await? {
            Some((list, version)) => (list, Some(version)),
            None => (Vec::new(), None),
        };

        // Catch-up: replay closed segments, sealing any the previous leader
        // abandoned mid-write.
        for &segment in &list[start_index(&list, cursor)..] {
            let outcome = self
                .segments
                .open_with_recovery(segment)
                .await
                .map_err(DriverError::Segment)?;

            let reader = match outcome {
                RecoverOutcome::Sealed(reader) => reader,
                RecoverOutcome::Unrecoverable => {
                    warn!(%segment, "segment unrecoverable, catch-up truncated");
                    return Ok(cursor);
                }
            };

            cursor = self
                .deliver_confirmed(&reader, cursor, Role::Leader)
                .await
                .map_err(DriverError::Segment)?;
        }

        // Publish a new segment at the end of the list. Exactly one
        // contender wins each list position; the losers abandon their
        // segment and re-derive state on the next Lead/Follow call.
        let appender = self
            .segments
            .create(self.config.replication)
            .await
            .map_err(DriverError::Segment)?;
        list.push(appender.id());
        let encoded = codec::encode_segment_list(&list);

        let published = match version {
            None => {
                let meta = self.meta.clone();
                let key = self.config.log_key.clone();
                let outcome = with_backoff(
                    &self.config.meta_retry,
                    |e: &M::Error| e.is_transient(),
                    || meta.create_if_absent(key.clone(), encoded.clone()),
                )
                .await
                .map_err(DriverError::from_meta_retry)?;

                outcome == CreateOutcome::Created
            }
            Some(version) => {
                let meta = self.meta.clone();
                let key = self.config.log_key.clone();
                let outcome = with_backoff(
                    &self.config.meta_retry,
                    |e: &M::Error| e.is_transient(),
                    || meta.compare_and_swap(key.clone(), encoded.clone(), version),
                )
                .await
                .map_err(DriverError::from_meta_retry)?;

                matches!(outcome, SwapOutcome::Applied { .. })
            }
        };

        if !published {
            info!(
                segment = %appender.id(),
                "lost segment list publication race, abandoning tenure"
            );
            // The unpublished segment is unreachable; seal it rather than
            // leak an open segment.
            if let Err(error) = appender.close().await {
                debug!(segment = %appender.id(), %error, "could not close abandoned segment");
            }
            return Ok(cursor);
        }

        info!(segment = %appender.id(), "leading on new segment");

        // Append loop. The segment is deliberately left open on exit:
        // sealing it is the successor's recovery open, which also fences
        // this handle if we only *think* we are still leader.
        while self.signal.is_leader() && !self.cancel.is_cancelled() {
            self.wait_tick(self.config.append_interval).await;
            if !self.signal.is_leader() || self.cancel.is_cancelled() {
                break;
            }

            let payload = self.producer.produce();
            let outcome = appender
                .append(payload.clone())
                .await
                .map_err(DriverError::Segment)?;

            match outcome {
                AppendOutcome::Appended { offset } => {
                    let id = EntryId::new(appender.id(), offset);
                    self.consumer.consume(id, &payload, Role::Leader);
                    debug!(entry = %id, "appended");
                    cursor = Some(id);
                }
                AppendOutcome::Fenced => {
                    warn!(segment = %appender.id(), "fenced mid-append, stepping down");
                    break;
                }
            }
        }

        Ok(cursor)
    }

    /// One followership stretch: tail the segment chain, delivering entries
    /// as they are confirmed, until elected leader or cancelled.
    pub async fn follow(
        &mut self,
        mut cursor: Cursor,
    ) -> Result<Cursor, DriverError<M::Error, S::Error>> {
        // The first leader may not have published the list yet.
        let mut attempts = 0;
        let mut list = loop {
            if self.signal.is_leader() || self.cancel.is_cancelled() {
                return Ok(cursor);
            }

            match self.read_segment_list().await? {
                Some((list, _)) => break list,
                None => {
                    attempts += 1;
                    if attempts >= self.config.list_wait.max_attempts {
                        return Err(DriverError::ListWaitExhausted { attempts });
                    }
                    let delay = self.config.list_wait.delay(attempts);
                    debug!(attempts, "segment list not created yet");
                    self.wait_tick(delay).await;
                }
            }
        };

        let mut to_read = list.split_off(start_index(&list, cursor));

        loop {
            if self.signal.is_leader() || self.cancel.is_cancelled() {
                return Ok(cursor);
            }

            for &segment in &to_read {
                cursor = self.tail_segment(segment, cursor).await?;
                if self.signal.is_leader() || self.cancel.is_cancelled() {
                    return Ok(cursor);
                }
            }

            // Pick up segments published since the last look at the list.
            to_read = match self.read_segment_list().await? {
                Some((list, _)) => match cursor {
                    Some(c) => match list.iter().position(|s| *s == c.segment) {
                        Some(index) => list[index + 1..].to_vec(),
                        None => {
                            warn!(segment = %c.segment, "cursor segment missing from list, rescanning");
                            list
                        }
                    },
                    None => list,
                },
                None => {
                    warn!("segment list disappeared, waiting for it to be recreated");
                    Vec::new()
                }
            };

            if to_read.is_empty() {
                self.wait_tick(self.config.poll_interval).await;
            }
        }
    }

    /// Polls one segment until it is sealed and fully delivered, using
    /// non-recovery opens so a live leader is never fenced.
    async fn tail_segment(
        &mut self,
        segment: SegmentId,
        mut cursor: Cursor,
    ) -> Result<Cursor, DriverError<M::Error, S::Error>> {
        loop {
            if self.signal.is_leader() || self.cancel.is_cancelled() {
                return Ok(cursor);
            }

            match self.probe_segment(segment, cursor).await {
                Ok((new_cursor, closed)) => {
                    cursor = new_cursor;
                    if closed {
                        return Ok(cursor);
                    }
                }
                Err(error) if error.is_transient() => {
                    debug!(%segment, %error, "segment not readable yet");
                }
                Err(error) => return Err(DriverError::Segment(error)),
            }

            self.wait_tick(self.config.poll_interval).await;
        }
    }

    /// One tailing probe: closed-state first, then read, so a `true` here
    /// means the delivered entries were final.
    async fn probe_segment(
        &mut self,
        segment: SegmentId,
        cursor: Cursor,
    ) -> Result<(Cursor, bool), S::Error> {
        let closed = self.segments.is_closed(segment).await?;
        let reader = self.segments.open_no_recovery(segment).await?;
        let cursor = self.deliver_confirmed(&reader, cursor, Role::Follower).await?;

        Ok((cursor, closed))
    }

    /// Delivers every confirmed entry of `reader` past the cursor, in
    /// ascending offset order.
    async fn deliver_confirmed(
        &mut self,
        reader: &S::Reader,
        mut cursor: Cursor,
        role: Role,
    ) -> Result<Cursor, S::Error> {
        let segment = reader.id();
        let from = next_offset(cursor, segment);

        let Some(last) = reader.last_confirmed().await? else {
            return Ok(cursor);
        };
        if last < from {
            return Ok(cursor);
        }

        for (i, payload) in reader.read(from, last).await?.into_iter().enumerate() {
            let id = EntryId::new(segment, from + i as u64);
            self.consumer.consume(id, &payload, role);
            debug!(entry = %id, %role, "delivered");
            cursor = Some(id);
        }

        Ok(cursor)
    }

    /// Reads and decodes the segment list, retrying transient store
    /// failures within the configured budget. `None` means the key does
    /// not exist yet.
    async fn read_segment_list(
        &self,
    ) -> Result<Option<(Vec<SegmentId>, u64)>, DriverError<M::Error, S::Error>> {
        let meta = self.meta.clone();
        let key = self.config.log_key.clone();

        let value = with_backoff(
            &self.config.meta_retry,
            |e: &M::Error| e.is_transient(),
            || meta.read(key.clone()),
        )
        .await
        .map_err(DriverError::from_meta_retry)?;

        match value {
            Some(value) => {
                let list = codec::decode_segment_list(&value.bytes)?;
                Ok(Some((list, value.version)))
            }
            None => Ok(None),
        }
    }

    /// Sleeps for `duration`, waking early on cancellation or a role
    /// change so the caller can re-check its loop condition.
    async fn wait_tick(&mut self, duration: Duration) {
        let cancel = self.cancel.clone();
        let signal = &mut self.signal;

        tokio::select! {
            () = cancel.cancelled() => {}
            () = signal.changed() => {}
            () = tokio::time::sleep(duration) => {}
        }
    }
}

/// Index of the first segment to scan: the cursor's segment, or the whole
/// list for a fresh cursor.
fn start_index(list: &[SegmentId], cursor: Cursor) -> usize {
    let Some(cursor) = cursor else { return 0 };

    list.iter()
        .position(|segment| *segment == cursor.segment)
        .unwrap_or_else(|| {
            warn!(segment = %cursor.segment, "cursor segment missing from list, rescanning");
            0
        })
}

/// First offset still undelivered in `segment`.
fn next_offset(cursor: Cursor, segment: SegmentId) -> u64 {
    match cursor {
        Some(c) if c.segment == segment => c.offset + 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_index_fresh_cursor_scans_everything() {
        let list = [SegmentId(3), SegmentId(5), SegmentId(9)];

        assert_eq!(start_index(&list, None), 0);
    }

    #[test]
    fn test_start_index_resumes_at_cursor_segment() {
        let list = [SegmentId(3), SegmentId(5), SegmentId(9)];
        let cursor = Some(EntryId::new(SegmentId(5), 7));

        assert_eq!(start_index(&list, cursor), 1);
    }

    #[test]
    fn test_start_index_missing_segment_rescans() {
        let list = [SegmentId(3), SegmentId(5)];
        let cursor = Some(EntryId::new(SegmentId(8), 0));

        assert_eq!(start_index(&list, cursor), 0);
    }

    #[test]
    fn test_next_offset() {
        let cursor = Some(EntryId::new(SegmentId(5), 7));

        assert_eq!(next_offset(cursor, SegmentId(5)), 8);
        assert_eq!(next_offset(cursor, SegmentId(9)), 0);
        assert_eq!(next_offset(None, SegmentId(5)), 0);
    }
}
