//! The movement ingestion buffer.
//!
//! Fine-grained input samples (key presses, pointer moves, clicks) arrive at
//! a much higher rate than transition events; committing each one
//! individually would hammer the store. The buffer accumulates them and
//! flushes wholesale, bounded by a size threshold and, via the flush worker,
//! a wall-clock interval. The current batch is the only state that can be
//! lost on abrupt termination.

use std::sync::Mutex;

use dw_core::{MovementSample, SubjectId};

use crate::{EngineError, SharedDb, lock};

/// Concurrency-safe accumulator for movement samples.
///
/// One mutex guards the pending batch for both [`record`](Self::record) and
/// [`flush`](Self::flush), so a flush triggered on the recording thread and
/// one on the timer thread can interleave without double-flushing or losing
/// samples. The persist call itself runs outside the batch lock.
pub struct MovementBuffer {
    store: SharedDb,
    subject: SubjectId,
    threshold: usize,
    pending: Mutex<Vec<MovementSample>>,
}

impl MovementBuffer {
    pub(crate) fn new(store: SharedDb, subject: SubjectId, threshold: usize) -> Self {
        Self {
            store,
            subject,
            threshold: threshold.max(1),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// The subject this buffer records for.
    #[must_use]
    pub fn subject(&self) -> &SubjectId {
        &self.subject
    }

    /// Appends a sample, flushing inline once the batch reaches the size
    /// threshold.
    ///
    /// A flush failure is surfaced to the caller; the samples stay buffered
    /// for the next scheduled flush.
    pub fn record(&self, sample: MovementSample) -> Result<(), EngineError> {
        let should_flush = {
            let mut pending = lock(&self.pending);
            pending.push(sample);
            pending.len() >= self.threshold
        };
        if should_flush {
            self.flush()?;
        }
        Ok(())
    }

    /// Takes the current batch and persists it, returning the number of
    /// samples written.
    ///
    /// The swap is atomic under the batch lock; on a store failure the taken
    /// samples are re-queued ahead of anything recorded in the meantime and
    /// the error is returned, so no data is dropped and no automatic retry
    /// happens in the hot path.
    pub fn flush(&self) -> Result<usize, EngineError> {
        let batch = {
            let mut pending = lock(&self.pending);
            if pending.is_empty() {
                return Ok(0);
            }
            std::mem::take(&mut *pending)
        };

        let written = {
            let mut db = lock(&self.store);
            db.insert_movement_samples(&self.subject, &batch)
        };

        match written {
            Ok(count) => Ok(count),
            Err(err) => {
                let mut pending = lock(&self.pending);
                let mut restored = batch;
                restored.append(&mut pending);
                *pending = restored;
                Err(err.into())
            }
        }
    }

    /// Number of samples currently buffered.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        lock(&self.pending).len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use dw_core::MovementKind;
    use dw_db::Database;

    use super::*;

    fn sample(n: i64) -> MovementSample {
        MovementSample::new(
            Utc.with_ymd_and_hms(2025, 2, 3, 8, 0, 0).unwrap() + chrono::Duration::seconds(n),
            MovementKind::MouseMove,
            format!("x:{n},y:{n}"),
            1.0,
        )
    }

    fn store_with_subject(id: &str) -> (SharedDb, SubjectId) {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let subject = SubjectId::new(id).unwrap();
        db.upsert_subject(&subject, None, None).unwrap();
        (Arc::new(Mutex::new(db)), subject)
    }

    #[test]
    fn reaching_the_threshold_auto_flushes() {
        let (store, subject) = store_with_subject("emp-001");
        let buffer = MovementBuffer::new(Arc::clone(&store), subject, 50);

        for n in 0..49 {
            buffer.record(sample(n)).unwrap();
        }
        assert_eq!(buffer.pending_len(), 49);
        assert_eq!(lock(&store).movement_count().unwrap(), 0);

        buffer.record(sample(49)).unwrap();
        assert_eq!(buffer.pending_len(), 0);
        assert_eq!(lock(&store).movement_count().unwrap(), 50);
    }

    #[test]
    fn explicit_flush_drains_the_batch() {
        let (store, subject) = store_with_subject("emp-001");
        let buffer = MovementBuffer::new(Arc::clone(&store), subject, 50);

        buffer.record(sample(0)).unwrap();
        buffer.record(sample(1)).unwrap();

        assert_eq!(buffer.flush().unwrap(), 2);
        assert_eq!(buffer.pending_len(), 0);
        assert_eq!(buffer.flush().unwrap(), 0);
        assert_eq!(lock(&store).movement_count().unwrap(), 2);
    }

    #[test]
    fn failed_flush_keeps_the_batch_for_retry() {
        // The subject is never registered, so the foreign key constraint
        // rejects the write.
        let db = Database::open_in_memory().expect("open in-memory db");
        let store: SharedDb = Arc::new(Mutex::new(db));
        let subject = SubjectId::new("ghost").unwrap();
        let buffer = MovementBuffer::new(Arc::clone(&store), subject.clone(), 50);

        buffer.record(sample(0)).unwrap();
        buffer.record(sample(1)).unwrap();

        assert!(buffer.flush().is_err());
        assert_eq!(buffer.pending_len(), 2);
        assert_eq!(lock(&store).movement_count().unwrap(), 0);

        // Registering the subject lets the next scheduled flush succeed.
        lock(&store).upsert_subject(&subject, None, None).unwrap();
        assert_eq!(buffer.flush().unwrap(), 2);
        assert_eq!(buffer.pending_len(), 0);
    }

    #[test]
    fn concurrent_recorders_lose_nothing() {
        let (store, subject) = store_with_subject("emp-001");
        let buffer = Arc::new(MovementBuffer::new(Arc::clone(&store), subject, 10));

        let mut handles = Vec::new();
        for thread in 0..4 {
            let buffer = Arc::clone(&buffer);
            handles.push(std::thread::spawn(move || {
                for n in 0..25 {
                    buffer.record(sample(thread * 100 + n)).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().expect("recorder thread");
        }
        buffer.flush().unwrap();

        assert_eq!(lock(&store).movement_count().unwrap(), 100);
        assert_eq!(buffer.pending_len(), 0);
    }
}
