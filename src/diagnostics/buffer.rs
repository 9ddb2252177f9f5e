//! In-memory queue of pending diagnostic records.

use std::sync::{Mutex, MutexGuard};

use super::record::DiagnosticRecord;

/// Ordered queue of records waiting for a flush.
///
/// Records are stored whole, so every field of entry *i* belongs to the same
/// event. The lock is only held for the push or the drain, never across a sink
/// write.
#[derive(Debug)]
pub struct DiagnosticsBuffer {
    records: Mutex<Vec<DiagnosticRecord>>,
    threshold: usize,
}

impl DiagnosticsBuffer {
    /// Creates an empty buffer that reports overflow at `threshold` records.
    pub fn new(threshold: usize) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            threshold: threshold.max(1),
        }
    }

    /// Appends a record and returns the new length.
    pub fn push(&self, record: DiagnosticRecord) -> usize {
        let mut records = self.lock();
        records.push(record);
        records.len()
    }

    /// Takes every pending record, leaving the buffer empty.
    pub fn drain(&self) -> Vec<DiagnosticRecord> {
        std::mem::take(&mut *self.lock())
    }

    /// Puts records that could not be written back in front of anything
    /// logged since they were drained.
    pub fn requeue(&self, mut records: Vec<DiagnosticRecord>) {
        if records.is_empty() {
            return;
        }
        let mut pending = self.lock();
        records.append(&mut pending);
        *pending = records;
    }

    /// Whether `len` has reached the overflow threshold.
    pub fn is_overflowing(&self, len: usize) -> bool {
        len >= self.threshold
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the pending records, in capture order.
    pub fn snapshot(&self) -> Vec<DiagnosticRecord> {
        self.lock().clone()
    }

    // A panic inside another logging call must not disable diagnostics.
    fn lock(&self) -> MutexGuard<'_, Vec<DiagnosticRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
