//! Terminal sink.
//!
//! Writes records as fixed-width lines to standard error (or an injected
//! writer), flushing after every line. Writers on different threads take
//! turns on the writer lock. A write started from inside another write on the
//! same thread (the writer itself logging) returns immediately instead.

use std::cell::Cell;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

use super::record::DiagnosticRecord;

type BoxedWriter = Box<dyn Write + Send>;

thread_local! {
    // Address of the sink this thread is writing to, 0 when idle.
    static WRITING: Cell<usize> = const { Cell::new(0) };
}

/// Destination for records when no database is available.
pub struct TerminalSink {
    writer: Mutex<BoxedWriter>,
}

impl TerminalSink {
    /// Sink writing to the process's standard error.
    pub fn stderr() -> Self {
        Self::with_writer(std::io::stderr())
    }

    /// Sink writing to `writer`.
    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Writes every record in order.
    ///
    /// Blocks while another thread holds the writer. Returns `false` without
    /// writing only when called from inside a write to this sink on the
    /// current thread (for example when writing triggered another log call).
    pub fn write_records(&self, records: &[DiagnosticRecord]) -> bool {
        if self.is_writing_here() {
            return false;
        }
        let _writing = WritingGuard::enter(self.id());

        let mut writer = self.lock();
        for record in records {
            // Nowhere left to report a failing terminal; keep going.
            let _ = writeln!(writer, "{}", record.terminal_line()).and_then(|_| writer.flush());
        }
        true
    }

    /// Whether the current thread is inside a write to this sink.
    pub fn is_writing_here(&self) -> bool {
        WRITING.with(|writing| writing.get() == self.id())
    }

    fn id(&self) -> usize {
        self as *const Self as usize
    }

    fn lock(&self) -> MutexGuard<'_, BoxedWriter> {
        self.writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::stderr()
    }
}

impl std::fmt::Debug for TerminalSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalSink")
            .field("writing_here", &self.is_writing_here())
            .finish_non_exhaustive()
    }
}

/// Marks the current thread as writing to one sink; restores the previous
/// mark on drop so nested writes to other sinks unwind correctly.
struct WritingGuard {
    previous: usize,
}

impl WritingGuard {
    fn enter(id: usize) -> Self {
        Self {
            previous: WRITING.with(|writing| writing.replace(id)),
        }
    }
}

impl Drop for WritingGuard {
    fn drop(&mut self) {
        WRITING.with(|writing| writing.set(self.previous));
    }
}

/// Cloneable in-memory writer, for capturing terminal output.
#[derive(Debug, Clone, Default)]
pub struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl CaptureWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes()).into_owned()
    }

    /// Lines written so far.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }

    fn bytes(&self) -> MutexGuard<'_, Vec<u8>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.bytes().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
