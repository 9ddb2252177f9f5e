//! Buffered diagnostics.
//!
//! Log calls are captured as [`DiagnosticRecord`]s in an in-memory buffer and
//! flushed as a batch, either to the `DebugInfo` table of the diagnostics
//! connection or, when no such connection is open, to the terminal. Stored
//! records can be replayed by time window (see [`Diagnostics::collect_since`]).
//!
//! The buffer is bounded: reaching the overflow threshold writes everything to
//! the terminal. A [`Severity::Fatal`] record flushes and then terminates.

mod buffer;
mod database;
mod logger;
mod mode;
mod record;
mod replay;
mod terminal;

use std::sync::{Arc, RwLock};

use crate::config::{DiagnosticsConfig, NOT_SET_TAG};
use crate::connection::ConnectionManager;

pub use buffer::DiagnosticsBuffer;
pub use database::{
    ensure_table, fetch_window, retention_cutoff, StoredRecord, WriteOptions, WriteReport,
};
pub use logger::{install_diagnostics_logger, DiagnosticsLogger};
pub use mode::{DispatchMode, ModeCell, ModeGuard};
pub use record::{
    file_basename, format_time, now_millis, parse_time, trim_function_name, DiagnosticRecord,
    Severity, SourceLocation,
};
pub use replay::{bare_function_name, format_replay_line, DiagnosticsReview};
pub use terminal::{CaptureWriter, TerminalSink};

type FatalHandler = Box<dyn Fn() + Send + Sync>;

/// Where a flush sent the drained records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was pending; no sink was invoked.
    Empty,
    /// Records written to the terminal.
    Terminal(usize),
    /// Records written to the diagnostics database.
    Database(WriteReport),
    /// The flush ran inside a terminal write on the same thread; the records
    /// went back to the buffer.
    Deferred(usize),
}

/// Buffering diagnostics logger.
///
/// One instance is normally shared as `Arc<Diagnostics>` between the
/// [`DiagnosticsLogger`] hook, any [`DiagnosticsReview`] task and the code
/// that opens connections.
pub struct Diagnostics {
    config: DiagnosticsConfig,
    buffer: DiagnosticsBuffer,
    mode: ModeCell,
    terminal: TerminalSink,
    connections: Arc<ConnectionManager>,
    revision_tag: RwLock<String>,
    fatal_handler: FatalHandler,
}

impl Diagnostics {
    /// Creates an instance writing terminal output to `terminal`.
    ///
    /// Immediate mode starts in [`DispatchMode::DirectTerminal`].
    pub fn new(
        config: DiagnosticsConfig,
        connections: Arc<ConnectionManager>,
        terminal: TerminalSink,
    ) -> Self {
        let mode = if config.immediate {
            DispatchMode::DirectTerminal
        } else {
            DispatchMode::Buffering
        };
        Self {
            buffer: DiagnosticsBuffer::new(config.overflow_threshold),
            mode: ModeCell::new(mode),
            terminal,
            connections,
            revision_tag: RwLock::new(NOT_SET_TAG.to_string()),
            fatal_handler: Box::new(|| std::process::abort()),
            config,
        }
    }

    /// Replaces what happens after a Fatal record has been flushed.
    pub fn with_fatal_handler(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.fatal_handler = Box::new(handler);
        self
    }

    pub fn config(&self) -> &DiagnosticsConfig {
        &self.config
    }

    pub fn buffer(&self) -> &DiagnosticsBuffer {
        &self.buffer
    }

    pub fn mode(&self) -> &ModeCell {
        &self.mode
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    /// Tag stamped on every record captured from now on.
    pub fn set_revision_tag(&self, tag: impl Into<String>) {
        *self
            .revision_tag
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = tag.into();
    }

    pub fn revision_tag(&self) -> String {
        self.revision_tag
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Routes one log call according to the current [`DispatchMode`].
    pub fn dispatch(
        &self,
        severity: Severity,
        location: SourceLocation,
        message: impl Into<String>,
    ) {
        match self.mode.get() {
            DispatchMode::Buffering => self.append(severity, location, message),
            DispatchMode::DirectTerminal => self.emit_direct(severity, location, message),
        }
    }

    /// Buffers one record.
    ///
    /// A Fatal record is flushed together with everything pending and the
    /// fatal handler runs afterwards, whatever the flush did. Reaching the
    /// overflow threshold writes the buffer to the terminal.
    pub fn append(
        &self,
        severity: Severity,
        location: SourceLocation,
        message: impl Into<String>,
    ) {
        let record = DiagnosticRecord::capture(severity, self.revision_tag(), location, message);
        let len = self.buffer.push(record);

        if severity == Severity::Fatal {
            self.flush_blocking();
            (self.fatal_handler)();
            return;
        }

        if self.buffer.is_overflowing(len) {
            self.overflow_flush();
        }
    }

    /// Writes pending records and then this one straight to the terminal.
    ///
    /// When the terminal write itself logged something, the records stay
    /// buffered for the next flush. Fatal runs the fatal handler either way.
    fn emit_direct(
        &self,
        severity: Severity,
        location: SourceLocation,
        message: impl Into<String>,
    ) {
        let mut records = self.buffer.drain();
        records.push(DiagnosticRecord::capture(
            severity,
            self.revision_tag(),
            location,
            message,
        ));
        self.write_terminal(records);

        if severity == Severity::Fatal {
            (self.fatal_handler)();
        }
    }

    fn overflow_flush(&self) {
        let _direct = self.mode.enter_direct();
        let records = self.buffer.drain();
        if !records.is_empty() {
            self.write_terminal(records);
        }
    }

    /// Writes `records` to the terminal, requeueing them if this thread is
    /// already inside a terminal write.
    fn write_terminal(&self, records: Vec<DiagnosticRecord>) -> bool {
        if self.terminal.write_records(&records) {
            return true;
        }
        self.buffer.requeue(records);
        false
    }

    /// Drains the buffer into the diagnostics database, or the terminal when
    /// no diagnostics connection is open.
    ///
    /// Records logged while the write is in progress stay buffered for the
    /// next flush.
    pub async fn flush(&self) -> FlushOutcome {
        let records = self.buffer.drain();
        if records.is_empty() {
            return FlushOutcome::Empty;
        }

        match self.connections.diagnostics() {
            Some(handle) => {
                let report =
                    database::write_records(&handle, &records, self.write_options()).await;
                FlushOutcome::Database(report)
            }
            None => {
                let count = records.len();
                if self.write_terminal(records) {
                    FlushOutcome::Terminal(count)
                } else {
                    FlushOutcome::Deferred(count)
                }
            }
        }
    }

    /// Synchronous [`flush`](Self::flush) for callers outside async code.
    ///
    /// The database write runs on a scoped helper thread with its own
    /// current-thread runtime, so this is safe to call from inside a runtime
    /// as well.
    pub fn flush_blocking(&self) {
        if self.buffer.is_empty() {
            return;
        }
        if self.connections.diagnostics().is_none() {
            self.write_terminal(self.buffer.drain());
            return;
        }

        std::thread::scope(|scope| {
            let worker = scope.spawn(|| {
                match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => {
                        runtime.block_on(self.flush());
                    }
                    Err(e) => {
                        log::error!("Failed to start diagnostics flush runtime: {e}");
                        self.write_terminal(self.buffer.drain());
                    }
                }
            });
            if worker.join().is_err() {
                log::error!("Diagnostics flush thread panicked");
            }
        });
    }

    fn write_options(&self) -> WriteOptions {
        WriteOptions {
            strip_quotes: self.config.strip_quotes,
            retention_days: self.config.retention_days,
        }
    }
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("config", &self.config)
            .field("pending", &self.buffer.len())
            .field("mode", &self.mode.get())
            .field("revision_tag", &self.revision_tag())
            .finish_non_exhaustive()
    }
}

impl Drop for Diagnostics {
    fn drop(&mut self) {
        self.flush_blocking();
    }
}
