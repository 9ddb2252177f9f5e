//! `log` facade hook that feeds [`Diagnostics`].
//!
//! Once installed, every `log::info!`/`log::warn!`/... call in the process is
//! routed through [`Diagnostics::dispatch`] and buffered (or written straight to
//! the terminal, depending on the dispatch mode).

use std::sync::Arc;

use log::{LevelFilter, Metadata, Record};

use crate::error_handling::InitializationError;

use super::{Diagnostics, Severity, SourceLocation};

/// `log::Log` implementation forwarding records to a shared [`Diagnostics`].
pub struct DiagnosticsLogger {
    diagnostics: Arc<Diagnostics>,
    level: LevelFilter,
}

impl DiagnosticsLogger {
    pub fn new(diagnostics: Arc<Diagnostics>, level: LevelFilter) -> Self {
        Self { diagnostics, level }
    }

    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }
}

impl log::Log for DiagnosticsLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        if metadata.level() > self.level {
            return false;
        }
        // Query logging from the database sink would otherwise refill the buffer.
        if metadata.target().starts_with("sqlx") {
            return metadata.level() <= log::Level::Warn;
        }
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let location = SourceLocation::new(
            record.file().unwrap_or_default(),
            record.module_path().unwrap_or_else(|| record.target()),
            record.line().unwrap_or_default(),
        );
        self.diagnostics.dispatch(
            Severity::from(record.level()),
            location,
            record.args().to_string(),
        );
    }

    fn flush(&self) {
        self.diagnostics.flush_blocking();
    }
}

/// Registers a [`DiagnosticsLogger`] as the process-wide logger.
///
/// Fails if a logger (for example `env_logger`) is already installed.
pub fn install_diagnostics_logger(
    diagnostics: Arc<Diagnostics>,
    level: LevelFilter,
) -> Result<(), InitializationError> {
    log::set_boxed_logger(Box::new(DiagnosticsLogger::new(diagnostics, level)))?;
    log::set_max_level(level);
    Ok(())
}
