//! Process-level setup.
//!
//! This module provides functions to initialize the shared resources:
//! - the tool's own `env_logger` output
//! - a [`Diagnostics`] instance with its connection manager
//! - the diagnostics connection, opened from a URL

mod logger;

use std::sync::Arc;

use crate::config::DiagnosticsConfig;
use crate::connection::{ConnectionManager, ConnectionRole};
use crate::diagnostics::{Diagnostics, TerminalSink};
use crate::error_handling::ConnectionError;

pub use crate::diagnostics::install_diagnostics_logger;
pub use logger::init_logger_with;

/// Creates a shared [`Diagnostics`] writing terminal output to standard error.
///
/// Connections are named after `base_name` (the diagnostics connection is
/// `Debug<base_name>`).
pub fn init_diagnostics(config: DiagnosticsConfig, base_name: &str) -> Arc<Diagnostics> {
    Arc::new(Diagnostics::new(
        config,
        Arc::new(ConnectionManager::with_base_name(base_name)),
        TerminalSink::stderr(),
    ))
}

/// Opens the diagnostics connection from `url`.
///
/// On failure the error is returned and records keep going to the terminal.
pub async fn init_diagnostics_connection(
    diagnostics: &Diagnostics,
    url: &str,
) -> Result<(), ConnectionError> {
    diagnostics
        .connections()
        .open_url(url, ConnectionRole::Diagnostics)
        .await?;
    Ok(())
}
