// Shared test helpers for diagnostics setup.
//
// Every helper writes terminal output to a CaptureWriter so tests can inspect
// exactly what reached the terminal.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use diag_support::diagnostics::{CaptureWriter, TerminalSink};
use diag_support::{ConnectionManager, ConnectionParams, Diagnostics, DiagnosticsConfig};

/// Diagnostics with no database: flushes go to the captured terminal.
#[allow(dead_code)] // Used by other test files
pub fn terminal_diagnostics(config: DiagnosticsConfig) -> (Arc<Diagnostics>, CaptureWriter) {
    let capture = CaptureWriter::new();
    let diagnostics = Arc::new(Diagnostics::new(
        config,
        Arc::new(ConnectionManager::with_base_name("test")),
        TerminalSink::with_writer(capture.clone()),
    ));
    (diagnostics, capture)
}

/// Diagnostics with a SQLite diagnostics connection in a fresh temp directory.
/// Keep the returned `TempDir` alive for the duration of the test.
#[allow(dead_code)] // Used by other test files
pub async fn database_diagnostics(
    config: DiagnosticsConfig,
) -> (Arc<Diagnostics>, CaptureWriter, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let (diagnostics, capture) = terminal_diagnostics(config);
    let params = ConnectionParams {
        driver: "sqlite".to_string(),
        database: dir.path().join("diag.db").to_string_lossy().to_string(),
        ..Default::default()
    };
    diagnostics
        .connections()
        .open_diagnostics(&params, None)
        .await
        .expect("Failed to open diagnostics database");
    (diagnostics, capture, dir)
}

/// Messages stored in `DebugInfo`, in insertion order.
#[allow(dead_code)] // Used by other test files
pub async fn stored_messages(diagnostics: &Diagnostics) -> Vec<String> {
    let handle = diagnostics
        .connections()
        .diagnostics()
        .expect("diagnostics connection should be open");
    sqlx::query_scalar("SELECT Message FROM DebugInfo ORDER BY idDebugInfo")
        .fetch_all(handle.pool())
        .await
        .expect("Failed to read DebugInfo")
}

/// Lets the millisecond clock move past the last captured record.
#[allow(dead_code)] // Used by other test files
pub async fn tick() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}
