//! diag_support library: buffered diagnostics with database and terminal sinks
//!
//! Log calls are captured in memory and flushed in batches to a `DebugInfo`
//! table on a diagnostics connection, or to standard error when no database is
//! open. Each record carries the revision tag of the source tree the program was
//! built from. Stored records can be replayed by time window for periodic
//! catch-up review.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use diag_support::initialization::{init_diagnostics, init_diagnostics_connection};
//! use diag_support::{install_diagnostics_logger, now_millis, DiagnosticsConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let diagnostics = init_diagnostics(DiagnosticsConfig::default(), "inventory");
//! init_diagnostics_connection(&diagnostics, "sqlite:///var/lib/inventory/diag.db").await?;
//! install_diagnostics_logger(Arc::clone(&diagnostics), log::LevelFilter::Debug)?;
//!
//! let checkpoint = now_millis();
//! log::warn!("disk almost full");
//! diagnostics.flush().await;
//! diagnostics.collect_since(checkpoint).await;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! Flushing to a database and replay are async and need a Tokio runtime.
//! Buffering, Fatal handling and `Drop` work from synchronous code too.

pub mod app;
pub mod config;
pub mod connection;
pub mod diagnostics;
pub mod error_handling;
pub mod initialization;
pub mod revision;
mod timezone;

// Re-export public API
pub use config::{DiagnosticsConfig, LogFormat, LogLevel};
pub use connection::{ConnectionHandle, ConnectionManager, ConnectionParams, ConnectionRole};
pub use diagnostics::{
    install_diagnostics_logger, now_millis, Diagnostics, DiagnosticsLogger, DiagnosticsReview,
    DispatchMode, FlushOutcome, Severity, SourceLocation, WriteReport,
};
pub use error_handling::{ConnectionError, DatabaseError, InitializationError, RevisionError};
pub use revision::{GitCommand, RevisionTagResolver, TagSource};
pub use timezone::{local_time_zone_sql, set_db_time_zone_sql};
