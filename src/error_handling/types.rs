//! Error type definitions.
//!
//! This module defines the error types returned by connection setup, database
//! writes, revision discovery and logger initialization.

use log::SetLoggerError;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),
}

/// Error types for opening named database connections.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The driver name is not one this crate can open.
    #[error("Unsupported database driver: {0}")]
    UnsupportedDriver(String),

    /// The connection string could not be parsed.
    #[error("Invalid connection URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Error creating the SQLite database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// The driver refused the connection.
    #[error("Unable to open database connection '{name}': {source}")]
    ConnectError {
        name: String,
        #[source]
        source: sqlx::Error,
    },
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// The handle's pool has been closed.
    #[error("Database connection '{0}' is not open")]
    NotOpen(String),
}

/// Error types for revision tag discovery.
#[derive(Error, Debug)]
pub enum RevisionError {
    /// Reading or writing the tag cache, or spawning the command, failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The version-control command exited unsuccessfully.
    #[error("Revision command failed ({status}): {stderr}")]
    CommandFailed { status: String, stderr: String },

    /// The version-control command printed nothing.
    #[error("Revision command produced no output")]
    EmptyOutput,
}
