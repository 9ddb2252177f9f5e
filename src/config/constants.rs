//! Configuration constants.
//!
//! This module defines the limits, formats and sentinel values used by the
//! diagnostics subsystem and its helpers.

use std::time::Duration;

// Buffering
/// Number of buffered records that triggers an overflow flush to the terminal.
/// Keeps the in-memory queue bounded when no periodic flush is running.
pub const OVERFLOW_THRESHOLD: usize = 10_000;

// Database retention
/// Rows in `DebugInfo` older than this many days are purged after each database flush.
pub const RETENTION_DAYS: u64 = 2;
/// Name of the diagnostics table.
pub const DEBUG_INFO_TABLE: &str = "DebugInfo";

// Formats
/// Timestamp format stored in the `Time` column (sorts lexicographically).
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
/// Day-granularity format used for the retention cutoff.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// Terminal line layout
pub const TERMINAL_SEVERITY_WIDTH: usize = 8;
pub const TERMINAL_FILE_WIDTH: usize = 12;
pub const TERMINAL_FUNCTION_WIDTH: usize = 30;
pub const TERMINAL_LINE_WIDTH: usize = 6;

// Replay line layout
/// Maximum number of message characters shown per replayed record.
pub const REPLAY_MESSAGE_LIMIT: usize = 250;
pub const REPLAY_TAG_CHARS: usize = 8;
pub const REPLAY_TAG_WIDTH: usize = 10;
pub const REPLAY_SEVERITY_WIDTH: usize = 10;
pub const REPLAY_FUNCTION_WIDTH: usize = 25;

// Revision tags
/// Tag value before the resolver has run.
pub const NOT_SET_TAG: &str = "NotSet";
/// Tag value when no ancestor of the executable contains the program's source directory.
pub const SOURCE_NOT_FOUND_TAG: &str = "Source path not found";
/// Tag value when the source directory has no `.git` directory.
pub const GIT_NOT_FOUND_TAG: &str = ".git not found";
/// Tag value when the version-control command fails.
pub const GIT_FAILED_TAG: &str = "git log failed";
/// Cache file holding the resolved tag, next to the source tree.
pub const TAG_FILE_NAME: &str = "ArchiveTag.txt";

// Periodic review
/// Default interval between catch-up reviews of stored diagnostics.
pub const DEFAULT_REVIEW_INTERVAL: Duration = Duration::from_secs(60);

// Connection pool
/// Maximum time to wait for a pooled connection before failing the write.
pub const DB_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
/// Maximum connections per named pool. Diagnostics writes are sequential,
/// so a small pool is enough.
pub const DB_MAX_CONNECTIONS: u32 = 4;
/// Prefix for the diagnostics connection name when none is given.
pub const DEBUG_CONNECTION_PREFIX: &str = "Debug";
/// Base connection name when neither the caller nor the revision resolver supplies one.
pub const DEFAULT_CONNECTION_NAME: &str = "default";
