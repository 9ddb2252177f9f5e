//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (thresholds, formats, sentinel tags)
//! - Diagnostics settings
//! - CLI option types and parsing

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{
    Command, DiagnosticsConfig, EmitArgs, LogFormat, LogLevel, Opt, ReplayArgs, TagArgs,
    TimezoneArgs,
};
