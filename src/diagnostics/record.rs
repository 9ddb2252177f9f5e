//! Diagnostic record types and their terminal formatting.

use std::path::Path;

use chrono::{Local, NaiveDateTime, SubsecRound};
use strum_macros::EnumIter;

use crate::config::{
    TERMINAL_FILE_WIDTH, TERMINAL_FUNCTION_WIDTH, TERMINAL_LINE_WIDTH, TERMINAL_SEVERITY_WIDTH,
    TIME_FORMAT,
};

/// Urgency of a diagnostic record, ordered from least to most urgent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, clap::ValueEnum,
)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Critical,
    /// Flushes the buffer and terminates the process.
    Fatal,
}

impl Severity {
    /// Name stored in the `Severity` column and printed on the terminal.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "Debug",
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Critical => "Critical",
            Severity::Fatal => "Fatal",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl From<log::Level> for Severity {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Severity::Critical,
            log::Level::Warn => Severity::Warning,
            log::Level::Info => Severity::Info,
            log::Level::Debug | log::Level::Trace => Severity::Debug,
        }
    }
}

/// Where a diagnostic was emitted, as reported by the call site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub function: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, function: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            function: function.into(),
            line,
        }
    }
}

/// Builds a [`SourceLocation`] for the invoking line, using the module path as
/// the function name.
#[macro_export]
macro_rules! location {
    () => {
        $crate::diagnostics::SourceLocation::new(file!(), module_path!(), line!())
    };
}

/// One logged event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    pub timestamp: NaiveDateTime,
    pub severity: Severity,
    /// Revision tag in effect when the record was captured.
    pub revision_tag: String,
    pub location: SourceLocation,
    pub message: String,
}

impl DiagnosticRecord {
    /// Captures a record stamped with the current local time.
    pub fn capture(
        severity: Severity,
        revision_tag: impl Into<String>,
        location: SourceLocation,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: now_millis(),
            severity,
            revision_tag: revision_tag.into(),
            location,
            message: message.into(),
        }
    }

    /// Timestamp as stored in the `Time` column.
    pub fn time_string(&self) -> String {
        format_time(&self.timestamp)
    }

    /// Formats the record as one fixed-width terminal line (without newline).
    ///
    /// Fields are tab separated: severity, file basename, trimmed function
    /// name, line number and the unpadded message.
    pub fn terminal_line(&self) -> String {
        format!(
            "{severity:<sw$}\t{file:>fw$.fw$}\t{function:>nw$.nw$}\t{line:>lw$}\t{message}",
            severity = self.severity.as_str(),
            file = file_basename(&self.location.file),
            function = trim_function_name(&self.location.function),
            line = self.location.line,
            message = self.message,
            sw = TERMINAL_SEVERITY_WIDTH,
            fw = TERMINAL_FILE_WIDTH,
            nw = TERMINAL_FUNCTION_WIDTH,
            lw = TERMINAL_LINE_WIDTH,
        )
    }
}

/// Current local time truncated to millisecond precision.
pub fn now_millis() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(3)
}

/// Formats a timestamp the way the `Time` column stores it.
pub fn format_time(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIME_FORMAT).to_string()
}

/// Parses a `yyyy-MM-dd HH:mm:ss[.zzz]` timestamp.
pub fn parse_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%d %H:%M:%S"))
        .ok()
}

/// Final path component of a source file.
pub fn file_basename(file: &str) -> &str {
    Path::new(file)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file)
}

/// Strips the argument list and any enclosing-scope prefix from a function name.
///
/// The prefix ends at the last `:` before the argument list, or at the last
/// space when there is no `:`.
pub fn trim_function_name(function: &str) -> &str {
    let end = function.find('(').unwrap_or(function.len());
    let head = &function[..end];
    let begin = head
        .rfind(':')
        .or_else(|| head.rfind(' '))
        .map_or(0, |idx| idx + 1);
    &head[begin..]
}
