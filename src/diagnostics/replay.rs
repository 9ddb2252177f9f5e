//! Time-windowed replay of stored diagnostics.
//!
//! [`Diagnostics::collect_since`] re-emits everything stored since a checkpoint
//! and returns the next checkpoint. [`DiagnosticsReview`] keeps that checkpoint
//! and runs the replay periodically.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::{
    REPLAY_FUNCTION_WIDTH, REPLAY_MESSAGE_LIMIT, REPLAY_SEVERITY_WIDTH, REPLAY_TAG_CHARS,
    REPLAY_TAG_WIDTH,
};
use crate::location;

use super::database::{self, StoredRecord};
use super::record::now_millis;
use super::{Diagnostics, Severity};

impl Diagnostics {
    /// Re-emits stored records captured at or after `since` and returns the
    /// checkpoint for the next call.
    ///
    /// The buffer is flushed first so the database is current. Rows are read
    /// for `since <= Time < issued`, where `issued` is the time the query was
    /// made, and `issued` is returned. Feeding the result back in as `since`
    /// gives consecutive windows that neither overlap nor leave gaps.
    ///
    /// Lines are dispatched at Info with buffering suspended, so they go
    /// straight to the terminal. Without a diagnostics connection (or in
    /// immediate mode) nothing is retrievable and the current time is returned.
    pub async fn collect_since(&self, since: NaiveDateTime) -> NaiveDateTime {
        if self.config().immediate {
            return now_millis();
        }

        self.flush().await;

        let Some(handle) = self.connections().diagnostics() else {
            return now_millis();
        };

        let issued = now_millis();
        let _direct = self.mode().enter_direct();
        match database::fetch_window(&handle, &since, &issued).await {
            Ok(rows) => {
                for row in &rows {
                    self.dispatch(Severity::Info, location!(), format_replay_line(row));
                }
            }
            Err(e) => log::warn!("Diagnostics extraction error: {e}"),
        }
        issued
    }
}

/// Formats a stored row for review.
///
/// Layout: time, the last 8 characters of the tag, severity, line number,
/// bare function name and the message with CR/LF escaped, cut to 250 characters.
pub fn format_replay_line(row: &StoredRecord) -> String {
    let line_number = format!("{:>4}", row.line);
    format!(
        "{time}   {tag:<tw$}{severity:<sw$}{line:<6}{function:<fw$.fw$} {message}",
        time = row.time,
        tag = last_chars(&row.revision_tag, REPLAY_TAG_CHARS),
        severity = row.severity,
        line = line_number,
        function = bare_function_name(&row.function),
        message = escape_message(&row.message, REPLAY_MESSAGE_LIMIT),
        tw = REPLAY_TAG_WIDTH,
        sw = REPLAY_SEVERITY_WIDTH,
        fw = REPLAY_FUNCTION_WIDTH,
    )
}

/// Function name without scope qualifiers, argument list or return type.
pub fn bare_function_name(function: &str) -> &str {
    let unscoped = function.rsplit("::").next().unwrap_or(function);
    let name = unscoped.split('(').next().unwrap_or(unscoped);
    name.rsplit(' ').next().unwrap_or(name)
}

fn last_chars(value: &str, count: usize) -> String {
    let total = value.chars().count();
    value.chars().skip(total.saturating_sub(count)).collect()
}

fn escape_message(message: &str, limit: usize) -> String {
    message
        .replace('\r', "\\r")
        .replace('\n', "\\n")
        .chars()
        .take(limit)
        .collect()
}

/// Periodic catch-up review of stored diagnostics.
pub struct DiagnosticsReview {
    diagnostics: Arc<Diagnostics>,
    checkpoint: Mutex<NaiveDateTime>,
}

impl DiagnosticsReview {
    /// Review starting from the current time.
    pub fn new(diagnostics: Arc<Diagnostics>) -> Self {
        Self::starting_at(diagnostics, now_millis())
    }

    pub fn starting_at(diagnostics: Arc<Diagnostics>, checkpoint: NaiveDateTime) -> Self {
        Self {
            diagnostics,
            checkpoint: Mutex::new(checkpoint),
        }
    }

    pub async fn checkpoint(&self) -> NaiveDateTime {
        *self.checkpoint.lock().await
    }

    /// Replays everything since the last checkpoint and advances it.
    ///
    /// Does nothing unless diagnostics display is enabled and immediate mode
    /// is off. Returns whether a replay ran.
    pub async fn review(&self) -> bool {
        let config = self.diagnostics.config();
        if !config.show_diagnostics || config.immediate {
            return false;
        }
        let mut checkpoint = self.checkpoint.lock().await;
        *checkpoint = self.diagnostics.collect_since(*checkpoint).await;
        true
    }

    /// Runs [`review`](Self::review) every `review_interval` until `cancel`
    /// fires, then once more so nothing logged before shutdown is skipped.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let period = self.diagnostics.config().review_interval;
        self.spawn_every(period, cancel)
    }

    /// Like [`spawn`](Self::spawn) with an explicit period.
    pub fn spawn_every(
        self: Arc<Self>,
        period: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.review().await;
                    }
                    _ = cancel.cancelled() => {
                        break;
                    }
                }
            }
            self.review().await;
        })
    }
}
