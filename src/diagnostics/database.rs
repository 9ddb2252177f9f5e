//! Database sink for diagnostic records.
//!
//! Records go into the `DebugInfo` table, one row each. The table is created
//! lazily the first time a handle is used. Every statement is independent: a
//! failed insert is logged and the next record is still attempted, and the
//! retention purge runs whatever happened to the inserts.

use chrono::{Days, Local, NaiveDate, NaiveDateTime};
use sqlx::any::AnyRow;
use sqlx::Row;

use crate::config::{DATE_FORMAT, DEBUG_INFO_TABLE};
use crate::connection::{ConnectionHandle, Driver};
use crate::error_handling::DatabaseError;

use super::record::{format_time, DiagnosticRecord};

const CREATE_TABLE_SQLITE: &str = "CREATE TABLE IF NOT EXISTS DebugInfo (
    idDebugInfo INTEGER PRIMARY KEY AUTOINCREMENT,
    Time TEXT NOT NULL,
    Severity TEXT NOT NULL,
    ArchiveTag TEXT,
    FilePath TEXT,
    FunctionName TEXT,
    SourceLineNo INTEGER,
    Message TEXT
)";

const CREATE_INDEX_SQLITE: &str =
    "CREATE INDEX IF NOT EXISTS idx_debuginfo_time ON DebugInfo (Time)";

const CREATE_TABLE_MYSQL: &str = "CREATE TABLE IF NOT EXISTS DebugInfo (
    idDebugInfo INT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    Time VARCHAR(32) NOT NULL,
    Severity VARCHAR(16) NOT NULL,
    ArchiveTag VARCHAR(64),
    FilePath VARCHAR(512),
    FunctionName VARCHAR(512),
    SourceLineNo INT,
    Message TEXT,
    INDEX idx_debuginfo_time (Time)
)";

const INSERT_RECORD: &str = "INSERT INTO DebugInfo \
    (Time, Severity, ArchiveTag, FilePath, FunctionName, SourceLineNo, Message) \
    VALUES (?, ?, ?, ?, ?, ?, ?)";

const DELETE_OLDER_THAN: &str = "DELETE FROM DebugInfo WHERE Time < ?";

const SELECT_WINDOW: &str = "SELECT Time, Severity, ArchiveTag, FilePath, FunctionName, \
    SourceLineNo, Message FROM DebugInfo WHERE Time >= ? AND Time < ? \
    ORDER BY Time, idDebugInfo";

/// Options for a database write.
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    pub strip_quotes: bool,
    pub retention_days: u64,
}

/// Summary of one database flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub inserted: usize,
    pub failed: usize,
    /// Rows removed by the retention purge; `None` when the purge failed.
    pub purged: Option<u64>,
}

/// A `DebugInfo` row as read back for replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub time: String,
    pub severity: String,
    pub revision_tag: String,
    pub file: String,
    pub function: String,
    pub line: i64,
    pub message: String,
}

/// Creates `DebugInfo` if the probe query fails.
pub async fn ensure_table(handle: &ConnectionHandle) -> Result<(), DatabaseError> {
    if handle.schema_ready() {
        return Ok(());
    }
    if !handle.is_open() {
        return Err(DatabaseError::NotOpen(handle.name().to_string()));
    }

    let probe = format!("SELECT 1 FROM {} LIMIT 1", DEBUG_INFO_TABLE);
    if sqlx::query(&probe).fetch_optional(handle.pool()).await.is_err() {
        log::info!(
            "Creating {} table on connection {}",
            DEBUG_INFO_TABLE,
            handle.name()
        );
        match handle.driver() {
            Driver::Sqlite => {
                sqlx::query(CREATE_TABLE_SQLITE)
                    .execute(handle.pool())
                    .await?;
                sqlx::query(CREATE_INDEX_SQLITE)
                    .execute(handle.pool())
                    .await?;
            }
            Driver::MySql => {
                sqlx::query(CREATE_TABLE_MYSQL)
                    .execute(handle.pool())
                    .await?;
            }
        }
    }
    handle.mark_schema_ready();
    Ok(())
}

/// Inserts every record, then purges rows past retention.
pub async fn write_records(
    handle: &ConnectionHandle,
    records: &[DiagnosticRecord],
    options: WriteOptions,
) -> WriteReport {
    if let Err(e) = ensure_table(handle).await {
        log::error!("Error preparing {} table: {e}", DEBUG_INFO_TABLE);
    }

    let mut report = WriteReport::default();
    for record in records {
        match insert_record(handle, record, options.strip_quotes).await {
            Ok(()) => report.inserted += 1,
            Err(e) => {
                log::error!(
                    "Error inserting {} record in database: {e} (record time {})",
                    DEBUG_INFO_TABLE,
                    record.time_string()
                );
                report.failed += 1;
            }
        }
    }

    let cutoff = retention_cutoff(Local::now().date_naive(), options.retention_days);
    match purge_older_than(handle, &cutoff).await {
        Ok(purged) => report.purged = Some(purged),
        Err(e) => log::error!("Error deleting old debug info from database: {e}"),
    }

    if report.failed > 0 {
        log::warn!(
            "Diagnostics flush: {} inserted, {} failed",
            report.inserted,
            report.failed
        );
    }
    report
}

/// Inserts one record.
pub async fn insert_record(
    handle: &ConnectionHandle,
    record: &DiagnosticRecord,
    strip_quotes: bool,
) -> Result<(), DatabaseError> {
    let message = if strip_quotes {
        record.message.replace('\'', "")
    } else {
        record.message.clone()
    };

    sqlx::query(INSERT_RECORD)
        .bind(record.time_string())
        .bind(record.severity.as_str())
        .bind(record.revision_tag.as_str())
        .bind(record.location.file.as_str())
        .bind(record.location.function.as_str())
        .bind(i64::from(record.location.line))
        .bind(message)
        .execute(handle.pool())
        .await?;
    Ok(())
}

/// Deletes rows whose `Time` sorts before `cutoff`; returns the number removed.
pub async fn purge_older_than(
    handle: &ConnectionHandle,
    cutoff: &str,
) -> Result<u64, DatabaseError> {
    let result = sqlx::query(DELETE_OLDER_THAN)
        .bind(cutoff)
        .execute(handle.pool())
        .await?;
    Ok(result.rows_affected())
}

/// Rows with `since <= Time < until`, oldest first.
pub async fn fetch_window(
    handle: &ConnectionHandle,
    since: &NaiveDateTime,
    until: &NaiveDateTime,
) -> Result<Vec<StoredRecord>, DatabaseError> {
    ensure_table(handle).await?;

    let rows = sqlx::query(SELECT_WINDOW)
        .bind(format_time(since))
        .bind(format_time(until))
        .fetch_all(handle.pool())
        .await?;

    rows.iter().map(stored_record).collect()
}

fn stored_record(row: &AnyRow) -> Result<StoredRecord, DatabaseError> {
    let text = |column: &str| -> Result<String, DatabaseError> {
        Ok(row
            .try_get::<Option<String>, _>(column)?
            .unwrap_or_default())
    };
    let line = match row.try_get::<Option<i64>, _>("SourceLineNo") {
        Ok(line) => line.unwrap_or_default(),
        Err(_) => i64::from(
            row.try_get::<Option<i32>, _>("SourceLineNo")?
                .unwrap_or_default(),
        ),
    };

    Ok(StoredRecord {
        time: text("Time")?,
        severity: text("Severity")?,
        revision_tag: text("ArchiveTag")?,
        file: text("FilePath")?,
        function: text("FunctionName")?,
        line,
        message: text("Message")?,
    })
}

/// First day kept by the purge, as `yyyy-MM-dd`.
pub fn retention_cutoff(today: NaiveDate, retention_days: u64) -> String {
    today
        .checked_sub_days(Days::new(retention_days))
        .unwrap_or(NaiveDate::MIN)
        .format(DATE_FORMAT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ConnectionManager, ConnectionParams};
    use crate::diagnostics::{Severity, SourceLocation};
    use chrono::Duration;

    async fn open_handle(dir: &tempfile::TempDir) -> ConnectionHandle {
        let manager = ConnectionManager::with_base_name("test");
        let params = ConnectionParams {
            driver: "sqlite".to_string(),
            database: dir.path().join("diag.db").to_string_lossy().to_string(),
            ..Default::default()
        };
        manager
            .open_diagnostics(&params, None)
            .await
            .expect("open diagnostics db")
    }

    fn record(message: &str) -> DiagnosticRecord {
        DiagnosticRecord::capture(
            Severity::Warning,
            "abcdef0123456789",
            SourceLocation::new("src/x.cpp", "Foo::bar(int)", 42),
            message,
        )
    }

    fn options() -> WriteOptions {
        WriteOptions {
            strip_quotes: true,
            retention_days: 2,
        }
    }

    async fn row_count(handle: &ConnectionHandle) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM DebugInfo")
            .fetch_one(handle.pool())
            .await
            .expect("count rows")
    }

    #[test]
    fn test_retention_cutoff() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(retention_cutoff(today, 2), "2026-02-27");
        assert_eq!(retention_cutoff(today, 0), "2026-03-01");
    }

    #[tokio::test]
    async fn test_table_created_lazily() {
        let dir = tempfile::tempdir().expect("temp dir");
        let handle = open_handle(&dir).await;
        assert!(!handle.schema_ready());
        ensure_table(&handle).await.expect("create table");
        assert!(handle.schema_ready());
        assert_eq!(row_count(&handle).await, 0);
        // Second call is a no-op.
        ensure_table(&handle).await.expect("already created");
    }

    #[tokio::test]
    async fn test_write_records_inserts_all() {
        let dir = tempfile::tempdir().expect("temp dir");
        let handle = open_handle(&dir).await;
        let records = vec![record("one"), record("two"), record("three")];

        let report = write_records(&handle, &records, options()).await;
        assert_eq!(report.inserted, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(report.purged, Some(0));
        assert_eq!(row_count(&handle).await, 3);
    }

    #[tokio::test]
    async fn test_quotes_stripped_by_default() {
        let dir = tempfile::tempdir().expect("temp dir");
        let handle = open_handle(&dir).await;
        write_records(&handle, &[record("can't open 'file'")], options()).await;

        let stored: String = sqlx::query_scalar("SELECT Message FROM DebugInfo")
            .fetch_one(handle.pool())
            .await
            .expect("read message");
        assert_eq!(stored, "cant open file");
    }

    #[tokio::test]
    async fn test_quotes_kept_when_stripping_disabled() {
        let dir = tempfile::tempdir().expect("temp dir");
        let handle = open_handle(&dir).await;
        let options = WriteOptions {
            strip_quotes: false,
            ..options()
        };
        write_records(&handle, &[record("it's \"quoted\"\nand multi-line")], options).await;

        let stored: String = sqlx::query_scalar("SELECT Message FROM DebugInfo")
            .fetch_one(handle.pool())
            .await
            .expect("read message");
        assert_eq!(stored, "it's \"quoted\"\nand multi-line");
    }

    #[tokio::test]
    async fn test_old_rows_are_purged() {
        let dir = tempfile::tempdir().expect("temp dir");
        let handle = open_handle(&dir).await;
        ensure_table(&handle).await.expect("create table");

        let mut old = record("stale");
        old.timestamp = old.timestamp - Duration::days(5);
        insert_record(&handle, &old, true).await.expect("insert old");

        let report = write_records(&handle, &[record("fresh")], options()).await;
        assert_eq!(report.purged, Some(1));

        let messages: Vec<String> = sqlx::query_scalar("SELECT Message FROM DebugInfo")
            .fetch_all(handle.pool())
            .await
            .expect("read messages");
        assert_eq!(messages, vec!["fresh".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_inserts_do_not_stop_purge() {
        let dir = tempfile::tempdir().expect("temp dir");
        let handle = open_handle(&dir).await;
        ensure_table(&handle).await.expect("create table");
        handle.pool().close().await;

        let report = write_records(&handle, &[record("a"), record("b")], options()).await;
        assert_eq!(report.inserted, 0);
        assert_eq!(report.failed, 2);
        assert_eq!(report.purged, None);
    }

    #[tokio::test]
    async fn test_fetch_window_bounds() {
        let dir = tempfile::tempdir().expect("temp dir");
        let handle = open_handle(&dir).await;
        ensure_table(&handle).await.expect("create table");

        let base = record("base").timestamp;
        for (offset, message) in [(-10, "before"), (0, "start"), (5, "inside"), (10, "end")] {
            let mut r = record(message);
            r.timestamp = base + Duration::seconds(offset);
            insert_record(&handle, &r, true).await.expect("insert");
        }

        let rows = fetch_window(&handle, &base, &(base + Duration::seconds(10)))
            .await
            .expect("fetch window");
        let messages: Vec<&str> = rows.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["start", "inside"]);
        assert_eq!(rows[0].line, 42);
        assert_eq!(rows[0].severity, "Warning");
        assert_eq!(rows[0].revision_tag, "abcdef0123456789");
        assert_eq!(rows[0].function, "Foo::bar(int)");
    }
}
