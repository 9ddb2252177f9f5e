//! SQL helper for aligning a database session's time zone with local time.

use chrono::{DateTime, Offset, TimeZone, Utc};

/// `SET time_zone = '±HH:MM'` for `zone`'s UTC offset at instant `at`.
///
/// Using the offset at a given instant means daylight saving is reflected for
/// zones that observe it.
///
/// # Examples
///
/// ```
/// use chrono::{FixedOffset, Utc};
/// use diag_support::set_db_time_zone_sql;
///
/// let eastern = FixedOffset::west_opt(5 * 3600).unwrap();
/// assert_eq!(set_db_time_zone_sql(&eastern, &Utc::now()), "SET time_zone = '-05:00'");
/// ```
pub fn set_db_time_zone_sql<Tz: TimeZone>(zone: &Tz, at: &DateTime<Utc>) -> String {
    let seconds = zone
        .offset_from_utc_datetime(&at.naive_utc())
        .fix()
        .local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.unsigned_abs() / 60;
    format!(
        "SET time_zone = '{}{:02}:{:02}'",
        sign,
        minutes / 60,
        minutes % 60
    )
}

/// Statement for the machine's local zone, right now.
pub fn local_time_zone_sql() -> String {
    set_db_time_zone_sql(&chrono::Local, &Utc::now())
}
