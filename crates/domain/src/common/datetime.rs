//! Epoch-millisecond timestamp utilities.
//!
//! The wire contract stores every timestamp (`create_at`, `update_at`,
//! `delete_at`, `due_date`, ...) as an absolute epoch-millisecond
//! integer, with `0` meaning "never". These helpers convert between
//! that representation and `chrono` at the API edge.

use chrono::{DateTime, Utc};

/// Epoch milliseconds as carried on the wire. `0` means "never"/unset.
pub type Millis = i64;

/// The unset timestamp value.
pub const NEVER: Millis = 0;

/// Converts a UTC datetime to epoch milliseconds.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use runbook_domain::common::to_millis;
///
/// let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
/// assert_eq!(to_millis(dt), 1_705_314_600_000);
/// ```
pub fn to_millis(dt: DateTime<Utc>) -> Millis {
    dt.timestamp_millis()
}

/// Converts epoch milliseconds back to a UTC datetime.
///
/// Returns `None` for the `NEVER` sentinel and for values outside the
/// range `chrono` can represent.
///
/// # Examples
///
/// ```
/// use chrono::Datelike;
/// use runbook_domain::common::from_millis;
///
/// let dt = from_millis(1_705_314_600_000).unwrap();
/// assert_eq!(dt.year(), 2024);
///
/// assert!(from_millis(0).is_none());
/// ```
pub fn from_millis(millis: Millis) -> Option<DateTime<Utc>> {
    if millis == NEVER {
        return None;
    }
    DateTime::from_timestamp_millis(millis)
}
