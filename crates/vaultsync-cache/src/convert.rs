//! Column conversions shared by both store adapters
//!
//! ## Type Mapping
//!
//! | Domain Type      | SQL Type | Strategy                                   |
//! |------------------|----------|--------------------------------------------|
//! | DateTime<Utc>    | TEXT     | RFC 3339, UTC, fixed nanosecond precision  |
//! | RecordStatus     | TEXT     | `as_str()` / `FromStr`                     |
//! | SyncStatus       | TEXT     | `as_str()` / `FromStr`                     |
//! | u64 / u32        | INTEGER  | cast through i64                           |
//! | serde_json Value | TEXT     | serde_json serialization                   |
//!
//! Timestamps are written with a fixed precision and a `Z` suffix so that
//! lexicographic comparison in SQL matches chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use vaultsync_core::domain::{BackupDetails, RestoreRecord};

use crate::CacheError;

/// Format a timestamp for storage
pub(crate) fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn format_optional_datetime(dt: Option<DateTime<Utc>>) -> Option<String> {
    dt.map(format_datetime)
}

/// Parse a DateTime<Utc> from an ISO 8601 string
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Rows written by other tools may use SQLite's default format
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
                .map(|ndt| ndt.and_utc())
        })
        .map_err(|e| {
            CacheError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

/// Parse an optional DateTime<Utc> from an optional string
pub(crate) fn parse_optional_datetime(
    s: Option<String>,
) -> Result<Option<DateTime<Utc>>, CacheError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

pub(crate) fn to_json_text(
    value: Option<&serde_json::Value>,
) -> Result<Option<String>, CacheError> {
    value
        .map(|v| {
            serde_json::to_string(v)
                .map_err(|e| CacheError::SerializationError(format!("Invalid JSON value: {}", e)))
        })
        .transpose()
}

pub(crate) fn from_json_text(
    column: &str,
    text: Option<String>,
) -> Result<Option<serde_json::Value>, CacheError> {
    match text {
        Some(ref s) if !s.is_empty() => serde_json::from_str(s).map(Some).map_err(|e| {
            CacheError::SerializationError(format!("Invalid JSON in {}: {}", column, e))
        }),
        _ => Ok(None),
    }
}

fn to_u64(v: Option<i64>) -> Option<u64> {
    v.and_then(|n| u64::try_from(n).ok())
}

/// Values of the descriptive columns, in the order both schemas declare them
pub(crate) struct DetailColumns {
    pub backup_type: String,
    pub file_path: Option<String>,
    pub file_size: Option<i64>,
    pub compressed_size: Option<i64>,
    pub compression_ratio: Option<f64>,
    pub checksum: Option<String>,
    pub databases_count: i64,
    pub encryption_enabled: bool,
    pub error_message: Option<String>,
    pub extra_data: Option<String>,
}

impl DetailColumns {
    pub(crate) fn from_details(details: &BackupDetails) -> Result<Self, CacheError> {
        Ok(Self {
            backup_type: details.backup_type.clone(),
            file_path: details.file_path.clone(),
            file_size: details.file_size.map(|n| n as i64),
            compressed_size: details.compressed_size.map(|n| n as i64),
            compression_ratio: details.compression_ratio,
            checksum: details.checksum.clone(),
            databases_count: i64::from(details.databases_count),
            encryption_enabled: details.encryption_enabled,
            error_message: details.error_message.clone(),
            extra_data: to_json_text(details.extra_data.as_ref())?,
        })
    }
}

/// Read the descriptive columns of a backup row
pub(crate) fn details_from_row(row: &SqliteRow) -> Result<BackupDetails, CacheError> {
    let databases_count: i64 = row.get("databases_count");
    let extra_data: Option<String> = row.get("extra_data");

    Ok(BackupDetails {
        backup_type: row.get("backup_type"),
        file_path: row.get("file_path"),
        file_size: to_u64(row.get("file_size")),
        compressed_size: to_u64(row.get("compressed_size")),
        compression_ratio: row.get("compression_ratio"),
        checksum: row.get("checksum"),
        databases_count: u32::try_from(databases_count).unwrap_or(0),
        encryption_enabled: row.get("encryption_enabled"),
        error_message: row.get("error_message"),
        extra_data: from_json_text("extra_data", extra_data)?,
    })
}

/// Read the restore columns shared by both schemas
///
/// Sync bookkeeping is left at its defaults; the local adapter restores it.
pub(crate) fn restore_from_row(row: &SqliteRow) -> Result<RestoreRecord, CacheError> {
    let restore_id: String = row.get("restore_id");
    let backup_id: Option<String> = row.get("backup_id");
    let status_str: String = row.get("status");
    let progress: i64 = row.get("progress");
    let restore_options: Option<String> = row.get("restore_options");
    let restored_databases_count: i64 = row.get("restored_databases_count");
    let created_at_str: String = row.get("created_at");

    let status = status_str.parse()?;
    let created_at = parse_datetime(&created_at_str)?;
    let started_at = parse_optional_datetime(row.get("started_at"))?;
    let completed_at = parse_optional_datetime(row.get("completed_at"))?;

    let mut record = RestoreRecord::new(restore_id)?
        .with_restore_type(row.get::<String, _>("restore_type"))
        .with_status(status)
        .with_progress(u8::try_from(progress.clamp(0, 100)).unwrap_or(100))
        .with_messages(row.get("status_message"), row.get("error_message"))
        .with_restore_options(from_json_text("restore_options", restore_options)?)
        .with_requested_by(row.get::<String, _>("requested_by"))
        .with_restored_databases_count(u32::try_from(restored_databases_count).unwrap_or(0))
        .with_timestamps(created_at, started_at, completed_at);
    if let Some(backup_id) = backup_id {
        record = record.with_backup_id(backup_id);
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_timestamps_sort_chronologically() {
        let early = parse_datetime("2026-01-01T09:00:00Z").unwrap();
        let late = parse_datetime("2026-01-01T10:00:00.5Z").unwrap();
        assert!(format_datetime(early) < format_datetime(late));
        assert_eq!(parse_datetime(&format_datetime(late)).unwrap(), late);
    }

    #[test]
    fn parses_sqlite_default_format() {
        let dt = parse_datetime("2026-03-04 05:06:07").unwrap();
        assert_eq!(format_datetime(dt), "2026-03-04T05:06:07.000000000Z");
    }

    #[test]
    fn rejects_garbage_datetime() {
        assert!(matches!(
            parse_datetime("yesterday"),
            Err(CacheError::SerializationError(_))
        ));
    }

    #[test]
    fn empty_optional_datetime_is_none() {
        assert_eq!(parse_optional_datetime(Some(String::new())).unwrap(), None);
        assert_eq!(parse_optional_datetime(None).unwrap(), None);
    }

    #[test]
    fn json_text_roundtrip() {
        let value = serde_json::json!({"k": [1, 2]});
        let text = to_json_text(Some(&value)).unwrap();
        assert_eq!(from_json_text("x", text).unwrap(), Some(value));
        assert!(from_json_text("x", Some("{not json".into())).is_err());
    }
}
