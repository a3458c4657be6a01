//! Audit views over the evaluation log
//!
//! Compliance reviews work from the flagged subset of the log: records whose
//! red-flag scan came back positive. Reviewers think in IST wall-clock time,
//! so the range filter takes naive IST bounds and compares them against each
//! record's capture instant shifted into IST. Records whose timestamp never
//! parsed (epoch sentinel from the lenient reader) are undated and left out
//! of audit views entirely.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use csv::WriterBuilder;

use crate::error::{Result, ThemisError};
use crate::storage::csv::CSV_HEADERS;
use crate::types::{ist_offset, EvaluationRecord};

/// Default file name for exported audit reports.
pub const EXPORT_FILE_NAME: &str = "flagged_audit.csv";

/// Accepted bound formats, tried in order. A bare date expands to the whole
/// day on the appropriate side.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// An inclusive IST datetime range, open on either side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditWindow {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl AuditWindow {
    /// No bounds: every dated flagged record matches.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Parse optional textual bounds.
    ///
    /// Accepts `YYYY-MM-DDTHH:MM:SS`, the space-separated equivalent, the
    /// minute-precision variants, and bare `YYYY-MM-DD`.
    pub fn from_bounds(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        Ok(Self {
            start: start.map(|raw| parse_bound(raw, false)).transpose()?,
            end: end.map(|raw| parse_bound(raw, true)).transpose()?,
        })
    }

    /// Whether an IST instant falls inside the window, bounds included.
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at <= end)
    }

    /// Flagged records inside the window, in log order.
    pub fn filter(&self, records: &[EvaluationRecord]) -> Vec<EvaluationRecord> {
        records
            .iter()
            .filter(|record| record.agent_reported && is_dated(record))
            .filter(|record| self.contains(ist_instant(record)))
            .cloned()
            .collect()
    }
}

/// All dated flagged records, in log order.
pub fn flagged(records: &[EvaluationRecord]) -> Vec<EvaluationRecord> {
    AuditWindow::unbounded().filter(records)
}

/// Seed bounds for an interactive range filter: the independent minima and
/// maxima of the flagged records' IST dates and times.
pub fn seed_window(flagged: &[EvaluationRecord]) -> Option<(NaiveDateTime, NaiveDateTime)> {
    if flagged.is_empty() {
        return None;
    }

    let instants: Vec<NaiveDateTime> = flagged.iter().map(ist_instant).collect();
    let min_date = instants.iter().map(|i| i.date()).min()?;
    let max_date = instants.iter().map(|i| i.date()).max()?;
    let min_time = instants.iter().map(|i| i.time()).min()?;
    let max_time = instants.iter().map(|i| i.time()).max()?;

    Some((min_date.and_time(min_time), max_date.and_time(max_time)))
}

/// Write records as CSV, header first, to any writer.
pub fn write_report<W: Write>(records: &[EvaluationRecord], writer: W) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer.write_record(CSV_HEADERS)?;
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Render records as CSV bytes, for download responses.
pub fn report_bytes(records: &[EvaluationRecord]) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_report(records, &mut buffer)?;
    Ok(buffer)
}

/// Write records as a CSV report file.
pub fn export_report(records: &[EvaluationRecord], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|e| {
        ThemisError::Store(format!("Failed to create report {}: {}", path.display(), e))
    })?;
    write_report(records, file)
}

fn is_dated(record: &EvaluationRecord) -> bool {
    record.timestamp_utc != DateTime::UNIX_EPOCH
}

/// The capture instant in IST wall-clock terms. Derived from the timestamp,
/// not the stored IST cells, so hand-edited cells cannot skew an audit.
fn ist_instant(record: &EvaluationRecord) -> NaiveDateTime {
    record.timestamp_utc.with_timezone(&ist_offset()).naive_local()
}

fn parse_bound(raw: &str, end_of_day: bool) -> Result<NaiveDateTime> {
    let raw = raw.trim();

    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(parsed);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let time = if end_of_day {
            NaiveTime::from_hms_opt(23, 59, 59).expect("Valid end-of-day time")
        } else {
            NaiveTime::MIN
        };
        return Ok(date.and_time(time));
    }

    Err(ThemisError::Validation(format!(
        "Unrecognized date bound '{}'. Use YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS",
        raw
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParsedEvaluation;
    use chrono::{TimeZone, Utc};

    fn record_at(utc: DateTime<chrono::Utc>, flagged: bool) -> EvaluationRecord {
        EvaluationRecord::assemble(
            "Agent: hello".to_string(),
            ParsedEvaluation::default(),
            flagged,
            utc,
        )
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<chrono::Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).single().unwrap()
    }

    #[test]
    fn test_flagged_keeps_only_reported_records() {
        let records = vec![
            record_at(utc(2025, 4, 1, 10, 0, 0), false),
            record_at(utc(2025, 4, 1, 11, 0, 0), true),
            record_at(utc(2025, 4, 1, 12, 0, 0), false),
        ];

        let audit = flagged(&records);
        assert_eq!(audit.len(), 1);
        assert!(audit[0].agent_reported);
    }

    #[test]
    fn test_undated_records_left_out_of_audit() {
        let mut undated = record_at(utc(2025, 4, 1, 10, 0, 0), true);
        undated.timestamp_utc = DateTime::UNIX_EPOCH;

        let records = vec![undated, record_at(utc(2025, 4, 1, 11, 0, 0), true)];
        assert_eq!(flagged(&records).len(), 1);
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        // 04:30 UTC is exactly 10:00 IST.
        let records = vec![
            record_at(utc(2025, 4, 1, 4, 30, 0), true),
            record_at(utc(2025, 4, 1, 5, 30, 0), true),
            record_at(utc(2025, 4, 1, 6, 30, 1), true),
        ];

        let window = AuditWindow::from_bounds(
            Some("2025-04-01T10:00:00"),
            Some("2025-04-01T12:00:00"),
        )
        .unwrap();

        // 10:00 and 11:00 IST are in; 12:00:01 IST is one second out.
        assert_eq!(window.filter(&records).len(), 2);
    }

    #[test]
    fn test_window_compares_in_ist_not_utc() {
        // 20:00 UTC on the 15th is 01:30 IST on the 16th.
        let records = vec![record_at(utc(2025, 1, 15, 20, 0, 0), true)];

        let on_16th = AuditWindow::from_bounds(Some("2025-01-16"), Some("2025-01-16")).unwrap();
        assert_eq!(on_16th.filter(&records).len(), 1);

        let on_15th = AuditWindow::from_bounds(Some("2025-01-15"), Some("2025-01-15")).unwrap();
        assert!(on_15th.filter(&records).is_empty());
    }

    #[test]
    fn test_bare_date_bounds_cover_the_whole_day() {
        let window = AuditWindow::from_bounds(Some("2025-04-01"), Some("2025-04-01")).unwrap();

        let start_of_day = NaiveDate::from_ymd_opt(2025, 4, 1)
            .unwrap()
            .and_time(NaiveTime::MIN);
        let end_of_day = NaiveDate::from_ymd_opt(2025, 4, 1)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        // The end bound has whole-second resolution, like stored rows.
        let past_end = NaiveDate::from_ymd_opt(2025, 4, 1)
            .unwrap()
            .and_hms_nano_opt(23, 59, 59, 500_000_000)
            .unwrap();
        let next_day = NaiveDate::from_ymd_opt(2025, 4, 2)
            .unwrap()
            .and_time(NaiveTime::MIN);

        assert!(window.contains(start_of_day));
        assert!(window.contains(end_of_day));
        assert!(!window.contains(past_end));
        assert!(!window.contains(next_day));
    }

    #[test]
    fn test_open_sided_windows() {
        let records = vec![
            record_at(utc(2025, 4, 1, 10, 0, 0), true),
            record_at(utc(2025, 4, 2, 10, 0, 0), true),
        ];

        let from_second = AuditWindow::from_bounds(Some("2025-04-02"), None).unwrap();
        assert_eq!(from_second.filter(&records).len(), 1);

        let until_first = AuditWindow::from_bounds(None, Some("2025-04-01")).unwrap();
        assert_eq!(until_first.filter(&records).len(), 1);
    }

    #[test]
    fn test_space_and_minute_precision_formats_accepted() {
        assert!(AuditWindow::from_bounds(Some("2025-04-01 10:00:00"), None).is_ok());
        assert!(AuditWindow::from_bounds(Some("2025-04-01T10:00"), None).is_ok());
        assert!(AuditWindow::from_bounds(None, Some("2025-04-01 10:00")).is_ok());
    }

    #[test]
    fn test_garbage_bound_is_validation_error() {
        let result = AuditWindow::from_bounds(Some("last tuesday"), None);
        assert!(matches!(result, Err(ThemisError::Validation(_))));
    }

    #[test]
    fn test_seed_window_spans_flagged_extremes() {
        // 04:30 UTC -> 10:00 IST; 12:30 UTC -> 18:00 IST.
        let records = vec![
            record_at(utc(2025, 4, 2, 4, 30, 0), true),
            record_at(utc(2025, 4, 1, 12, 30, 0), true),
        ];

        let (start, end) = seed_window(&records).unwrap();
        assert_eq!(
            start,
            NaiveDate::from_ymd_opt(2025, 4, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap()
        );
        assert_eq!(
            end,
            NaiveDate::from_ymd_opt(2025, 4, 2)
                .unwrap()
                .and_hms_opt(18, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_seed_window_empty_when_nothing_flagged() {
        assert!(seed_window(&[]).is_none());
    }

    #[test]
    fn test_report_round_trips_through_csv() {
        let records = vec![
            record_at(utc(2025, 4, 1, 10, 0, 0), true),
            record_at(utc(2025, 4, 1, 11, 0, 0), true),
        ];

        let bytes = report_bytes(&records).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("Conversation,Summary,"));

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(text.as_bytes());
        assert_eq!(reader.records().count(), 2);
    }
}
