//! CSV-backed evaluation log
//!
//! One UTF-8 file, first row always the column header, one record per row,
//! appended and never rewritten. Reads are full scans and deliberately
//! lenient: a damaged cell degrades to its field default and a short row is
//! padded out, so one bad line never takes down the whole log.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{Result, ThemisError};
use crate::storage::EvaluationStore;
use crate::types::{ist_offset, EvaluationRecord};

/// Column headers, in row order. Serde field renames on
/// [`EvaluationRecord`] must stay in lockstep with this list.
pub const CSV_HEADERS: [&str; 12] = [
    "Conversation",
    "Summary",
    "Behavior Eval",
    "Behavior Score",
    "Conversation Eval",
    "Conversation Score",
    "Know-how Eval",
    "Know-how Score",
    "Agent Reported",
    "Timestamp UTC",
    "Date (IST)",
    "Time (IST)",
];

/// Append-only CSV store.
///
/// Appends are serialized through an in-process lock; the log has one writer
/// per process and cross-process exclusion is out of scope.
pub struct CsvStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvStore {
    /// Create a store over the given log path. No file is touched until
    /// [`EvaluationStore::initialize`] or the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn needs_header(&self) -> Result<bool> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len() == 0),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the header row. Caller must hold the write lock.
    fn write_header_locked(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                ThemisError::Store(format!(
                    "Failed to create log {}: {}",
                    self.path.display(),
                    e
                ))
            })?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(CSV_HEADERS)?;
        writer.flush()?;

        debug!(path = %self.path.display(), "Wrote log header");
        Ok(())
    }
}

#[async_trait]
impl EvaluationStore for CsvStore {
    async fn initialize(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.needs_header()? {
            self.write_header_locked()?;
        }
        Ok(())
    }

    async fn append(&self, record: &EvaluationRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if self.needs_header()? {
            self.write_header_locked()?;
        }

        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                ThemisError::Store(format!(
                    "Failed to open log {}: {}",
                    self.path.display(),
                    e
                ))
            })?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;

        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<EvaluationRecord>> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            // A log that was never written is an empty log, not an error.
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ThemisError::Store(format!(
                    "Failed to read log {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let mut records = Vec::new();
        for row in reader.records() {
            match row {
                Ok(row) => records.push(record_from_row(&row)),
                Err(e) => {
                    // Skip rows the reader itself cannot frame.
                    warn!(path = %self.path.display(), error = %e, "Skipping unreadable log row");
                }
            }
        }

        Ok(records)
    }
}

/// Decode one row with per-field defaults.
///
/// Older logs wrote Python-style `True`/`False` booleans and timestamps with
/// a `+00:00` suffix; both forms are accepted. Missing or garbled IST cells
/// are re-derived from the timestamp.
fn record_from_row(row: &StringRecord) -> EvaluationRecord {
    let text = |i: usize| row.get(i).unwrap_or("").to_string();
    let score = |i: usize| {
        row.get(i)
            .and_then(|s| s.trim().parse::<u8>().ok())
            .unwrap_or(1)
    };

    let agent_reported = row
        .get(8)
        .map(|s| s.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let timestamp_utc = row
        .get(9)
        .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH);

    let ist = timestamp_utc.with_timezone(&ist_offset());
    let date_ist = row
        .get(10)
        .and_then(|s| s.trim().parse::<NaiveDate>().ok())
        .unwrap_or_else(|| ist.date_naive());
    let time_ist = row
        .get(11)
        .and_then(|s| s.trim().parse::<NaiveTime>().ok())
        .unwrap_or_else(|| ist.time());

    EvaluationRecord {
        conversation: text(0),
        summary: text(1),
        behavior_text: text(2),
        behavior_score: score(3),
        conversation_text: text(4),
        conversation_score: score(5),
        knowhow_text: text(6),
        knowhow_score: score(7),
        agent_reported,
        timestamp_utc,
        date_ist,
        time_ist,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParsedEvaluation;
    use crate::types::CategoryEval;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, CsvStore) {
        let dir = TempDir::new().expect("temp dir");
        let store = CsvStore::new(dir.path().join("chat_summary_log.csv"));
        (dir, store)
    }

    fn sample_record(conversation: &str, flagged: bool, minute: u32) -> EvaluationRecord {
        let parsed = ParsedEvaluation {
            summary: "Login issue resolved.".to_string(),
            behavior: CategoryEval {
                text: "Patient".to_string(),
                score: 4,
            },
            conversation_quality: CategoryEval {
                text: "Structured".to_string(),
                score: 5,
            },
            know_how: CategoryEval {
                text: "Accurate".to_string(),
                score: 5,
            },
            fully_parsed: true,
        };
        let now = Utc
            .with_ymd_and_hms(2025, 4, 10, 14, minute, 0)
            .single()
            .unwrap();
        EvaluationRecord::assemble(conversation.to_string(), parsed, flagged, now)
    }

    #[tokio::test]
    async fn test_initialize_writes_header_once() {
        let (_dir, store) = temp_store();

        store.initialize().await.unwrap();
        let first = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            first.lines().next().unwrap(),
            CSV_HEADERS.join(",")
        );

        // A second initialize leaves the file alone.
        store.initialize().await.unwrap();
        let second = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_initialize_preserves_existing_rows() {
        let (_dir, store) = temp_store();
        store.append(&sample_record("Customer: hi", false, 0)).await.unwrap();

        store.initialize().await.unwrap();

        let records = store.read_all().await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_append_then_read_back_round_trip() {
        let (_dir, store) = temp_store();

        let first = sample_record("Customer: my card was charged twice\nAgent: refunded", false, 1);
        let second = sample_record("Customer: reset my password please", true, 2);
        store.append(&first).await.unwrap();
        store.append(&second).await.unwrap();

        let records = store.read_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], first);
        assert_eq!(records[1], second);
    }

    #[tokio::test]
    async fn test_append_writes_header_on_fresh_file() {
        let (_dir, store) = temp_store();
        store.append(&sample_record("Customer: hi", false, 0)).await.unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(content.starts_with("Conversation,Summary,"));
    }

    #[tokio::test]
    async fn test_multiline_conversation_survives_round_trip() {
        let (_dir, store) = temp_store();
        let convo = "Customer: line one\nAgent: line two\n\nCustomer: \"quoted\", with commas";
        let record = sample_record(convo, false, 3);

        store.append(&record).await.unwrap();
        let records = store.read_all().await.unwrap();

        assert_eq!(records[0].conversation, convo);
    }

    #[tokio::test]
    async fn test_read_missing_file_is_empty() {
        let (_dir, store) = temp_store();
        let records = store.read_all().await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_read_header_only_file_is_empty() {
        let (_dir, store) = temp_store();
        store.initialize().await.unwrap();
        let records = store.read_all().await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_cells_degrade_per_field() {
        let (_dir, store) = temp_store();
        store.initialize().await.unwrap();

        // Hand-written row: unparseable score, Python-style boolean, garbage
        // timestamp, garbage date.
        let row = "convo,sum,beh,not-a-number,conv,5,know,4,True,yesterday,not-a-date,25:99:99\n";
        let mut content = std::fs::read_to_string(store.path()).unwrap();
        content.push_str(row);
        std::fs::write(store.path(), content).unwrap();

        let records = store.read_all().await.unwrap();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.behavior_score, 1);
        assert_eq!(record.conversation_score, 5);
        assert!(record.agent_reported);
        assert_eq!(record.timestamp_utc, DateTime::UNIX_EPOCH);
        // IST cells re-derived from the (epoch) timestamp.
        assert_eq!(
            record.date_ist,
            NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
        );
        assert_eq!(record.time_ist, NaiveTime::from_hms_opt(5, 30, 0).unwrap());
    }

    #[tokio::test]
    async fn test_short_row_degrades_to_defaults() {
        let (_dir, store) = temp_store();
        store.initialize().await.unwrap();

        let mut content = std::fs::read_to_string(store.path()).unwrap();
        content.push_str("just a conversation,and a summary\n");
        std::fs::write(store.path(), content).unwrap();

        let records = store.read_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].conversation, "just a conversation");
        assert_eq!(records[0].summary, "and a summary");
        assert_eq!(records[0].behavior_score, 1);
        assert!(!records[0].agent_reported);
        assert_eq!(records[0].timestamp_utc, DateTime::UNIX_EPOCH);
    }

    #[tokio::test]
    async fn test_legacy_utc_offset_timestamp_accepted() {
        let (_dir, store) = temp_store();
        store.initialize().await.unwrap();

        // Older writers emitted +00:00 instead of Z.
        let mut content = std::fs::read_to_string(store.path()).unwrap();
        content.push_str(
            "c,s,b,2,cv,3,k,4,False,2025-04-10T14:00:00+00:00,2025-04-10,19:30:00\n",
        );
        std::fs::write(store.path(), content).unwrap();

        let records = store.read_all().await.unwrap();
        assert_eq!(
            records[0].timestamp_utc,
            Utc.with_ymd_and_hms(2025, 4, 10, 14, 0, 0).single().unwrap()
        );
        assert!(!records[0].agent_reported);
    }

    #[tokio::test]
    async fn test_insertion_order_preserved() {
        let (_dir, store) = temp_store();

        for minute in 0..5 {
            store
                .append(&sample_record(&format!("conversation {}", minute), false, minute))
                .await
                .unwrap();
        }

        let records = store.read_all().await.unwrap();
        let conversations: Vec<_> = records.iter().map(|r| r.conversation.as_str()).collect();
        assert_eq!(
            conversations,
            vec![
                "conversation 0",
                "conversation 1",
                "conversation 2",
                "conversation 3",
                "conversation 4"
            ]
        );
    }
}
