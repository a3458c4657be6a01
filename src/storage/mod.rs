//! Storage layer for the evaluation log
//!
//! Provides the append-only store abstraction and its CSV implementation.
//! The log is insertion-ordered: rows are written once and never touched
//! again, and reading is always a full scan.

pub mod csv;

use crate::error::Result;
use crate::types::EvaluationRecord;
use async_trait::async_trait;

/// Store backend trait defining all required operations
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    /// Make sure the log exists with its header row. Idempotent: an existing
    /// non-empty log is left untouched.
    async fn initialize(&self) -> Result<()>;

    /// Append one record to the end of the log
    async fn append(&self, record: &EvaluationRecord) -> Result<()>;

    /// Read every record back in insertion order
    async fn read_all(&self) -> Result<Vec<EvaluationRecord>>;
}
