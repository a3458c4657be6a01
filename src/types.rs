//! Core data types for the Themis evaluation service
//!
//! This module defines the shapes that flow through the pipeline: the scored
//! category captures, the normalized `EvaluationRecord` persisted to the log,
//! and the `EvaluationReport` returned to callers.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::parser::ParsedEvaluation;
use crate::tokens::estimate_tokens;

/// Seconds east of UTC for Asia/Kolkata (+05:30, no DST).
const IST_OFFSET_SECONDS: i32 = 19_800;

/// The fixed IST offset used for all derived local dates and times.
pub fn ist_offset() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECONDS).expect("Valid IST offset")
}

/// One scored rubric category extracted from the model's reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEval {
    /// Free-text assessment for the category
    pub text: String,

    /// Score on the 1-5 rubric scale, 5 best
    pub score: u8,
}

impl Default for CategoryEval {
    /// The absence of a parseable score reads as the worst score, not as
    /// "unknown": empty text and a score of 1.
    fn default() -> Self {
        Self {
            text: String::new(),
            score: 1,
        }
    }
}

/// A fully normalized evaluation, one per processed conversation.
///
/// Serde field names match the log's column headers exactly, in column order.
/// Records are append-only: assembled once, persisted once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// Raw conversation text as received
    #[serde(rename = "Conversation")]
    pub conversation: String,

    /// Model-written summary, empty when the reply had none
    #[serde(rename = "Summary")]
    pub summary: String,

    /// Agent behavior: professionalism, tone, empathy
    #[serde(rename = "Behavior Eval")]
    pub behavior_text: String,

    #[serde(rename = "Behavior Score")]
    pub behavior_score: u8,

    /// Conversation handling: clarity, responsiveness, structure
    #[serde(rename = "Conversation Eval")]
    pub conversation_text: String,

    #[serde(rename = "Conversation Score")]
    pub conversation_score: u8,

    /// Issue know-how: correctness, understanding, resolution
    #[serde(rename = "Know-how Eval")]
    pub knowhow_text: String,

    #[serde(rename = "Know-how Score")]
    pub knowhow_score: u8,

    /// Red-flag scan verdict, independent of the model's own judgement
    #[serde(rename = "Agent Reported")]
    pub agent_reported: bool,

    /// Instant the record was assembled
    #[serde(rename = "Timestamp UTC")]
    pub timestamp_utc: DateTime<Utc>,

    /// Calendar date of the capture instant in IST
    #[serde(rename = "Date (IST)")]
    pub date_ist: NaiveDate,

    /// Wall-clock time of the capture instant in IST
    #[serde(rename = "Time (IST)")]
    pub time_ist: NaiveTime,
}

impl EvaluationRecord {
    /// Merge parser output, the policy verdict and the capture instant into
    /// one record. Pure combination: no validation happens here.
    pub fn assemble(
        conversation: String,
        parsed: ParsedEvaluation,
        agent_reported: bool,
        now: DateTime<Utc>,
    ) -> Self {
        // Whole-second timestamps keep the stored row and its IST
        // derivations round-trippable through the log.
        let now = now.with_nanosecond(0).unwrap_or(now);
        let ist = now.with_timezone(&ist_offset());

        Self {
            conversation,
            summary: parsed.summary,
            behavior_text: parsed.behavior.text,
            behavior_score: parsed.behavior.score,
            conversation_text: parsed.conversation_quality.text,
            conversation_score: parsed.conversation_quality.score,
            knowhow_text: parsed.know_how.text,
            knowhow_score: parsed.know_how.score,
            agent_reported,
            timestamp_utc: now,
            date_ist: ist.date_naive(),
            time_ist: ist.time(),
        }
    }
}

/// Per-category breakdown inside an [`EvaluationReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationScores {
    pub behavior: CategoryEval,
    pub conversation_quality: CategoryEval,
    pub know_how: CategoryEval,
}

/// Caller-facing view of one evaluation.
///
/// Leaner than the stored record: the conversation itself is omitted and a
/// token estimate is added for cost visibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub tokens_estimated: usize,
    pub agent_reported: bool,
    pub timestamp_utc: DateTime<Utc>,
    pub summary: String,
    pub evaluation: EvaluationScores,
}

impl From<&EvaluationRecord> for EvaluationReport {
    fn from(record: &EvaluationRecord) -> Self {
        Self {
            tokens_estimated: estimate_tokens(&record.conversation),
            agent_reported: record.agent_reported,
            timestamp_utc: record.timestamp_utc,
            summary: record.summary.clone(),
            evaluation: EvaluationScores {
                behavior: CategoryEval {
                    text: record.behavior_text.clone(),
                    score: record.behavior_score,
                },
                conversation_quality: CategoryEval {
                    text: record.conversation_text.clone(),
                    score: record.conversation_score,
                },
                know_how: CategoryEval {
                    text: record.knowhow_text.clone(),
                    score: record.knowhow_score,
                },
            },
        }
    }
}
