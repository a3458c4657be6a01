//! Themis - Support-Chat Evaluation Service
//!
//! Evaluates customer-support chat transcripts with an LLM and keeps an
//! append-only audit log of the results:
//! - Fixed evaluation rubric sent to an OpenAI-compatible completion endpoint
//! - Tolerant line parser for the model's free-text reply
//! - Sensitive-information red-flag scan, independent of the model
//! - Normalized records with UTC and IST (Asia/Kolkata) timestamps
//! - CSV-backed log with full read-back, audit filtering and export
//!
//! # Architecture
//!
//! The crate is one pipeline with thin delivery adapters:
//! - **Types**: `EvaluationRecord` and friends, the persisted shape
//! - **Parser/Policy**: pure functions from completion text to structure
//! - **Services**: the completion backend (Groq client behind a trait)
//! - **Storage**: the `EvaluationStore` trait and its CSV implementation
//! - **Pipeline**: `Evaluator`, the one path every surface goes through
//! - **Api**: the axum HTTP surface; the console binary is the other adapter
//!
//! # Example
//!
//! ```ignore
//! use themis_core::{config::ThemisConfig, pipeline::Evaluator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ThemisConfig::load(None)?;
//!     let evaluator = Evaluator::from_config(&config)?;
//!
//!     let record = evaluator
//!         .evaluate("Customer: I can't log in.\nAgent: Let me help.")
//!         .await?;
//!     println!("behavior score: {}", record.behavior_score);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod audit;
pub mod config;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod policy;
pub mod services;
pub mod storage;
pub mod tokens;
pub mod types;

// Re-export commonly used types
pub use audit::AuditWindow;
pub use config::ThemisConfig;
pub use error::{Result, ThemisError};
pub use parser::{parse_completion, ParsedEvaluation};
pub use pipeline::Evaluator;
pub use policy::detect_sensitive_info;
pub use services::{CompletionBackend, GroqClient};
pub use storage::{csv::CsvStore, EvaluationStore};
pub use tokens::estimate_tokens;
pub use types::{CategoryEval, EvaluationRecord, EvaluationReport};
