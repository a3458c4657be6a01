//! The evaluation pipeline
//!
//! One path every delivery surface goes through: validate the conversation,
//! scan it for red flags, request the model evaluation, parse the reply,
//! assemble the record, persist it. The HTTP API and the console UI are both
//! thin wrappers around [`Evaluator`].

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::ThemisConfig;
use crate::error::{Result, ThemisError};
use crate::parser::parse_completion;
use crate::policy::detect_sensitive_info;
use crate::services::llm::{CompletionBackend, GroqClient};
use crate::storage::{csv::CsvStore, EvaluationStore};
use crate::types::EvaluationRecord;

/// Orchestrates one conversation evaluation end to end.
pub struct Evaluator {
    backend: Arc<dyn CompletionBackend>,
    store: Arc<dyn EvaluationStore>,
}

impl Evaluator {
    /// Build an evaluator over an arbitrary backend and store.
    pub fn new(backend: Arc<dyn CompletionBackend>, store: Arc<dyn EvaluationStore>) -> Self {
        Self { backend, store }
    }

    /// Wire the production pipeline from configuration: Groq client over the
    /// configured endpoint, CSV store at the configured path.
    pub fn from_config(config: &ThemisConfig) -> Result<Self> {
        let api_key = config.api_key()?;
        let backend = GroqClient::new(config.completion.clone(), api_key)?;
        let store = CsvStore::new(config.store.path.clone());
        Ok(Self::new(Arc::new(backend), Arc::new(store)))
    }

    /// Shared handle to the underlying log, for read-back surfaces.
    pub fn store(&self) -> Arc<dyn EvaluationStore> {
        Arc::clone(&self.store)
    }

    /// Evaluate one conversation and append the result to the log.
    ///
    /// Empty input is rejected before any external call. Nothing is
    /// persisted unless every stage succeeds: a failed request or append
    /// leaves the log exactly as it was.
    pub async fn evaluate(&self, conversation: &str) -> Result<EvaluationRecord> {
        if conversation.trim().is_empty() {
            return Err(ThemisError::Validation(
                "Conversation is required".to_string(),
            ));
        }

        let agent_reported = detect_sensitive_info(conversation);
        if agent_reported {
            warn!("Conversation contains red-flag terms, marking for audit");
        }

        let reply = self.backend.complete(conversation).await?;

        let parsed = parse_completion(&reply);
        if !parsed.fully_parsed {
            warn!("Completion reply deviated from the expected format, defaults filled in");
        }

        let record = EvaluationRecord::assemble(
            conversation.to_string(),
            parsed,
            agent_reported,
            Utc::now(),
        );
        self.store.append(&record).await?;

        info!(
            flagged = record.agent_reported,
            behavior_score = record.behavior_score,
            conversation_score = record.conversation_score,
            knowhow_score = record.knowhow_score,
            "Evaluation recorded"
        );

        Ok(record)
    }
}
