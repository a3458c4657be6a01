//! Services layer for the Themis evaluation pipeline
//!
//! Provides the completion backend: the fixed rubric and the client that
//! carries conversations to the model.

pub mod llm;

pub use llm::{CompletionBackend, GroqClient, SYSTEM_PROMPT};
