//! Completion backend for conversation evaluation
//!
//! Carries a transcript to an OpenAI-compatible chat-completions endpoint
//! with the fixed evaluation rubric as the system message, and hands back the
//! model's raw reply. Groq hosts the default model; any endpoint speaking
//! the same protocol works via configuration.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CompletionSettings;
use crate::error::{Result, ThemisError};

/// Rubric sent as the system message with every evaluation request.
///
/// The parser in [`crate::parser`] is written against the response format
/// this prompt requests; the two move together.
pub const SYSTEM_PROMPT: &str = "\
You are an expert evaluator of customer support chats. Based on the conversation below:
1. Summarize the conversation.
2. Evaluate the agent's behavior: professionalism, tone, empathy.
3. Evaluate the agent's conversation handling: clarity, responsiveness, and structure.
4. Evaluate the agent's knowledge of the issue: correctness, understanding, and resolution offered.
5. For each evaluation category, also give a score from 1 to 5 (5 being best).

Also, if the agent ever asks for sensitive information such as credit card number, password, CVV, SSN, or OTP, consider it a serious violation and give a Behavior score of 1, and mention that it is against company policy.

Give your response in the following format:

Summary:
[Your summary]

Agent Evaluation:
- Behavior: [Textual evaluation] (Score: X/5)
- Conversation Quality: [Textual evaluation] (Score: X/5)
- Know-How of the Issue: [Textual evaluation] (Score: X/5)";

/// A service that evaluates a conversation into free-form text.
///
/// The pipeline only ever sees this trait; tests script it, production wires
/// in [`GroqClient`].
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Request an evaluation of the conversation. Returns the raw reply.
    async fn complete(&self, conversation: &str) -> Result<String>;
}

/// Chat-completions request format (OpenAI-compatible)
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Chat-completions response format
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Production completion backend.
pub struct GroqClient {
    settings: CompletionSettings,
    api_key: String,
    client: reqwest::Client,
}

impl GroqClient {
    /// Create a client with the given settings and API key.
    ///
    /// The request timeout is the only cancellation mechanism around the
    /// model call, so it is baked into the client here.
    pub fn new(settings: CompletionSettings, api_key: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(ThemisError::Config(config::ConfigError::Message(
                "Completion API key is empty".to_string(),
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            settings,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl CompletionBackend for GroqClient {
    async fn complete(&self, conversation: &str) -> Result<String> {
        debug!(model = %self.settings.model, "Requesting completion");

        let request = ChatCompletionRequest {
            model: self.settings.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: conversation.to_string(),
                },
            ],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.settings.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(ThemisError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ThemisError::Completion(format!(
                "API request failed with status {}: {}",
                status, error_text
            )));
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ThemisError::Completion(format!("Failed to parse response: {}", e)))?;

        api_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ThemisError::Completion("Empty response from API".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_api_key_rejected() {
        let result = GroqClient::new(CompletionSettings::default(), String::new());
        assert!(matches!(result, Err(ThemisError::Config(_))));
    }

    #[test]
    fn test_request_serializes_system_then_user() {
        let request = ChatCompletionRequest {
            model: "llama3-70b-8192".to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: "Customer: hello".to_string(),
                },
            ],
            max_tokens: 1024,
            temperature: 0.7,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama3-70b-8192");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "Customer: hello");
    }

    #[test]
    fn test_response_content_extraction() {
        let body = r#"{
            "id": "chatcmpl-123",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "Summary:\nAll good."}}
            ]
        }"#;

        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap();
        assert_eq!(content, "Summary:\nAll good.");
    }

    #[test]
    fn test_prompt_requests_the_parsed_format() {
        // The rubric and the parser share the format contract.
        assert!(SYSTEM_PROMPT.contains("Summary:"));
        assert!(SYSTEM_PROMPT.contains("- Behavior:"));
        assert!(SYSTEM_PROMPT.contains("- Conversation Quality:"));
        assert!(SYSTEM_PROMPT.contains("- Know-How of the Issue:"));
        assert!(SYSTEM_PROMPT.contains("(Score: X/5)"));
    }

    #[tokio::test]
    #[ignore] // Requires GROQ_API_KEY
    async fn test_live_completion() {
        let key = std::env::var("GROQ_API_KEY").unwrap();
        let client = GroqClient::new(CompletionSettings::default(), key).unwrap();

        let reply = client
            .complete("Customer: I was double charged.\nAgent: I see the duplicate and refunded it.")
            .await
            .unwrap();

        assert!(!reply.is_empty());
    }
}
