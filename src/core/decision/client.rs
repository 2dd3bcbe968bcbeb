use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::action::strip_code_fence;
use super::prompts::{
    NAVIGATION_SYSTEM_PROMPT, OPERATOR_SYSTEM_PROMPT, navigation_prompt, operator_prompt,
};
use super::{
    Action, DecisionError, DecisionFunction, DecisionRequest, OperatorAssessment,
    OperatorClassifier, parse_decision,
};
use crate::core::call::CallContext;

/// Connection settings for an OpenAI-compatible chat completions API.
#[derive(Debug, Clone)]
pub struct LlmDecisionConfig {
    pub api_key: String,
    /// Base URL without the `/chat/completions` suffix.
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Decision function and operator classifier backed by a chat completion model.
#[derive(Clone)]
pub struct LlmDecisionClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for LlmDecisionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmDecisionClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl LlmDecisionClient {
    pub fn new(config: LlmDecisionConfig) -> Result<Self, DecisionError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| DecisionError::Request(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key,
            model: config.model,
        })
    }

    async fn complete(&self, system: &str, user: String) -> Result<String, DecisionError> {
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DecisionError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DecisionError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| DecisionError::Malformed(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| DecisionError::Malformed("completion has no content".to_string()))
    }
}

#[async_trait]
impl DecisionFunction for LlmDecisionClient {
    async fn decide(&self, request: &DecisionRequest) -> Result<Action, DecisionError> {
        let user = navigation_prompt(
            &request.transcript,
            &request.context,
            &request.recent_actions,
        );
        let content = self.complete(NAVIGATION_SYSTEM_PROMPT, user).await?;
        debug!(response = %content, "Decision function responded");
        Ok(parse_decision(&content))
    }
}

#[async_trait]
impl OperatorClassifier for LlmDecisionClient {
    async fn classify(
        &self,
        transcript: &str,
        context: &CallContext,
    ) -> Result<OperatorAssessment, DecisionError> {
        let content = self
            .complete(OPERATOR_SYSTEM_PROMPT, operator_prompt(transcript, context))
            .await?;

        let assessment: OperatorAssessment = serde_json::from_str(strip_code_fence(&content))
            .map_err(|e| DecisionError::Malformed(e.to_string()))?;
        if !(0.0..=1.0).contains(&assessment.confidence) {
            return Err(DecisionError::Malformed(format!(
                "confidence {} outside [0, 1]",
                assessment.confidence
            )));
        }
        Ok(assessment)
    }
}
