//! `OpenAI` and `OpenAI`-compatible provider implementation

use super::types::{LlmMessage, LlmRequest, LlmResponse, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat models the assistant can be configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAIModel {
    GPT4,
    GPT4Turbo,
    GPT4o,
    GPT4oMini,
    O4Mini,
}

impl OpenAIModel {
    pub fn from_id(id: &str) -> Option<Self> {
        [
            OpenAIModel::GPT4,
            OpenAIModel::GPT4Turbo,
            OpenAIModel::GPT4o,
            OpenAIModel::GPT4oMini,
            OpenAIModel::O4Mini,
        ]
        .into_iter()
        .find(|m| m.api_name() == id)
    }

    pub fn api_name(self) -> &'static str {
        match self {
            OpenAIModel::GPT4 => "gpt-4",
            OpenAIModel::GPT4Turbo => "gpt-4-turbo",
            OpenAIModel::GPT4o => "gpt-4o",
            OpenAIModel::GPT4oMini => "gpt-4o-mini",
            OpenAIModel::O4Mini => "o4-mini",
        }
    }

    /// Models that use `max_completion_tokens` instead of `max_tokens`
    pub fn uses_max_completion_tokens(self) -> bool {
        matches!(self, OpenAIModel::O4Mini)
    }
}

/// OpenAI-compatible service implementation
pub struct OpenAIService {
    client: Client,
    api_key: String,
    model: OpenAIModel,
    base_url: String,
}

impl OpenAIService {
    pub fn new(
        api_key: String,
        model: OpenAIModel,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn translate_request(&self, request: &LlmRequest) -> OpenAIRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(system) = &request.system {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: Some(system.clone()),
            });
        }
        messages.extend(request.messages.iter().map(Self::translate_message));

        // O-series models use max_completion_tokens, others use max_tokens
        let (max_tokens, max_completion_tokens) = if self.model.uses_max_completion_tokens() {
            (None, request.max_tokens)
        } else {
            (request.max_tokens, None)
        };

        OpenAIRequest {
            model: self.model.api_name().to_string(),
            messages,
            max_tokens,
            max_completion_tokens,
        }
    }

    fn translate_message(msg: &LlmMessage) -> OpenAIMessage {
        OpenAIMessage {
            role: msg.role.as_str().to_string(),
            content: Some(msg.text.clone()),
        }
    }

    fn normalize_response(resp: OpenAIResponse) -> Result<LlmResponse, LlmError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::empty_response("No choices in response"))?;

        let text = choice
            .message
            .content
            .ok_or_else(|| LlmError::empty_response("Choice has no message content"))?;

        let usage = resp.usage.map_or_else(Usage::default, |u| Usage {
            input_tokens: u64::from(u.prompt_tokens),
            output_tokens: u64::from(u.completion_tokens),
        });

        Ok(LlmResponse { text, usage })
    }

    /// POST `body` to `{base_url}/{endpoint}` and decode the JSON reply
    async fn post_json<B, R>(&self, endpoint: &str, body: &B) -> Result<R, LlmError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            if let Ok(error_resp) = serde_json::from_str::<OpenAIErrorResponse>(&body) {
                return Err(LlmError::from_status(status.as_u16(), &error_resp.error.message));
            }
            return Err(LlmError::from_status(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })
    }
}

#[async_trait]
impl LlmService for OpenAIService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let openai_request = self.translate_request(request);
        let response: OpenAIResponse = self.post_json("chat/completions", &openai_request).await?;
        Self::normalize_response(response)
    }

    fn model_id(&self) -> &str {
        self.model.api_name()
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmErrorKind;
    use serde_json::json;

    fn service(model: OpenAIModel) -> OpenAIService {
        OpenAIService::new(
            "test-key".to_string(),
            model,
            "https://api.openai.com/v1/",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_model_ids() {
        assert_eq!(OpenAIModel::from_id("gpt-4"), Some(OpenAIModel::GPT4));
        assert_eq!(OpenAIModel::from_id("gpt-4o-mini"), Some(OpenAIModel::GPT4oMini));
        assert_eq!(OpenAIModel::from_id("claude"), None);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(service(OpenAIModel::GPT4).base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_translate_request_puts_system_first() {
        let request = LlmRequest::prompt(Some("classify"), "hello").with_max_tokens(10);
        let translated = service(OpenAIModel::GPT4).translate_request(&request);
        let value = serde_json::to_value(&translated).unwrap();

        assert_eq!(
            value,
            json!({
                "model": "gpt-4",
                "messages": [
                    { "role": "system", "content": "classify" },
                    { "role": "user", "content": "hello" }
                ],
                "max_tokens": 10
            })
        );
    }

    #[test]
    fn test_translate_request_o_series_token_field() {
        let request = LlmRequest::prompt(None, "hello").with_max_tokens(10);
        let translated = service(OpenAIModel::O4Mini).translate_request(&request);

        assert_eq!(translated.max_tokens, None);
        assert_eq!(translated.max_completion_tokens, Some(10));
        assert_eq!(translated.messages.len(), 1);
    }

    #[test]
    fn test_normalize_response() {
        let resp: OpenAIResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "role": "assistant", "content": " Activate\n" } }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 1, "total_tokens": 13 }
        }))
        .unwrap();

        let normalized = OpenAIService::normalize_response(resp).unwrap();
        assert_eq!(normalized.text, " Activate\n");
        assert_eq!(normalized.usage.input_tokens, 12);
        assert_eq!(normalized.usage.output_tokens, 1);
    }

    #[test]
    fn test_normalize_response_without_choices() {
        let resp: OpenAIResponse = serde_json::from_value(json!({ "choices": [] })).unwrap();
        let err = OpenAIService::normalize_response(resp).unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::EmptyResponse);
    }
}
