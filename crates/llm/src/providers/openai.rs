//! OpenAI chat-completions provider.
//!
//! Works with api.openai.com and with gateways that expose the same
//! `/v1/chat/completions` contract.
//! API: https://platform.openai.com/docs/api-reference/chat

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use askrc_core::{AppError, AppResult};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
const CHAT_ENDPOINT: &str = "/v1/chat/completions";

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Chat-completions request format.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions response format.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Error envelope returned on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// OpenAI LLM client.
pub struct OpenAiClient {
    /// Base URL without the `/v1/...` path
    base_url: String,

    api_key: String,

    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client for api.openai.com.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_OPENAI_URL, api_key)
    }

    /// Create a client for an OpenAI-compatible gateway.
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert LlmRequest to the chat format: optional system message, then the user message.
    fn to_chat_request(&self, request: &LlmRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);

        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: Some(system.clone()),
            });
        }

        messages.push(ChatMessage {
            role: "user".to_string(),
            content: Some(request.prompt.clone()),
        });

        ChatRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }

    /// Convert a chat response to LlmResponse, taking the first choice.
    fn convert_response(&self, response: ChatResponse) -> AppResult<LlmResponse> {
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::Llm("OpenAI response contained no choices".to_string()))?;

        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content: content.trim().to_string(),
            model: response.model,
            usage,
        })
    }
}

/// Map a non-2xx response to the error taxonomy.
///
/// 429 is the only status the caller retries.
fn classify_error(status: StatusCode, body: &str) -> AppError {
    let detail = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.code {
            Some(code) => format!("{} ({})", envelope.error.message, code),
            None => envelope.error.message,
        },
        Err(_) => body.to_string(),
    };

    if status == StatusCode::TOO_MANY_REQUESTS {
        AppError::RateLimited(format!("OpenAI API ({}): {}", status, detail))
    } else {
        AppError::Llm(format!("OpenAI API error ({}): {}", status, detail))
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(model = %request.model, "Sending completion request to OpenAI");
        tracing::debug!("Request: {:?}", request);

        let chat_request = self.to_chat_request(request);
        let url = format!("{}{}", self.base_url, CHAT_ENDPOINT);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to OpenAI: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_error(status, &error_text));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse OpenAI response: {}", e)))?;

        tracing::info!("Received completion from OpenAI");

        let converted = self.convert_response(chat_response)?;
        tracing::debug!(
            prompt_tokens = converted.usage.prompt_tokens,
            completion_tokens = converted.usage.completion_tokens,
            "Token usage"
        );

        Ok(converted)
    }
}
