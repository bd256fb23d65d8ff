//! LLM provider factory.
//!
//! Builds the configured [`LlmClient`] from a provider name, an optional
//! endpoint override and the resolved API key.

use crate::client::LlmClient;
use crate::providers::OpenAiClient;
use crate::types::ProviderType;
use askrc_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("openai")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required by hosted providers
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required
/// key is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;

    let api_key = match api_key {
        Some(key) if !key.trim().is_empty() => Some(key),
        _ if provider_type.requires_api_key() => {
            return Err(AppError::Config(format!(
                "{} provider requires API key",
                provider_type.as_str()
            )));
        }
        _ => None,
    };

    match provider_type {
        ProviderType::OpenAI => {
            let key = api_key.unwrap_or_default();
            let client = match endpoint {
                Some(base_url) => OpenAiClient::with_base_url(base_url, key),
                None => OpenAiClient::new(key),
            };
            tracing::debug!("Created {} client at {}", provider_type.as_str(), client.base_url());
            Ok(Arc::new(client))
        }
    }
}
