//! Answer generation with fixed-delay retry on rate limiting.

use askrc_core::config::GenerationConfig;
use askrc_core::AppResult;
use askrc_llm::{LlmClient, LlmRequest};
use askrc_prompt::PromptSpec;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Text returned when every attempt was rate-limited. Downstream consumers
/// match on this exact wording.
pub const GENERATION_FAILED: &str =
    "Request failed after multiple attempts due to rate limit issues.";

/// How often to try and how long to wait between rate-limited attempts.
///
/// The delay is fixed, not exponential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// Produces candidate answers from a [`PromptSpec`].
pub struct AnswerGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
    retry: RetryPolicy,
}

impl AnswerGenerator {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens: 1024,
            temperature: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Generator configured from the `generation` config section.
    pub fn from_config(client: Arc<dyn LlmClient>, config: &GenerationConfig) -> Self {
        let mut generator = Self::new(client, &config.model)
            .with_max_tokens(config.max_tokens)
            .with_retry_policy(RetryPolicy {
                max_retries: config.max_retries,
                delay: config.retry_delay(),
            });
        generator.temperature = config.temperature;
        generator
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn to_request(&self, prompt: &PromptSpec) -> LlmRequest {
        let mut request = LlmRequest::new(prompt.user.clone(), &self.model)
            .with_system(prompt.system.clone())
            .with_max_tokens(self.max_tokens);

        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }

        request
    }

    /// Generate an answer.
    ///
    /// Only `AppError::RateLimited` is retried. Any other backend error is
    /// returned immediately. When every attempt is rate-limited the result is
    /// `Ok(GENERATION_FAILED)`.
    #[instrument(skip(self, prompt), fields(provider = self.client.provider_name(), model = %self.model))]
    pub async fn generate(&self, prompt: &PromptSpec) -> AppResult<String> {
        let request = self.to_request(prompt);
        let attempts = self.retry.max_retries;

        for attempt in 1..=attempts {
            match self.client.complete(&request).await {
                Ok(response) => {
                    info!(attempt, "Generated answer");
                    return Ok(response.content.trim().to_string());
                }
                Err(e) if e.is_rate_limited() => {
                    if attempt < attempts {
                        warn!(
                            "Rate limit exceeded. Retrying in {:?} (attempt {}/{})",
                            self.retry.delay, attempt, attempts
                        );
                        tokio::time::sleep(self.retry.delay).await;
                    } else {
                        warn!("Rate limit exceeded on final attempt {}/{}", attempt, attempts);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        warn!("Generation gave up after {} rate-limited attempts", attempts);
        Ok(GENERATION_FAILED.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fakes::ScriptedLlm;
    use askrc_core::AppError;

    fn prompt() -> PromptSpec {
        PromptSpec {
            system: "rules".to_string(),
            context: "ctx".to_string(),
            question: "q".to_string(),
            user: "ctx q".to_string(),
        }
    }

    fn generator(llm: &Arc<ScriptedLlm>, max_retries: u32) -> AnswerGenerator {
        AnswerGenerator::new(llm.clone(), "gpt-4-turbo").with_retry_policy(RetryPolicy {
            max_retries,
            delay: Duration::ZERO,
        })
    }

    #[tokio::test]
    async fn test_single_call_on_success() {
        let llm = Arc::new(ScriptedLlm::new(vec![Ok("  Use sbatch.  ".to_string())]));
        let answer = generator(&llm, 3).generate(&prompt()).await.unwrap();

        assert_eq!(answer, "Use sbatch.");
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_sentinel_after_exhausting_retries() {
        let llm = Arc::new(ScriptedLlm::always_rate_limited());
        let answer = generator(&llm, 3).generate(&prompt()).await.unwrap();

        assert_eq!(answer, GENERATION_FAILED);
        assert_eq!(llm.calls(), 3);
    }

    #[tokio::test]
    async fn test_recovers_after_rate_limit() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Err(AppError::RateLimited("429".to_string())),
            Ok("second time lucky".to_string()),
        ]));
        let answer = generator(&llm, 3).generate(&prompt()).await.unwrap();

        assert_eq!(answer, "second time lucky");
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Err(AppError::Llm("401 invalid key".to_string())),
            Ok("never reached".to_string()),
        ]));
        let result = generator(&llm, 3).generate(&prompt()).await;

        assert!(matches!(result, Err(AppError::Llm(_))));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_request_carries_prompt_and_budget() {
        let llm = Arc::new(ScriptedLlm::new(vec![Ok("ok".to_string())]));
        generator(&llm, 1)
            .with_max_tokens(256)
            .with_temperature(0.1)
            .generate(&prompt())
            .await
            .unwrap();

        let request = llm.last_request().expect("request recorded");
        assert_eq!(request.system.as_deref(), Some("rules"));
        assert_eq!(request.prompt, "ctx q");
        assert_eq!(request.model, "gpt-4-turbo");
        assert_eq!(request.max_tokens, Some(256));
        assert_eq!(request.temperature, Some(0.1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_between_attempts() {
        let llm = Arc::new(ScriptedLlm::always_rate_limited());
        let generator = AnswerGenerator::new(llm.clone(), "gpt-4-turbo").with_retry_policy(
            RetryPolicy {
                max_retries: 3,
                delay: Duration::from_secs(5),
            },
        );

        let started = tokio::time::Instant::now();
        let answer = generator.generate(&prompt()).await.unwrap();

        assert_eq!(answer, GENERATION_FAILED);
        assert_eq!(llm.calls(), 3);
        // Two pauses between three attempts, none after the last
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(10));
        assert!(elapsed < Duration::from_secs(15));
    }

    #[test]
    fn test_from_config() {
        let config = GenerationConfig {
            model: "gpt-4o".to_string(),
            max_tokens: 512,
            max_retries: 5,
            retry_delay_secs: 2,
            ..GenerationConfig::default()
        };
        let llm = Arc::new(ScriptedLlm::new(Vec::new()));
        let generator = AnswerGenerator::from_config(llm, &config);

        assert_eq!(generator.model(), "gpt-4o");
        assert_eq!(
            generator.retry_policy(),
            RetryPolicy {
                max_retries: 5,
                delay: Duration::from_secs(2)
            }
        );
    }
}
