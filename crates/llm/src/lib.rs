//! LLM integration crate for AskRC.
//!
//! Provider-agnostic access to generative-text backends through the
//! [`LlmClient`] trait. Retry policy lives with the caller; providers only
//! classify failures (rate limiting vs. everything else).
//!
//! # Providers
//! - **OpenAI**: chat-completions API, or any gateway speaking it
//!
//! # Example
//! ```no_run
//! use askrc_llm::{LlmClient, LlmRequest, providers::OpenAiClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiClient::new("sk-...");
//! let request = LlmRequest::new("How do I submit a GPU job?", "gpt-4-turbo")
//!     .with_system("You are a helpful assistant.");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::OpenAiClient;
pub use types::ProviderType;
