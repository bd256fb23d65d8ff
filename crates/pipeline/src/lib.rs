//! Question-answering pipeline for AskRC.
//!
//! Screens a question for bias, retrieves documentation context, generates
//! an answer, checks that the answer is grounded in the context and decides
//! whether to display, suppress or escalate it.
//!
//! Every external boundary is a trait so deployments (and tests) can swap
//! implementations without touching the state machine:
//! - [`ContextRetriever`]: search index
//! - [`BiasScreen`]: question and answer screening
//! - [`AnswerValidator`]: grounding check
//! - [`Notifier`]: out-of-band alerts
//!
//! Generation goes through [`AnswerGenerator`], which wraps any
//! [`askrc_llm::LlmClient`] with the rate-limit retry policy.

pub mod generator;
pub mod notify;
pub mod outcome;
pub mod pipeline;
pub mod retriever;
pub mod screen;
pub mod validator;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use generator::{AnswerGenerator, RetryPolicy, GENERATION_FAILED};
pub use notify::{dispatch, Alert, LogNotifier, Notifier, SlackNotifier};
pub use outcome::{Answer, PipelineOutcome};
pub use pipeline::{PipelineRun, QueryPipeline};
pub use retriever::{AzureSearchRetriever, ContextRetriever, RetrievedContext, NO_RELEVANT_INFORMATION};
pub use screen::{BiasFinding, BiasKind, BiasScreen, LexicalBiasScreen, PassthroughScreen, ScreenTarget, Screened};
pub use validator::{AnswerValidator, GroundingReport, KeyConceptValidator};
