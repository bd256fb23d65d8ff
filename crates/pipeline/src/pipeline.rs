//! The question-answering state machine.
//!
//! ```text
//! ScreenQuestion ─finding─▶ RephraseRequested
//!       │
//!   Retrieve ─error─▶ Err(Retrieval)
//!       │
//!  BuildPrompt ─▶ Generate ─error─▶ Err(Llm)
//!       │
//!  ScreenAnswer ─▶ Validate ─┬─ not grounded ─▶ InsufficientContext (+ alert)
//!                            ├─ finding ──────▶ BiasFlaggedAnswer   (+ alert)
//!                            └─ otherwise ────▶ Displayed
//! ```
//!
//! Stages run strictly in order and none is revisited. Alerts are spawned and
//! never influence the outcome.

use crate::generator::AnswerGenerator;
use crate::notify::{dispatch, Alert, LogNotifier, Notifier, SlackNotifier};
use crate::outcome::{Answer, PipelineOutcome};
use crate::retriever::{AzureSearchRetriever, ContextRetriever};
use crate::screen::{BiasFinding, BiasScreen, LexicalBiasScreen, PassthroughScreen, ScreenTarget};
use crate::validator::{AnswerValidator, KeyConceptValidator};
use askrc_core::{AppConfig, AppError, AppResult};
use askrc_prompt::{load_template, PromptBuilder};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

const DEFAULT_TOP_K: usize = 8;
const DEFAULT_CHANNEL: &str = "slack";

const LACKS_CONTEXT_TITLE: &str = "Answer lacks context";
const BIAS_TITLE: &str = "Bias detected in model response";

/// One finished run: the outcome plus the alert still in flight, if any.
#[derive(Debug)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub outcome: PipelineOutcome,
    pub notification: Option<JoinHandle<()>>,
}

impl PipelineRun {
    /// Wait for the pending alert (if any) and return the outcome.
    pub async fn finish(self) -> PipelineOutcome {
        if let Some(handle) = self.notification {
            if let Err(e) = handle.await {
                warn!(run_id = %self.run_id, "Alert task did not complete: {}", e);
            }
        }
        self.outcome
    }
}

/// Orchestrates screening, retrieval, generation and validation for a
/// single question at a time. Holds no per-question state, so one instance
/// can serve many concurrent questions behind an `Arc`.
pub struct QueryPipeline {
    question_screen: Arc<dyn BiasScreen>,
    answer_screen: Arc<dyn BiasScreen>,
    retriever: Arc<dyn ContextRetriever>,
    prompts: PromptBuilder,
    generator: AnswerGenerator,
    validator: Arc<dyn AnswerValidator>,
    notifier: Arc<dyn Notifier>,
    channel: String,
    top_k: usize,
}

impl QueryPipeline {
    /// Pipeline with the lexical screens, the default grounding threshold and
    /// the built-in prompt.
    pub fn new(
        retriever: Arc<dyn ContextRetriever>,
        generator: AnswerGenerator,
        notifier: Arc<dyn Notifier>,
    ) -> AppResult<Self> {
        Ok(Self {
            question_screen: Arc::new(LexicalBiasScreen::for_questions()),
            answer_screen: Arc::new(LexicalBiasScreen::for_responses()),
            retriever,
            prompts: PromptBuilder::builtin()?,
            generator,
            validator: Arc::new(KeyConceptValidator::default()),
            notifier,
            channel: DEFAULT_CHANNEL.to_string(),
            top_k: DEFAULT_TOP_K,
        })
    }

    /// Build every collaborator from configuration.
    ///
    /// # Errors
    /// `AppError::Config` when the configuration is invalid or a required
    /// key is missing from the environment; `AppError::Prompt` when the
    /// prompt file cannot be loaded.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;

        let endpoint = config.search.endpoint.as_deref().unwrap_or_default();
        let search_key = config.search_api_key().ok_or_else(|| {
            AppError::Config(format!(
                "Search key not set. Export {}",
                config.search.api_key_env
            ))
        })?;
        let retriever = AzureSearchRetriever::new(endpoint, &config.search.index, search_key)?
            .with_api_version(&config.search.api_version);

        let api_key = config.generation_api_key();
        let client = askrc_llm::create_client(
            &config.generation.provider,
            config.generation.endpoint.as_deref(),
            api_key.as_deref(),
        )?;
        let generator = AnswerGenerator::from_config(client, &config.generation);

        let notifier: Arc<dyn Notifier> = match config.webhook_url() {
            Some(url) => Arc::new(SlackNotifier::new(url)?),
            None => {
                if config.alerts.enabled {
                    warn!(
                        "{} not set; alerts will only be logged",
                        config.alerts.webhook_url_env
                    );
                }
                Arc::new(LogNotifier)
            }
        };

        let template = load_template(config.generation.prompt_file.as_deref())?;

        let mut pipeline = Self::new(Arc::new(retriever), generator, notifier)?
            .with_prompt_builder(PromptBuilder::new(template)?)
            .with_validator(Arc::new(KeyConceptValidator::new(
                config.validation.threshold,
            )))
            .with_top_k(config.search.top_k)
            .with_channel(&config.alerts.channel);

        if config.screening.enabled {
            let extra = &config.screening.extra_terms;
            pipeline = pipeline
                .with_question_screen(Arc::new(
                    LexicalBiasScreen::new(ScreenTarget::Question).with_extra_terms(extra),
                ))
                .with_answer_screen(Arc::new(
                    LexicalBiasScreen::new(ScreenTarget::Response).with_extra_terms(extra),
                ));
        } else {
            pipeline = pipeline
                .with_question_screen(Arc::new(PassthroughScreen::new(ScreenTarget::Question)))
                .with_answer_screen(Arc::new(PassthroughScreen::new(ScreenTarget::Response)));
        }

        Ok(pipeline)
    }

    pub fn with_question_screen(mut self, screen: Arc<dyn BiasScreen>) -> Self {
        self.question_screen = screen;
        self
    }

    pub fn with_answer_screen(mut self, screen: Arc<dyn BiasScreen>) -> Self {
        self.answer_screen = screen;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn AnswerValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_prompt_builder(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    /// Fragments requested per question. Zero is raised to one.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Answer one question, leaving any alert to finish in the background.
    pub async fn answer(&self, question: &str) -> AppResult<PipelineOutcome> {
        Ok(self.run(question).await?.outcome)
    }

    /// Answer several questions concurrently. Results keep input order.
    pub async fn answer_all(&self, questions: &[String]) -> Vec<AppResult<PipelineRun>> {
        futures::future::join_all(questions.iter().map(|q| self.run(q))).await
    }

    /// Answer one question and hand back the pending alert with the outcome.
    pub async fn run(&self, question: &str) -> AppResult<PipelineRun> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("pipeline", %run_id);

        async move {
            let (outcome, notification) = self.execute(question).await?;
            info!(outcome = outcome.label(), "Pipeline finished");
            Ok(PipelineRun {
                run_id,
                outcome,
                notification,
            })
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        question: &str,
    ) -> AppResult<(PipelineOutcome, Option<JoinHandle<()>>)> {
        // ScreenQuestion
        let screened = self.question_screen.screen(question).await;
        if let Some(finding) = screened.finding {
            info!(kind = %finding.kind, "Question flagged; asking for a rephrase");
            return Ok((PipelineOutcome::RephraseRequested { finding }, None));
        }
        let question = screened.cleaned;

        // Retrieve
        let context = self.retriever.retrieve(&question, self.top_k).await?;
        let context_blob = context.to_blob();

        // BuildPrompt
        let prompt = self.prompts.build(&context_blob, &question)?;

        // Generate
        let raw = self.generator.generate(&prompt).await?;

        // ScreenAnswer
        let screened_answer = self.answer_screen.screen(&raw).await;

        // Validate
        let grounding = self
            .validator
            .assess(&screened_answer.cleaned, &context_blob);

        let answer = Answer {
            raw,
            cleaned: screened_answer.cleaned,
            finding: screened_answer.finding.clone(),
            grounding,
        };

        if !answer.is_grounded() {
            let mut body = format!(
                "The answer provided lacks sufficient contextual relevance: {}",
                answer.cleaned
            );
            // A finding on an ungrounded answer rides along in the same alert
            if let Some(finding) = &answer.finding {
                body.push_str(&format!(
                    "\nBias message in the model response: {}",
                    finding.message
                ));
            }
            let alert =
                Alert::new(&self.channel, LACKS_CONTEXT_TITLE, body).with_question(&question);
            let handle = dispatch(self.notifier.clone(), alert);
            return Ok((PipelineOutcome::InsufficientContext { answer }, Some(handle)));
        }

        match screened_answer.finding {
            Some(finding) => {
                let handle = dispatch(self.notifier.clone(), self.bias_alert(&finding, &question));
                Ok((
                    PipelineOutcome::BiasFlaggedAnswer { answer, finding },
                    Some(handle),
                ))
            }
            None => Ok((PipelineOutcome::Displayed { answer }, None)),
        }
    }

    fn bias_alert(&self, finding: &BiasFinding, question: &str) -> Alert {
        Alert::new(
            &self.channel,
            BIAS_TITLE,
            format!("Bias message in the model response: {}", finding.message),
        )
        .with_question(question)
    }
}
