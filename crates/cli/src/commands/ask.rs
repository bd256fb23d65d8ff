//! Ask command handler.
//!
//! Runs each question through the answering pipeline and prints the outcome.

use askrc_core::{config::AppConfig, AppError, AppResult};
use askrc_pipeline::{PipelineOutcome, PipelineRun, QueryPipeline};
use clap::Args;
use std::path::PathBuf;

/// Answer one or more questions
#[derive(Args, Debug)]
pub struct AskCommand {
    /// Questions to answer (several are answered concurrently)
    #[arg(required_unless_present = "file")]
    pub questions: Vec<String>,

    /// Read questions from a file, one per line
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Exit without waiting for pending alerts
    #[arg(long)]
    pub no_wait: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let questions = self.collect_questions()?;
        let pipeline = QueryPipeline::from_config(config)?;

        let results = pipeline.answer_all(&questions).await;

        let mut pending = Vec::new();
        let mut entries = Vec::new();
        let mut failures = 0;

        for (question, result) in questions.iter().zip(results) {
            match result {
                Ok(run) => {
                    if self.json {
                        entries.push(serde_json::json!({
                            "question": question,
                            "runId": run.run_id.to_string(),
                            "result": run.outcome,
                        }));
                    } else {
                        print_outcome(question, &run.outcome, questions.len() > 1);
                    }
                    pending.push(run);
                }
                Err(e) => {
                    failures += 1;
                    tracing::error!("Could not process question: {}", e);
                    if self.json {
                        entries.push(serde_json::json!({
                            "question": question,
                            "error": e.to_string(),
                        }));
                    } else {
                        eprintln!("Could not process \"{}\": {}", question, e);
                    }
                }
            }
        }

        if self.json {
            let output = if entries.len() == 1 {
                entries.remove(0)
            } else {
                serde_json::Value::Array(entries)
            };
            let json = serde_json::to_string_pretty(&output)?;
            println!("{}", json);
        }

        if self.no_wait {
            tracing::debug!("Not waiting for {} pending runs", pending.len());
        } else {
            futures::future::join_all(pending.into_iter().map(PipelineRun::finish)).await;
        }

        if failures > 0 {
            return Err(AppError::Other(format!(
                "{} of {} questions could not be processed",
                failures,
                questions.len()
            )));
        }

        Ok(())
    }

    /// Questions from the command line followed by those in `--file`.
    fn collect_questions(&self) -> AppResult<Vec<String>> {
        let mut questions: Vec<String> = self
            .questions
            .iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();

        if let Some(ref path) = self.file {
            let contents = std::fs::read_to_string(path).map_err(|e| {
                AppError::Config(format!("Failed to read questions file {:?}: {}", path, e))
            })?;
            questions.extend(
                contents
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    .map(str::to_string),
            );
        }

        if questions.is_empty() {
            return Err(AppError::Config("No question provided".to_string()));
        }

        Ok(questions)
    }
}

fn print_outcome(question: &str, outcome: &PipelineOutcome, with_heading: bool) {
    if with_heading {
        println!("Q: {}", question);
    }
    println!("{}", outcome.user_message());
    if with_heading {
        println!();
    }

    if let Some(answer) = outcome.answer() {
        tracing::debug!(
            outcome = outcome.label(),
            key_concepts = answer.grounding.overlap(),
            threshold = answer.grounding.threshold,
            "Answer details"
        );
    }
}
