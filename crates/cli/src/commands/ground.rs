//! Ground command handler.
//!
//! Calibration aid for the grounding threshold: shows the shared key
//! concepts between an answer and a context and the resulting verdict.

use askrc_core::{config::AppConfig, AppResult};
use askrc_pipeline::{AnswerValidator, GroundingReport, KeyConceptValidator};
use clap::Args;
use std::path::PathBuf;

/// Check how well an answer is grounded in a context
#[derive(Args, Debug)]
pub struct GroundCommand {
    /// File holding the answer text
    #[arg(long)]
    pub answer: PathBuf,

    /// File holding the context text
    #[arg(long)]
    pub context: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl GroundCommand {
    /// Execute the ground command.
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ground command");

        let answer = std::fs::read_to_string(&self.answer)?;
        let context = std::fs::read_to_string(&self.context)?;

        let validator = KeyConceptValidator::new(config.validation.threshold);
        let report = validator.assess(&answer, &context);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print!("{}", render(&report));
        }

        Ok(())
    }
}

fn render(report: &GroundingReport) -> String {
    let concepts: Vec<&str> = report.key_concepts.iter().map(String::as_str).collect();
    format!(
        "Key concepts ({}/{}): {}\nGrounded: {}\n",
        report.overlap(),
        report.threshold,
        if concepts.is_empty() {
            "-".to_string()
        } else {
            concepts.join(", ")
        },
        if report.grounded { "yes" } else { "no" }
    )
}
