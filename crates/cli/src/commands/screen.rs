//! Screen command handler.
//!
//! Runs the configured bias screen over a piece of text.

use askrc_core::{config::AppConfig, AppResult};
use askrc_pipeline::{BiasScreen, LexicalBiasScreen, PassthroughScreen, ScreenTarget};
use clap::Args;

/// Run the bias screen on a piece of text
#[derive(Args, Debug)]
pub struct ScreenCommand {
    /// Text to screen
    #[arg(required = true, trailing_var_arg = true)]
    pub text: Vec<String>,

    /// Screen as a generated response rather than a question
    #[arg(long)]
    pub response: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ScreenCommand {
    /// Execute the screen command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing screen command");

        let screen = self.build_screen(config);
        let screened = screen.screen(&self.text.join(" ")).await;

        if self.json {
            let output = serde_json::json!({
                "screen": screen.name(),
                "cleaned": screened.cleaned,
                "finding": screened.finding,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Cleaned: {}", screened.cleaned);
            match screened.finding {
                Some(finding) => println!("Finding ({}): {}", finding.kind, finding.message),
                None => println!("Finding: none"),
            }
        }

        Ok(())
    }

    fn build_screen(&self, config: &AppConfig) -> Box<dyn BiasScreen> {
        let target = if self.response {
            ScreenTarget::Response
        } else {
            ScreenTarget::Question
        };
        if !config.screening.enabled {
            return Box::new(PassthroughScreen::new(target));
        }

        Box::new(LexicalBiasScreen::new(target).with_extra_terms(&config.screening.extra_terms))
    }
}
