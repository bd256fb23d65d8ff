//! Terminal results of a pipeline run.

use crate::screen::BiasFinding;
use crate::validator::GroundingReport;
use serde::Serialize;

/// A generated answer after screening and validation. Never mutated once a
/// decision has been made about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    /// Text as returned by the generator (or the generation-failed sentinel)
    pub raw: String,
    /// Screened text shown to the user
    pub cleaned: String,
    /// Answer-side bias finding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finding: Option<BiasFinding>,
    pub grounding: GroundingReport,
}

impl Answer {
    pub fn is_grounded(&self) -> bool {
        self.grounding.grounded
    }
}

/// Exactly one of these is produced per question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Grounded answer with no bias finding
    Displayed { answer: Answer },
    /// The question itself was flagged; nothing else ran
    RephraseRequested { finding: BiasFinding },
    /// Grounded answer whose text was flagged by the answer screen. Shown
    /// with the finding as a warning
    BiasFlaggedAnswer { answer: Answer, finding: BiasFinding },
    /// Answer not supported by the retrieved context
    InsufficientContext { answer: Answer },
}

impl PipelineOutcome {
    /// Stable label used in logs and JSON output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Displayed { .. } => "displayed",
            Self::RephraseRequested { .. } => "rephrase_requested",
            Self::BiasFlaggedAnswer { .. } => "bias_flagged_answer",
            Self::InsufficientContext { .. } => "insufficient_context",
        }
    }

    pub fn answer(&self) -> Option<&Answer> {
        match self {
            Self::Displayed { answer }
            | Self::BiasFlaggedAnswer { answer, .. }
            | Self::InsufficientContext { answer } => Some(answer),
            Self::RephraseRequested { .. } => None,
        }
    }

    pub fn finding(&self) -> Option<&BiasFinding> {
        match self {
            Self::RephraseRequested { finding } | Self::BiasFlaggedAnswer { finding, .. } => {
                Some(finding)
            }
            _ => None,
        }
    }

    /// Whether the answer text may be shown as-is.
    pub fn is_displayed(&self) -> bool {
        matches!(self, Self::Displayed { .. })
    }

    /// What the asker sees.
    pub fn user_message(&self) -> String {
        match self {
            Self::Displayed { answer } => answer.cleaned.clone(),
            Self::RephraseRequested { finding } => finding.message.clone(),
            Self::BiasFlaggedAnswer { answer, finding } => {
                format!("{}\n\nWarning: {}", answer.cleaned, finding.message)
            }
            Self::InsufficientContext { .. } => {
                "The documentation does not contain enough information to answer this \
                 question reliably. The support team has been notified."
                    .to_string()
            }
        }
    }
}
