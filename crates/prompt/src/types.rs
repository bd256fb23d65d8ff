//! Prompt types for AskRC.

use serde::{Deserialize, Serialize};

/// Built-in system instruction.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are AskRC, an assistant for research computing \
cluster documentation. Answer the question using only the documentation context provided. \
Quote commands, paths and partition names exactly as they appear in the context. \
If the context does not contain the answer, say that you could not find it in the documentation. \
Keep the answer concise and factual.";

/// Built-in user message template.
pub const DEFAULT_USER_TEMPLATE: &str =
    "Documentation context:\n{{context}}\n\nQuestion:\n{{question}}\n\nAnswer:";

/// A prompt template, either built in or loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// Unique template identifier
    pub id: String,

    /// Human-readable title
    #[serde(default)]
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// System instruction sent verbatim
    pub system: String,

    /// Handlebars template for the user message
    pub template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            id: "askrc.answer.default".to_string(),
            title: "Answer from documentation".to_string(),
            api_version: "1.0".to_string(),
            system: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            template: DEFAULT_USER_TEMPLATE.to_string(),
        }
    }
}

/// A fully composed prompt ready for generation.
///
/// Carries its inputs alongside the rendered user message so the generation
/// step can be reproduced from the spec alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSpec {
    /// System instruction
    pub system: String,

    /// Context blob the answer must be grounded in
    pub context: String,

    /// Cleaned question
    pub question: String,

    /// Rendered user message
    pub user: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_deserialization() {
        let yaml = r#"
id: askrc.answer.terse
title: Terse answers
apiVersion: "1.0"
system: Answer in one sentence.
template: "{{context}} -- {{question}}"
"#;

        let template: PromptTemplate = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(template.id, "askrc.answer.terse");
        assert_eq!(template.system, "Answer in one sentence.");
        assert!(template.template.contains("{{question}}"));
    }

    #[test]
    fn test_default_template_placeholders() {
        let template = PromptTemplate::default();
        assert!(template.template.contains("{{context}}"));
        assert!(template.template.contains("{{question}}"));
        assert!(!template.system.is_empty());
    }
}
