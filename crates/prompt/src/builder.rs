//! Prompt builder rendering the user template around context and question.

use crate::types::{PromptSpec, PromptTemplate};
use askrc_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

const TEMPLATE_NAME: &str = "prompt";

/// Composes [`PromptSpec`]s from a single registered template.
///
/// `build` has no side effects and no hidden state: the same context and
/// question always yield the same spec.
///
/// # Example
/// ```
/// use askrc_prompt::PromptBuilder;
///
/// let builder = PromptBuilder::builtin().unwrap();
/// let spec = builder.build("Use sbatch to submit jobs.", "How do I submit a job?").unwrap();
/// assert!(spec.user.contains("How do I submit a job?"));
/// ```
pub struct PromptBuilder {
    template: PromptTemplate,
    handlebars: Handlebars<'static>,
}

impl PromptBuilder {
    /// Register a template for rendering.
    pub fn new(template: PromptTemplate) -> AppResult<Self> {
        let mut handlebars = Handlebars::new();

        // Plain text, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);

        handlebars
            .register_template_string(TEMPLATE_NAME, &template.template)
            .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

        tracing::debug!("Registered prompt template: {}", template.id);

        Ok(Self {
            template,
            handlebars,
        })
    }

    /// Builder using the built-in template.
    pub fn builtin() -> AppResult<Self> {
        Self::new(PromptTemplate::default())
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Compose the prompt for one question.
    pub fn build(&self, context: &str, question: &str) -> AppResult<PromptSpec> {
        let mut variables = HashMap::new();
        variables.insert("context", context);
        variables.insert("question", question);

        let user = self
            .handlebars
            .render(TEMPLATE_NAME, &variables)
            .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

        Ok(PromptSpec {
            system: self.template.system.clone(),
            context: context.to_string(),
            question: question.to_string(),
            user,
        })
    }
}
