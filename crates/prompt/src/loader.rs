//! Loader for YAML prompt templates.

use crate::types::PromptTemplate;
use askrc_core::{AppError, AppResult};
use std::path::Path;

/// Load a prompt template, falling back to the built-in one.
///
/// # Arguments
/// * `path` - Optional YAML file; `None` selects the built-in template
///
/// # Example
/// ```no_run
/// use askrc_prompt::load_template;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let template = load_template(Some(Path::new(".askrc/prompts/answer.yml")))?;
/// println!("Loaded template: {}", template.title);
/// # Ok(())
/// # }
/// ```
pub fn load_template(path: Option<&Path>) -> AppResult<PromptTemplate> {
    let Some(path) = path else {
        tracing::debug!("Using built-in prompt template");
        return Ok(PromptTemplate::default());
    };

    tracing::debug!("Loading prompt template from: {:?}", path);

    if !path.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            path
        )));
    }

    let contents = std::fs::read_to_string(path).map_err(|e| {
        AppError::Prompt(format!("Failed to read prompt file {:?}: {}", path, e))
    })?;

    let template: PromptTemplate = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML {:?}: {}", path, e))
    })?;

    validate_template(&template)?;

    tracing::info!("Loaded prompt template: {} ({})", template.id, template.title);

    Ok(template)
}

/// Validate a prompt template.
fn validate_template(template: &PromptTemplate) -> AppResult<()> {
    if template.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if template.system.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt system instruction cannot be empty".to_string(),
        ));
    }

    if !template.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            template.api_version
        )));
    }

    // A template that drops either input cannot ground or answer anything
    for placeholder in ["{{context}}", "{{question}}"] {
        if !template.template.contains(placeholder) {
            return Err(AppError::Prompt(format!(
                "Prompt template must reference {}",
                placeholder
            )));
        }
    }

    Ok(())
}
