//! Prompt composition for AskRC.
//!
//! This crate turns retrieved context and a cleaned question into a
//! [`PromptSpec`]:
//! - A fixed system instruction
//! - A Handlebars user template (`{{context}}`, `{{question}}`)
//! - Optional YAML template files overriding the built-in one

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::PromptBuilder;
pub use loader::load_template;
pub use types::{PromptSpec, PromptTemplate};
