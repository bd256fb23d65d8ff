//! Command handlers for the AskRC CLI.

pub mod ask;
pub mod ground;
pub mod screen;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use ground::GroundCommand;
pub use screen::ScreenCommand;
