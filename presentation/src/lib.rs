//! Presentation layer for voice-copilot
//!
//! This crate contains the CLI definition and console formatting for the
//! one-shot commands (`--show-config`, `--list-tools`).

pub mod cli;
pub mod output;

// Re-export commonly used types
pub use cli::commands::Cli;
pub use output::console::ConsoleFormatter;
