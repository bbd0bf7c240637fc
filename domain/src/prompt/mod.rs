//! Prompt domain
//!
//! The copilot's system instructions and the turn context assembled from
//! them plus the session's toolset.

mod template;
pub mod turn_context;

pub use template::PromptTemplate;
pub use turn_context::TurnContext;
