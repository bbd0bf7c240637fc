//! LLM turn context

use super::template::PromptTemplate;
use crate::session::message::TurnMessage;
use crate::tool::entities::ToolsetSnapshot;

/// Context handed to the LLM turn processor when the session starts.
///
/// System instructions plus the immutable toolset snapshot. Built once by
/// the orchestrator after tool aggregation.
#[derive(Debug, Clone)]
pub struct TurnContext {
    messages: Vec<TurnMessage>,
    toolset: ToolsetSnapshot,
}

impl TurnContext {
    pub fn new(system_prompt: impl Into<String>, toolset: ToolsetSnapshot) -> Self {
        let mut system_prompt = system_prompt.into();
        if toolset.is_empty() {
            system_prompt.push_str("\n\n");
            system_prompt.push_str(PromptTemplate::no_tools_notice());
        }
        Self {
            messages: vec![TurnMessage::system(system_prompt)],
            toolset,
        }
    }

    pub fn messages(&self) -> &[TurnMessage] {
        &self.messages
    }

    pub fn toolset(&self) -> &ToolsetSnapshot {
        &self.toolset
    }

    pub fn tool_count(&self) -> usize {
        self.toolset.len()
    }
}
