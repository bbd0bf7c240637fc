//! Tool domain entities

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// A callable capability advertised by a tool provider.
///
/// Mirrors the MCP `tools/list` entry: a name, a human-readable
/// description, and a JSON Schema for the arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: empty_object_schema(),
        }
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Function-calling representation handed to the LLM.
    pub fn to_api_tool(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "input_schema": self.input_schema,
        })
    }
}

/// A descriptor together with the provider that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolEntry {
    pub provider: String,
    pub descriptor: ToolDescriptor,
}

/// Immutable union of all providers' tools at the time aggregation ran.
///
/// Order is significant: providers appear in registration order and each
/// provider's tools keep the order the provider reported them in. The
/// snapshot is cheap to clone and never mutated after construction; a
/// changed provider requires building a new snapshot.
#[derive(Debug, Clone, Default)]
pub struct ToolsetSnapshot {
    entries: Arc<[ToolEntry]>,
}

impl ToolsetSnapshot {
    pub fn new(entries: Vec<ToolEntry>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ToolEntry] {
        &self.entries
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.descriptor.name.as_str())
    }

    /// Provider that owns `tool_name`.
    ///
    /// Names may collide across providers; the first provider in
    /// registration order wins.
    pub fn owner_of(&self, tool_name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.descriptor.name == tool_name)
            .map(|e| e.provider.as_str())
    }

    /// Number of distinct providers that contributed at least one tool.
    pub fn provider_count(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.provider.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn to_api_tools(&self) -> Vec<Value> {
        self.descriptors().map(ToolDescriptor::to_api_tool).collect()
    }
}

/// Drop repeated names from one provider's list, keeping the first.
///
/// Returns the unique tools and the names that were dropped.
pub fn dedup_by_name(tools: Vec<ToolDescriptor>) -> (Vec<ToolDescriptor>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(tools.len());
    let mut dropped = Vec::new();
    for tool in tools {
        if seen.insert(tool.name.clone()) {
            unique.push(tool);
        } else {
            dropped.push(tool.name);
        }
    }
    (unique, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(provider: &str, name: &str) -> ToolEntry {
        ToolEntry {
            provider: provider.to_string(),
            descriptor: ToolDescriptor::new(name, format!("{} tool", name)),
        }
    }

    #[test]
    fn test_snapshot_preserves_order() {
        let snapshot = ToolsetSnapshot::new(vec![
            entry("arxiv", "search_papers"),
            entry("arxiv", "download_paper"),
            entry("huggingface", "search_models"),
        ]);
        let names: Vec<_> = snapshot.names().collect();
        assert_eq!(names, vec!["search_papers", "download_paper", "search_models"]);
        assert_eq!(snapshot.provider_count(), 2);
    }

    #[test]
    fn test_owner_of_first_wins() {
        let snapshot = ToolsetSnapshot::new(vec![entry("a", "search"), entry("b", "search")]);
        assert_eq!(snapshot.owner_of("search"), Some("a"));
        assert_eq!(snapshot.owner_of("missing"), None);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = ToolsetSnapshot::empty();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.provider_count(), 0);
        assert!(snapshot.to_api_tools().is_empty());
    }

    #[test]
    fn test_dedup_by_name_keeps_first() {
        let tools = vec![
            ToolDescriptor::new("a", "first"),
            ToolDescriptor::new("b", "b"),
            ToolDescriptor::new("a", "second"),
        ];
        let (unique, dropped) = dedup_by_name(tools);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].description, "first");
        assert_eq!(dropped, vec!["a".to_string()]);
    }

    #[test]
    fn test_api_tool_shape() {
        let tool = ToolDescriptor::new("search", "Search things")
            .with_input_schema(serde_json::json!({"type": "object", "required": ["q"]}));
        let api = tool.to_api_tool();
        assert_eq!(api["name"], "search");
        assert_eq!(api["input_schema"]["required"][0], "q");
    }

    #[test]
    fn test_descriptor_deserialize_defaults_schema() {
        let tool: ToolDescriptor = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert_eq!(tool.description, "");
        assert_eq!(tool.input_schema["type"], "object");
    }
}
