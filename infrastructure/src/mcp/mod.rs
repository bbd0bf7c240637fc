//! MCP tool providers (rmcp client).

mod provider;

pub use provider::{McpEndpoint, McpToolProvider};
