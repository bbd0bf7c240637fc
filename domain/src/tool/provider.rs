//! Tool provider abstraction
//!
//! This module defines the [`ToolProvider`] trait, which abstracts external
//! sources of LLM-callable tools (MCP servers over stdio or HTTP).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  ToolProviderRegistry                       │
//! │  (queries providers in order, merges into ToolsetSnapshot)  │
//! └─────────────────────────────────────────────────────────────┘
//!           │                    │                    │
//!           ▼                    ▼                    ▼
//!    ┌────────────┐       ┌────────────┐       ┌────────────┐
//!    │   arxiv    │       │ huggingface│       │   remote   │
//!    │  (stdio)   │       │  (stdio)   │       │   (http)   │
//!    └────────────┘       └────────────┘       └────────────┘
//! ```
//!
//! Providers are independent and may fail independently. An unreachable
//! provider contributes zero tools; it never aborts the session.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use super::entities::ToolDescriptor;

/// Error type for tool provider operations
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider could not be reached (spawn failure, handshake failure, network)
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Listing tools timed out
    #[error("Provider timed out after {0} seconds")]
    Timeout(u64),

    /// Tool not offered by any provider
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// The provider reported an error while running a tool
    #[error("Tool call failed: {0}")]
    CallFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The provider was already closed
    #[error("Provider closed")]
    Closed,
}

/// External source of LLM-callable tools.
///
/// Handles are constructed from configuration before registration; the
/// connection handshake happens on the first [`list_tools`](Self::list_tools)
/// call.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Unique key for this provider (e.g. "arxiv", "huggingface")
    fn name(&self) -> &str;

    /// Discover the tools this provider offers, in provider order.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ProviderError>;

    /// Run one of this provider's tools and return its textual output.
    async fn call_tool(
        &self,
        tool_name: &str,
        arguments: Map<String, Value>,
    ) -> Result<String, ProviderError>;

    /// Release the connection. Must be idempotent.
    async fn close(&self) -> Result<(), ProviderError>;
}
