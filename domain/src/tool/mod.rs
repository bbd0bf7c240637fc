//! Tool domain module
//!
//! Tools are capabilities the LLM can call during a voice session (paper
//! search, model lookup, ...). They come from external **tool providers**,
//! each of which advertises a list of [`ToolDescriptor`]s.
//!
//! ```text
//! ┌──────────────┐  list_tools  ┌────────────────┐  merge   ┌──────────────────┐
//! │ ToolProvider │────────────▶│ ToolDescriptor │───────▶│ ToolsetSnapshot │
//! │ (per source) │              │  (name/schema) │          │ (LLM-visible)    │
//! └──────────────┘              └────────────────┘          └──────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`ToolProvider`]: external source of tools (MCP over stdio or HTTP)
//! - [`ToolDescriptor`]: name, description, input JSON Schema
//! - [`ToolsetSnapshot`]: immutable, ordered union built once per session
//! - [`ProviderError`]: failures from a single provider
//!
//! The domain holds no I/O; the registry that drives aggregation lives in
//! the application layer and concrete providers in infrastructure.

pub mod entities;
pub mod provider;

pub use entities::{ToolDescriptor, ToolEntry, ToolsetSnapshot, dedup_by_name};
pub use provider::{ProviderError, ToolProvider};
