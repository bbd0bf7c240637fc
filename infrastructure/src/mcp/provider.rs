//! MCP tool provider over stdio or streamable HTTP.
//!
//! Each [`McpToolProvider`] owns one rmcp client session. The connection is
//! opened lazily on the first `list_tools` call, so a provider that cannot
//! be reached fails registration instead of startup.

use async_trait::async_trait;
use rmcp::model::{CallToolRequestParams, CallToolResult};
use rmcp::service::{Peer, RunningService};
use rmcp::transport::{StreamableHttpClientTransport, TokioChildProcess};
use rmcp::{RoleClient, ServiceExt};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use voice_domain::{ProviderError, ToolDescriptor, ToolProvider};

/// Where an MCP server lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpEndpoint {
    /// Local child process speaking MCP on stdio.
    Stdio {
        command: String,
        args: Vec<String>,
        env: BTreeMap<String, String>,
    },
    /// Remote server speaking streamable HTTP.
    Http { url: String },
}

impl McpEndpoint {
    pub fn describe(&self) -> String {
        match self {
            McpEndpoint::Stdio { command, args, .. } if args.is_empty() => command.clone(),
            McpEndpoint::Stdio { command, args, .. } => format!("{} {}", command, args.join(" ")),
            McpEndpoint::Http { url } => url.clone(),
        }
    }
}

type ClientService = RunningService<RoleClient, ()>;

pub struct McpToolProvider {
    name: String,
    endpoint: McpEndpoint,
    service: Mutex<Option<ClientService>>,
    closed: AtomicBool,
}

impl McpToolProvider {
    pub fn new(name: impl Into<String>, endpoint: McpEndpoint) -> Self {
        Self {
            name: name.into(),
            endpoint,
            service: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn endpoint(&self) -> &McpEndpoint {
        &self.endpoint
    }

    /// Peer handle for the live session, connecting first if needed.
    async fn peer(&self) -> Result<Peer<RoleClient>, ProviderError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProviderError::Closed);
        }
        let mut guard = self.service.lock().await;
        if let Some(service) = guard.as_ref() {
            return Ok(service.peer().clone());
        }

        info!(provider = %self.name, endpoint = %self.endpoint.describe(), "Connecting to MCP server");
        let service = connect(&self.name, &self.endpoint).await?;
        let peer = service.peer().clone();
        *guard = Some(service);
        Ok(peer)
    }
}

async fn connect(name: &str, endpoint: &McpEndpoint) -> Result<ClientService, ProviderError> {
    match endpoint {
        McpEndpoint::Stdio { command, args, env } => {
            let mut cmd = Command::new(command);
            cmd.args(args);
            for (key, value) in env {
                cmd.env(key, value);
            }
            let transport = TokioChildProcess::new(cmd).map_err(|e| {
                ProviderError::Unavailable(format!("failed to spawn '{command}': {e}"))
            })?;
            ().serve(transport)
                .await
                .map_err(|e| ProviderError::Unavailable(format!("{name}: initialization failed: {e}")))
        }
        McpEndpoint::Http { url } => {
            let transport = StreamableHttpClientTransport::from_uri(url.clone());
            ().serve(transport)
                .await
                .map_err(|e| ProviderError::Unavailable(format!("{name}: initialization failed: {e}")))
        }
    }
}

fn to_descriptor(tool: rmcp::model::Tool) -> ToolDescriptor {
    ToolDescriptor::new(
        tool.name.to_string(),
        tool.description.as_deref().unwrap_or_default().to_string(),
    )
    .with_input_schema(Value::Object((*tool.input_schema).clone()))
}

/// Flatten an MCP call result into the text handed back to the LLM.
fn result_text(result: &CallToolResult) -> String {
    let blocks = serde_json::to_value(&result.content).unwrap_or(Value::Null);
    content_text(&blocks)
}

fn content_text(blocks: &Value) -> String {
    let Some(blocks) = blocks.as_array() else {
        return String::new();
    };
    blocks
        .iter()
        .map(|block| match block.get("text").and_then(Value::as_str) {
            Some(text) => text.to_string(),
            None => block.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl ToolProvider for McpToolProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ProviderError> {
        let peer = self.peer().await?;
        let tools = peer
            .list_all_tools()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("tools/list failed: {e}")))?;
        debug!(provider = %self.name, tools = tools.len(), "Listed MCP tools");
        Ok(tools.into_iter().map(to_descriptor).collect())
    }

    async fn call_tool(
        &self,
        tool_name: &str,
        arguments: Map<String, Value>,
    ) -> Result<String, ProviderError> {
        let peer = self.peer().await?;
        let result = peer
            .call_tool(CallToolRequestParams {
                meta: None,
                name: tool_name.to_string().into(),
                arguments: Some(arguments),
                task: None,
            })
            .await
            .map_err(|e| ProviderError::CallFailed(format!("tools/call failed: {e}")))?;

        let text = result_text(&result);
        if result.is_error.unwrap_or(false) {
            return Err(ProviderError::CallFailed(text));
        }
        Ok(text)
    }

    async fn close(&self) -> Result<(), ProviderError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let service = self.service.lock().await.take();
        match service {
            Some(service) => {
                if let Err(e) = service.cancel().await {
                    warn!(provider = %self.name, error = %e, "Error during MCP server shutdown");
                    return Err(ProviderError::Unavailable(e.to_string()));
                }
                info!(provider = %self.name, "Disconnected MCP server");
                Ok(())
            }
            None => {
                debug!(provider = %self.name, "MCP server was never connected");
                Ok(())
            }
        }
    }
}
