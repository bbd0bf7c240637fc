//! Tool provider registry
//!
//! Holds the session's tool providers in registration order, aggregates
//! their tools once into a [`ToolsetSnapshot`] and routes LLM tool calls back
//! to the provider that owns each tool.

use crate::telemetry::TelemetryEmitter;
use futures::future::join_all;
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info, warn};
use voice_domain::telemetry::names;
use voice_domain::tool::dedup_by_name;
use voice_domain::{
    ProviderError, SpanAttributes, ToolDescriptor, ToolEntry, ToolProvider, ToolsetSnapshot,
};

/// Default per-provider budget for `list_tools`.
pub const DEFAULT_LIST_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of closing one provider.
#[derive(Debug)]
pub struct ProviderCloseReport {
    pub provider: String,
    pub result: Result<(), ProviderError>,
}

pub struct ToolProviderRegistry {
    providers: Vec<Arc<dyn ToolProvider>>,
    list_timeout: Duration,
    telemetry: TelemetryEmitter,
    snapshot: OnceLock<ToolsetSnapshot>,
}

impl ToolProviderRegistry {
    pub fn new(providers: Vec<Arc<dyn ToolProvider>>, telemetry: TelemetryEmitter) -> Self {
        Self {
            providers,
            list_timeout: DEFAULT_LIST_TIMEOUT,
            telemetry,
            snapshot: OnceLock::new(),
        }
    }

    pub fn with_list_timeout(mut self, timeout: Duration) -> Self {
        self.list_timeout = timeout;
        self
    }

    pub fn providers(&self) -> &[Arc<dyn ToolProvider>] {
        &self.providers
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// The aggregated snapshot, if [`register_all`](Self::register_all) ran.
    pub fn snapshot(&self) -> Option<&ToolsetSnapshot> {
        self.snapshot.get()
    }

    /// Query every provider and merge their tools.
    ///
    /// Providers are queried concurrently but merged in registration order.
    /// A provider that fails or times out contributes nothing. The snapshot
    /// is built once; later calls return it unchanged.
    pub async fn register_all(&self) -> ToolsetSnapshot {
        if let Some(snapshot) = self.snapshot.get() {
            debug!("Toolset already aggregated");
            return snapshot.clone();
        }

        let listings = join_all(self.providers.iter().map(|p| self.list_one(p.as_ref()))).await;

        let mut entries = Vec::new();
        for (provider, listing) in self.providers.iter().zip(listings) {
            match listing {
                Ok(tools) => {
                    let (tools, duplicates) = dedup_by_name(tools);
                    if !duplicates.is_empty() {
                        warn!(provider = %provider.name(), duplicates = ?duplicates, "Provider listed duplicate tools");
                    }
                    info!(provider = %provider.name(), tools = tools.len(), "Registered provider tools");
                    for descriptor in tools {
                        if entries.iter().any(|e: &ToolEntry| e.descriptor.name == descriptor.name) {
                            debug!(provider = %provider.name(), tool = %descriptor.name, "Tool name already owned by an earlier provider");
                        }
                        entries.push(ToolEntry {
                            provider: provider.name().to_string(),
                            descriptor,
                        });
                    }
                }
                Err(e) => {
                    warn!(provider = %provider.name(), error = %e, "Tool provider unavailable, continuing without its tools");
                    self.telemetry.emit(
                        names::PROVIDER_ERROR,
                        SpanAttributes::new()
                            .with("service", names::service::TOOLS)
                            .with("provider", provider.name()),
                        Some(SpanAttributes::new().with("error.message", e.to_string())),
                    );
                }
            }
        }

        let snapshot = ToolsetSnapshot::new(entries);
        if snapshot.is_empty() && !self.providers.is_empty() {
            warn!("No tools available from any provider");
        }
        self.telemetry.emit(
            names::TOOLS_REGISTERED,
            SpanAttributes::new()
                .with("service", names::service::TOOLS)
                .with("tools_count", snapshot.len())
                .with("providers_count", snapshot.provider_count()),
            None,
        );

        self.snapshot.get_or_init(|| snapshot).clone()
    }

    async fn list_one(
        &self,
        provider: &dyn ToolProvider,
    ) -> Result<Vec<ToolDescriptor>, ProviderError> {
        match tokio::time::timeout(self.list_timeout, provider.list_tools()).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.list_timeout.as_secs())),
        }
    }

    /// Run a tool on the provider that owns it.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: Map<String, Value>,
    ) -> Result<String, ProviderError> {
        let owner = self
            .snapshot
            .get()
            .and_then(|s| s.owner_of(tool_name))
            .ok_or_else(|| ProviderError::ToolNotFound(tool_name.to_string()))?;
        let provider = self
            .providers
            .iter()
            .find(|p| p.name() == owner)
            .ok_or_else(|| ProviderError::ToolNotFound(tool_name.to_string()))?;

        debug!(provider = %owner, tool = %tool_name, "Routing tool call");
        provider.call_tool(tool_name, arguments).await
    }

    /// Close every provider in registration order.
    ///
    /// A failing provider is logged and does not stop the loop.
    pub async fn close_all(&self) -> Vec<ProviderCloseReport> {
        let mut reports = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let result = provider.close().await;
            match &result {
                Ok(()) => debug!(provider = %provider.name(), "Provider closed"),
                Err(e) => warn!(provider = %provider.name(), error = %e, "Failed to close provider"),
            }
            reports.push(ProviderCloseReport {
                provider: provider.name().to_string(),
                result,
            });
        }
        reports
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted tool provider shared by tests across the crate.

    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct FakeProvider {
        pub name: String,
        pub tools: Vec<ToolDescriptor>,
        pub fail_list: bool,
        pub fail_close: bool,
        pub hang: bool,
        pub calls: Mutex<Vec<(String, Map<String, Value>)>>,
        pub closes: AtomicUsize,
        pub close_log: Option<Arc<Mutex<Vec<String>>>>,
    }

    impl FakeProvider {
        pub fn new(name: &str, tools: &[&str]) -> Self {
            Self {
                name: name.to_string(),
                tools: tools
                    .iter()
                    .map(|t| ToolDescriptor::new(*t, format!("{t} from {name}")))
                    .collect(),
                fail_list: false,
                fail_close: false,
                hang: false,
                calls: Mutex::new(Vec::new()),
                closes: AtomicUsize::new(0),
                close_log: None,
            }
        }

        pub fn failing(mut self) -> Self {
            self.fail_list = true;
            self
        }

        pub fn failing_close(mut self) -> Self {
            self.fail_close = true;
            self
        }

        pub fn hanging(mut self) -> Self {
            self.hang = true;
            self
        }

        pub fn logging_closes(mut self, log: Arc<Mutex<Vec<String>>>) -> Self {
            self.close_log = Some(log);
            self
        }

        pub fn close_count(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ToolProvider for FakeProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ProviderError> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.fail_list {
                return Err(ProviderError::Unavailable("connection refused".into()));
            }
            Ok(self.tools.clone())
        }

        async fn call_tool(
            &self,
            tool_name: &str,
            arguments: Map<String, Value>,
        ) -> Result<String, ProviderError> {
            self.calls
                .lock()
                .unwrap()
                .push((tool_name.to_string(), arguments));
            Ok(format!("{} handled {}", self.name, tool_name))
        }

        async fn close(&self) -> Result<(), ProviderError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if let Some(log) = &self.close_log {
                log.lock().unwrap().push(self.name.clone());
            }
            if self.fail_close {
                return Err(ProviderError::Unavailable("already gone".into()));
            }
            Ok(())
        }
    }
}
