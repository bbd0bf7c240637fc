//! Per-session state
//!
//! [`SessionContext`] replaces free-standing globals: it is built once per
//! pipeline run and shared by `Arc` with the coordinator and every handler.

use crate::lifecycle::state::ShutdownState;
use crate::lifecycle::tasks::TaskSet;
use crate::ports::pipeline::PipelinePort;
use crate::ports::transport::{SessionTransport, TransportError};
use crate::telemetry::TelemetryEmitter;
use crate::tools::ToolProviderRegistry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use voice_domain::{ConversationId, DomainError, ToolsetSnapshot};

pub struct SessionContext {
    conversation_id: ConversationId,
    state: Arc<ShutdownState>,
    transport: RwLock<Option<Arc<dyn SessionTransport>>>,
    pipeline: Arc<dyn PipelinePort>,
    registry: Arc<ToolProviderRegistry>,
    telemetry: TelemetryEmitter,
    toolset: OnceLock<ToolsetSnapshot>,
    tasks: TaskSet,
    cancelled: AtomicBool,
}

impl SessionContext {
    pub fn new(
        state: Arc<ShutdownState>,
        transport: Arc<dyn SessionTransport>,
        pipeline: Arc<dyn PipelinePort>,
        registry: Arc<ToolProviderRegistry>,
        telemetry: TelemetryEmitter,
    ) -> Self {
        Self {
            conversation_id: ConversationId::new(),
            state,
            transport: RwLock::new(Some(transport)),
            pipeline,
            registry,
            telemetry,
            toolset: OnceLock::new(),
            tasks: TaskSet::new(),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Use an id chosen by the caller, e.g. one already given to telemetry.
    pub fn with_conversation_id(mut self, id: ConversationId) -> Self {
        self.conversation_id = id;
        self
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    pub fn state(&self) -> &Arc<ShutdownState> {
        &self.state
    }

    pub fn pipeline(&self) -> &Arc<dyn PipelinePort> {
        &self.pipeline
    }

    pub fn registry(&self) -> &Arc<ToolProviderRegistry> {
        &self.registry
    }

    pub fn telemetry(&self) -> &TelemetryEmitter {
        &self.telemetry
    }

    pub fn tasks(&self) -> &TaskSet {
        &self.tasks
    }

    /// The transport, unless the coordinator already released it.
    pub fn transport(&self) -> Result<Arc<dyn SessionTransport>, TransportError> {
        self.transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(TransportError::Released)
    }

    pub fn has_transport(&self) -> bool {
        self.transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Take the session's transport handle and release the connection
    /// behind it. Returns `Ok(false)` if it was already released.
    pub async fn release_transport(&self) -> Result<bool, TransportError> {
        let taken = self
            .transport
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match taken {
            Some(transport) => transport.release().await.map(|()| true),
            None => Ok(false),
        }
    }

    /// Install the aggregated toolset. Only the first call succeeds.
    pub fn set_toolset(&self, toolset: ToolsetSnapshot) -> Result<(), DomainError> {
        self.toolset
            .set(toolset)
            .map_err(|_| DomainError::ToolsetAlreadyBuilt)
    }

    pub fn toolset(&self) -> ToolsetSnapshot {
        self.toolset.get().cloned().unwrap_or_default()
    }

    /// Note that a handler raised a cancellation signal. The orchestrator
    /// surfaces it to its caller once the session has shut down.
    pub fn record_cancellation(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
