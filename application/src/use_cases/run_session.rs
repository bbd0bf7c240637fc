//! Run session use case
//!
//! Drives one voice session from startup to completed shutdown:
//!
//! 1. aggregate tools into the session's [`ToolsetSnapshot`](voice_domain::ToolsetSnapshot)
//! 2. build the LLM [`TurnContext`] and hand it to the pipeline
//! 3. register one guarded handler per [`EventKind`] and start dispatch
//! 4. wait until the coordinator reaches `Completed`

use super::dispatch::{HandlerRegistry, spawn_dispatch};
use super::handlers::SessionHandlers;
use crate::config::SessionParams;
use crate::lifecycle::{EventHandlerGuard, ShutdownCoordinator};
use crate::ports::scheduler::SchedulerProbe;
use crate::ports::transport::TransportError;
use crate::session::SessionContext;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use voice_domain::{ConversationId, DomainError, EventKind, TurnContext};

#[derive(Error, Debug)]
pub enum RunSessionError {
    #[error("Pipeline rejected the turn context: {0}")]
    Pipeline(#[from] TransportError),

    #[error("Transport event stream already taken")]
    EventStreamUnavailable,

    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A handler raised a cancellation signal.
    #[error("Session cancelled")]
    Cancelled,
}

/// Summary of a finished session.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub conversation_id: ConversationId,
    pub tools_count: usize,
}

pub struct SessionOrchestrator {
    context: Arc<SessionContext>,
    coordinator: Arc<ShutdownCoordinator>,
    guard: EventHandlerGuard,
    params: SessionParams,
}

impl SessionOrchestrator {
    pub fn new(
        context: Arc<SessionContext>,
        scheduler: Arc<dyn SchedulerProbe>,
        params: SessionParams,
    ) -> Self {
        let coordinator = Arc::new(
            ShutdownCoordinator::new(Arc::clone(&context)).with_cancel_timeout(params.cancel_timeout),
        );
        let guard = EventHandlerGuard::new(Arc::clone(context.state()), scheduler);
        Self {
            context,
            coordinator,
            guard,
            params,
        }
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.context
    }

    /// The coordinator, for wiring signal listeners.
    pub fn coordinator(&self) -> Arc<ShutdownCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Run the session until shutdown completes.
    ///
    /// A startup failure still runs the full teardown before it is returned.
    pub async fn run(&self) -> Result<SessionSummary, RunSessionError> {
        if let Err(e) = self.start().await {
            error!(error = %e, "Session failed to start");
            self.coordinator.shutdown().await;
            return Err(e);
        }

        self.context.state().wait_completed().await;

        if self.context.was_cancelled() {
            return Err(RunSessionError::Cancelled);
        }
        Ok(SessionSummary {
            conversation_id: self.context.conversation_id(),
            tools_count: self.context.toolset().len(),
        })
    }

    async fn start(&self) -> Result<(), RunSessionError> {
        info!(
            conversation_id = %self.context.conversation_id(),
            room_url = %self.params.room_url.as_deref().unwrap_or("<none>"),
            token = %self.params.masked_token(),
            bot_name = %self.params.bot_name,
            "Starting voice session"
        );

        let toolset = self.context.registry().register_all().await;
        info!(
            tools = toolset.len(),
            providers = toolset.provider_count(),
            "Toolset ready"
        );
        self.context.set_toolset(toolset.clone())?;

        let turn = TurnContext::new(self.params.system_prompt.clone(), toolset);
        self.context.pipeline().configure(&turn).await?;

        let handlers: Arc<SessionHandlers> = Arc::new(SessionHandlers::new(
            Arc::clone(&self.context),
            Arc::clone(&self.coordinator),
        ));
        let mut registry = HandlerRegistry::new();
        for kind in EventKind::ALL {
            registry.register(kind, handlers.clone());
        }

        let events = self
            .context
            .transport()?
            .take_events()
            .ok_or(RunSessionError::EventStreamUnavailable)?;
        spawn_dispatch(
            &self.context,
            &self.coordinator,
            &self.guard,
            &registry,
            events,
        );
        info!(handlers = registry.len(), "Session running");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::ShutdownState;
    use crate::ports::scheduler::TokioSchedulerProbe;
    use crate::session::testing::{FakePipeline, FakeTransport, PipelineCall};
    use crate::telemetry::TelemetryEmitter;
    use crate::telemetry::emitter::testing::RecordingBackend;
    use crate::tools::ToolProviderRegistry;
    use crate::tools::registry::testing::FakeProvider;
    use crate::ports::transport::SessionTransport;
    use std::time::Duration;
    use voice_domain::telemetry::names;
    use voice_domain::{SessionEvent, ShutdownPhase, ToolProvider, Transcription};

    struct Fixture {
        orchestrator: Arc<SessionOrchestrator>,
        transport: Arc<FakeTransport>,
        pipeline: Arc<FakePipeline>,
        backend: Arc<RecordingBackend>,
        providers: Vec<Arc<FakeProvider>>,
    }

    fn fixture() -> Fixture {
        let backend = Arc::new(RecordingBackend::default());
        let telemetry = TelemetryEmitter::new(backend.clone());
        let providers = vec![
            Arc::new(FakeProvider::new("arxiv", &["search_papers"])),
            Arc::new(FakeProvider::new("huggingface", &["search_models"]).failing()),
        ];
        let registry = Arc::new(ToolProviderRegistry::new(
            providers
                .iter()
                .map(|p| Arc::clone(p) as Arc<dyn ToolProvider>)
                .collect(),
            telemetry.clone(),
        ));
        let transport = Arc::new(FakeTransport::new());
        let pipeline = Arc::new(FakePipeline::default());
        let context = Arc::new(SessionContext::new(
            Arc::new(ShutdownState::new()),
            transport.clone(),
            pipeline.clone(),
            registry,
            telemetry,
        ));
        let orchestrator = Arc::new(SessionOrchestrator::new(
            context,
            Arc::new(TokioSchedulerProbe::default()),
            SessionParams::default()
                .with_room_url("https://example.daily.co/room")
                .with_token("secret")
                .with_cancel_timeout(Duration::from_secs(1)),
        ));
        Fixture {
            orchestrator,
            transport,
            pipeline,
            backend,
            providers,
        }
    }

    #[tokio::test]
    async fn test_full_session_until_disconnect() {
        let f = fixture();
        let runner = {
            let orchestrator = Arc::clone(&f.orchestrator);
            tokio::spawn(async move { orchestrator.run().await })
        };

        f.transport.push(SessionEvent::ClientReady).await;
        f.transport
            .push(SessionEvent::ClientConnected {
                participant_id: "p1".into(),
            })
            .await;
        f.transport
            .push(SessionEvent::Transcription(
                Transcription::new("hello").with_participant("p1"),
            ))
            .await;
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        f.transport
            .push(SessionEvent::ClientDisconnected {
                participant_id: Some("p1".into()),
            })
            .await;

        let summary = tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .expect("session should finish")
            .unwrap()
            .unwrap();

        assert_eq!(summary.tools_count, 1);
        let calls = f.pipeline.calls();
        assert_eq!(calls[0], PipelineCall::Configure { tools: 1 });
        assert!(calls.contains(&PipelineCall::BotReady));
        assert!(calls.contains(&PipelineCall::LlmRun));
        assert_eq!(calls.last(), Some(&PipelineCall::Cancel));
        assert_eq!(f.transport.captured(), vec!["p1".to_string()]);
        assert_eq!(f.backend.named(names::SPEECH_TO_TEXT).len(), 1);
        assert_eq!(f.backend.named(names::TOOLS_REGISTERED).len(), 1);
        assert_eq!(f.backend.named(names::PROVIDER_ERROR).len(), 1);
        assert_eq!(f.backend.flush_count(), 1);
        assert!(f.providers.iter().all(|p| p.close_count() == 1));
        assert_eq!(
            f.orchestrator.context().state().phase(),
            ShutdownPhase::Completed
        );
        assert!(f.backend.spans().iter().all(|s| s.ended == 1));
    }

    #[tokio::test]
    async fn test_external_shutdown_ends_run() {
        let f = fixture();
        let runner = {
            let orchestrator = Arc::clone(&f.orchestrator);
            tokio::spawn(async move { orchestrator.run().await })
        };
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        f.orchestrator.coordinator().schedule();

        let result = tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .expect("session should finish")
            .unwrap();
        assert!(result.is_ok());
        assert!(!f.orchestrator.context().has_transport());
    }

    #[tokio::test]
    async fn test_missing_event_stream_fails_and_tears_down() {
        let f = fixture();
        let _stolen = f.transport.take_events();

        let err = f.orchestrator.run().await.unwrap_err();

        assert!(matches!(err, RunSessionError::EventStreamUnavailable));
        assert_eq!(
            f.orchestrator.context().state().phase(),
            ShutdownPhase::Completed
        );
        assert!(f.providers.iter().all(|p| p.close_count() == 1));
    }
}
