//! Typed event dispatch
//!
//! ```text
//!  transport ──► pump ──┬──► [client_ready queue]  ──► worker ──► guard ──► handler
//!                       ├──► [transcription queue] ──► worker ──► guard ──► handler
//!                       └──► ...
//! ```
//!
//! Each registered [`EventKind`] gets its own queue and worker, so events of
//! one kind are handled in transport order while different kinds interleave.

use crate::lifecycle::{EventHandlerGuard, HandlerError, ShutdownCoordinator, TaskFailure};
use crate::session::SessionContext;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use voice_domain::{EventKind, SessionEvent};

/// A callback for session events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: SessionEvent) -> Result<(), HandlerError>;
}

/// Mapping from event kind to its handler, built once at startup.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: BTreeMap<EventKind, Arc<dyn EventHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`, replacing any previous one.
    pub fn register(&mut self, kind: EventKind, handler: Arc<dyn EventHandler>) -> &mut Self {
        if self.handlers.insert(kind, handler).is_some() {
            debug!(kind = %kind, "Replaced event handler");
        }
        self
    }

    pub fn get(&self, kind: EventKind) -> Option<&Arc<dyn EventHandler>> {
        self.handlers.get(&kind)
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.handlers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Spawn one worker per registered kind plus the event pump, all tracked in
/// the session task set.
pub fn spawn_dispatch(
    context: &Arc<SessionContext>,
    coordinator: &Arc<ShutdownCoordinator>,
    guard: &EventHandlerGuard,
    registry: &HandlerRegistry,
    events: mpsc::Receiver<SessionEvent>,
) {
    let mut queues = BTreeMap::new();
    for (kind, handler) in &registry.handlers {
        let (tx, rx) = mpsc::unbounded_channel();
        queues.insert(*kind, tx);
        let worker = Worker {
            kind: *kind,
            handler: Arc::clone(handler),
            guard: guard.clone(),
            context: Arc::clone(context),
            coordinator: Arc::clone(coordinator),
        };
        context
            .tasks()
            .spawn(format!("worker:{kind}"), move |cancel| worker.run(rx, cancel));
    }

    context
        .tasks()
        .spawn("event-pump", move |cancel| pump(events, queues, cancel));
}

async fn pump(
    mut events: mpsc::Receiver<SessionEvent>,
    queues: BTreeMap<EventKind, mpsc::UnboundedSender<SessionEvent>>,
    cancel: tokio_util::sync::CancellationToken,
) -> Result<(), TaskFailure> {
    let mut disconnected = false;
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TaskFailure::Cancelled),
            event = events.recv() => event,
        };
        let event = match event {
            Some(event) => event,
            None if disconnected => return Ok(()),
            None => {
                warn!("Transport event stream ended without a disconnect");
                disconnected = true;
                SessionEvent::ClientDisconnected {
                    participant_id: None,
                }
            }
        };

        let kind = event.kind();
        if kind == EventKind::ClientDisconnected {
            disconnected = true;
        }
        match queues.get(&kind) {
            Some(queue) => {
                if queue.send(event).is_err() {
                    debug!(kind = %kind, "Worker already stopped, dropping event");
                }
            }
            None => debug!(kind = %kind, "No handler registered, dropping event"),
        }
    }
}

struct Worker {
    kind: EventKind,
    handler: Arc<dyn EventHandler>,
    guard: EventHandlerGuard,
    context: Arc<SessionContext>,
    coordinator: Arc<ShutdownCoordinator>,
}

impl Worker {
    async fn run(
        self,
        mut queue: mpsc::UnboundedReceiver<SessionEvent>,
        cancel: tokio_util::sync::CancellationToken,
    ) -> Result<(), TaskFailure> {
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TaskFailure::Cancelled),
                event = queue.recv() => match event {
                    Some(event) => event,
                    None => return Ok(()),
                },
            };

            let handler = &self.handler;
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TaskFailure::Cancelled),
                outcome = self.guard.run(self.kind, || handler.handle(event)) => outcome,
            };

            if outcome.is_err() {
                warn!(handler = %self.kind, "Handler raised cancellation, ending session");
                self.context.record_cancellation();
                self.coordinator.schedule();
                return Err(TaskFailure::Cancelled);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::ShutdownState;
    use crate::ports::scheduler::SchedulerProbe;
    use crate::ports::transport::SessionTransport;
    use crate::session::testing::{FakePipeline, FakeTransport};
    use crate::telemetry::TelemetryEmitter;
    use crate::tools::ToolProviderRegistry;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;
    use voice_domain::{ShutdownPhase, Transcription};

    struct AlwaysAlive;

    impl SchedulerProbe for AlwaysAlive {
        fn is_alive(&self) -> bool {
            true
        }
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(&self, event: SessionEvent) -> Result<(), HandlerError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let label = match &event {
                SessionEvent::Transcription(t) => t.text.clone(),
                other => other.kind().to_string(),
            };
            self.seen.lock().unwrap().push(label);
            Ok(())
        }
    }

    struct CancellingHandler;

    #[async_trait]
    impl EventHandler for CancellingHandler {
        async fn handle(&self, _event: SessionEvent) -> Result<(), HandlerError> {
            Err(HandlerError::Cancelled)
        }
    }

    fn setup() -> (
        Arc<SessionContext>,
        Arc<ShutdownCoordinator>,
        EventHandlerGuard,
        Arc<FakeTransport>,
    ) {
        let state = Arc::new(ShutdownState::new());
        let transport = Arc::new(FakeTransport::new());
        let context = Arc::new(SessionContext::new(
            Arc::clone(&state),
            transport.clone(),
            Arc::new(FakePipeline::default()),
            Arc::new(ToolProviderRegistry::new(Vec::new(), TelemetryEmitter::disabled())),
            TelemetryEmitter::disabled(),
        ));
        let coordinator = Arc::new(
            ShutdownCoordinator::new(Arc::clone(&context))
                .with_cancel_timeout(Duration::from_secs(1)),
        );
        let guard = EventHandlerGuard::new(state, Arc::new(AlwaysAlive));
        (context, coordinator, guard, transport)
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_same_kind_keeps_order() {
        let (context, coordinator, guard, transport) = setup();
        let recorder = Arc::new(Recorder::default());
        let mut registry = HandlerRegistry::new();
        registry.register(EventKind::Transcription, recorder.clone());

        let events = transport.take_events().unwrap();
        spawn_dispatch(&context, &coordinator, &guard, &registry, events);
        for text in ["one", "two", "three"] {
            transport
                .push(SessionEvent::Transcription(Transcription::new(text)))
                .await;
        }
        settle().await;

        assert_eq!(*recorder.seen.lock().unwrap(), vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_kinds_interleave() {
        let (context, coordinator, guard, transport) = setup();
        let gate = Arc::new(Notify::new());
        let blocked = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            gate: Some(gate.clone()),
        });
        let free = Arc::new(Recorder::default());
        let mut registry = HandlerRegistry::new();
        registry
            .register(EventKind::ToolInvoked, blocked.clone())
            .register(EventKind::Transcription, free.clone());

        let events = transport.take_events().unwrap();
        spawn_dispatch(&context, &coordinator, &guard, &registry, events);
        transport
            .push(SessionEvent::ToolInvoked(voice_domain::ToolInvocation {
                tool_id: None,
                name: None,
                arguments: serde_json::Value::Null,
            }))
            .await;
        transport
            .push(SessionEvent::Transcription(Transcription::new("while waiting")))
            .await;
        settle().await;

        assert_eq!(*free.seen.lock().unwrap(), vec!["while waiting"]);
        assert!(blocked.seen.lock().unwrap().is_empty());

        gate.notify_one();
        settle().await;
        assert_eq!(*blocked.seen.lock().unwrap(), vec!["tool_invoked"]);
    }

    #[tokio::test]
    async fn test_stream_end_synthesizes_disconnect() {
        let (context, coordinator, guard, transport) = setup();
        let recorder = Arc::new(Recorder::default());
        let mut registry = HandlerRegistry::new();
        registry.register(EventKind::ClientDisconnected, recorder.clone());

        let events = transport.take_events().unwrap();
        spawn_dispatch(&context, &coordinator, &guard, &registry, events);
        transport.close_stream();
        settle().await;

        assert_eq!(*recorder.seen.lock().unwrap(), vec!["client_disconnected"]);
    }

    #[tokio::test]
    async fn test_cancellation_surfaces_and_shuts_down() {
        let (context, coordinator, guard, transport) = setup();
        let mut registry = HandlerRegistry::new();
        registry.register(EventKind::TurnStarted, Arc::new(CancellingHandler));

        let events = transport.take_events().unwrap();
        spawn_dispatch(&context, &coordinator, &guard, &registry, events);
        transport
            .push(SessionEvent::TurnStarted { messages: vec![] })
            .await;

        tokio::time::timeout(Duration::from_secs(2), context.state().wait_completed())
            .await
            .expect("session should shut down");
        assert!(context.was_cancelled());
        assert_eq!(context.state().phase(), ShutdownPhase::Completed);
    }

    #[tokio::test]
    async fn test_unregistered_kind_is_dropped() {
        let (context, coordinator, guard, transport) = setup();
        let recorder = Arc::new(Recorder::default());
        let mut registry = HandlerRegistry::new();
        registry.register(EventKind::Transcription, recorder.clone());
        assert_eq!(registry.kinds(), vec![EventKind::Transcription]);

        let events = transport.take_events().unwrap();
        spawn_dispatch(&context, &coordinator, &guard, &registry, events);
        transport.push(SessionEvent::ClientReady).await;
        transport
            .push(SessionEvent::Transcription(Transcription::new("after")))
            .await;
        settle().await;

        assert_eq!(*recorder.seen.lock().unwrap(), vec!["after"]);
    }
}
