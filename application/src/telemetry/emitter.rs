//! Bracketed span emission
//!
//! [`TelemetryEmitter`] opens a span, runs a body, optionally attaches one
//! payload and closes the span on every exit path. A [`SpanGuard`] owns the
//! open span; its `Drop` ends it, which covers early returns, errors, panics
//! and futures dropped mid-flight.
//!
//! With no backend configured the emitter is a pure pass-through.

use crate::ports::telemetry::{SpanHandle, TelemetryBackend, TelemetryError};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};
use voice_domain::SpanAttributes;

/// Collects the payload a span body wants attached to its span.
#[derive(Debug, Clone, Default)]
pub struct SpanRecorder {
    payload: Arc<Mutex<Option<SpanAttributes>>>,
}

impl SpanRecorder {
    /// Set the span payload. A later call replaces an earlier one; only one
    /// update reaches the backend.
    pub fn record(&self, payload: SpanAttributes) {
        *self.payload.lock().unwrap_or_else(PoisonError::into_inner) = Some(payload);
    }

    fn take(&self) -> Option<SpanAttributes> {
        self.payload
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Owns an open span and ends it exactly once.
pub struct SpanGuard {
    name: String,
    span: Option<Box<dyn SpanHandle>>,
    recorder: SpanRecorder,
}

impl SpanGuard {
    fn finish(&mut self) {
        let Some(mut span) = self.span.take() else {
            return;
        };
        if let Some(payload) = self.recorder.take()
            && let Err(e) = span.update(&payload)
        {
            warn!(span = %self.name, error = %e, "Failed to update span");
        }
        if let Err(e) = span.end() {
            warn!(span = %self.name, error = %e, "Failed to end span");
        }
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Front door for all span recording in the session.
#[derive(Clone, Default)]
pub struct TelemetryEmitter {
    backend: Option<Arc<dyn TelemetryBackend>>,
}

impl TelemetryEmitter {
    pub fn new(backend: Arc<dyn TelemetryBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn disabled() -> Self {
        Self { backend: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    fn open(&self, name: &str, metadata: &SpanAttributes) -> Option<SpanGuard> {
        let backend = self.backend.as_ref()?;
        match backend.start_span(name, metadata) {
            Ok(span) => Some(SpanGuard {
                name: name.to_string(),
                span: Some(span),
                recorder: SpanRecorder::default(),
            }),
            Err(e) => {
                warn!(span = %name, error = %e, "Failed to start span");
                None
            }
        }
    }

    /// Run a synchronous body inside a span.
    pub fn with_span<T>(
        &self,
        name: &str,
        metadata: SpanAttributes,
        body: impl FnOnce(&SpanRecorder) -> T,
    ) -> T {
        match self.open(name, &metadata) {
            Some(guard) => body(&guard.recorder),
            None => body(&SpanRecorder::default()),
        }
    }

    /// Run an asynchronous body inside a span.
    ///
    /// The span stays open across every suspension point of the body.
    pub async fn with_span_async<T, F, Fut>(&self, name: &str, metadata: SpanAttributes, body: F) -> T
    where
        F: FnOnce(SpanRecorder) -> Fut,
        Fut: Future<Output = T>,
    {
        match self.open(name, &metadata) {
            Some(guard) => {
                let output = body(guard.recorder.clone()).await;
                drop(guard);
                output
            }
            None => body(SpanRecorder::default()).await,
        }
    }

    /// Record a one-shot span with an optional payload.
    pub fn emit(&self, name: &str, metadata: SpanAttributes, payload: Option<SpanAttributes>) {
        self.with_span(name, metadata, |recorder| {
            if let Some(payload) = payload {
                recorder.record(payload);
            }
        });
    }

    /// Flush the backend.
    ///
    /// Returns `Ok(false)` when telemetry is disabled. Callers that only
    /// care about best effort can ignore the result; the failure is already
    /// logged.
    pub async fn flush(&self) -> Result<bool, TelemetryError> {
        let Some(backend) = &self.backend else {
            return Ok(false);
        };
        match backend.flush().await {
            Ok(()) => {
                debug!("Telemetry flushed");
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "Telemetry flush failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording backend shared by tests across the crate.

    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedSpan {
        pub name: String,
        pub metadata: SpanAttributes,
        pub updates: Vec<SpanAttributes>,
        pub ended: usize,
    }

    #[derive(Default)]
    pub struct RecordingBackend {
        pub spans: Arc<Mutex<Vec<RecordedSpan>>>,
        pub flushes: AtomicUsize,
        pub fail_start: AtomicBool,
        pub fail_flush: AtomicBool,
    }

    impl RecordingBackend {
        pub fn spans(&self) -> Vec<RecordedSpan> {
            self.spans.lock().unwrap().clone()
        }

        pub fn named(&self, name: &str) -> Vec<RecordedSpan> {
            self.spans().into_iter().filter(|s| s.name == name).collect()
        }

        pub fn flush_count(&self) -> usize {
            self.flushes.load(Ordering::SeqCst)
        }
    }

    struct RecordingSpan {
        index: usize,
        spans: Arc<Mutex<Vec<RecordedSpan>>>,
    }

    impl SpanHandle for RecordingSpan {
        fn update(&mut self, payload: &SpanAttributes) -> Result<(), TelemetryError> {
            self.spans.lock().unwrap()[self.index]
                .updates
                .push(payload.clone());
            Ok(())
        }

        fn end(self: Box<Self>) -> Result<(), TelemetryError> {
            self.spans.lock().unwrap()[self.index].ended += 1;
            Ok(())
        }
    }

    #[async_trait]
    impl TelemetryBackend for RecordingBackend {
        fn start_span(
            &self,
            name: &str,
            metadata: &SpanAttributes,
        ) -> Result<Box<dyn SpanHandle>, TelemetryError> {
            if self.fail_start.load(Ordering::SeqCst) {
                return Err(TelemetryError::Backend("unreachable".into()));
            }
            let mut spans = self.spans.lock().unwrap();
            spans.push(RecordedSpan {
                name: name.to_string(),
                metadata: metadata.clone(),
                updates: Vec::new(),
                ended: 0,
            });
            Ok(Box::new(RecordingSpan {
                index: spans.len() - 1,
                spans: Arc::clone(&self.spans),
            }))
        }

        async fn flush(&self) -> Result<(), TelemetryError> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            if self.fail_flush.load(Ordering::SeqCst) {
                return Err(TelemetryError::Flush("network down".into()));
            }
            Ok(())
        }
    }
}
