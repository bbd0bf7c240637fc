//! Langfuse ingestion backend.
//!
//! Spans are buffered as ingestion events (`trace-create`, `span-create`,
//! `span-update`) and shipped in one batch per flush to
//! `POST {host}/api/public/ingestion` with basic auth.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, trace};
use uuid::Uuid;
use voice_application::{SpanHandle, TelemetryBackend, TelemetryError};
use voice_domain::SpanAttributes;

const INGESTION_PATH: &str = "/api/public/ingestion";

/// Connection settings for a Langfuse project.
#[derive(Debug, Clone)]
pub struct LangfuseSettings {
    pub host: String,
    pub public_key: String,
    pub secret_key: String,
}

type EventBuffer = Arc<Mutex<Vec<Value>>>;

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn push(buffer: &EventBuffer, kind: &str, body: Value) {
    let event = json!({
        "id": Uuid::new_v4().to_string(),
        "timestamp": now(),
        "type": kind,
        "body": body,
    });
    trace!("Langfuse event queued: {}", kind);
    buffer
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(event);
}

pub struct LangfuseBackend {
    client: reqwest::Client,
    endpoint: String,
    settings: LangfuseSettings,
    trace_id: String,
    buffer: EventBuffer,
}

impl LangfuseBackend {
    /// Create a backend that groups every span under one trace.
    pub fn new(settings: LangfuseSettings, trace_name: &str, session_id: &str) -> Self {
        let endpoint = format!("{}{}", settings.host.trim_end_matches('/'), INGESTION_PATH);
        let trace_id = Uuid::new_v4().to_string();
        let buffer: EventBuffer = Arc::new(Mutex::new(Vec::new()));
        push(
            &buffer,
            "trace-create",
            json!({
                "id": trace_id,
                "name": trace_name,
                "sessionId": session_id,
                "timestamp": now(),
            }),
        );
        Self {
            client: reqwest::Client::new(),
            endpoint,
            settings,
            trace_id,
            buffer,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Events waiting for the next flush.
    pub fn pending(&self) -> Vec<Value> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn take_batch(&self) -> Vec<Value> {
        std::mem::take(&mut *self.buffer.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Put a failed batch back in front of anything queued since.
    fn requeue(&self, mut batch: Vec<Value>) {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        batch.append(&mut buffer);
        *buffer = batch;
    }
}

struct LangfuseSpan {
    id: String,
    trace_id: String,
    buffer: EventBuffer,
}

impl SpanHandle for LangfuseSpan {
    fn update(&mut self, payload: &SpanAttributes) -> Result<(), TelemetryError> {
        push(
            &self.buffer,
            "span-update",
            json!({
                "id": self.id,
                "traceId": self.trace_id,
                "output": payload.to_json(),
            }),
        );
        Ok(())
    }

    fn end(self: Box<Self>) -> Result<(), TelemetryError> {
        push(
            &self.buffer,
            "span-update",
            json!({
                "id": self.id,
                "traceId": self.trace_id,
                "endTime": now(),
            }),
        );
        Ok(())
    }
}

#[async_trait]
impl TelemetryBackend for LangfuseBackend {
    fn start_span(
        &self,
        name: &str,
        metadata: &SpanAttributes,
    ) -> Result<Box<dyn SpanHandle>, TelemetryError> {
        let id = Uuid::new_v4().to_string();
        push(
            &self.buffer,
            "span-create",
            json!({
                "id": id,
                "traceId": self.trace_id,
                "name": name,
                "startTime": now(),
                "metadata": metadata.to_json(),
            }),
        );
        Ok(Box::new(LangfuseSpan {
            id,
            trace_id: self.trace_id.clone(),
            buffer: Arc::clone(&self.buffer),
        }))
    }

    async fn flush(&self) -> Result<(), TelemetryError> {
        let batch = self.take_batch();
        if batch.is_empty() {
            return Ok(());
        }
        let count = batch.len();
        debug!("Flushing {} events to Langfuse", count);

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.settings.public_key, Some(&self.settings.secret_key))
            .json(&json!({ "batch": batch }))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => {
                let status = resp.status();
                self.requeue(batch);
                Err(TelemetryError::Flush(format!(
                    "Langfuse rejected {count} events: HTTP {status}"
                )))
            }
            Err(e) => {
                self.requeue(batch);
                Err(TelemetryError::Flush(format!("Langfuse unreachable: {e}")))
            }
        }
    }
}
