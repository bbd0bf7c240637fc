//! JSONL span backend.
//!
//! Each finished span is written as a single JSON line:
//!
//! ```json
//! {"type":"span","span_id":"...","name":"speech_to_text","start_time":"...","end_time":"...","duration_ms":3,"metadata":{...},"payload":{...}}
//! ```

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;
use voice_application::{SpanHandle, TelemetryBackend, TelemetryError};
use voice_domain::SpanAttributes;

type SharedWriter = Arc<Mutex<BufWriter<File>>>;

/// Span backend writing one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes on `Drop`.
pub struct JsonlSpanBackend {
    writer: SharedWriter,
    path: PathBuf,
}

impl JsonlSpanBackend {
    /// Create the file (and parent directories), truncating an existing one.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, TelemetryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                TelemetryError::Backend(format!(
                    "Could not create span log directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        let file = File::create(path).map_err(|e| {
            TelemetryError::Backend(format!(
                "Could not create span log file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self {
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

struct JsonlSpan {
    id: String,
    name: String,
    metadata: SpanAttributes,
    payload: Option<SpanAttributes>,
    started: DateTime<Utc>,
    writer: SharedWriter,
}

impl SpanHandle for JsonlSpan {
    fn update(&mut self, payload: &SpanAttributes) -> Result<(), TelemetryError> {
        self.payload = Some(payload.clone());
        Ok(())
    }

    fn end(self: Box<Self>) -> Result<(), TelemetryError> {
        let ended = Utc::now();
        let record = json!({
            "type": "span",
            "span_id": self.id,
            "name": self.name,
            "start_time": self.started.to_rfc3339_opts(SecondsFormat::Millis, true),
            "end_time": ended.to_rfc3339_opts(SecondsFormat::Millis, true),
            "duration_ms": (ended - self.started).num_milliseconds(),
            "metadata": self.metadata.to_json(),
            "payload": self.payload.as_ref().map(SpanAttributes::to_json).unwrap_or(Value::Null),
        });
        let line = serde_json::to_string(&record)
            .map_err(|e| TelemetryError::Backend(e.to_string()))?;

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{}", line).map_err(|e| TelemetryError::Backend(e.to_string()))
    }
}

#[async_trait]
impl TelemetryBackend for JsonlSpanBackend {
    fn start_span(
        &self,
        name: &str,
        metadata: &SpanAttributes,
    ) -> Result<Box<dyn SpanHandle>, TelemetryError> {
        Ok(Box::new(JsonlSpan {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            metadata: metadata.clone(),
            payload: None,
            started: Utc::now(),
            writer: Arc::clone(&self.writer),
        }))
    }

    async fn flush(&self) -> Result<(), TelemetryError> {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
            .map_err(|e| TelemetryError::Flush(e.to_string()))
    }
}

impl Drop for JsonlSpanBackend {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_one_line_per_span() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spans/session.jsonl");
        let backend = JsonlSpanBackend::new(&path).unwrap();

        let mut span = backend
            .start_span(
                "speech_to_text",
                &SpanAttributes::new().with("participant_id", "p1"),
            )
            .unwrap();
        span.update(&SpanAttributes::new().with("stt.text", "hello"))
            .unwrap();
        span.end().unwrap();
        backend
            .start_span("llm_error", &SpanAttributes::new())
            .unwrap()
            .end()
            .unwrap();
        backend.flush().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "span");
        assert_eq!(lines[0]["name"], "speech_to_text");
        assert_eq!(lines[0]["metadata"]["participant_id"], "p1");
        assert_eq!(lines[0]["payload"]["stt.text"], "hello");
        assert!(lines[0]["duration_ms"].as_i64().unwrap() >= 0);
        assert_eq!(lines[1]["name"], "llm_error");
        assert!(lines[1]["payload"].is_null());
    }

    #[test]
    fn invalid_path_is_backend_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let result = JsonlSpanBackend::new(blocker.join("nested/spans.jsonl"));

        assert!(matches!(result, Err(TelemetryError::Backend(_))));
    }
}
