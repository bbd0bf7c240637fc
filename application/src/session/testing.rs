//! Fake transport and pipeline shared by tests across the crate.

use crate::ports::pipeline::{PipelinePort, ToolCallOutput};
use crate::ports::transport::{SessionTransport, TransportError};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;
use voice_domain::{SessionEvent, TurnContext};

pub struct FakeTransport {
    events: Mutex<Option<mpsc::Receiver<SessionEvent>>>,
    sender: Mutex<Option<mpsc::Sender<SessionEvent>>>,
    pub captured: Mutex<Vec<String>>,
    pub fail_capture: AtomicBool,
    pub fail_release: AtomicBool,
    releases: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(64);
        Self {
            events: Mutex::new(Some(rx)),
            sender: Mutex::new(Some(tx)),
            captured: Mutex::new(Vec::new()),
            fail_capture: AtomicBool::new(false),
            fail_release: AtomicBool::new(false),
            releases: AtomicUsize::new(0),
        }
    }

    pub async fn push(&self, event: SessionEvent) {
        let tx = self.sender.lock().unwrap().clone().expect("stream open");
        tx.send(event).await.expect("receiver alive");
    }

    /// Drop the sending side so the event stream ends.
    pub fn close_stream(&self) {
        self.sender.lock().unwrap().take();
    }

    pub fn captured(&self) -> Vec<String> {
        self.captured.lock().unwrap().clone()
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionTransport for FakeTransport {
    fn take_events(&self) -> Option<mpsc::Receiver<SessionEvent>> {
        self.events.lock().unwrap().take()
    }

    async fn capture_participant_transcription(
        &self,
        participant_id: &str,
    ) -> Result<(), TransportError> {
        if self.fail_capture.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.captured
            .lock()
            .unwrap()
            .push(participant_id.to_string());
        Ok(())
    }

    async fn release(&self) -> Result<(), TransportError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        if self.fail_release.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed("socket stuck".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineCall {
    Configure { tools: usize },
    BotReady,
    LlmRun,
    ToolResult(ToolCallOutput),
    Cancel,
}

#[derive(Default)]
pub struct FakePipeline {
    pub calls: Mutex<Vec<PipelineCall>>,
}

impl FakePipeline {
    pub fn calls(&self) -> Vec<PipelineCall> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, call: PipelineCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PipelinePort for FakePipeline {
    async fn configure(&self, context: &TurnContext) -> Result<(), TransportError> {
        self.push(PipelineCall::Configure {
            tools: context.tool_count(),
        });
        Ok(())
    }

    async fn set_bot_ready(&self) -> Result<(), TransportError> {
        self.push(PipelineCall::BotReady);
        Ok(())
    }

    async fn queue_llm_run(&self) -> Result<(), TransportError> {
        self.push(PipelineCall::LlmRun);
        Ok(())
    }

    async fn send_tool_result(&self, output: &ToolCallOutput) -> Result<(), TransportError> {
        self.push(PipelineCall::ToolResult(output.clone()));
        Ok(())
    }

    async fn cancel(&self) -> Result<(), TransportError> {
        self.push(PipelineCall::Cancel);
        Ok(())
    }
}
