//! JSON-lines bridge to the external media pipeline.
//!
//! The bridge owns the room connection, ASR, LLM and TTS. The session talks
//! to it over a pair of byte streams: either the stdio of a sidecar process
//! spawned here, or this process's own stdin/stdout.
//!
//! A background reader task owns the read half exclusively and forwards
//! decoded events into a bounded channel. When the bridge goes away the
//! channel closes, which the session treats as a disconnect.
//!
//! [`release`](SessionTransport::release) shuts the writer, stops the reader
//! and kills the sidecar. Every later send fails with `Released`, whichever
//! port it goes through.

use super::error::BridgeError;
use super::protocol::{OutboundFrame, decode_line, encode_frame};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use voice_application::{PipelinePort, SessionTransport, ToolCallOutput, TransportError};
use voice_domain::{SessionEvent, TurnContext};

/// Capacity of the inbound event channel.
const EVENT_BUFFER: usize = 256;

/// How long `release` waits for a killed sidecar to be reaped.
const CHILD_EXIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Room parameters announced to the bridge on startup.
#[derive(Debug, Clone, Default)]
pub struct JoinRequest {
    pub room_url: Option<String>,
    pub token: Option<String>,
    pub bot_name: String,
}

/// How to launch a sidecar bridge process.
#[derive(Debug, Clone, Default)]
pub struct BridgeCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

pub struct BridgeTransport {
    writer: Mutex<Option<BoxedWriter>>,
    events: std::sync::Mutex<Option<mpsc::Receiver<SessionEvent>>>,
    reader_handle: JoinHandle<()>,
    /// Sidecar process, if we spawned one (killed on release or drop).
    child: std::sync::Mutex<Option<Child>>,
    cancelled: AtomicBool,
    released: AtomicBool,
}

impl BridgeTransport {
    /// Build a transport over arbitrary byte streams.
    pub fn from_io<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let reader_handle = tokio::spawn(Self::reader_loop(reader, tx));
        Self {
            writer: Mutex::new(Some(Box::new(writer))),
            events: std::sync::Mutex::new(Some(rx)),
            reader_handle,
            child: std::sync::Mutex::new(None),
            cancelled: AtomicBool::new(false),
            released: AtomicBool::new(false),
        }
    }

    /// Speak the protocol over this process's stdin/stdout.
    pub fn stdio() -> Self {
        Self::from_io(tokio::io::stdin(), tokio::io::stdout())
    }

    /// Spawn a sidecar bridge and speak the protocol over its stdio.
    pub fn spawn(command: &BridgeCommand) -> Result<Self, BridgeError> {
        debug!("Spawning bridge: {} {:?}", command.program, command.args);

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(&command.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        // Linux: request kernel to send SIGTERM to child when parent dies.
        // This catches cases where Drop doesn't run (SIGKILL, OOM kill).
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        let mut child = cmd.spawn().map_err(BridgeError::SpawnError)?;
        let stdout = child.stdout.take().ok_or_else(|| {
            BridgeError::SpawnError(std::io::Error::other("Failed to capture bridge stdout"))
        })?;
        let stdin = child.stdin.take().ok_or_else(|| {
            BridgeError::SpawnError(std::io::Error::other("Failed to capture bridge stdin"))
        })?;

        info!(
            program = %command.program,
            pid = child.id().unwrap_or_default(),
            "Bridge process started"
        );
        let transport = Self::from_io(stdout, stdin);
        *transport.child.lock().unwrap_or_else(|e| e.into_inner()) = Some(child);
        Ok(transport)
    }

    /// Announce the room to join.
    pub async fn join(&self, request: &JoinRequest) -> Result<(), BridgeError> {
        self.send(&OutboundFrame::Join {
            room_url: request.room_url.as_deref(),
            token: request.token.as_deref(),
            bot_name: &request.bot_name,
        })
        .await
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    async fn send(&self, frame: &OutboundFrame<'_>) -> Result<(), BridgeError> {
        let line = encode_frame(frame)?;
        trace!("Bridge sending: {}", line.trim_end());

        let mut guard = self.writer.lock().await;
        if self.is_released() {
            return Err(BridgeError::Released);
        }
        let writer = guard.as_mut().ok_or(BridgeError::Closed)?;
        let result = async {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        }
        .await;
        if let Err(e) = result {
            warn!("Bridge write failed, closing writer: {}", e);
            guard.take();
            return Err(e.into());
        }
        Ok(())
    }

    /// Background reader loop: single owner of the read half.
    ///
    /// Runs until EOF or an I/O error. Malformed lines are logged and
    /// skipped. Dropping `tx` on exit ends the session's event stream.
    async fn reader_loop<R>(reader: R, tx: mpsc::Sender<SessionEvent>)
    where
        R: AsyncRead + Send + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!("Bridge closed its output");
                    break;
                }
                Err(e) => {
                    warn!("Bridge reader: read error: {}", e);
                    break;
                }
            };
            trace!("Bridge received: {}", line);

            match decode_line(&line) {
                Ok(Some(event)) => {
                    if tx.send(event).await.is_err() {
                        debug!("Bridge reader: session stopped listening");
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Bridge reader: {}", e),
            }
        }
    }

    fn kill_child(&self) -> Option<Child> {
        let mut child = self.child.lock().unwrap_or_else(|e| e.into_inner()).take()?;
        if let Err(e) = child.start_kill() {
            debug!("Bridge process already gone: {}", e);
        }
        Some(child)
    }
}

impl Drop for BridgeTransport {
    fn drop(&mut self) {
        self.reader_handle.abort();
        if self.kill_child().is_some() {
            debug!("BridgeTransport dropping, killed bridge process");
        }
    }
}

#[async_trait]
impl SessionTransport for BridgeTransport {
    fn take_events(&self) -> Option<mpsc::Receiver<SessionEvent>> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    async fn capture_participant_transcription(
        &self,
        participant_id: &str,
    ) -> Result<(), TransportError> {
        self.send(&OutboundFrame::CaptureTranscription { participant_id })
            .await
            .map_err(Into::into)
    }

    async fn release(&self) -> Result<(), TransportError> {
        // Holding the writer lock orders this after any in-flight send
        let mut guard = self.writer.lock().await;
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let shutdown = match guard.take() {
            Some(mut writer) => writer.shutdown().await,
            None => Ok(()),
        };
        drop(guard);

        self.reader_handle.abort();
        if let Some(mut child) = self.kill_child() {
            match tokio::time::timeout(CHILD_EXIT_TIMEOUT, child.wait()).await {
                Ok(Ok(status)) => info!(%status, "Bridge process exited"),
                Ok(Err(e)) => warn!("Failed to reap bridge process: {}", e),
                Err(_) => warn!("Bridge process did not exit after kill"),
            }
        }
        debug!("Bridge transport released");

        match shutdown {
            Ok(()) => Ok(()),
            Err(e) => {
                let err = TransportError::from(BridgeError::Io(e));
                if err.is_teardown_race() { Ok(()) } else { Err(err) }
            }
        }
    }
}

#[async_trait]
impl PipelinePort for BridgeTransport {
    async fn configure(&self, context: &TurnContext) -> Result<(), TransportError> {
        self.send(&OutboundFrame::Configure {
            messages: context.messages(),
            tools: context.toolset().to_api_tools(),
        })
        .await
        .map_err(Into::into)
    }

    async fn set_bot_ready(&self) -> Result<(), TransportError> {
        self.send(&OutboundFrame::BotReady).await.map_err(Into::into)
    }

    async fn queue_llm_run(&self) -> Result<(), TransportError> {
        self.send(&OutboundFrame::RunLlm).await.map_err(Into::into)
    }

    async fn send_tool_result(&self, output: &ToolCallOutput) -> Result<(), TransportError> {
        self.send(&OutboundFrame::ToolResult {
            tool_id: &output.tool_id,
            name: &output.name,
            content: &output.content,
            is_error: output.is_error,
        })
        .await
        .map_err(Into::into)
    }

    async fn cancel(&self) -> Result<(), TransportError> {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.send(&OutboundFrame::Cancel).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, duplex};
    use voice_application::{
        SessionContext, ShutdownCoordinator, ShutdownState, StepOutcome, TelemetryEmitter,
        ToolProviderRegistry,
    };
    use voice_application::lifecycle::coordinator::ShutdownStep;
    use voice_domain::{ToolsetSnapshot, Transcription};

    #[tokio::test]
    async fn reader_forwards_events_and_skips_garbage() {
        let (mut bridge_side, session_side) = duplex(4096);
        let (session_read, _unused_write) = tokio::io::split(session_side);
        let transport = BridgeTransport::from_io(session_read, tokio::io::sink());
        let mut events = transport.take_events().unwrap();
        assert!(transport.take_events().is_none());

        bridge_side
            .write_all(
                b"{\"type\":\"client_ready\"}\nnot json\n\n{\"type\":\"transcription\",\"text\":\"hi\"}\n",
            )
            .await
            .unwrap();
        drop(bridge_side);

        assert_eq!(events.recv().await, Some(SessionEvent::ClientReady));
        assert_eq!(
            events.recv().await,
            Some(SessionEvent::Transcription(Transcription::new("hi")))
        );
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn outbound_frames_are_json_lines() {
        let (session_side, bridge_side) = duplex(4096);
        let transport = BridgeTransport::from_io(tokio::io::empty(), session_side);

        transport
            .join(&JoinRequest {
                room_url: Some("https://example.daily.co/room".into()),
                token: Some("tok".into()),
                bot_name: "AI Copilot".into(),
            })
            .await
            .unwrap();
        transport
            .configure(&TurnContext::new("prompt", ToolsetSnapshot::empty()))
            .await
            .unwrap();
        transport.set_bot_ready().await.unwrap();
        transport.queue_llm_run().await.unwrap();
        transport.cancel().await.unwrap();
        transport.cancel().await.unwrap();
        drop(transport);

        let mut raw = String::new();
        let mut bridge_side = bridge_side;
        bridge_side.read_to_string(&mut raw).await.unwrap();
        let types: Vec<String> = raw
            .lines()
            .map(|l| {
                let v: serde_json::Value = serde_json::from_str(l).unwrap();
                v["type"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(
            types,
            vec!["join", "configure", "bot_ready", "run_llm", "cancel"]
        );
    }

    #[tokio::test]
    async fn write_to_closed_peer_is_teardown() {
        let (session_side, bridge_side) = duplex(64);
        drop(bridge_side);
        let transport = BridgeTransport::from_io(tokio::io::empty(), session_side);

        let err = transport.queue_llm_run().await.unwrap_err();

        assert!(err.is_teardown_race(), "unexpected error: {err:?}");
        let err = transport.set_bot_ready().await.unwrap_err();
        assert_eq!(err, TransportError::Closed);
    }

    #[tokio::test]
    async fn release_stops_reader_and_closes_writer() {
        let (session_side, mut bridge_side) = duplex(4096);
        let (session_read, session_write) = tokio::io::split(session_side);
        let transport = BridgeTransport::from_io(session_read, session_write);
        let mut events = transport.take_events().unwrap();

        transport.release().await.unwrap();
        transport.release().await.unwrap();

        assert!(transport.is_released());
        assert_eq!(events.recv().await, None);
        let mut raw = String::new();
        bridge_side.read_to_string(&mut raw).await.unwrap();
        assert!(raw.is_empty());
    }

    #[tokio::test]
    async fn pipeline_send_after_shutdown_is_released() {
        let (session_side, _bridge_side) = duplex(4096);
        let (session_read, session_write) = tokio::io::split(session_side);
        let bridge = Arc::new(BridgeTransport::from_io(session_read, session_write));
        let context = Arc::new(SessionContext::new(
            Arc::new(ShutdownState::new()),
            bridge.clone(),
            bridge.clone(),
            Arc::new(ToolProviderRegistry::new(Vec::new(), TelemetryEmitter::disabled())),
            TelemetryEmitter::disabled(),
        ));

        let report = ShutdownCoordinator::new(Arc::clone(&context))
            .shutdown()
            .await
            .unwrap();

        assert_eq!(report.outcome(ShutdownStep::ReleaseTransport), Some(&StepOutcome::Done));
        assert!(!context.has_transport());
        assert_eq!(context.pipeline().queue_llm_run().await, Err(TransportError::Released));
        assert_eq!(context.pipeline().set_bot_ready().await, Err(TransportError::Released));
        assert_eq!(
            bridge.capture_participant_transcription("p1").await,
            Err(TransportError::Released)
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn release_kills_sidecar() {
        let transport = BridgeTransport::spawn(&BridgeCommand {
            program: "sleep".into(),
            args: vec!["30".into()],
            env: BTreeMap::new(),
        })
        .unwrap();

        tokio::time::timeout(Duration::from_secs(5), transport.release())
            .await
            .expect("release returns once the sidecar is reaped")
            .unwrap();

        assert!(transport.child.lock().unwrap().is_none());
        assert_eq!(transport.queue_llm_run().await, Err(TransportError::Released));
    }
}
