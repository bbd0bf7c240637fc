//! Session transport port
//!
//! The media transport (room connection, audio in/out, speech-to-text) is an
//! external collaborator. The session only consumes its event stream and
//! holds an opaque handle to it.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use voice_domain::SessionEvent;

/// Errors reported by the transport or the turn pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The underlying connection is gone (peer exited, channel closed).
    #[error("Transport closed")]
    Closed,

    /// The session already released its handle during shutdown.
    #[error("Transport released")]
    Released,

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// `true` when the error means the resource was torn down underneath
    /// the caller, as opposed to a genuine fault.
    pub fn is_teardown_race(&self) -> bool {
        matches!(self, TransportError::Closed | TransportError::Released)
    }
}

/// Port for the real-time media transport.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Take the inbound event stream.
    ///
    /// Events arrive in the order the transport observed them. Only the
    /// first call returns `Some`; the stream has a single consumer.
    fn take_events(&self) -> Option<mpsc::Receiver<SessionEvent>>;

    /// Start speech-to-text for a participant.
    async fn capture_participant_transcription(
        &self,
        participant_id: &str,
    ) -> Result<(), TransportError>;

    /// Tear the connection down. Later sends through any handle to the
    /// same connection fail with [`TransportError::Released`]. Idempotent.
    async fn release(&self) -> Result<(), TransportError>;
}
