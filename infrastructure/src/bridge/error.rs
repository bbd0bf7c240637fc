//! Error types for the bridge adapter

use thiserror::Error;
use voice_application::TransportError;

/// Errors that can occur when talking to the media bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Failed to spawn bridge process: {0}")]
    SpawnError(#[source] std::io::Error),

    #[error("Bridge I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid bridge frame: {error}\nRaw frame: {raw}")]
    ParseError { error: String, raw: String },

    #[error("Bridge closed")]
    Closed,

    #[error("Bridge released")]
    Released,
}

impl From<BridgeError> for TransportError {
    fn from(e: BridgeError) -> Self {
        match e {
            BridgeError::Closed => TransportError::Closed,
            BridgeError::Released => TransportError::Released,
            BridgeError::Io(io) if is_disconnect(&io) => TransportError::Closed,
            BridgeError::ParseError { error, .. } => TransportError::Protocol(error),
            other => TransportError::SendFailed(other.to_string()),
        }
    }
}

fn is_disconnect(e: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        e.kind(),
        ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::UnexpectedEof
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broken_pipe_is_teardown() {
        let err: TransportError =
            BridgeError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe)).into();
        assert!(err.is_teardown_race());
    }

    #[test]
    fn other_io_is_send_failure() {
        let err: TransportError =
            BridgeError::Io(std::io::Error::other("disk on fire")).into();
        assert!(matches!(err, TransportError::SendFailed(_)));
    }
}
