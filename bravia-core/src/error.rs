//! Domain-specific error types for the simple-IP control protocol.
//!
//! All fallible operations return `Result<T, BraviaError>`.
//! Nothing in the frame path panics on client input. Every error is typed
//! and the session decides whether it is fatal.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the emulator.
#[derive(Debug, Error)]
pub enum BraviaError {
    // ── Frame Errors ─────────────────────────────────────────────
    /// The received frame is shorter or longer than a protocol frame.
    #[error("invalid frame length: expected {expected}, got {actual}")]
    InvalidFrameLength { expected: usize, actual: usize },

    /// The frame bytes are not ASCII text.
    #[error("frame is not valid ascii text")]
    InvalidText,

    /// A frame field did not map to any known variant.
    #[error("unknown {type_name}: {value:?}")]
    UnknownVariant { type_name: &'static str, value: String },

    /// A frame violated protocol rules.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The peer closed the connection.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Storage Errors ───────────────────────────────────────────
    /// Reading or writing the state file failed.
    #[error("state file {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The state file is not valid JSON.
    #[error("state file json: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = BraviaError::InvalidFrameLength {
            expected: 24,
            actual: 23,
        };
        assert!(e.to_string().contains("24"));
        assert!(e.to_string().contains("23"));

        let e = BraviaError::UnknownVariant {
            type_name: "opcode",
            value: "TYPE".into(),
        };
        assert!(e.to_string().contains("TYPE"));
    }

    #[test]
    fn from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: BraviaError = json_err.into();
        assert!(matches!(e, BraviaError::Json(_)));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: BraviaError = io_err.into();
        assert!(matches!(e, BraviaError::Connection(_)));
    }

    #[test]
    fn persistence_names_the_file() {
        let e = BraviaError::Persistence {
            path: PathBuf::from("/nope/state.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.to_string().contains("/nope/state.json"));
    }
}
