//! Session lifecycle.
//!
//! A session starts `Active` and ends `Closed`; there is no way back.
//! A reconnecting client gets a brand-new session from the acceptor.

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::BraviaError;

// ── CloseReason ──────────────────────────────────────────────────

/// Why a session left the `Active` phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed its end (zero-length read).
    PeerClosed,
    /// The liveness ping before a read failed.
    PingFailed,
    /// The socket returned an error while reading.
    ReadFailed,
    /// Sending a reply failed.
    WriteFailed,
    /// No frame arrived within the configured idle timeout.
    IdleTimeout,
}

impl CloseReason {
    /// Returns `true` when the peer is gone rather than the session giving up.
    pub fn is_disconnect(&self) -> bool {
        !matches!(self, Self::IdleTimeout)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => write!(f, "peer closed the connection"),
            Self::PingFailed => write!(f, "liveness ping failed"),
            Self::ReadFailed => write!(f, "read failed"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::IdleTimeout => write!(f, "idle timeout"),
        }
    }
}

// ── SessionPhase ─────────────────────────────────────────────────

/// ```text
///  Active ──► Closed
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// Reading and answering frames.
    Active {
        /// When the session was created.
        since: Instant,
    },

    /// Terminal.
    Closed { reason: CloseReason },
}

impl Default for SessionPhase {
    fn default() -> Self {
        Self::Active {
            since: Instant::now(),
        }
    }
}

impl SessionPhase {
    /// Transition to `Closed`, returning how long the session was active.
    ///
    /// Valid from: `Active`.
    pub fn close(&mut self, reason: CloseReason) -> Result<Duration, BraviaError> {
        match self {
            Self::Active { since } => {
                let lived = since.elapsed();
                *self = Self::Closed { reason };
                Ok(lived)
            }
            Self::Closed { .. } => Err(BraviaError::ProtocolViolation(
                "cannot close: session already closed",
            )),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_phase_is_active() {
        assert!(matches!(SessionPhase::default(), SessionPhase::Active { .. }));
    }

    #[test]
    fn close_is_terminal() {
        let mut phase = SessionPhase::default();
        let lived = phase.close(CloseReason::PeerClosed).unwrap();
        assert!(lived < Duration::from_secs(5));
        assert_eq!(
            phase,
            SessionPhase::Closed {
                reason: CloseReason::PeerClosed
            }
        );

        assert!(phase.close(CloseReason::PingFailed).is_err());
        assert_eq!(
            phase,
            SessionPhase::Closed {
                reason: CloseReason::PeerClosed
            }
        );
    }

    #[test]
    fn idle_timeout_is_not_a_disconnect() {
        assert!(CloseReason::PeerClosed.is_disconnect());
        assert!(CloseReason::PingFailed.is_disconnect());
        assert!(!CloseReason::IdleTimeout.is_disconnect());
    }

    #[test]
    fn display_format() {
        assert_eq!(CloseReason::PeerClosed.to_string(), "peer closed the connection");
        assert_eq!(CloseReason::IdleTimeout.to_string(), "idle timeout");
    }
}
