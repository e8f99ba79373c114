//! Per-connection session: receive, dispatch, respond, pace, repeat.
//!
//! Reads are never reassembled. Each iteration performs one read of at
//! most [`FRAME_LENGTH`] + 1 bytes and treats whatever arrived as the
//! frame; anything shorter or longer is logged and dropped. This matches
//! how clients of the real display behave (one frame per write) and keeps
//! a desynced client from poisoning later frames.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::SinkExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio_util::codec::FramedWrite;
use tracing::{debug, info, warn};

use crate::codec::FrameCodec;
use crate::dispatch::{Dispatcher, Outcome};
use crate::frame::{FRAME_LENGTH, Frame};
use crate::state::{CloseReason, SessionPhase};
use crate::store::DeviceStateStore;

/// Default delay between loop iterations.
pub const DEFAULT_PACING: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sleep after every iteration so a chatty client cannot spin the task.
    pub pacing: Duration,
    /// Close the session when no bytes arrive for this long. `None` waits
    /// forever.
    pub idle_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pacing: DEFAULT_PACING,
            idle_timeout: None,
        }
    }
}

/// One client connection.
///
/// Holds the shared store through the dispatcher; there is no per-session
/// copy of the device state.
pub struct Session<S> {
    reader: ReadHalf<S>,
    writer: FramedWrite<WriteHalf<S>, FrameCodec>,
    peer: SocketAddr,
    dispatcher: Dispatcher,
    config: SessionConfig,
    phase: SessionPhase,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(
        stream: S,
        peer: SocketAddr,
        store: Arc<DeviceStateStore>,
        config: SessionConfig,
    ) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader,
            writer: FramedWrite::new(writer, FrameCodec),
            peer,
            dispatcher: Dispatcher::new(store),
            config,
            phase: SessionPhase::default(),
        }
    }

    /// Drive the session until the connection is lost.
    pub async fn run(mut self) -> CloseReason {
        info!("{} connected.", self.peer);
        self.print_status();

        let reason = loop {
            if let Err(reason) = self.step().await {
                break reason;
            }
        };
        let lived = match self.phase.close(reason) {
            Ok(lived) => lived,
            Err(e) => {
                warn!("{}: {e}", self.peer);
                Duration::ZERO
            }
        };

        if let Err(e) = SinkExt::<Frame>::close(&mut self.writer).await {
            debug!("{}: shutdown: {e}", self.peer);
        }
        info!("{} disconnected ({reason}) after {lived:.1?}.", self.peer);
        reason
    }

    /// One loop iteration. `Err` carries the reason the session must end.
    async fn step(&mut self) -> Result<(), CloseReason> {
        if let Err(e) = self.ping().await {
            warn!("there was an error pinging {}: {e}", self.peer);
            return Err(CloseReason::PingFailed);
        }

        // One spare byte so an overlong write is seen as such.
        let mut buf = [0u8; FRAME_LENGTH + 1];
        let n = self.receive(&mut buf).await?;

        if n == 0 {
            warn!("no data received from {}; closing", self.peer);
            return Err(CloseReason::PeerClosed);
        }

        if n == FRAME_LENGTH {
            self.handle_frame(&buf[..n]).await?;
        } else {
            warn!(
                "{}: frame length was {n} (expected {FRAME_LENGTH}); dropped",
                self.peer
            );
        }

        tokio::time::sleep(self.config.pacing).await;
        Ok(())
    }

    /// Zero-length write plus flush: fails once the socket is torn down.
    async fn ping(&mut self) -> std::io::Result<()> {
        self.writer.get_mut().write(&[]).await?;
        self.writer.get_mut().flush().await
    }

    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize, CloseReason> {
        let read = match self.config.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.reader.read(buf)).await {
                Ok(read) => read,
                Err(_) => {
                    warn!("{}: nothing received for {limit:?}", self.peer);
                    return Err(CloseReason::IdleTimeout);
                }
            },
            None => self.reader.read(buf).await,
        };

        read.map_err(|e| {
            warn!("{}: read error: {e}", self.peer);
            CloseReason::ReadFailed
        })
    }

    async fn handle_frame(&mut self, bytes: &[u8]) -> Result<(), CloseReason> {
        let frame = match Frame::decode(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("{}: dropping frame: {e}", self.peer);
                return Ok(());
            }
        };
        debug!("{} -> {frame}", self.peer);

        let outcome = self.dispatcher.dispatch(&frame);
        if let Outcome::Ignored(reason) = &outcome {
            warn!("{}: ignored {frame}: {reason}", self.peer);
        }

        // Each reply is flushed on its own: acknowledgement, then notify.
        for reply in outcome.replies() {
            debug!("{} <- {reply}", self.peer);
            if let Err(e) = self.writer.send(*reply).await {
                warn!("{}: send failed: {e}", self.peer);
                return Err(CloseReason::WriteFailed);
            }
        }

        if outcome.is_mutation() {
            self.print_status();
        }
        Ok(())
    }

    fn print_status(&self) {
        info!("{}\n{}", self.peer, self.dispatcher.store().status());
    }
}

// ── Tests ────────────────────────────────────────────────────────
