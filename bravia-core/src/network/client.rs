use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::Framed;

use crate::codec::FrameCodec;
use crate::error::BraviaError;
use crate::frame::Frame;
use crate::message::{Kind, Opcode};

/// How long `recv` waits for the display before giving up.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// A client connection to a display (or to the emulator).
///
/// Unlike the display side, the client reassembles frames: a reply split
/// over several TCP segments still comes out as one [`Frame`].
#[derive(Debug)]
pub struct DisplayClient {
    framed: Framed<TcpStream, FrameCodec>,
    reply_timeout: Duration,
}

impl DisplayClient {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            framed: Framed::new(stream, FrameCodec),
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }

    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, BraviaError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::new(stream))
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub async fn send(&mut self, frame: Frame) -> Result<(), BraviaError> {
        self.framed.send(frame).await
    }

    /// Write bytes that need not form a valid frame.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<(), BraviaError> {
        let stream = self.framed.get_mut();
        stream.write_all(bytes).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Next frame from the display.
    pub async fn recv(&mut self) -> Result<Frame, BraviaError> {
        match tokio::time::timeout(self.reply_timeout, self.framed.next()).await {
            Ok(Some(frame)) => frame,
            Ok(None) => Err(BraviaError::ConnectionClosed),
            Err(_) => Err(BraviaError::Timeout(self.reply_timeout)),
        }
    }

    /// Send a control command and collect the acknowledgement and notify.
    pub async fn control(
        &mut self,
        opcode: Opcode,
        payload: &str,
    ) -> Result<(Frame, Frame), BraviaError> {
        self.send(Frame::new(Kind::Control, opcode, payload)?).await?;
        let ack = self.recv().await?;
        let notify = self.recv().await?;
        Ok((ack, notify))
    }

    /// Ask for the current value of `opcode`.
    pub async fn query(&mut self, opcode: Opcode) -> Result<Frame, BraviaError> {
        self.send(Frame::enquiry(opcode)).await?;
        self.recv().await
    }
}
