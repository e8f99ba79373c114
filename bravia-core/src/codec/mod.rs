//! `tokio_util` codec for fixed-length frames.
//!
//! The decoder buffers until a whole frame is available, which is what a
//! client wants. The display side never reassembles (see [`Session`]) and
//! only uses the encoder half.
//!
//! [`Session`]: crate::network::Session

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::BraviaError;
use crate::frame::{FRAME_LENGTH, Frame};

#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = BraviaError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < FRAME_LENGTH {
            src.reserve(FRAME_LENGTH - src.len());
            return Ok(None);
        }
        let bytes = src.split_to(FRAME_LENGTH);
        Frame::decode(&bytes).map(Some)
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = BraviaError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(item.as_bytes());
        Ok(())
    }
}
