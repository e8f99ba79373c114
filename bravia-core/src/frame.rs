//! Fixed-length protocol frame.
//!
//! ```text
//! offset:  0    1       2      3-6      7-22              23
//! field:   '*'  sender  kind   opcode   payload(16 chars) terminator
//! ```
//!
//! Every frame is exactly [`FRAME_LENGTH`] ASCII bytes. There is no other
//! delimiter on the wire: framing is purely by length.

use std::fmt;
use std::ops::Range;

use crate::error::BraviaError;
use crate::message::{Kind, Opcode};

pub const FRAME_LENGTH: usize = 24;
pub const PAYLOAD_LENGTH: usize = 16;

pub const START_BYTE: u8 = b'*';
pub const SERVER_SENDER: u8 = b'S';
pub const TERMINATOR: u8 = b'\n';

pub const SENDER_OFFSET: usize = 1;
pub const KIND_OFFSET: usize = 2;
pub const OPCODE_RANGE: Range<usize> = 3..7;
pub const PAYLOAD_RANGE: Range<usize> = 7..23;
pub const TERMINATOR_OFFSET: usize = 23;

/// Offset of the input-type digit inside an `INPT` frame.
pub const INPUT_PORT_OFFSET: usize = 14;

/// Enquiry payload filler.
const ENQUIRY_FILL: &str = "################";

pub type FrameBytes = [u8; FRAME_LENGTH];

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame {
    bytes: FrameBytes,
}

impl Frame {
    /// Build a server-sender frame, left-padding `payload` with zeros to
    /// [`PAYLOAD_LENGTH`] characters and appending the terminator.
    pub fn new(kind: Kind, opcode: Opcode, payload: &str) -> Result<Self, BraviaError> {
        if !payload.is_ascii() {
            return Err(BraviaError::InvalidText);
        }
        if payload.len() > PAYLOAD_LENGTH {
            return Err(BraviaError::ProtocolViolation("payload longer than 16 characters"));
        }

        let mut bytes: FrameBytes = [b'0'; FRAME_LENGTH];
        bytes[0] = START_BYTE;
        bytes[SENDER_OFFSET] = SERVER_SENDER;
        bytes[KIND_OFFSET] = kind.as_byte();
        bytes[OPCODE_RANGE].copy_from_slice(opcode.code());
        let start = PAYLOAD_RANGE.end - payload.len();
        bytes[start..PAYLOAD_RANGE.end].copy_from_slice(payload.as_bytes());
        bytes[TERMINATOR_OFFSET] = TERMINATOR;
        Ok(Self { bytes })
    }

    /// A server frame with an all-zero payload.
    fn zeroed(kind: Kind, opcode: Opcode) -> Self {
        let mut bytes: FrameBytes = [b'0'; FRAME_LENGTH];
        bytes[0] = START_BYTE;
        bytes[SENDER_OFFSET] = SERVER_SENDER;
        bytes[KIND_OFFSET] = kind.as_byte();
        bytes[OPCODE_RANGE].copy_from_slice(opcode.code());
        bytes[TERMINATOR_OFFSET] = TERMINATOR;
        Self { bytes }
    }

    /// `*SE<opcode>################`: ask for the current value.
    pub fn enquiry(opcode: Opcode) -> Self {
        let mut frame = Self::zeroed(Kind::Enquiry, opcode);
        frame.bytes[PAYLOAD_RANGE].copy_from_slice(ENQUIRY_FILL.as_bytes());
        frame
    }

    /// `*SA<opcode>0000000000000000`: acknowledgement of a control command.
    pub fn acknowledge(opcode: Opcode) -> Self {
        Self::zeroed(Kind::Answer, opcode)
    }

    /// Parse exactly one frame.
    pub fn decode(bytes: &[u8]) -> Result<Self, BraviaError> {
        let bytes: FrameBytes =
            bytes
                .try_into()
                .map_err(|_| BraviaError::InvalidFrameLength {
                    expected: FRAME_LENGTH,
                    actual: bytes.len(),
                })?;
        if !bytes.is_ascii() {
            return Err(BraviaError::InvalidText);
        }
        Ok(Self { bytes })
    }

    /// Concatenate `parts` into a frame; the total must be a whole frame.
    pub(crate) fn from_parts(parts: &[&[u8]]) -> Result<Self, BraviaError> {
        let joined: Vec<u8> = parts.concat();
        Self::decode(&joined)
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn as_bytes(&self) -> &FrameBytes {
        &self.bytes
    }

    /// The frame as text. Frames are ASCII by construction.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes).unwrap_or_default()
    }

    pub fn byte(&self, offset: usize) -> u8 {
        self.bytes[offset]
    }

    pub fn sender(&self) -> u8 {
        self.bytes[SENDER_OFFSET]
    }

    pub fn kind_byte(&self) -> u8 {
        self.bytes[KIND_OFFSET]
    }

    pub fn kind(&self) -> Result<Kind, BraviaError> {
        Kind::try_from(self.kind_byte())
    }

    pub fn opcode_bytes(&self) -> &[u8] {
        &self.bytes[OPCODE_RANGE]
    }

    pub fn opcode(&self) -> Result<Opcode, BraviaError> {
        Opcode::try_from(self.opcode_bytes())
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[PAYLOAD_RANGE]
    }

    /// Payload plus terminator: everything from offset 7 to the end.
    pub fn tail(&self) -> &[u8] {
        &self.bytes[PAYLOAD_RANGE.start..]
    }

    /// The last payload digit, which carries on/off settings.
    pub fn setting_digit(&self) -> u8 {
        self.bytes[PAYLOAD_RANGE.end - 1]
    }

    /// The last `count` payload characters parsed as a decimal number.
    pub fn trailing_number(&self, count: usize) -> Option<u16> {
        let count = count.min(PAYLOAD_LENGTH);
        let digits = &self.bytes[PAYLOAD_RANGE.end - count..PAYLOAD_RANGE.end];
        std::str::from_utf8(digits).ok()?.parse().ok()
    }

    /// Copy of this frame with the kind byte replaced.
    pub fn with_kind(&self, kind: Kind) -> Self {
        let mut bytes = self.bytes;
        bytes[KIND_OFFSET] = kind.as_byte();
        Self { bytes }
    }
}

impl TryFrom<&str> for Frame {
    type Error = BraviaError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::decode(value.as_bytes())
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().escape_debug())
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Frame").field(&self.as_str()).finish()
    }
}
