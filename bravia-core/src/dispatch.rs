//! Command dispatcher: turns one decoded frame into store operations and
//! the frames to send back.
//!
//! ```text
//! Client ──[*SC<op><payload>]──► Display    control: store, then
//! Display ──[*SA<op>0…0]───────► Client       acknowledgement
//! Display ──[*SN<op><stored>]──► Client       notify
//!
//! Client ──[*SE<op>#…#]────────► Display    enquiry
//! Display ──[*SA<op><stored>]──► Client       stored frame verbatim
//! ```
//!
//! Unknown opcodes, undocumented input ports and unknown kinds get no
//! answer at all. Clients see a timeout, as they would with the hardware.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::BraviaError;
use crate::frame::{Frame, INPUT_PORT_OFFSET};
use crate::message::{InputPort, Kind, Opcode};
use crate::store::DeviceStateStore;

const STORED_PREFIX: &[u8] = b"*SA";
const INPUT_FILL: &[u8] = b"0000000";
const INPUT_GAP: &[u8] = b"0000";
/// Start of the input number carried over from an `INPT` control frame.
const INPUT_NUMBER_OFFSET: usize = 19;

// ── Outcome ──────────────────────────────────────────────────────

/// Why a frame produced no answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    UnknownControl(String),
    UnknownEnquiry(String),
    UnknownInputPort(char),
    /// A kind the display never accepts from a client (`A`, `N`, or junk).
    UnexpectedKind(char),
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownControl(op) => write!(f, "no control type match: {op:?}"),
            Self::UnknownEnquiry(op) => write!(f, "no enquiry type match: {op:?}"),
            Self::UnknownInputPort(port) => write!(f, "undocumented input port {port:?}"),
            Self::UnexpectedKind(kind) => write!(f, "wrong message format: {kind:?}"),
        }
    }
}

/// Result of dispatching one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A control command changed `opcode`. `replies` is acknowledgement
    /// then notify, in send order.
    Controlled {
        opcode: Opcode,
        stored: Frame,
        replies: [Frame; 2],
    },
    /// An enquiry was answered from the store.
    Queried { opcode: Opcode, reply: Frame },
    /// Nothing changed and nothing is sent.
    Ignored(IgnoreReason),
}

impl Outcome {
    /// Frames to write back, in order.
    pub fn replies(&self) -> &[Frame] {
        match self {
            Self::Controlled { replies, .. } => replies,
            Self::Queried { reply, .. } => std::slice::from_ref(reply),
            Self::Ignored(_) => &[],
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Controlled { .. })
    }
}

// ── Frame synthesis ──────────────────────────────────────────────

/// The representation a control frame leaves in the store.
///
/// `INPT` keeps only the port digit and the input number; every other
/// opcode keeps the payload (and terminator) verbatim.
pub fn stored_representation(opcode: Opcode, command: &Frame) -> Result<Frame, BraviaError> {
    let bytes = command.as_bytes();
    match opcode {
        Opcode::Input => {
            let port = InputPort::try_from(bytes[INPUT_PORT_OFFSET])?.as_byte();
            Frame::from_parts(&[
                STORED_PREFIX,
                &opcode.code()[..],
                INPUT_FILL,
                std::slice::from_ref(&port),
                INPUT_GAP,
                &bytes[INPUT_NUMBER_OFFSET..],
            ])
        }
        _ => Frame::from_parts(&[STORED_PREFIX, &opcode.code()[..], command.tail()]),
    }
}

/// Acknowledgement followed by the notify frame for a freshly stored value.
pub fn respond(opcode: Opcode, stored: &Frame) -> [Frame; 2] {
    [Frame::acknowledge(opcode), stored.with_kind(Kind::Notify)]
}

// ── Dispatcher ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Dispatcher {
    store: Arc<DeviceStateStore>,
}

impl Dispatcher {
    pub fn new(store: Arc<DeviceStateStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<DeviceStateStore> {
        &self.store
    }

    pub fn dispatch(&self, frame: &Frame) -> Outcome {
        match frame.kind() {
            Ok(Kind::Control) => self.control(frame),
            Ok(Kind::Enquiry) => self.query(frame),
            _ => Outcome::Ignored(IgnoreReason::UnexpectedKind(char::from(frame.kind_byte()))),
        }
    }

    fn control(&self, frame: &Frame) -> Outcome {
        let Ok(opcode) = frame.opcode() else {
            return Outcome::Ignored(IgnoreReason::UnknownControl(opcode_text(frame)));
        };

        let stored = match stored_representation(opcode, frame) {
            Ok(stored) => stored,
            Err(e) => {
                debug!("rejecting {frame}: {e}");
                return Outcome::Ignored(IgnoreReason::UnknownInputPort(char::from(
                    frame.byte(INPUT_PORT_OFFSET),
                )));
            }
        };

        if let Err(e) = self.store.set(opcode, stored) {
            // Memory already holds the new value; only the file lags behind.
            warn!("{opcode} updated but not persisted: {e}");
        }

        Outcome::Controlled {
            opcode,
            stored,
            replies: respond(opcode, &stored),
        }
    }

    fn query(&self, frame: &Frame) -> Outcome {
        match frame.opcode() {
            Ok(opcode) => Outcome::Queried {
                opcode,
                reply: self.store.get(opcode),
            },
            Err(_) => Outcome::Ignored(IgnoreReason::UnknownEnquiry(opcode_text(frame))),
        }
    }
}

fn opcode_text(frame: &Frame) -> String {
    String::from_utf8_lossy(frame.opcode_bytes()).into_owned()
}

// ── Tests ────────────────────────────────────────────────────────
