//! Frame kinds, opcodes and input ports.
//!
//! Uses proper enums with `TryFrom`, no panics on unknown values.

use crate::error::BraviaError;
use std::fmt;

// ── Kind ─────────────────────────────────────────────────────────

/// The frame kind carried at offset 2.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Client asks the display to change an attribute.
    Control = b'C',
    /// Client asks for the current value of an attribute.
    Enquiry = b'E',
    /// Display answers a control or an enquiry.
    Answer = b'A',
    /// Display announces an attribute change.
    Notify = b'N',
}

impl TryFrom<u8> for Kind {
    type Error = BraviaError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            b'C' => Ok(Kind::Control),
            b'E' => Ok(Kind::Enquiry),
            b'A' => Ok(Kind::Answer),
            b'N' => Ok(Kind::Notify),
            _ => Err(BraviaError::UnknownVariant {
                type_name: "kind",
                value: char::from(value).to_string(),
            }),
        }
    }
}

impl Kind {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ── Opcode ───────────────────────────────────────────────────────

/// The five attributes the display exposes, keyed by their 4-letter code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// `POWR`: power on/off.
    Power,
    /// `INPT`: selected input.
    Input,
    /// `AMUT`: audio mute.
    AudioMute,
    /// `VOLU`: audio volume.
    Volume,
    /// `PMUT`: picture mute.
    PictureMute,
}

impl Opcode {
    pub const ALL: [Opcode; 5] = [
        Opcode::Power,
        Opcode::Input,
        Opcode::AudioMute,
        Opcode::Volume,
        Opcode::PictureMute,
    ];

    pub fn code(self) -> &'static [u8; 4] {
        match self {
            Opcode::Power => b"POWR",
            Opcode::Input => b"INPT",
            Opcode::AudioMute => b"AMUT",
            Opcode::Volume => b"VOLU",
            Opcode::PictureMute => b"PMUT",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Opcode::Power => "POWR",
            Opcode::Input => "INPT",
            Opcode::AudioMute => "AMUT",
            Opcode::Volume => "VOLU",
            Opcode::PictureMute => "PMUT",
        }
    }
}

impl TryFrom<&[u8]> for Opcode {
    type Error = BraviaError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        match value {
            b"POWR" => Ok(Opcode::Power),
            b"INPT" => Ok(Opcode::Input),
            b"AMUT" => Ok(Opcode::AudioMute),
            b"VOLU" => Ok(Opcode::Volume),
            b"PMUT" => Ok(Opcode::PictureMute),
            _ => Err(BraviaError::UnknownVariant {
                type_name: "opcode",
                value: String::from_utf8_lossy(value).into_owned(),
            }),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── InputPort ────────────────────────────────────────────────────

/// Input types the display accepts at `INPT` offset 14.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputPort {
    Hdmi = b'1',
    Component = b'4',
    ScreenMirroring = b'5',
}

impl TryFrom<u8> for InputPort {
    type Error = BraviaError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            b'1' => Ok(InputPort::Hdmi),
            b'4' => Ok(InputPort::Component),
            b'5' => Ok(InputPort::ScreenMirroring),
            _ => Err(BraviaError::UnknownVariant {
                type_name: "input port",
                value: char::from(value).to_string(),
            }),
        }
    }
}

impl InputPort {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for InputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputPort::Hdmi => write!(f, "hdmi"),
            InputPort::Component => write!(f, "component"),
            InputPort::ScreenMirroring => write!(f, "scrn-mirror"),
        }
    }
}
