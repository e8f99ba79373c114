//! Shared device state: the five attributes, held as the literal frames
//! the display answers with, and written through to a JSON file.
//!
//! One [`DeviceStateStore`] exists per process and is shared by `Arc`
//! across every session. Mutation and persistence happen under a single
//! lock, so the file on disk always holds one complete snapshot.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::BraviaError;
use crate::frame::{Frame, INPUT_PORT_OFFSET};
use crate::message::{InputPort, Opcode};

// ── Defaults ─────────────────────────────────────────────────────

const DEFAULT_POWER: &str = "*SAPOWR0000000000000000\n";
const DEFAULT_INPUT: &str = "*SAINPT0000000100000003\n";
const DEFAULT_AUDIO_MUTE: &str = "*SAAMUT0000000000000000\n";
const DEFAULT_AUDIO_VOLUME: &str = "*SAVOLU0000000000000064\n";
const DEFAULT_PICTURE_MUTE: &str = "*SAPMUT0000000000000000\n";

fn default_frame(opcode: Opcode) -> Frame {
    let text = match opcode {
        Opcode::Power => DEFAULT_POWER,
        Opcode::Input => DEFAULT_INPUT,
        Opcode::AudioMute => DEFAULT_AUDIO_MUTE,
        Opcode::Volume => DEFAULT_AUDIO_VOLUME,
        Opcode::PictureMute => DEFAULT_PICTURE_MUTE,
    };
    // The constants above are 24 ascii bytes each.
    Frame::try_from(text).unwrap_or_else(|_| Frame::acknowledge(opcode))
}

// ── DeviceState ──────────────────────────────────────────────────

/// Current value of every attribute, as the frame a query would return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    pub power: Frame,
    pub input: Frame,
    pub audio_mute: Frame,
    pub audio_volume: Frame,
    pub picture_mute: Frame,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            power: default_frame(Opcode::Power),
            input: default_frame(Opcode::Input),
            audio_mute: default_frame(Opcode::AudioMute),
            audio_volume: default_frame(Opcode::Volume),
            picture_mute: default_frame(Opcode::PictureMute),
        }
    }
}

impl DeviceState {
    pub fn get(&self, opcode: Opcode) -> Frame {
        match opcode {
            Opcode::Power => self.power,
            Opcode::Input => self.input,
            Opcode::AudioMute => self.audio_mute,
            Opcode::Volume => self.audio_volume,
            Opcode::PictureMute => self.picture_mute,
        }
    }

    fn slot_mut(&mut self, opcode: Opcode) -> &mut Frame {
        match opcode {
            Opcode::Power => &mut self.power,
            Opcode::Input => &mut self.input,
            Opcode::AudioMute => &mut self.audio_mute,
            Opcode::Volume => &mut self.audio_volume,
            Opcode::PictureMute => &mut self.picture_mute,
        }
    }

    /// Decode the stored frames into scalars for console output.
    pub fn status(&self) -> DeviceStatus {
        DeviceStatus {
            power: self.power.setting_digit() == b'1',
            input_port: InputPort::try_from(self.input.byte(INPUT_PORT_OFFSET)).ok(),
            input_number: self.input.trailing_number(4),
            audio_muted: self.audio_mute.setting_digit() != b'0',
            volume: self.audio_volume.trailing_number(3),
            picture_muted: self.picture_mute.setting_digit() != b'0',
        }
    }

    fn from_persisted(persisted: PersistedState) -> Self {
        let mut state = Self::default();
        for opcode in Opcode::ALL {
            let text = persisted.field(opcode);
            match Frame::try_from(text) {
                Ok(frame) if frame.opcode().ok() == Some(opcode) => *state.slot_mut(opcode) = frame,
                _ => warn!(
                    "state file entry {} is invalid ({:?}); using default",
                    PersistedState::key(opcode),
                    text
                ),
            }
        }
        state
    }
}

// ── DeviceStatus ─────────────────────────────────────────────────

/// Decoded view of [`DeviceState`]. Never used to build responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    pub power: bool,
    /// `None` when the stored input frame names an undocumented port.
    pub input_port: Option<InputPort>,
    pub input_number: Option<u16>,
    pub audio_muted: bool,
    pub volume: Option<u16>,
    pub picture_muted: bool,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let on_off = |b: bool| if b { "on" } else { "off" };
        let muted = |b: bool| if b { "muted" } else { "unmuted" };
        let input = match self.input_port {
            Some(port) => port.to_string(),
            None => "unknown".to_string(),
        };

        writeln!(f, "========= SERVER DATA =========")?;
        writeln!(f, "Power: {}", on_off(self.power))?;
        match self.input_number {
            Some(n) => writeln!(f, "Input: {input} {n}")?,
            None => writeln!(f, "Input: {input}")?,
        }
        writeln!(f, "Audio Mute: {}", muted(self.audio_muted))?;
        match self.volume {
            Some(v) => writeln!(f, "Audio Volume: {v:03}")?,
            None => writeln!(f, "Audio Volume: ?")?,
        }
        writeln!(f, "Picture Mute: {}", muted(self.picture_muted))?;
        write!(f, "===============================")
    }
}

// ── Persistence format ───────────────────────────────────────────

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    #[serde(default)]
    power_stat: String,
    #[serde(default)]
    input_stat: String,
    #[serde(default)]
    audio_mute_stat: String,
    #[serde(default)]
    audio_volume_stat: String,
    #[serde(default)]
    picture_mute_stat: String,
}

impl PersistedState {
    fn key(opcode: Opcode) -> &'static str {
        match opcode {
            Opcode::Power => "power_stat",
            Opcode::Input => "input_stat",
            Opcode::AudioMute => "audio_mute_stat",
            Opcode::Volume => "audio_volume_stat",
            Opcode::PictureMute => "picture_mute_stat",
        }
    }

    fn field(&self, opcode: Opcode) -> &str {
        match opcode {
            Opcode::Power => &self.power_stat,
            Opcode::Input => &self.input_stat,
            Opcode::AudioMute => &self.audio_mute_stat,
            Opcode::Volume => &self.audio_volume_stat,
            Opcode::PictureMute => &self.picture_mute_stat,
        }
    }
}

impl From<&DeviceState> for PersistedState {
    fn from(state: &DeviceState) -> Self {
        Self {
            power_stat: state.power.as_str().to_owned(),
            input_stat: state.input.as_str().to_owned(),
            audio_mute_stat: state.audio_mute.as_str().to_owned(),
            audio_volume_stat: state.audio_volume.as_str().to_owned(),
            picture_mute_stat: state.picture_mute.as_str().to_owned(),
        }
    }
}

// ── DeviceStateStore ─────────────────────────────────────────────

#[derive(Debug)]
pub struct DeviceStateStore {
    state: Mutex<DeviceState>,
    /// `None` for a store that lives only in memory.
    path: Option<PathBuf>,
}

impl DeviceStateStore {
    /// Load the state file at `path`, or start from defaults and persist
    /// them when the file is absent or empty.
    ///
    /// Any other I/O failure, or a file that is not a JSON object, is an
    /// error: the emulator cannot establish its initial state.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, BraviaError> {
        let path = path.into();

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(source) => return Err(BraviaError::Persistence { path, source }),
        };

        let state = match contents {
            Some(text) if !text.trim().is_empty() => {
                let persisted: PersistedState = serde_json::from_str(&text)?;
                info!("loaded device state from {}", path.display());
                DeviceState::from_persisted(persisted)
            }
            _ => {
                info!("no device state at {}; writing defaults", path.display());
                let state = DeviceState::default();
                persist(&path, &state)?;
                state
            }
        };

        Ok(Self {
            state: Mutex::new(state),
            path: Some(path),
        })
    }

    /// A store with default state and no backing file.
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(DeviceState::default()),
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current representation of one attribute.
    pub fn get(&self, opcode: Opcode) -> Frame {
        self.lock().get(opcode)
    }

    /// Replace one attribute and write the whole snapshot through.
    ///
    /// On a persistence error the in-memory value is still updated; the
    /// caller decides how loudly to complain.
    pub fn set(&self, opcode: Opcode, frame: Frame) -> Result<(), BraviaError> {
        let mut state = self.lock();
        *state.slot_mut(opcode) = frame;
        debug!("{opcode} := {frame}");
        // Written inline under the lock: the file is five short strings and
        // must land in mutation order.
        match &self.path {
            Some(path) => persist(path, &state),
            None => Ok(()),
        }
    }

    pub fn snapshot(&self) -> DeviceState {
        self.lock().clone()
    }

    pub fn status(&self) -> DeviceStatus {
        self.lock().status()
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        // A panic while holding the lock cannot leave a half-written frame:
        // every mutation is a single Copy assignment.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Write the snapshot to a sibling temp file, then rename it over `path`.
fn persist(path: &Path, state: &DeviceState) -> Result<(), BraviaError> {
    let json = serde_json::to_string(&PersistedState::from(state))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let io = |source| BraviaError::Persistence {
        path: path.to_path_buf(),
        source,
    };
    std::fs::write(&tmp, json).map_err(io)?;
    std::fs::rename(&tmp, path).map_err(io)
}

// ── Tests ────────────────────────────────────────────────────────
