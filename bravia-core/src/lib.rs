//! # bravia-core
//!
//! Protocol core for an emulated display speaking the fixed-length
//! simple-IP control protocol.
//!
//! This crate contains:
//! - **Frame**: the 24-byte `Frame`, `Kind`, `Opcode`, `InputPort`
//! - **Codec**: `FrameCodec` for framed TCP I/O via `tokio_util`
//! - **Store**: `DeviceStateStore`, the shared and persisted device state
//! - **Dispatch**: `Dispatcher`, control/enquiry handling and response frames
//! - **Network**: `Session` (display side) and `DisplayClient`
//! - **State**: the session lifecycle (`SessionPhase`, `CloseReason`)
//! - **Error**: `BraviaError`, a typed, `thiserror`-based error hierarchy

pub mod codec;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod message;
pub mod network;
pub mod state;
pub mod store;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::FrameCodec;
pub use dispatch::{Dispatcher, IgnoreReason, Outcome};
pub use error::BraviaError;
pub use frame::{FRAME_LENGTH, Frame};
pub use message::{InputPort, Kind, Opcode};
pub use network::{DisplayClient, Session, SessionConfig};
pub use state::{CloseReason, SessionPhase};
pub use store::{DeviceState, DeviceStateStore, DeviceStatus};
