pub mod phase;

pub use phase::{CloseReason, SessionPhase};
