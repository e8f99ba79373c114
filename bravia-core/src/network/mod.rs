pub mod client;
pub mod session;

pub use client::DisplayClient;
pub use session::{Session, SessionConfig};
