//! # bravia-emulator: networked display emulator
//!
//! Listens for simple-IP control connections and answers them from a
//! single shared, persisted device state. Each connection runs its own
//! [`bravia_core::Session`].
//!
//! ## Modes
//!
//! - **Serve** (default): bind the configured address and accept clients
//!   until Ctrl-C.
//! - **Gen-config**: print the default configuration TOML and exit.

pub mod config;
pub mod server;
