//! Configuration for the emulator.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use bravia_core::SessionConfig;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Where the device state lives.
    pub storage: StorageConfig,
    /// Per-connection behaviour.
    pub session: SessionSettings,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to bind the control listener on.
    pub host: String,
    /// TCP port for control connections.
    pub port: u16,
}

/// State file configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding the five attributes.
    pub state_file: PathBuf,
}

/// Session tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Delay between receive iterations in milliseconds.
    pub pacing_ms: u64,
    /// Close a silent connection after this many seconds (0 = never).
    pub idle_timeout_secs: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 51234,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("sony_stats.json"),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            pacing_ms: 100,
            idle_timeout_secs: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl EmulatorConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// The default configuration as TOML text.
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&Self::default())
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = Self::default_toml().map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// `host:port` string for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.network.host, self.network.port)
    }

    /// Convert session settings into a [`SessionConfig`].
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            pacing: Duration::from_millis(self.session.pacing_ms),
            idle_timeout: match self.session.idle_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
