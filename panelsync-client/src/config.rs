//! Connection configuration
//!
//! Transport addressing (host/port/TLS flag) is a configuration input to
//! connection construction, not part of the protocol itself.

use std::path::Path;
use std::time::Duration;

use panelsync_utils::{paths, PanelsyncError, Result};
use serde::Deserialize;

/// Addressing and timing for a connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    /// Honored by TLS-capable transports; the bundled TCP transport is
    /// plaintext.
    pub tls: bool,
    /// Session/gui instance id carried in every task envelope.
    pub session_id: i64,
    /// Fixed reconnection delay. Deliberately not exponential backoff: for a
    /// LAN control panel, low reconnect latency beats politeness.
    pub reconnect_delay_ms: u64,
    /// Upper bound on a single connection attempt.
    pub connect_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 2255,
            tls: false,
            session_id: 0,
            reconnect_delay_ms: 1000,
            connect_timeout_ms: 3000,
        }
    }
}

impl ConnectionConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            PanelsyncError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            PanelsyncError::config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Load from the default XDG config file
    /// (`~/.config/panelsync/config.toml`).
    pub fn load_default() -> Result<Self> {
        Self::load(&paths::config_file())
    }
}
