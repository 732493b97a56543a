//! Error types for panelsync
//!
//! Provides a unified error type used across the panelsync crates.

use std::path::PathBuf;

/// Main error type for panelsync operations
#[derive(Debug, thiserror::Error)]
pub enum PanelsyncError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Connection Errors ===

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Connection attempt timed out after {millis}ms")]
    ConnectTimeout { millis: u64 },

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Not connected")]
    NotConnected,

    // === Protocol Errors ===

    #[error("Protocol error: {0}")]
    Protocol(String),

    // === Registry Errors ===

    #[error("Duplicate widget id: {id}")]
    DuplicateWidgetId { id: u32 },

    #[error("Widget not found: {id}")]
    WidgetNotFound { id: u32 },

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PanelsyncError {
    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::ConnectTimeout { .. } | Self::ConnectionClosed
        )
    }
}

/// Result type alias using PanelsyncError
pub type Result<T> = std::result::Result<T, PanelsyncError>;
