//! Error types for the monitor.

use sds011_protocol::ProtocolError;
use thiserror::Error;

/// Errors that can occur while running the monitor.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// I/O error on a sensor connection or config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port could not be opened.
    #[error("failed to open serial port {port}: {source}")]
    Serial {
        /// Port path.
        port: String,
        /// Underlying serial error.
        #[source]
        source: tokio_serial::Error,
    },

    /// Config file is not valid YAML for the expected schema.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Config parsed but is not usable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A command could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The channel task for a sensor is no longer running.
    #[error("channel for sensor '{0}' is closed")]
    ChannelClosed(String),

    /// Event could not be serialized for output.
    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// Result type alias for monitor operations.
pub type MonitorResult<T> = Result<T, MonitorError>;
