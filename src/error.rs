//! Error handling for adapter operations.
//!
//! This module defines `AdapterError`, the unified error type returned by
//! every operation on every backend. Vendor return codes are never
//! discarded, not even for disconnect, subscribe, and publish; each
//! operation reports a typed result, so callers can distinguish setup
//! mistakes from transport failures from misuse of the lifecycle.
//!
//! # Error categories
//!
//! **Setup errors** (fix configuration and retry):
//! - `ClientSetup`: malformed broker URL, broken TLS certificate triple
//! - `Config`: validation failures on `ConnectOptions`
//! - `ConfigParse`: unreadable TOML
//! - `Io`: certificate or key file could not be read
//!
//! **Lifecycle errors** (caller used the adapter out of order):
//! - `NotConnected`: disconnect/subscribe/publish before a successful connect
//! - `AlreadyConnected`: connect while a connection is active
//!
//! **Transport errors** (the vendor client failed):
//! - `ConnectTimeout`: broker did not accept the session in time
//! - `ClientTransfer` / `ClientConnection`: vendor-reported failures

use thiserror::Error;

/// The unified error type for MQTT adapter operations.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Adapter could not be configured for a connection attempt.
    ///
    /// Covers malformed broker URLs, unknown URL schemes, a client
    /// certificate without its key (or the reverse), and TLS enabled
    /// without a CA certificate.
    #[error("Client setup error: {0}")]
    ClientSetup(String),

    /// `ConnectOptions` failed its declared validation constraints.
    #[error("Configuration error: {0}")]
    Config(#[from] validator::ValidationErrors),

    /// Configuration file was present but not valid TOML for
    /// `ConnectOptions`.
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Operation requires an active connection and none exists.
    ///
    /// Calling into a vendor client without a handle is undefined; the
    /// adapter guards the handle and reports this instead.
    #[error("No active broker connection")]
    NotConnected,

    /// A connection is already active; disconnect before reconnecting.
    #[error("A broker connection is already active")]
    AlreadyConnected,

    /// The broker did not accept the session within the configured window.
    #[error("Connection attempt timed out after {0} seconds")]
    ConnectTimeout(u64),

    /// File I/O failed, typically while loading TLS certificate material.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The vendor client refused to accept a subscribe, publish, or
    /// disconnect request.
    #[cfg(feature = "native")]
    #[error("Client transfer error: {0}")]
    ClientTransfer(#[from] rumqttc::ClientError),

    /// The vendor connection failed or was lost.
    ///
    /// Boxed to keep the enum small; `rumqttc::ConnectionError` is large.
    #[cfg(feature = "native")]
    #[error("Client connection error: {0}")]
    ClientConnection(#[from] Box<rumqttc::ConnectionError>),

    /// The ESP-IDF client reported a failure.
    #[cfg(all(feature = "esp32", target_os = "espidf"))]
    #[error("Vendor client error: {0}")]
    Esp(#[from] esp_idf_svc::sys::EspError),
}

#[cfg(feature = "native")]
impl From<rumqttc::ConnectionError> for AdapterError {
    fn from(err: rumqttc::ConnectionError) -> Self {
        AdapterError::ClientConnection(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_setup_display() {
        let err = AdapterError::ClientSetup("empty broker URL".into());
        assert_eq!(err.to_string(), "Client setup error: empty broker URL");
    }

    #[test]
    fn test_lifecycle_errors_display() {
        assert_eq!(
            AdapterError::NotConnected.to_string(),
            "No active broker connection"
        );
        assert_eq!(
            AdapterError::AlreadyConnected.to_string(),
            "A broker connection is already active"
        );
    }

    #[test]
    fn test_connect_timeout_display() {
        let err = AdapterError::ConnectTimeout(30);
        assert_eq!(
            err.to_string(),
            "Connection attempt timed out after 30 seconds"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "ca.pem not found");
        let err: AdapterError = io_err.into();
        assert!(err.to_string().contains("ca.pem not found"));
    }

    #[test]
    fn test_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(AdapterError::NotConnected);
        assert_eq!(err.to_string(), "No active broker connection");
    }
}
