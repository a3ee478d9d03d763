//! Connection options for MQTT adapters.
//!
//! `ConnectOptions` carries everything a backend needs to open a broker
//! connection: the broker URL, optional credentials, optional TLS
//! certificate paths, and the protocol knobs the vendor clients expose.
//! Options can be built programmatically or loaded from a TOML file.
//!
//! # Examples
//!
//! ```ignore
//! use platform_mqtt::ConnectOptions;
//!
//! // Plain connection with credentials
//! let options = ConnectOptions::new("mqtt://broker.local:1883")
//!     .credentials("device-42", "hunter2");
//!
//! // Mutual TLS
//! let options = ConnectOptions::new("mqtts://broker.local")
//!     .with_tls("/etc/mqtt/ca.pem", "/etc/mqtt/client.crt", "/etc/mqtt/client.key");
//!
//! // From a TOML file
//! let options = ConnectOptions::load_from_file("mqtt.toml")?;
//! ```
//!
//! Example `mqtt.toml`:
//!
//! ```toml
//! url = "mqtts://broker.example.com"
//! username = "device-42"
//! password = "hunter2"
//! keep_alive = 20
//!
//! [tls]
//! ca_cert_path = "/etc/mqtt/ca.pem"
//! client_cert_path = "/etc/mqtt/client.crt"
//! client_key_path = "/etc/mqtt/client.key"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::AdapterError;

/// Default MQTT port for plain transports.
const DEFAULT_PLAIN_PORT: u16 = 1883;

/// Default MQTT port for TLS transports.
const DEFAULT_TLS_PORT: u16 = 8883;

/// Options for a single broker connection attempt.
///
/// Each successful `connect` consumes a snapshot of these options; a later
/// connect may use different ones. All fields except `url` have defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ConnectOptions {
    /// Broker URL. Accepts `mqtt://`, `tcp://`, `mqtts://`, `ssl://`
    /// schemes or a bare `host[:port]`. Required and non-empty.
    #[validate(length(min = 1, message = "Broker URL must not be empty"))]
    pub url: String,

    /// Username presented to the broker, if it requires authentication.
    pub username: Option<String>,

    /// Password presented to the broker. Ignored without a username.
    pub password: Option<String>,

    /// Client identifier. A fresh UUID is generated when left empty.
    #[validate(length(max = 36, message = "Client id must not exceed 36 characters"))]
    pub client_id: String,

    /// Keep-alive interval in seconds.
    #[validate(range(min = 1, max = 3600, message = "Keep-alive must be 1-3600 seconds"))]
    pub keep_alive: u64,

    /// How long a connect call waits for the broker to accept the session
    /// before giving up, in seconds.
    #[validate(range(min = 1, max = 600, message = "Connection timeout must be 1-600 seconds"))]
    pub connection_timeout: u64,

    /// Whether to ask the broker for a clean session.
    pub clean_session: bool,

    /// Capacity of the vendor client's request queue (native backend).
    #[validate(range(min = 1, message = "Request capacity must be at least 1"))]
    pub request_capacity: usize,

    /// TLS certificate material. Absent means a plain transport.
    #[validate(nested)]
    pub tls: Option<TlsOptions>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            url: String::new(),
            username: None,
            password: None,
            client_id: String::new(),
            keep_alive: 20,
            connection_timeout: 30,
            clean_session: true,
            request_capacity: 10,
            tls: None,
        }
    }
}

impl ConnectOptions {
    /// Creates options for the given broker URL with default knobs.
    pub fn new(url: impl Into<String>) -> Self {
        ConnectOptions {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Loads options from a TOML file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, AdapterError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Sets the broker credentials.
    pub fn credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the client identifier.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Enables mutual TLS with the full certificate triple.
    pub fn with_tls(
        mut self,
        ca_cert_path: impl Into<String>,
        client_cert_path: impl Into<String>,
        client_key_path: impl Into<String>,
    ) -> Self {
        self.tls = Some(TlsOptions::new(
            ca_cert_path,
            client_cert_path,
            client_key_path,
        ));
        self
    }

    /// Enables TLS with server verification only, no client certificate.
    pub fn with_tls_ca_only(mut self, ca_cert_path: impl Into<String>) -> Self {
        self.tls = Some(TlsOptions::with_ca_only(ca_cert_path));
        self
    }

    /// Validates the options as a whole: declared field constraints plus
    /// the TLS triple consistency rule.
    pub fn validate_config(&self) -> Result<(), AdapterError> {
        self.validate()?;
        if let Some(tls) = &self.tls {
            tls.check_consistency()?;
        }
        Ok(())
    }

    /// Resolves the effective client id, generating one when unset.
    pub fn effective_client_id(&self) -> String {
        if self.client_id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            self.client_id.clone()
        }
    }

    /// Parses the broker URL into host, port, and scheme security.
    pub fn broker_address(&self) -> Result<BrokerAddress, AdapterError> {
        parse_broker_url(&self.url)
    }

    /// Whether the options request a TLS transport.
    pub fn wants_tls(&self) -> bool {
        self.tls.as_ref().is_some_and(TlsOptions::is_enabled)
    }
}

/// Paths to the PEM certificate material for a TLS transport.
///
/// The CA certificate is required whenever TLS is in play. The client
/// certificate and key are optional but come as a pair: either both are
/// present (mutual TLS) or both absent (server verification only). Mixed
/// presence is a setup error, never silently accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TlsOptions {
    /// PEM file with the CA certificate used to verify the broker.
    pub ca_cert_path: Option<String>,

    /// PEM file with the client certificate, for mutual TLS.
    pub client_cert_path: Option<String>,

    /// PEM file with the client private key, for mutual TLS.
    pub client_key_path: Option<String>,
}

impl TlsOptions {
    /// Full certificate triple for mutual TLS.
    pub fn new(
        ca_cert_path: impl Into<String>,
        client_cert_path: impl Into<String>,
        client_key_path: impl Into<String>,
    ) -> Self {
        TlsOptions {
            ca_cert_path: Some(ca_cert_path.into()),
            client_cert_path: Some(client_cert_path.into()),
            client_key_path: Some(client_key_path.into()),
        }
    }

    /// CA certificate only, no client authentication.
    pub fn with_ca_only(ca_cert_path: impl Into<String>) -> Self {
        TlsOptions {
            ca_cert_path: Some(ca_cert_path.into()),
            client_cert_path: None,
            client_key_path: None,
        }
    }

    /// Whether any certificate material is configured at all.
    pub fn is_enabled(&self) -> bool {
        self.ca_cert_path.is_some()
            || self.client_cert_path.is_some()
            || self.client_key_path.is_some()
    }

    /// Whether a client certificate/key pair is configured.
    pub fn has_client_auth(&self) -> bool {
        self.client_cert_path.is_some() && self.client_key_path.is_some()
    }

    /// Enforces the triple rule: a CA certificate whenever TLS is enabled,
    /// and the client certificate and key either both present or both
    /// absent.
    pub fn check_consistency(&self) -> Result<(), AdapterError> {
        if !self.is_enabled() {
            return Ok(());
        }
        if self.ca_cert_path.is_none() {
            return Err(AdapterError::ClientSetup(
                "TLS requires a CA certificate".into(),
            ));
        }
        match (&self.client_cert_path, &self.client_key_path) {
            (Some(_), None) => Err(AdapterError::ClientSetup(
                "client certificate provided without its key".into(),
            )),
            (None, Some(_)) => Err(AdapterError::ClientSetup(
                "client key provided without its certificate".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// A broker endpoint resolved from a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    /// Hostname or IP address, without scheme or port.
    pub host: String,
    /// TCP port. Defaults to 1883, or 8883 for a secure scheme.
    pub port: u16,
    /// Whether the URL scheme itself asks for TLS (`mqtts://`, `ssl://`).
    pub secure_scheme: bool,
}

/// Splits a broker URL into its endpoint parts.
///
/// The vendor clients want host and port separately; the adapter contract
/// passes a single URL. Accepted forms: `scheme://host[:port]` with one of
/// the four known schemes, or a bare `host[:port]`.
pub fn parse_broker_url(url: &str) -> Result<BrokerAddress, AdapterError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(AdapterError::ClientSetup("broker URL must not be empty".into()));
    }

    let (secure_scheme, rest) = match url.split_once("://") {
        Some(("mqtt", rest)) | Some(("tcp", rest)) => (false, rest),
        Some(("mqtts", rest)) | Some(("ssl", rest)) => (true, rest),
        Some((scheme, _)) => {
            return Err(AdapterError::ClientSetup(format!(
                "unsupported broker URL scheme '{scheme}'"
            )));
        }
        None => (false, url),
    };

    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse::<u16>().map_err(|_| {
                AdapterError::ClientSetup(format!("invalid broker port '{port}'"))
            })?;
            (host, port)
        }
        None => {
            let port = if secure_scheme {
                DEFAULT_TLS_PORT
            } else {
                DEFAULT_PLAIN_PORT
            };
            (rest, port)
        }
    };

    if host.is_empty() {
        return Err(AdapterError::ClientSetup(
            "broker URL is missing a host".into(),
        ));
    }

    Ok(BrokerAddress {
        host: host.to_string(),
        port,
        secure_scheme,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_url_with_port() {
        let addr = parse_broker_url("mqtt://broker.local:1884").unwrap();
        assert_eq!(addr.host, "broker.local");
        assert_eq!(addr.port, 1884);
        assert!(!addr.secure_scheme);
    }

    #[test]
    fn test_parse_defaults_plain_port() {
        let addr = parse_broker_url("tcp://broker.local").unwrap();
        assert_eq!(addr.port, 1883);
    }

    #[test]
    fn test_parse_secure_scheme_defaults_tls_port() {
        let addr = parse_broker_url("mqtts://broker.local").unwrap();
        assert_eq!(addr.port, 8883);
        assert!(addr.secure_scheme);

        let addr = parse_broker_url("ssl://broker.local:9883").unwrap();
        assert_eq!(addr.port, 9883);
    }

    #[test]
    fn test_parse_bare_host() {
        let addr = parse_broker_url("localhost").unwrap();
        assert_eq!(addr.host, "localhost");
        assert_eq!(addr.port, 1883);
    }

    #[test]
    fn test_parse_rejects_empty_and_unknown() {
        assert!(parse_broker_url("").is_err());
        assert!(parse_broker_url("   ").is_err());
        assert!(parse_broker_url("ws://broker.local").is_err());
        assert!(parse_broker_url("mqtt://").is_err());
        assert!(parse_broker_url("mqtt://broker.local:notaport").is_err());
    }

    #[test]
    fn test_validate_rejects_empty_url() {
        let options = ConnectOptions::default();
        assert!(options.validate_config().is_err());

        let options = ConnectOptions::new("mqtt://broker.local");
        assert!(options.validate_config().is_ok());
    }

    #[test]
    fn test_tls_triple_consistency() {
        // Full triple and CA-only are both fine.
        let full = TlsOptions::new("ca.pem", "client.crt", "client.key");
        assert!(full.check_consistency().is_ok());
        assert!(full.has_client_auth());

        let ca_only = TlsOptions::with_ca_only("ca.pem");
        assert!(ca_only.check_consistency().is_ok());
        assert!(!ca_only.has_client_auth());

        // Mixed presence is a setup error, not undefined behavior.
        let cert_without_key = TlsOptions {
            ca_cert_path: Some("ca.pem".into()),
            client_cert_path: Some("client.crt".into()),
            client_key_path: None,
        };
        assert!(matches!(
            cert_without_key.check_consistency(),
            Err(AdapterError::ClientSetup(_))
        ));

        let key_without_cert = TlsOptions {
            ca_cert_path: Some("ca.pem".into()),
            client_cert_path: None,
            client_key_path: Some("client.key".into()),
        };
        assert!(key_without_cert.check_consistency().is_err());

        let client_auth_without_ca = TlsOptions {
            ca_cert_path: None,
            client_cert_path: Some("client.crt".into()),
            client_key_path: Some("client.key".into()),
        };
        assert!(client_auth_without_ca.check_consistency().is_err());
    }

    #[test]
    fn test_effective_client_id() {
        let options = ConnectOptions::new("mqtt://broker.local").client_id("device-42");
        assert_eq!(options.effective_client_id(), "device-42");

        let options = ConnectOptions::new("mqtt://broker.local");
        let generated = options.effective_client_id();
        assert!(!generated.is_empty());
        // A second call generates a fresh id; the options stay untouched.
        assert!(options.client_id.is_empty());
        assert_ne!(generated, options.effective_client_id());
    }

    #[test]
    fn test_from_toml() {
        let text = r#"
            url = "mqtts://broker.example.com"
            username = "device-42"
            password = "hunter2"
            keep_alive = 45

            [tls]
            ca_cert_path = "/etc/mqtt/ca.pem"
        "#;
        let options: ConnectOptions = toml::from_str(text).unwrap();
        assert_eq!(options.url, "mqtts://broker.example.com");
        assert_eq!(options.username.as_deref(), Some("device-42"));
        assert_eq!(options.keep_alive, 45);
        assert!(options.wants_tls());
        assert!(options.validate_config().is_ok());
    }

    #[test]
    fn test_toml_defaults() {
        let options: ConnectOptions = toml::from_str(r#"url = "mqtt://h""#).unwrap();
        assert_eq!(options.keep_alive, 20);
        assert_eq!(options.connection_timeout, 30);
        assert!(options.clean_session);
        assert!(options.tls.is_none());
    }
}
