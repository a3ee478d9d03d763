//! ESP-IDF backend over `esp-idf-svc`'s MQTT client.
//!
//! `Esp32Adapter` wraps `EspMqttClient`. The vendor client runs its own
//! event task and delivers connection, disconnection, message, and error
//! events through a callback installed at construction time; the adapter
//! forwards them through the same de-duplicating dispatcher the other
//! backends use. Connection strings and PEM material are copied into
//! owned storage for the lifetime of the connection, mirroring what the
//! vendor requires of its borrowed configuration.
//!
//! The vendor connect is asynchronous: a successful call means the client
//! started, and the connect callback fires when the broker accepts the
//! session. A failed start reports the disconnect callback once, the same
//! contract the native backend keeps.

use std::ffi::CString;
use std::sync::{Arc, Mutex};

use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};
use esp_idf_svc::tls::X509;
use tracing::{debug, warn};

use crate::error::AdapterError;
use crate::events::{ConnectHandler, DisconnectHandler, EventDispatcher, MessageHandler};
use crate::options::ConnectOptions;
use crate::state::ConnectionState;
use crate::{MqttAdapter, Result};

/// PEM blobs kept alive for as long as the vendor client may read them.
struct CertBundle {
    ca: CString,
    cert: CString,
    key: CString,
}

struct ActiveClient {
    client: EspMqttClient<'static>,
    _certs: Option<Box<CertBundle>>,
}

/// MQTT adapter backed by the ESP-IDF MQTT client.
pub struct Esp32Adapter {
    dispatcher: Arc<EventDispatcher>,
    connection: Mutex<Option<ActiveClient>>,
}

impl Esp32Adapter {
    pub fn new() -> Self {
        Esp32Adapter {
            dispatcher: Arc::new(EventDispatcher::new()),
            connection: Mutex::new(None),
        }
    }

    /// Current connection state as observed through dispatched events.
    pub fn state(&self) -> ConnectionState {
        self.dispatcher.state()
    }

    fn load_certs(options: &ConnectOptions) -> Result<Option<Box<CertBundle>>> {
        let Some(tls) = options.tls.as_ref().filter(|tls| tls.is_enabled()) else {
            return Ok(None);
        };
        tls.check_consistency()?;
        if !tls.has_client_auth() {
            return Err(AdapterError::ClientSetup(
                "this backend requires the full certificate triple for TLS".into(),
            ));
        }
        let read_pem = |path: &str| -> Result<CString> {
            let bytes = std::fs::read(path)?;
            CString::new(bytes)
                .map_err(|_| AdapterError::ClientSetup(format!("NUL byte in PEM file {path}")))
        };
        let ca = read_pem(tls.ca_cert_path.as_deref().unwrap_or_default())?;
        let cert = read_pem(tls.client_cert_path.as_deref().unwrap_or_default())?;
        let key = read_pem(tls.client_key_path.as_deref().unwrap_or_default())?;
        Ok(Some(Box::new(CertBundle { ca, cert, key })))
    }
}

impl Default for Esp32Adapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MqttAdapter for Esp32Adapter {
    fn set_on_connect(&self, handler: Option<ConnectHandler>) {
        self.dispatcher.set_on_connect(handler);
    }

    fn set_on_disconnect(&self, handler: Option<DisconnectHandler>) {
        self.dispatcher.set_on_disconnect(handler);
    }

    fn set_on_message(&self, handler: Option<MessageHandler>) {
        self.dispatcher.set_on_message(handler);
    }

    async fn connect(&self, options: &ConnectOptions) -> Result<()> {
        let mut slot = self.connection.lock().expect("connection slot poisoned");
        if slot.is_some() {
            return Err(AdapterError::AlreadyConnected);
        }
        options.validate_config()?;

        let certs = Self::load_certs(options)?;
        let client_id = options.effective_client_id();
        let conf = MqttClientConfiguration {
            client_id: Some(&client_id),
            username: options.username.as_deref(),
            password: options.password.as_deref(),
            keep_alive_interval: Some(std::time::Duration::from_secs(options.keep_alive)),
            server_certificate: certs.as_ref().map(|c| X509::pem(c.ca.as_c_str())),
            client_certificate: certs.as_ref().map(|c| X509::pem(c.cert.as_c_str())),
            private_key: certs.as_ref().map(|c| X509::pem(c.key.as_c_str())),
            ..Default::default()
        };

        self.dispatcher.mark_connecting();
        debug!(url = %options.url, "starting vendor client");

        let dispatcher = Arc::clone(&self.dispatcher);
        let client = EspMqttClient::new_cb(&options.url, &conf, move |event| {
            forward_event(&dispatcher, event.payload());
        })
        .map_err(|e| {
            // Never started; the disconnect callback is the proxy.
            self.dispatcher.dispatch_disconnected();
            AdapterError::from(e)
        })?;

        *slot = Some(ActiveClient {
            client,
            _certs: certs,
        });
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let mut slot = self.connection.lock().expect("connection slot poisoned");
        // Dropping the vendor client stops its task and destroys the
        // handle.
        slot.take().ok_or(AdapterError::NotConnected)?;
        self.dispatcher.dispatch_disconnected();
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<()> {
        let mut slot = self.connection.lock().expect("connection slot poisoned");
        let conn = slot.as_mut().ok_or(AdapterError::NotConnected)?;
        conn.client.subscribe(topic, QoS::AtMostOnce)?;
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        let mut slot = self.connection.lock().expect("connection slot poisoned");
        let conn = slot.as_mut().ok_or(AdapterError::NotConnected)?;
        conn.client.publish(topic, QoS::AtMostOnce, false, payload)?;
        Ok(())
    }
}

/// Forwards one vendor event through the dispatcher.
fn forward_event(dispatcher: &EventDispatcher, payload: EventPayload<'_>) {
    match payload {
        EventPayload::Connected(_) => {
            dispatcher.dispatch_connected();
        }
        EventPayload::Disconnected => {
            dispatcher.dispatch_disconnected();
        }
        EventPayload::Received { topic, data, .. } => {
            // The vendor may deliver fragmented messages with no topic on
            // the continuation events; only whole messages are forwarded.
            if let Some(topic) = topic {
                dispatcher.dispatch_message(topic, data);
            } else {
                warn!(len = data.len(), "dropping message fragment without topic");
            }
        }
        EventPayload::Error(e) => {
            // No caller to return this to; surface it in the log.
            warn!("vendor client error: {e}");
        }
        other => debug!(?other, "vendor event"),
    }
}
