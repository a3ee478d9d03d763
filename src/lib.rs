//! # platform-mqtt: one MQTT client surface, three backends
//!
//! A platform-abstraction layer exposing a uniform MQTT client contract
//! so application code compiles unchanged against any of three backends:
//!
//! - **native** (`NativeAdapter`, feature `native`, default): desktop and
//!   server targets, built on `rumqttc`
//! - **esp32** (`Esp32Adapter`, feature `esp32`, espidf targets only):
//!   built on the ESP-IDF MQTT client via `esp-idf-svc`
//! - **stub** (`StubAdapter`, always available): accepts every call, does
//!   nothing
//!
//! The contract is deliberately small: three callback registrations and
//! four connection operations, all QoS 0. Protocol framing, TLS
//! handshakes, keep-alive, and persistence belong to the vendor clients;
//! this layer owns only the translation between the vendor's event shape
//! and the application's callbacks, and it owns that translation
//! completely: every backend delivers callbacks through the same
//! de-duplicating dispatcher, and every operation returns a typed result
//! instead of swallowing vendor return codes.
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use platform_mqtt::{ConnectOptions, MqttAdapter, NativeAdapter};
//!
//! #[tokio::main]
//! async fn main() -> platform_mqtt::Result<()> {
//!     let adapter = NativeAdapter::new();
//!
//!     adapter.set_on_connect(Some(Arc::new(|| println!("online"))));
//!     adapter.set_on_disconnect(Some(Arc::new(|| println!("offline"))));
//!     adapter.set_on_message(Some(Arc::new(|topic: &str, payload: &[u8]| {
//!         println!("{topic}: {} bytes", payload.len());
//!     })));
//!
//!     let options = ConnectOptions::new("mqtt://broker.local")
//!         .credentials("device-42", "hunter2");
//!     adapter.connect(&options).await?;
//!     adapter.subscribe("devices/42/cmd").await?;
//!     adapter.publish("devices/42/state", b"ready").await?;
//!     adapter.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Callback delivery
//!
//! Backends report lifecycle events from two directions: synthesized from
//! the result of a connect or disconnect call, and forwarded from the
//! vendor's asynchronous notifications. Both funnel through one
//! state-transition guard per adapter, so when both directions observe
//! the same transition the handler fires exactly once. Message payloads
//! are passed through verbatim as `&[u8]`: length-delimited, possibly
//! containing NUL bytes, with no encoding guarantee.
//!
//! Handlers run on whatever thread or task the event arrives on. Keep
//! them short; hand heavy work to a channel.

pub mod error;
pub mod events;
pub mod options;
pub mod state;

pub mod stub;

#[cfg(feature = "native")]
pub mod native;

#[cfg(all(feature = "esp32", target_os = "espidf"))]
pub mod esp32;

pub use error::AdapterError;
pub use events::{ConnectHandler, DisconnectHandler, EventDispatcher, MessageHandler};
pub use options::{BrokerAddress, ConnectOptions, TlsOptions};
pub use state::ConnectionState;
pub use stub::StubAdapter;

#[cfg(feature = "native")]
pub use native::NativeAdapter;

#[cfg(all(feature = "esp32", target_os = "espidf"))]
pub use esp32::Esp32Adapter;

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;

/// The uniform MQTT client contract every backend implements.
///
/// Applications hold one adapter instance per broker connection slot
/// (each backend supports exactly one active connection at a time) and
/// use it through this trait so the backend can be swapped per target
/// without code changes.
#[allow(async_fn_in_trait)]
pub trait MqttAdapter {
    /// Registers the handler fired when the broker accepts the session.
    /// Replaces any previous registration; `None` disables it.
    fn set_on_connect(&self, handler: Option<ConnectHandler>);

    /// Registers the handler fired when the connection ends, whether by
    /// request, by a failed connect, or by an asynchronous loss.
    /// Replaces any previous registration; `None` disables it.
    fn set_on_disconnect(&self, handler: Option<DisconnectHandler>);

    /// Registers the handler fired for each inbound message with the
    /// topic and raw payload. Replaces any previous registration; `None`
    /// disables it.
    fn set_on_message(&self, handler: Option<MessageHandler>);

    /// Opens a connection to the broker described by `options`.
    ///
    /// Fails with `AlreadyConnected` while a connection is active, with a
    /// setup error for invalid options, and with a transport error or
    /// `ConnectTimeout` when the broker cannot be reached. The connect
    /// callback fires on success; a failed attempt fires the disconnect
    /// callback once.
    async fn connect(&self, options: &ConnectOptions) -> Result<()>;

    /// Closes the active connection and releases the vendor handle.
    ///
    /// Fails with `NotConnected` when no connection exists. The
    /// disconnect callback fires exactly once per connection, whether
    /// the teardown was requested or the link was already lost.
    async fn disconnect(&self) -> Result<()>;

    /// Subscribes the active connection to `topic` at QoS 0.
    async fn subscribe(&self, topic: &str) -> Result<()>;

    /// Publishes `payload` to `topic` at QoS 0, non-retained.
    ///
    /// The payload is sent exactly as sliced; embedded NUL bytes are
    /// preserved.
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()>;
}
