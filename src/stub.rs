//! No-op backend.
//!
//! `StubAdapter` satisfies the adapter contract without talking to any
//! broker: handler registrations are stored (so replacement semantics can
//! be observed) but never invoked, and every operation succeeds for every
//! argument combination. Builds without a real transport link against
//! this backend, and tests use it as a null object.

use crate::events::{ConnectHandler, DisconnectHandler, EventDispatcher, MessageHandler};
use crate::options::ConnectOptions;
use crate::state::ConnectionState;
use crate::{MqttAdapter, Result};

/// MQTT adapter that accepts everything and does nothing.
#[derive(Default)]
pub struct StubAdapter {
    dispatcher: EventDispatcher,
}

impl StubAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always `Disconnected`; the stub never dispatches an event.
    pub fn state(&self) -> ConnectionState {
        self.dispatcher.state()
    }
}

impl MqttAdapter for StubAdapter {
    fn set_on_connect(&self, handler: Option<ConnectHandler>) {
        self.dispatcher.set_on_connect(handler);
    }

    fn set_on_disconnect(&self, handler: Option<DisconnectHandler>) {
        self.dispatcher.set_on_disconnect(handler);
    }

    fn set_on_message(&self, handler: Option<MessageHandler>) {
        self.dispatcher.set_on_message(handler);
    }

    async fn connect(&self, _options: &ConnectOptions) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    async fn subscribe(&self, _topic: &str) -> Result<()> {
        Ok(())
    }

    async fn publish(&self, _topic: &str, _payload: &[u8]) -> Result<()> {
        Ok(())
    }
}
