//! Callback registration and event dispatch.
//!
//! This is the one piece of logic every backend shares: three optional
//! handler slots, and the rule for when a vendor event actually reaches
//! the registered handler.
//!
//! # Delivery model
//!
//! Backends feed the dispatcher from two directions: synchronously from
//! the result of a connect/disconnect call, and asynchronously from the
//! vendor client's own thread or task when it reports a connection event.
//! Both directions funnel through the same state transition guard, so when
//! both fire for the same transition (a requested disconnect followed by
//! the vendor's connection-lost notification, for example) the handler
//! runs exactly once.
//!
//! Handler slots are guarded by a mutex and the handler is cloned out of
//! the slot before invocation, so setters may race with vendor-thread
//! dispatch safely, and a handler may re-register handlers without
//! deadlocking.

use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use crate::state::ConnectionState;

/// Handler invoked when the broker accepts the session.
pub type ConnectHandler = Arc<dyn Fn() + Send + Sync>;

/// Handler invoked when the connection ends, whether requested or lost.
pub type DisconnectHandler = Arc<dyn Fn() + Send + Sync>;

/// Handler invoked for every inbound message, with the topic and the raw
/// payload bytes. The payload is length-delimited, never NUL-terminated,
/// and carries no text encoding guarantee.
pub type MessageHandler = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

#[derive(Default)]
struct Slots {
    on_connect: Option<ConnectHandler>,
    on_disconnect: Option<DisconnectHandler>,
    on_message: Option<MessageHandler>,
    state: ConnectionState,
}

/// Per-adapter callback slots plus the connection state machine.
///
/// One dispatcher exists per adapter instance. Each slot is independent,
/// last writer wins, and `None` disables the slot. An empty slot makes the
/// corresponding event a no-op; it never makes it an error.
#[derive(Default)]
pub struct EventDispatcher {
    slots: Mutex<Slots>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the connect handler, replacing any previous registration.
    pub fn set_on_connect(&self, handler: Option<ConnectHandler>) {
        self.slots.lock().expect("slots poisoned").on_connect = handler;
    }

    /// Registers the disconnect handler, replacing any previous registration.
    pub fn set_on_disconnect(&self, handler: Option<DisconnectHandler>) {
        self.slots.lock().expect("slots poisoned").on_disconnect = handler;
    }

    /// Registers the message handler, replacing any previous registration.
    pub fn set_on_message(&self, handler: Option<MessageHandler>) {
        self.slots.lock().expect("slots poisoned").on_message = handler;
    }

    /// Current connection state as tracked by dispatched events.
    pub fn state(&self) -> ConnectionState {
        self.slots.lock().expect("slots poisoned").state
    }

    /// Marks the start of a connection attempt. No handler fires; the
    /// transition only arms the disconnect handler for a failed handshake.
    pub fn mark_connecting(&self) {
        let mut slots = self.slots.lock().expect("slots poisoned");
        trace!(from = %slots.state, "connection attempt started");
        slots.state = ConnectionState::Connecting;
    }

    /// Reports that the broker accepted the session. Fires the connect
    /// handler if this is an actual transition into `Connected`; returns
    /// whether it was.
    pub fn dispatch_connected(&self) -> bool {
        let handler = {
            let mut slots = self.slots.lock().expect("slots poisoned");
            if slots.state == ConnectionState::Connected {
                trace!("duplicate connected event suppressed");
                return false;
            }
            slots.state = ConnectionState::Connected;
            slots.on_connect.clone()
        };
        debug!("connected");
        if let Some(handler) = handler {
            handler();
        }
        true
    }

    /// Reports that the connection ended, whether by request, by a failed
    /// handshake, or by an asynchronous loss notification. Fires the
    /// disconnect handler if this is an actual transition out of
    /// `Connecting`/`Connected`; returns whether it was.
    pub fn dispatch_disconnected(&self) -> bool {
        let handler = {
            let mut slots = self.slots.lock().expect("slots poisoned");
            if slots.state == ConnectionState::Disconnected {
                trace!("duplicate disconnected event suppressed");
                return false;
            }
            slots.state = ConnectionState::Disconnected;
            slots.on_disconnect.clone()
        };
        debug!("disconnected");
        if let Some(handler) = handler {
            handler();
        }
        true
    }

    /// Forwards an inbound message to the registered handler, verbatim.
    ///
    /// The payload may contain embedded NUL bytes; its length is the slice
    /// length and nothing else.
    pub fn dispatch_message(&self, topic: &str, payload: &[u8]) {
        let handler = self
            .slots
            .lock()
            .expect("slots poisoned")
            .on_message
            .clone();
        trace!(topic, len = payload.len(), "message received");
        if let Some(handler) = handler {
            handler(topic, payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_handler(counter: &Arc<AtomicUsize>) -> ConnectHandler {
        let counter = Arc::clone(counter);
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_message_forwarded_verbatim() {
        let dispatcher = EventDispatcher::new();
        let seen: Arc<Mutex<Vec<(String, Vec<u8>)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        dispatcher.set_on_message(Some(Arc::new(move |topic: &str, payload: &[u8]| {
            sink.lock().unwrap().push((topic.to_string(), payload.to_vec()));
        })));

        // Payload with embedded NULs; length comes from the slice, not a
        // terminator.
        let payload = [0x01u8, 0x00, 0x02, 0x00, 0x03];
        dispatcher.dispatch_message("sensors/temp", &payload);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "sensors/temp");
        assert_eq!(seen[0].1, payload);
    }

    #[test]
    fn test_message_payload_is_length_delimited() {
        let dispatcher = EventDispatcher::new();
        let seen: Arc<Mutex<Vec<Vec<u8>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        dispatcher.set_on_message(Some(Arc::new(move |_topic: &str, payload: &[u8]| {
            sink.lock().unwrap().push(payload.to_vec());
        })));

        // A shorter slice of a larger buffer transmits only the slice.
        let buffer = [0xAAu8; 16];
        dispatcher.dispatch_message("t", &buffer[..5]);

        assert_eq!(seen.lock().unwrap()[0], vec![0xAA; 5]);
    }

    #[test]
    fn test_last_registered_handler_wins() {
        let dispatcher = EventDispatcher::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        dispatcher.set_on_connect(Some(counting_handler(&first)));
        dispatcher.set_on_connect(Some(counting_handler(&second)));
        dispatcher.dispatch_connected();

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unset_handler_is_a_noop() {
        let dispatcher = EventDispatcher::new();
        // No handlers registered at all: every event is accepted silently.
        assert!(dispatcher.dispatch_connected());
        dispatcher.dispatch_message("topic", b"payload");
        assert!(dispatcher.dispatch_disconnected());
    }

    #[test]
    fn test_none_clears_a_registration() {
        let dispatcher = EventDispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));
        dispatcher.set_on_connect(Some(counting_handler(&count)));
        dispatcher.set_on_connect(None);

        dispatcher.dispatch_connected();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_disconnect_fires_exactly_once_per_transition() {
        let dispatcher = EventDispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));
        dispatcher.set_on_disconnect(Some(counting_handler(&count)));

        dispatcher.mark_connecting();
        dispatcher.dispatch_connected();

        // Requested disconnect and the vendor loss notification both land;
        // only the first transition reaches the handler.
        assert!(dispatcher.dispatch_disconnected());
        assert!(!dispatcher.dispatch_disconnected());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_connect_failure_fires_disconnect_once() {
        let dispatcher = EventDispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));
        dispatcher.set_on_disconnect(Some(counting_handler(&count)));

        // A failed handshake goes Connecting -> Disconnected without ever
        // reaching Connected.
        dispatcher.mark_connecting();
        assert!(dispatcher.dispatch_disconnected());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_disconnect_before_any_connect_is_suppressed() {
        let dispatcher = EventDispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));
        dispatcher.set_on_disconnect(Some(counting_handler(&count)));

        assert!(!dispatcher.dispatch_disconnected());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_duplicate_connected_suppressed() {
        let dispatcher = EventDispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));
        dispatcher.set_on_connect(Some(counting_handler(&count)));

        dispatcher.mark_connecting();
        assert!(dispatcher.dispatch_connected());
        // The synthesized result and the vendor CONNACK event may both
        // arrive; the second is a duplicate.
        assert!(!dispatcher.dispatch_connected());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_may_reregister_without_deadlock() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let inner = Arc::clone(&dispatcher);
        dispatcher.set_on_connect(Some(Arc::new(move || {
            inner.set_on_message(None);
        })));
        assert!(dispatcher.dispatch_connected());
    }

    #[test]
    fn test_state_follows_transitions() {
        let dispatcher = EventDispatcher::new();
        assert_eq!(dispatcher.state(), ConnectionState::Disconnected);
        dispatcher.mark_connecting();
        assert_eq!(dispatcher.state(), ConnectionState::Connecting);
        dispatcher.dispatch_connected();
        assert_eq!(dispatcher.state(), ConnectionState::Connected);
        dispatcher.dispatch_disconnected();
        assert_eq!(dispatcher.state(), ConnectionState::Disconnected);
    }
}
