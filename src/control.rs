//! Inbound control messages.
//!
//! Bus clients may deliver messages on their own thread, so they only ever
//! push into a [`ControlSender`]. The render loop owns the matching
//! [`ControlInbox`] and drains it once per cycle, which keeps the override
//! state single-writer without a lock.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crate::overrides::PayloadError;

/// Largest payload accepted as text; anything longer is queued as rejected.
pub const MAX_PAYLOAD_LEN: usize = 64;

/// A message received on one of the control topics.
///
/// Payloads that could not be read as text are still queued, carrying the
/// reason, so the handler for the topic decides what a bad payload means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlMessage {
    pub topic: String,
    pub payload: Result<String, PayloadError>,
}

impl ControlMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: Ok(payload.into()),
        }
    }

    pub fn rejected(topic: impl Into<String>, err: PayloadError) -> Self {
        Self {
            topic: topic.into(),
            payload: Err(err),
        }
    }

    /// Decode a raw bus payload.
    pub fn from_bytes(topic: impl Into<String>, payload: &[u8]) -> Self {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Self::rejected(topic, PayloadError::TooLong(payload.len()));
        }
        match core::str::from_utf8(payload) {
            Ok(text) => Self::new(topic, text),
            Err(_) => Self::rejected(topic, PayloadError::NotUtf8),
        }
    }
}

/// Which handler a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Color,
    Brightness,
    Ignored,
}

/// The two topic names the clock listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlTopics {
    pub color: String,
    pub brightness: String,
}

impl ControlTopics {
    /// Route by exact topic match.
    pub fn route(&self, topic: &str) -> Route {
        if topic == self.color {
            Route::Color
        } else if topic == self.brightness {
            Route::Brightness
        } else {
            Route::Ignored
        }
    }

    /// Topics to subscribe to.
    pub fn all(&self) -> [&str; 2] {
        [self.color.as_str(), self.brightness.as_str()]
    }
}

/// Create a connected sender/inbox pair.
pub fn control_channel() -> (ControlSender, ControlInbox) {
    let (tx, rx) = mpsc::channel();
    (ControlSender { tx }, ControlInbox { rx })
}

/// Producer side, handed to the bus client.
#[derive(Debug, Clone)]
pub struct ControlSender {
    tx: Sender<ControlMessage>,
}

impl ControlSender {
    /// Queue a raw bus message.
    ///
    /// Returns `false` only if the inbox is gone.
    pub fn deliver(&self, topic: &str, payload: &[u8]) -> bool {
        self.send(ControlMessage::from_bytes(topic, payload))
    }

    /// Queue a message whose payload could not be received whole.
    pub fn reject(&self, topic: &str, err: PayloadError) -> bool {
        log::warn!("unreadable payload on topic {topic}: {err}");
        self.send(ControlMessage::rejected(topic, err))
    }

    fn send(&self, message: ControlMessage) -> bool {
        self.tx.send(message).is_ok()
    }
}

/// Consumer side, owned by the render loop.
#[derive(Debug)]
pub struct ControlInbox {
    rx: Receiver<ControlMessage>,
}

impl ControlInbox {
    /// Take every message queued so far without blocking.
    pub fn drain(&mut self) -> Vec<ControlMessage> {
        let mut messages = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(message) => messages.push(message),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn topics() -> ControlTopics {
        ControlTopics {
            color: "clock/color".into(),
            brightness: "clock/brightness".into(),
        }
    }

    #[test_case("clock/color", Route::Color; "color")]
    #[test_case("clock/brightness", Route::Brightness; "brightness")]
    #[test_case("clock/colour", Route::Ignored; "near miss")]
    #[test_case("clock/color/", Route::Ignored; "trailing slash")]
    #[test_case("", Route::Ignored; "empty")]
    fn route_by_exact_topic(topic: &str, expected: Route) {
        assert_eq!(topics().route(topic), expected);
    }

    #[test]
    fn drain_returns_messages_in_order() {
        let (tx, mut inbox) = control_channel();
        assert!(tx.deliver("a", b"1"));
        assert!(tx.clone().deliver("b", b"2"));

        let messages = inbox.drain();
        assert_eq!(
            messages,
            vec![ControlMessage::new("a", "1"), ControlMessage::new("b", "2")]
        );
        assert!(inbox.drain().is_empty(), "inbox should be empty after drain");
    }

    #[test]
    fn oversized_payload_is_queued_as_rejected() {
        let (tx, mut inbox) = control_channel();
        let payload = [b'1'; MAX_PAYLOAD_LEN + 1];

        assert!(tx.deliver("clock/color", &payload));
        assert_eq!(
            inbox.drain(),
            vec![ControlMessage::rejected(
                "clock/color",
                PayloadError::TooLong(MAX_PAYLOAD_LEN + 1)
            )]
        );
    }

    #[test]
    fn payload_at_limit_is_text() {
        let payload = "7".repeat(MAX_PAYLOAD_LEN);
        let message = ControlMessage::from_bytes("clock/brightness", payload.as_bytes());
        assert_eq!(message.payload, Ok(payload));
    }

    #[test]
    fn non_utf8_payload_is_queued_as_rejected() {
        let (tx, mut inbox) = control_channel();

        assert!(tx.deliver("clock/color", &[0xff, 0xfe]));
        assert_eq!(
            inbox.drain(),
            vec![ControlMessage::rejected("clock/color", PayloadError::NotUtf8)]
        );
    }

    #[test]
    fn explicit_rejection_is_queued() {
        let (tx, mut inbox) = control_channel();

        assert!(tx.reject("clock/color", PayloadError::TooLong(4096)));
        assert_eq!(inbox.drain()[0].payload, Err(PayloadError::TooLong(4096)));
    }

    #[test]
    fn drain_after_sender_dropped_is_empty() {
        let (tx, mut inbox) = control_channel();
        drop(tx);
        assert!(inbox.drain().is_empty());
    }
}
