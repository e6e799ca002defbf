use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embedded_svc::mqtt::client::{Details, EventPayload, QoS};
use esp_idf_svc::mqtt::client::{EspMqttClient, MqttClientConfiguration};
use log::{info, warn};

use super::FirmwareError;
use crate::config::ClockConfig;
use crate::connectivity::ControlBus;
use crate::control::ControlSender;
use crate::overrides::PayloadError;

const CLIENT_ID: &str = "ring-clock";

/// Session flags written from the MQTT task.
#[derive(Debug, Default)]
struct SessionFlags {
    connected: AtomicBool,
    /// Bumped on every (re)connect; subscriptions are lost with the session.
    generation: AtomicU32,
}

/// MQTT client feeding the control inbox.
///
/// The ESP-IDF client reconnects on its own in the background; this type
/// only tracks whether the current session is subscribed.
pub struct EspControlBus {
    sender: ControlSender,
    client: Option<EspMqttClient<'static>>,
    url: String,
    flags: Arc<SessionFlags>,
    subscribed: Option<u32>,
}

impl EspControlBus {
    pub fn new(sender: ControlSender) -> Self {
        Self {
            sender,
            client: None,
            url: String::new(),
            flags: Arc::new(SessionFlags::default()),
            subscribed: None,
        }
    }

    fn open(&mut self, url: &str) -> Result<(), FirmwareError> {
        // Drop the old session first so its callback stops touching the flags
        self.client = None;
        self.flags = Arc::new(SessionFlags::default());
        self.subscribed = None;

        let conf = MqttClientConfiguration {
            client_id: Some(CLIENT_ID),
            ..Default::default()
        };
        let flags = Arc::clone(&self.flags);
        let sender = self.sender.clone();
        let client = EspMqttClient::new_cb(url, &conf, move |event| match event.payload() {
            EventPayload::Connected(_) => {
                flags.generation.fetch_add(1, Ordering::Relaxed);
                flags.connected.store(true, Ordering::Release);
            }
            EventPayload::Disconnected => flags.connected.store(false, Ordering::Release),
            EventPayload::Received {
                topic: Some(topic),
                data,
                details: Details::Complete,
                ..
            } => {
                sender.deliver(topic, data);
            }
            // Only the first chunk names the topic; any chunked message is oversized
            EventPayload::Received {
                topic: Some(topic),
                details: Details::InitialChunk(chunk),
                ..
            } => {
                sender.reject(topic, PayloadError::TooLong(chunk.total_data_size));
            }
            EventPayload::Error(err) => warn!("mqtt error: {err:?}"),
            _ => {}
        })?;

        info!("mqtt client started for {url}");
        self.client = Some(client);
        self.url = url.to_string();
        Ok(())
    }
}

impl ControlBus for EspControlBus {
    type Error = FirmwareError;

    fn is_connected(&mut self) -> bool {
        self.flags.connected.load(Ordering::Acquire)
            && self.subscribed == Some(self.flags.generation.load(Ordering::Relaxed))
    }

    fn connect(&mut self, config: &ClockConfig) -> Result<(), Self::Error> {
        let url = config.mqtt_url();
        if self.client.is_none() || self.url != url {
            self.open(&url)?;
        }

        if !self.flags.connected.load(Ordering::Acquire) {
            return Err(FirmwareError::BrokerPending);
        }

        let generation = self.flags.generation.load(Ordering::Relaxed);
        let client = self.client.as_mut().ok_or(FirmwareError::BrokerPending)?;
        for topic in config.topics().all() {
            client.subscribe(topic, QoS::AtMostOnce)?;
        }
        self.subscribed = Some(generation);
        Ok(())
    }
}
