use std::time::Duration;

use crate::config::ClockConfig;
use crate::connectivity::{ControlBus, NetworkLink, Provisioner, TimeSync};
use crate::control::ControlSender;

/// Failures produced by the simulated network stack.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulatedError {
    #[error("network '{0}' is not reachable")]
    Unreachable(String),
    #[error("broker refused the connection")]
    Refused,
    #[error("time server did not answer")]
    TimeServer,
    #[error("no configuration was submitted")]
    NoSubmission,
}

/// In-memory Wi-Fi station.
///
/// Every SSID is reachable unless [`set_reachable_ssid`](Self::set_reachable_ssid)
/// narrows it down to a single one.
#[derive(Debug, Clone, Default)]
pub struct SimulatedLink {
    reachable: Option<String>,
    joined: Option<String>,
    up: bool,
    reconnects: u32,
    last_window: Option<Duration>,
}

impl SimulatedLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reachable_ssid(&mut self, ssid: &str) {
        self.reachable = Some(ssid.to_string());
    }

    /// Make every SSID reachable again.
    pub fn reach_all(&mut self) {
        self.reachable = None;
    }

    /// Lose the association while remembering the network.
    pub fn drop_link(&mut self) {
        self.up = false;
    }

    /// Network last joined.
    pub fn joined(&self) -> Option<&str> {
        self.joined.as_deref()
    }

    /// Reconnect attempts so far.
    pub fn reconnects(&self) -> u32 {
        self.reconnects
    }

    /// Time budget passed to the latest connect or reconnect.
    pub fn last_window(&self) -> Option<Duration> {
        self.last_window
    }

    fn reachable(&self, ssid: &str) -> bool {
        !ssid.is_empty() && self.reachable.as_deref().is_none_or(|r| r == ssid)
    }
}

impl NetworkLink for SimulatedLink {
    type Error = SimulatedError;

    fn connect(
        &mut self,
        ssid: &str,
        _password: &str,
        window: Duration,
    ) -> Result<(), Self::Error> {
        self.last_window = Some(window);
        if !self.reachable(ssid) {
            self.up = false;
            return Err(SimulatedError::Unreachable(ssid.to_string()));
        }
        self.joined = Some(ssid.to_string());
        self.up = true;
        Ok(())
    }

    fn is_up(&mut self) -> bool {
        self.up
    }

    fn reconnect(&mut self, window: Duration) -> Result<(), Self::Error> {
        self.reconnects += 1;
        self.last_window = Some(window);
        let ssid = self.joined.clone().unwrap_or_default();
        if self.reachable(&ssid) {
            self.up = true;
            Ok(())
        } else {
            Err(SimulatedError::Unreachable(ssid))
        }
    }
}

/// In-memory MQTT session.
///
/// Messages given to [`publish`](Self::publish) reach the attached
/// [`ControlSender`] only while connected and only on subscribed topics.
#[derive(Debug, Default)]
pub struct SimulatedBus {
    sender: Option<ControlSender>,
    connected: bool,
    subscriptions: Vec<String>,
    connects: u32,
    failures: u32,
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus that forwards published messages to `sender`.
    pub fn with_sender(sender: ControlSender) -> Self {
        Self {
            sender: Some(sender),
            ..Self::default()
        }
    }

    /// Connect attempts so far, successful or not.
    pub fn connects(&self) -> u32 {
        self.connects
    }

    pub fn drop_session(&mut self) {
        self.connected = false;
        self.subscriptions.clear();
    }

    /// Fail the next `count` connect attempts.
    pub fn fail_next(&mut self, count: u32) {
        self.failures = count;
    }

    /// Publish as the broker would. Returns whether the message was delivered.
    pub fn publish(&self, topic: &str, payload: &[u8]) -> bool {
        if !self.connected || !self.subscriptions.iter().any(|t| t == topic) {
            return false;
        }
        self.sender
            .as_ref()
            .is_some_and(|sender| sender.deliver(topic, payload))
    }
}

impl ControlBus for SimulatedBus {
    type Error = SimulatedError;

    fn is_connected(&mut self) -> bool {
        self.connected
    }

    fn connect(&mut self, config: &ClockConfig) -> Result<(), Self::Error> {
        self.connects += 1;
        if self.failures > 0 {
            self.failures -= 1;
            return Err(SimulatedError::Refused);
        }
        self.subscriptions = config
            .topics()
            .all()
            .iter()
            .map(|t| t.to_string())
            .collect();
        self.connected = true;
        Ok(())
    }
}

/// Counts sync requests; the host wall clock is already correct.
#[derive(Debug, Clone, Default)]
pub struct SimulatedTimeSync {
    failing: bool,
    syncs: u32,
}

impl SimulatedTimeSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            syncs: 0,
        }
    }

    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    /// Successful syncs so far.
    pub fn syncs(&self) -> u32 {
        self.syncs
    }
}

impl TimeSync for SimulatedTimeSync {
    type Error = SimulatedError;

    fn sync(&mut self) -> Result<(), Self::Error> {
        if self.failing {
            return Err(SimulatedError::TimeServer);
        }
        self.syncs += 1;
        Ok(())
    }
}

/// Provisioner that "receives" a prepared submission.
///
/// The submission is handed out once; later rounds fail, standing in for a
/// user who never comes back.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvisioner {
    submission: Option<ClockConfig>,
    runs: u32,
}

impl ScriptedProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_submission(config: ClockConfig) -> Self {
        Self {
            submission: Some(config),
            runs: 0,
        }
    }

    pub fn runs(&self) -> u32 {
        self.runs
    }
}

impl Provisioner for ScriptedProvisioner {
    type Link = SimulatedLink;
    type Error = SimulatedError;

    fn provision(
        &mut self,
        link: &mut SimulatedLink,
        _current: &ClockConfig,
    ) -> Result<ClockConfig, Self::Error> {
        self.runs += 1;
        // The setup access point replaces the station association
        link.up = false;
        self.submission.take().ok_or(SimulatedError::NoSubmission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::control_channel;

    fn config() -> ClockConfig {
        ClockConfig {
            wifi_ssid: "home".into(),
            mqtt_host: "broker.local".into(),
            ..ClockConfig::default()
        }
    }

    #[test]
    fn link_rejects_blank_ssid() {
        let mut link = SimulatedLink::new();
        assert!(link.connect("", "", Duration::ZERO).is_err());
        assert!(!link.is_up());
    }

    #[test]
    fn link_reconnects_to_joined_network() {
        let mut link = SimulatedLink::new();
        link.connect("home", "pw", Duration::ZERO).expect("reachable");
        link.drop_link();

        assert!(!link.is_up());
        assert_eq!(link.reconnect(Duration::ZERO), Ok(()));
        assert!(link.is_up());
        assert_eq!(link.reconnects(), 1);
    }

    #[test]
    fn reconnect_without_network_fails() {
        let mut link = SimulatedLink::new();
        assert!(link.reconnect(Duration::ZERO).is_err());
    }

    #[test]
    fn bus_only_delivers_subscribed_topics_while_connected() {
        let (tx, mut inbox) = control_channel();
        let mut bus = SimulatedBus::with_sender(tx);

        assert!(!bus.publish("ringclock/color", b"#ff0000"));

        bus.connect(&config()).expect("connects");
        assert!(bus.publish("ringclock/color", b"#ff0000"));
        assert!(!bus.publish("other/topic", b"1"));

        bus.drop_session();
        assert!(!bus.publish("ringclock/brightness", b"10"));

        assert_eq!(inbox.drain().len(), 1);
    }

    #[test]
    fn bus_failures_are_consumed() {
        let mut bus = SimulatedBus::new();
        bus.fail_next(2);

        assert!(bus.connect(&config()).is_err());
        assert!(bus.connect(&config()).is_err());
        assert!(bus.connect(&config()).is_ok());
        assert_eq!(bus.connects(), 3);
    }

    #[test]
    fn provisioner_hands_out_submission_once() {
        let mut provisioner = ScriptedProvisioner::with_submission(config());
        let mut link = SimulatedLink::new();

        assert_eq!(provisioner.provision(&mut link, &ClockConfig::default()), Ok(config()));
        assert_eq!(
            provisioner.provision(&mut link, &ClockConfig::default()),
            Err(SimulatedError::NoSubmission)
        );
        assert_eq!(provisioner.runs(), 2);
    }
}
