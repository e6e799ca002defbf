use std::time::Duration;

use crate::config::ClockConfig;

/// The network link (Wi-Fi station) the device talks through.
pub trait NetworkLink {
    /// Error type for link failures.
    type Error: std::fmt::Debug + std::fmt::Display;

    /// Join the network with the given credentials, waiting at most `window`.
    fn connect(&mut self, ssid: &str, password: &str, window: Duration)
    -> Result<(), Self::Error>;

    /// Whether the link is currently usable.
    fn is_up(&mut self) -> bool;

    /// Rejoin the last network, waiting at most `window`.
    fn reconnect(&mut self, window: Duration) -> Result<(), Self::Error>;
}

/// Publish/subscribe session delivering control messages.
///
/// Received messages are not returned here; implementations push them into
/// a [`ControlSender`](crate::control::ControlSender).
pub trait ControlBus {
    /// Error type for session failures.
    type Error: std::fmt::Debug + std::fmt::Display;

    /// Whether the session is connected and subscribed.
    fn is_connected(&mut self) -> bool;

    /// (Re-)open the session to the broker in `config` and subscribe to its
    /// control topics. Must not block for longer than one connect attempt.
    fn connect(&mut self, config: &ClockConfig) -> Result<(), Self::Error>;
}

/// Network time synchronization for the system wall clock.
pub trait TimeSync {
    /// Error type for sync failures.
    type Error: std::fmt::Debug + std::fmt::Display;

    /// Start (or restart) a synchronization round.
    fn sync(&mut self) -> Result<(), Self::Error>;
}

/// Configuration entry used when no stored credentials work.
///
/// Takes over the device until a valid configuration is submitted.
pub trait Provisioner {
    /// The link the provisioner borrows, e.g. to run an access point.
    type Link: NetworkLink;

    /// Error type for provisioning failures.
    type Error: std::fmt::Debug + std::fmt::Display;

    /// Block until the user submits a configuration, pre-filled from `current`.
    fn provision(
        &mut self,
        link: &mut Self::Link,
        current: &ClockConfig,
    ) -> Result<ClockConfig, Self::Error>;
}
