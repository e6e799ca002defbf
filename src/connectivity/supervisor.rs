use std::time::{Duration, Instant};

use log::{info, warn};

use super::traits::{ControlBus, NetworkLink, Provisioner, TimeSync};
use crate::config::{ClockConfig, ConfigStore, timing};
use crate::overrides::DisplayOverride;

/// Connectivity of the running device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Link down and the last reconnect window expired.
    Disconnected,
    /// Joining or rejoining the network.
    LinkEstablishing,
    /// Link up, control bus session not (yet) open.
    BusConnecting,
    /// Link up and control bus subscribed.
    Operational,
}

/// Top-level device mode. Provisioning is a separate takeover, not a
/// connectivity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Provisioning,
    Running,
}

/// Snapshot of link, bus and time-sync health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionState {
    pub link_up: bool,
    pub bus_connected: bool,
    /// When the last successful time sync was started.
    pub last_sync: Option<Instant>,
}

/// Result of one [`Supervisor::service`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceReport {
    pub state: SupervisorState,
    pub connection: ConnectionState,
    /// A time sync was started during this pass.
    pub resynced: bool,
    /// The color override was dropped because the bus was down.
    pub override_cleared: bool,
}

/// Tunables for reconnect and resync behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorSettings {
    pub resync_interval: Duration,
    pub link_reconnect_window: Duration,
    pub bus_backoff_initial: Duration,
    pub bus_backoff_max: Duration,
    /// Bus connect attempts made in a single cycle before deferring to the backoff.
    pub bus_attempts_per_cycle: u32,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            resync_interval: timing::RESYNC_INTERVAL,
            link_reconnect_window: timing::LINK_RECONNECT_WINDOW,
            bus_backoff_initial: timing::BUS_BACKOFF_INITIAL,
            bus_backoff_max: timing::BUS_BACKOFF_MAX,
            bus_attempts_per_cycle: timing::BUS_ATTEMPTS_PER_CYCLE,
        }
    }
}

/// Errors that stop the device from reaching normal operation.
#[derive(Debug, thiserror::Error)]
pub enum StartupError<P, S> {
    #[error("provisioning failed: {0}")]
    Provisioning(P),
    #[error("failed to store configuration: {0}")]
    Store(S),
}

/// Keeps the link, the control bus session and network time current.
///
/// Nothing here fails the render loop: every problem is logged and retried on
/// a later cycle.
#[derive(Debug)]
pub struct Supervisor<L, B, S> {
    link: L,
    bus: B,
    sync: S,
    settings: SupervisorSettings,
    config: ClockConfig,
    mode: Mode,
    state: SupervisorState,
    connection: ConnectionState,
    bus_backoff: Duration,
    bus_retry_at: Option<Instant>,
}

impl<L, B, S> Supervisor<L, B, S>
where
    L: NetworkLink,
    B: ControlBus,
    S: TimeSync,
{
    pub fn new(link: L, bus: B, sync: S, config: ClockConfig) -> Self {
        Self::with_settings(link, bus, sync, config, SupervisorSettings::default())
    }

    pub fn with_settings(
        link: L,
        bus: B,
        sync: S,
        config: ClockConfig,
        settings: SupervisorSettings,
    ) -> Self {
        Self {
            link,
            bus,
            sync,
            settings,
            config,
            mode: Mode::Running,
            state: SupervisorState::Disconnected,
            connection: ConnectionState::default(),
            bus_backoff: settings.bus_backoff_initial,
            bus_retry_at: None,
        }
    }

    #[inline]
    pub fn state(&self) -> SupervisorState {
        self.state
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// Configuration currently in use, possibly replaced by provisioning.
    #[inline]
    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    #[inline]
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    #[inline]
    pub fn bus(&self) -> &B {
        &self.bus
    }

    #[inline]
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    #[inline]
    pub fn sync_mut(&mut self) -> &mut S {
        &mut self.sync
    }

    /// Bring the link up, falling back to provisioning until it works.
    ///
    /// A configuration that fails [`ClockConfig::validate`] is never tried;
    /// it goes straight to provisioning.
    ///
    /// Every provisioning round blocks until a configuration is submitted.
    /// The submitted configuration is persisted through `store` before it is
    /// tried. Returns once the link is up and the first time sync has been
    /// attempted.
    pub fn start<P, C>(
        &mut self,
        now: Instant,
        provisioner: &mut P,
        store: &mut C,
    ) -> Result<(), StartupError<P::Error, C::Error>>
    where
        P: Provisioner<Link = L>,
        C: ConfigStore,
    {
        loop {
            match self.config.validate() {
                Ok(()) => {
                    self.set_state(SupervisorState::LinkEstablishing);
                    match self.link.connect(
                        &self.config.wifi_ssid,
                        &self.config.wifi_password,
                        self.settings.link_reconnect_window,
                    ) {
                        Ok(()) => break,
                        Err(err) => warn!("failed to join '{}': {err}", self.config.wifi_ssid),
                    }
                }
                Err(err) => warn!("stored configuration is unusable: {err}"),
            }

            self.set_state(SupervisorState::Disconnected);
            self.mode = Mode::Provisioning;
            info!("entering provisioning mode");
            let config = provisioner
                .provision(&mut self.link, &self.config)
                .map_err(StartupError::Provisioning)?;
            store.save(&config).map_err(StartupError::Store)?;
            info!("configuration for '{}' stored", config.wifi_ssid);
            self.config = config;
        }

        self.mode = Mode::Running;
        self.connection.link_up = true;
        info!("joined '{}'", self.config.wifi_ssid);
        self.set_state(SupervisorState::BusConnecting);
        self.try_sync(now);
        Ok(())
    }

    /// One connectivity pass of the main loop.
    ///
    /// Repairs the link (bounded by the reconnect window), reopens the bus
    /// session subject to backoff, clears `overrides` while the bus is down
    /// and resynchronizes time when the resync interval has passed.
    pub fn service(&mut self, now: Instant, overrides: &mut DisplayOverride) -> ServiceReport {
        self.service_link();

        let override_cleared = if self.connection.link_up {
            self.service_bus(now, overrides)
        } else {
            self.connection.bus_connected = false;
            drop_override(overrides)
        };

        let resynced = self.resync_if_due(now);

        ServiceReport {
            state: self.state,
            connection: self.connection,
            resynced,
            override_cleared,
        }
    }

    fn service_link(&mut self) {
        if self.link.is_up() {
            self.connection.link_up = true;
            return;
        }

        if self.connection.link_up {
            warn!("network link lost");
        }
        self.connection.link_up = false;
        self.set_state(SupervisorState::LinkEstablishing);

        match self.link.reconnect(self.settings.link_reconnect_window) {
            Ok(()) => {
                info!("network link restored");
                self.connection.link_up = true;
                self.set_state(SupervisorState::BusConnecting);
            }
            Err(err) => {
                warn!("network reconnect failed: {err}");
                self.set_state(SupervisorState::Disconnected);
            }
        }
    }

    /// Returns whether an active override was dropped.
    fn service_bus(&mut self, now: Instant, overrides: &mut DisplayOverride) -> bool {
        if self.bus.is_connected() {
            self.connection.bus_connected = true;
            self.set_state(SupervisorState::Operational);
            return false;
        }

        if self.connection.bus_connected {
            warn!("control bus session lost");
        }
        self.connection.bus_connected = false;
        let cleared = drop_override(overrides);
        self.set_state(SupervisorState::BusConnecting);

        if self.bus_retry_at.is_some_and(|at| now < at) {
            return cleared;
        }

        for attempt in 1..=self.settings.bus_attempts_per_cycle {
            match self.bus.connect(&self.config) {
                Ok(()) => {
                    info!("control bus connected to {}", self.config.mqtt_url());
                    self.connection.bus_connected = true;
                    self.bus_backoff = self.settings.bus_backoff_initial;
                    self.bus_retry_at = None;
                    self.set_state(SupervisorState::Operational);
                    return cleared;
                }
                Err(err) => warn!("control bus connect attempt {attempt} failed: {err}"),
            }
        }

        self.bus_retry_at = Some(now + self.bus_backoff);
        self.bus_backoff = (self.bus_backoff * 2).min(self.settings.bus_backoff_max);
        cleared
    }

    fn resync_if_due(&mut self, now: Instant) -> bool {
        let due = self
            .connection
            .last_sync
            .is_none_or(|at| now.saturating_duration_since(at) > self.settings.resync_interval);
        due && self.try_sync(now)
    }

    fn try_sync(&mut self, now: Instant) -> bool {
        match self.sync.sync() {
            Ok(()) => {
                info!("network time sync started");
                self.connection.last_sync = Some(now);
                true
            }
            Err(err) => {
                warn!("network time sync failed: {err}");
                false
            }
        }
    }

    fn set_state(&mut self, state: SupervisorState) {
        if state != self.state {
            info!("connectivity {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }
}

fn drop_override(overrides: &mut DisplayOverride) -> bool {
    if overrides.is_active() {
        info!("control bus down, reverting to default color");
        overrides.clear();
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_COLOR;
    use crate::mock::{
        MemoryStore, ScriptedProvisioner, SimulatedBus, SimulatedLink, SimulatedTimeSync,
    };

    type TestSupervisor = Supervisor<SimulatedLink, SimulatedBus, SimulatedTimeSync>;

    fn config() -> ClockConfig {
        ClockConfig {
            wifi_ssid: "home".into(),
            wifi_password: "secret".into(),
            mqtt_host: "broker.local".into(),
            ..ClockConfig::default()
        }
    }

    fn settings() -> SupervisorSettings {
        SupervisorSettings {
            bus_backoff_initial: Duration::from_secs(2),
            bus_backoff_max: Duration::from_secs(8),
            link_reconnect_window: Duration::from_secs(3),
            ..SupervisorSettings::default()
        }
    }

    fn overrides() -> DisplayOverride {
        DisplayOverride::new(DEFAULT_COLOR, 64)
    }

    /// Supervisor that has completed startup at `t0`.
    fn started(t0: Instant) -> TestSupervisor {
        let mut supervisor = Supervisor::with_settings(
            SimulatedLink::new(),
            SimulatedBus::new(),
            SimulatedTimeSync::new(),
            config(),
            settings(),
        );
        supervisor
            .start(t0, &mut ScriptedProvisioner::new(), &mut MemoryStore::new())
            .expect("startup should succeed");
        supervisor
    }

    #[test]
    fn start_with_credentials_skips_provisioning() {
        let t0 = Instant::now();
        let mut provisioner = ScriptedProvisioner::new();
        let mut store = MemoryStore::new();
        let mut supervisor = Supervisor::new(
            SimulatedLink::new(),
            SimulatedBus::new(),
            SimulatedTimeSync::new(),
            config(),
        );

        supervisor
            .start(t0, &mut provisioner, &mut store)
            .expect("startup should succeed");

        assert_eq!(provisioner.runs(), 0);
        assert_eq!(store.saves(), 0);
        assert_eq!(supervisor.mode(), Mode::Running);
        assert_eq!(supervisor.state(), SupervisorState::BusConnecting);
        assert_eq!(supervisor.connection().last_sync, Some(t0));
        assert_eq!(supervisor.sync_mut().syncs(), 1);
    }

    #[test]
    fn start_without_credentials_provisions_and_stores() {
        let submitted = config();
        let mut provisioner = ScriptedProvisioner::with_submission(submitted.clone());
        let mut store = MemoryStore::new();
        let mut supervisor = Supervisor::new(
            SimulatedLink::new(),
            SimulatedBus::new(),
            SimulatedTimeSync::new(),
            ClockConfig::default(),
        );

        supervisor
            .start(Instant::now(), &mut provisioner, &mut store)
            .expect("startup should succeed");

        assert_eq!(provisioner.runs(), 1);
        assert_eq!(store.stored(), Some(&submitted));
        assert_eq!(supervisor.config(), &submitted);
        assert_eq!(supervisor.link_mut().joined(), Some("home"));
    }

    #[test]
    fn start_with_unreachable_network_provisions() {
        let mut link = SimulatedLink::new();
        link.set_reachable_ssid("office");
        let submitted = ClockConfig {
            wifi_ssid: "office".into(),
            ..config()
        };
        let mut provisioner = ScriptedProvisioner::with_submission(submitted);
        let mut supervisor = Supervisor::new(
            link,
            SimulatedBus::new(),
            SimulatedTimeSync::new(),
            config(),
        );

        supervisor
            .start(Instant::now(), &mut provisioner, &mut MemoryStore::new())
            .expect("startup should succeed");

        assert_eq!(provisioner.runs(), 1);
        assert_eq!(supervisor.link_mut().joined(), Some("office"));
    }

    #[test]
    fn stored_config_without_broker_provisions() {
        let partial = ClockConfig {
            mqtt_host: String::new(),
            ..config()
        };
        let mut store = MemoryStore::with_config(partial);
        let loaded = store
            .load()
            .expect("memory store cannot fail")
            .expect("config was stored");
        let mut provisioner = ScriptedProvisioner::with_submission(config());
        let mut supervisor = Supervisor::new(
            SimulatedLink::new(),
            SimulatedBus::new(),
            SimulatedTimeSync::new(),
            loaded,
        );

        supervisor
            .start(Instant::now(), &mut provisioner, &mut store)
            .expect("startup should succeed");

        assert_eq!(provisioner.runs(), 1);
        assert_eq!(store.saves(), 1);
        assert_eq!(store.stored(), Some(&config()));
        assert_eq!(supervisor.config().mqtt_url(), "mqtt://broker.local:1883");
        assert_eq!(supervisor.mode(), Mode::Running);
    }

    #[test]
    fn provisioning_failure_is_reported() {
        let mut supervisor = Supervisor::new(
            SimulatedLink::new(),
            SimulatedBus::new(),
            SimulatedTimeSync::new(),
            ClockConfig::default(),
        );

        let result = supervisor.start(
            Instant::now(),
            &mut ScriptedProvisioner::new(),
            &mut MemoryStore::new(),
        );

        assert!(matches!(result, Err(StartupError::Provisioning(_))));
        assert_eq!(supervisor.mode(), Mode::Provisioning);
    }

    #[test]
    fn first_service_connects_bus() {
        let t0 = Instant::now();
        let mut supervisor = started(t0);

        let report = supervisor.service(t0, &mut overrides());

        assert_eq!(report.state, SupervisorState::Operational);
        assert!(report.connection.bus_connected);
        assert!(!report.resynced);
        assert_eq!(supervisor.bus_mut().connects(), 1);
    }

    #[test]
    fn bus_loss_clears_override() {
        let t0 = Instant::now();
        let mut supervisor = started(t0);
        let mut overrides = overrides();
        supervisor.service(t0, &mut overrides);

        overrides.set_color_from_text("#ff0000").expect("valid color");
        supervisor.bus_mut().drop_session();
        supervisor.bus_mut().fail_next(1);
        let report = supervisor.service(t0, &mut overrides);

        assert!(report.override_cleared);
        assert!(!overrides.is_active());
        assert_eq!(overrides.current_color(), DEFAULT_COLOR);
        assert_eq!(report.state, SupervisorState::BusConnecting);
    }

    #[test]
    fn bus_retries_respect_backoff() {
        let t0 = Instant::now();
        let mut supervisor = started(t0);
        supervisor.bus_mut().fail_next(3);
        let mut overrides = overrides();

        supervisor.service(t0, &mut overrides);
        assert_eq!(supervisor.bus_mut().connects(), 1);

        // Still inside the 2s backoff
        supervisor.service(t0 + Duration::from_secs(1), &mut overrides);
        assert_eq!(supervisor.bus_mut().connects(), 1);

        supervisor.service(t0 + Duration::from_secs(2), &mut overrides);
        assert_eq!(supervisor.bus_mut().connects(), 2);

        // Backoff doubled to 4s
        supervisor.service(t0 + Duration::from_secs(5), &mut overrides);
        assert_eq!(supervisor.bus_mut().connects(), 2);
        supervisor.service(t0 + Duration::from_secs(6), &mut overrides);
        assert_eq!(supervisor.bus_mut().connects(), 3);

        // Failures used up; connects once the 8s backoff passes
        let report = supervisor.service(t0 + Duration::from_secs(14), &mut overrides);
        assert_eq!(supervisor.bus_mut().connects(), 4);
        assert_eq!(report.state, SupervisorState::Operational);
    }

    #[test]
    fn bus_attempts_per_cycle_are_bounded() {
        let t0 = Instant::now();
        let mut supervisor = Supervisor::with_settings(
            SimulatedLink::new(),
            SimulatedBus::new(),
            SimulatedTimeSync::new(),
            config(),
            SupervisorSettings {
                bus_attempts_per_cycle: 3,
                ..settings()
            },
        );
        supervisor
            .start(t0, &mut ScriptedProvisioner::new(), &mut MemoryStore::new())
            .expect("startup should succeed");
        supervisor.bus_mut().fail_next(10);

        supervisor.service(t0, &mut overrides());

        assert_eq!(supervisor.bus_mut().connects(), 3);
    }

    #[test]
    fn link_loss_is_repaired() {
        let t0 = Instant::now();
        let mut supervisor = started(t0);
        supervisor.service(t0, &mut overrides());

        supervisor.link_mut().drop_link();
        let report = supervisor.service(t0, &mut overrides());

        assert!(report.connection.link_up);
        assert_eq!(supervisor.link_mut().reconnects(), 1);
        assert_eq!(
            supervisor.link_mut().last_window(),
            Some(settings().link_reconnect_window)
        );
    }

    #[test]
    fn failed_link_repair_skips_bus_and_clears_override() {
        let t0 = Instant::now();
        let mut supervisor = started(t0);
        let mut overrides = overrides();
        supervisor.service(t0, &mut overrides);
        overrides.set_color_from_text("00ff00").expect("valid color");

        supervisor.link_mut().drop_link();
        supervisor.link_mut().set_reachable_ssid("elsewhere");
        let connects_before = supervisor.bus_mut().connects();
        let report = supervisor.service(t0, &mut overrides);

        assert_eq!(report.state, SupervisorState::Disconnected);
        assert!(!report.connection.link_up);
        assert!(!report.connection.bus_connected);
        assert!(report.override_cleared);
        assert_eq!(supervisor.bus_mut().connects(), connects_before);
    }

    #[test]
    fn resync_after_interval() {
        let t0 = Instant::now();
        let mut supervisor = started(t0);
        let mut overrides = overrides();

        let report = supervisor.service(t0 + Duration::from_secs(14 * 60), &mut overrides);
        assert!(!report.resynced);

        let later = t0 + Duration::from_secs(15 * 60 + 1);
        let report = supervisor.service(later, &mut overrides);
        assert!(report.resynced);
        assert_eq!(report.connection.last_sync, Some(later));
        assert_eq!(supervisor.sync_mut().syncs(), 2);
    }

    #[test]
    fn resync_happens_even_while_link_is_down() {
        let t0 = Instant::now();
        let mut supervisor = started(t0);
        supervisor.link_mut().drop_link();
        supervisor.link_mut().set_reachable_ssid("elsewhere");

        let report = supervisor.service(t0 + Duration::from_secs(16 * 60), &mut overrides());

        assert!(report.resynced);
    }

    #[test]
    fn failed_sync_is_retried_next_cycle() {
        let t0 = Instant::now();
        let mut supervisor = Supervisor::new(
            SimulatedLink::new(),
            SimulatedBus::new(),
            SimulatedTimeSync::failing(),
            config(),
        );
        supervisor
            .start(t0, &mut ScriptedProvisioner::new(), &mut MemoryStore::new())
            .expect("startup should succeed");
        assert_eq!(supervisor.connection().last_sync, None);

        supervisor.sync_mut().set_failing(false);
        let report = supervisor.service(t0 + Duration::from_secs(1), &mut overrides());

        assert!(report.resynced);
        assert_eq!(report.connection.last_sync, Some(t0 + Duration::from_secs(1)));
    }
}
