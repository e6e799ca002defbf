use std::time::Instant;

use log::{debug, info, warn};
use smart_leds::RGB8;

use crate::ClockDisplay;
use crate::compositor::compose_frame;
use crate::config::ConfigStore;
use crate::connectivity::{
    ControlBus, NetworkLink, Provisioner, ServiceReport, StartupError, Supervisor, TimeSync,
};
use crate::control::{ControlInbox, ControlMessage, ControlTopics, Route};
use crate::frame::Frame;
use crate::overrides::{ColorUpdate, DisplayOverride};
use crate::time::{TimeOfDay, TimeSource};

/// What a single [`ClockApp::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub service: ServiceReport,
    /// Control messages handled this cycle.
    pub messages: usize,
    pub time: TimeOfDay,
    pub color: RGB8,
    pub brightness: u8,
}

/// Everything the render loop owns.
///
/// The override state is only touched from [`tick`](Self::tick): inbound
/// messages are queued by the bus and applied here, once per cycle.
pub struct ClockApp<D, C, L, B, S> {
    supervisor: Supervisor<L, B, S>,
    display: D,
    clock: C,
    overrides: DisplayOverride,
    inbox: ControlInbox,
    topics: ControlTopics,
    frame: Frame,
}

impl<D, C, L, B, S> ClockApp<D, C, L, B, S>
where
    D: ClockDisplay,
    C: TimeSource,
    L: NetworkLink,
    B: ControlBus,
    S: TimeSync,
{
    pub fn new(supervisor: Supervisor<L, B, S>, display: D, clock: C, inbox: ControlInbox) -> Self {
        let config = supervisor.config();
        let overrides = DisplayOverride::new(config.default_color, config.default_brightness);
        let topics = config.topics();
        Self {
            supervisor,
            display,
            clock,
            overrides,
            inbox,
            topics,
            frame: Frame::new(),
        }
    }

    /// Get online, provisioning first if needed. See [`Supervisor::start`].
    pub fn start<P, St>(
        &mut self,
        now: Instant,
        provisioner: &mut P,
        store: &mut St,
    ) -> Result<(), StartupError<P::Error, St::Error>>
    where
        P: Provisioner<Link = L>,
        St: ConfigStore,
    {
        self.supervisor.start(now, provisioner, store)?;

        // Provisioning may have replaced the defaults and topics
        let config = self.supervisor.config();
        self.overrides = DisplayOverride::new(config.default_color, config.default_brightness);
        self.topics = config.topics();
        Ok(())
    }

    /// Run one loop iteration: apply queued control messages, service
    /// connectivity, then render and transmit the current time.
    pub fn tick(&mut self, now: Instant) -> Result<CycleReport, D::Error> {
        let messages = self.inbox.drain();
        for message in &messages {
            self.handle_message(message);
        }

        let service = self.supervisor.service(now, &mut self.overrides);

        let time = self.clock.now();
        let color = self.overrides.current_color();
        let brightness = self.overrides.brightness();
        compose_frame(&mut self.frame, time, color);
        self.display.show(&self.frame, brightness)?;

        Ok(CycleReport {
            service,
            messages: messages.len(),
            time,
            color,
            brightness,
        })
    }

    fn handle_message(&mut self, message: &ControlMessage) {
        let ControlMessage { topic, payload } = message;
        match self.topics.route(topic) {
            Route::Color => match self.overrides.set_color_from_payload(payload.as_deref()) {
                Ok(ColorUpdate::Set(c)) => {
                    info!("color override #{:02x}{:02x}{:02x}", c.r, c.g, c.b);
                }
                Ok(ColorUpdate::Cleared) => info!("color override cleared"),
                Err(err) => warn!("rejected color {payload:?} on {topic}, override cleared: {err}"),
            },
            Route::Brightness => match payload
                .as_deref()
                .map_err(Clone::clone)
                .and_then(|text| self.overrides.set_brightness_from_text(text))
            {
                Ok(brightness) => info!("brightness set to {brightness}"),
                Err(err) => warn!("ignoring brightness {payload:?} on {topic}: {err}"),
            },
            Route::Ignored => debug!("ignoring message on {topic}"),
        }
    }

    #[inline]
    pub fn overrides(&self) -> &DisplayOverride {
        &self.overrides
    }

    /// The frame most recently composed.
    #[inline]
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    #[inline]
    pub fn supervisor(&self) -> &Supervisor<L, B, S> {
        &self.supervisor
    }

    #[inline]
    pub fn supervisor_mut(&mut self) -> &mut Supervisor<L, B, S> {
        &mut self.supervisor
    }

    #[inline]
    pub fn display(&self) -> &D {
        &self.display
    }

    #[inline]
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }
}
