use crate::time::{LocalClock, TimeOfDay, TimeSource};

/// A clock that shows whatever time it was last set to.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedClock {
    time: TimeOfDay,
}

impl FixedClock {
    pub fn new(time: TimeOfDay) -> Self {
        Self { time }
    }

    pub fn set(&mut self, time: TimeOfDay) {
        self.time = time;
    }
}

impl TimeSource for FixedClock {
    fn now(&self) -> TimeOfDay {
        self.time
    }
}

/// Either the host wall clock or a pinned time, switchable at runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedClock {
    pinned: Option<TimeOfDay>,
}

impl SimulatedClock {
    /// Follow the host clock until [`pin`](Self::pin) is called.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pin(&mut self, time: TimeOfDay) {
        self.pinned = Some(time);
    }

    pub fn unpin(&mut self) {
        self.pinned = None;
    }
}

impl TimeSource for SimulatedClock {
    fn now(&self) -> TimeOfDay {
        self.pinned.unwrap_or_else(|| LocalClock.now())
    }
}
