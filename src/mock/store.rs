use std::convert::Infallible;

use crate::config::{ClockConfig, ConfigStore};

/// Configuration store that lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    stored: Option<ClockConfig>,
    saves: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `config`.
    pub fn with_config(config: ClockConfig) -> Self {
        Self {
            stored: Some(config),
            saves: 0,
        }
    }

    pub fn stored(&self) -> Option<&ClockConfig> {
        self.stored.as_ref()
    }

    pub fn saves(&self) -> u32 {
        self.saves
    }
}

impl ConfigStore for MemoryStore {
    type Error = Infallible;

    fn load(&mut self) -> Result<Option<ClockConfig>, Self::Error> {
        Ok(self.stored.clone())
    }

    fn save(&mut self, config: &ClockConfig) -> Result<(), Self::Error> {
        self.stored = Some(config.clone());
        self.saves += 1;
        Ok(())
    }
}
