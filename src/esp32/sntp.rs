use esp_idf_svc::sntp::EspSntp;
use log::debug;

use super::FirmwareError;
use crate::connectivity::TimeSync;

/// SNTP client setting the system clock.
///
/// Restarting the service forces an immediate poll.
#[derive(Default)]
pub struct EspTimeSync {
    sntp: Option<EspSntp<'static>>,
}

impl EspTimeSync {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimeSync for EspTimeSync {
    type Error = FirmwareError;

    fn sync(&mut self) -> Result<(), Self::Error> {
        if let Some(previous) = self.sntp.take() {
            debug!("restarting sntp, previous status {:?}", previous.get_sync_status());
        }
        self.sntp = Some(EspSntp::new_default()?);
        Ok(())
    }
}
