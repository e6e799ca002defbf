mod display;
mod mqtt;
mod provisioning;
mod sntp;
mod storage;
mod wifi;

use std::time::Duration;

use esp_idf_svc::io::EspIOError;
use esp_idf_svc::sys::EspError;

pub use display::Ws2812Ring;
pub use mqtt::EspControlBus;
pub use provisioning::EspProvisioner;
pub use sntp::EspTimeSync;
pub use storage::NvsConfigStore;
pub use wifi::EspWifiLink;

/// Errors raised by the ESP-IDF collaborators.
#[derive(Debug, thiserror::Error)]
pub enum FirmwareError {
    #[error("ESP-IDF call failed: {0}")]
    Esp(#[from] EspError),
    #[error("I/O failed: {0}")]
    Io(#[from] EspIOError),
    #[error("{0} is too long")]
    TooLong(&'static str),
    #[error("no connection to '{0}' within {1:?}")]
    LinkTimeout(String, Duration),
    #[error("no network has been joined yet")]
    NoNetwork,
    #[error("broker session not established yet")]
    BrokerPending,
    #[error("setup page closed without a submission")]
    ProvisioningAborted,
}
