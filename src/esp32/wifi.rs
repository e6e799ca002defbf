use std::time::{Duration, Instant};

use embedded_svc::wifi::{AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{debug, info};

use super::FirmwareError;
use crate::config::timing::LINK_POLL_INTERVAL;
use crate::connectivity::NetworkLink;

/// Wi-Fi station used as the clock's network link.
///
/// The radio can also be switched to an open access point for
/// provisioning; [`connect`](NetworkLink::connect) switches it back.
pub struct EspWifiLink {
    wifi: BlockingWifi<EspWifi<'static>>,
    ssid: Option<String>,
}

impl EspWifiLink {
    pub fn new(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> Result<Self, FirmwareError> {
        let esp_wifi = EspWifi::new(modem, sys_loop.clone(), Some(nvs))?;
        Ok(Self {
            wifi: BlockingWifi::wrap(esp_wifi, sys_loop)?,
            ssid: None,
        })
    }

    /// Replace the station with an open access point named `ssid`.
    pub fn start_access_point(&mut self, ssid: &str) -> Result<(), FirmwareError> {
        if self.wifi.is_started()? {
            self.wifi.stop()?;
        }
        self.wifi
            .set_configuration(&Configuration::AccessPoint(AccessPointConfiguration {
                ssid: ssid.try_into().map_err(|_| FirmwareError::TooLong("AP SSID"))?,
                auth_method: AuthMethod::None,
                channel: 1,
                ..Default::default()
            }))?;
        self.wifi.start()?;
        self.wifi.wait_netif_up()?;
        info!("access point '{ssid}' up");
        Ok(())
    }

    pub fn stop_access_point(&mut self) -> Result<(), FirmwareError> {
        self.wifi.stop()?;
        Ok(())
    }

    /// Issue a connect and poll for association until `window` runs out.
    fn join(&mut self, window: Duration) -> Result<(), FirmwareError> {
        let ssid = self.ssid.clone().ok_or(FirmwareError::NoNetwork)?;
        let deadline = Instant::now() + window;

        self.wifi.wifi_mut().connect()?;
        while !self.wifi.is_connected()? {
            if Instant::now() >= deadline {
                let _ = self.wifi.wifi_mut().disconnect();
                return Err(FirmwareError::LinkTimeout(ssid, window));
            }
            debug!("waiting for '{ssid}'");
            FreeRtos::delay_ms(LINK_POLL_INTERVAL.as_millis() as u32);
        }

        self.wifi.wait_netif_up()?;
        Ok(())
    }
}

impl NetworkLink for EspWifiLink {
    type Error = FirmwareError;

    fn connect(&mut self, ssid: &str, password: &str, window: Duration) -> Result<(), Self::Error> {
        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPAWPA2Personal
        };

        if self.wifi.is_started()? {
            self.wifi.stop()?;
        }
        self.wifi
            .set_configuration(&Configuration::Client(ClientConfiguration {
                ssid: ssid.try_into().map_err(|_| FirmwareError::TooLong("SSID"))?,
                password: password
                    .try_into()
                    .map_err(|_| FirmwareError::TooLong("password"))?,
                auth_method,
                ..Default::default()
            }))?;
        self.wifi.start()?;
        self.ssid = Some(ssid.to_string());

        info!("joining '{ssid}'");
        self.join(window)
    }

    fn is_up(&mut self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    fn reconnect(&mut self, window: Duration) -> Result<(), Self::Error> {
        let _ = self.wifi.wifi_mut().disconnect();
        self.join(window)
    }
}
