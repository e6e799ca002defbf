use ring_clock::config::ClockConfig;

#[cfg(target_os = "espidf")]
fn main() {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::info!("Ring Clock - ESP32");

    if let Err(err) = device::run() {
        log::error!("fatal: {err}");
    }
    esp_idf_svc::hal::delay::FreeRtos::delay_ms(5000);
    esp_idf_svc::hal::reset::restart();
}

#[cfg(target_os = "espidf")]
mod device {
    use std::time::Instant;

    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::delay::FreeRtos;
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::hal::rmt::TxRmtDriver;
    use esp_idf_svc::hal::rmt::config::TransmitConfig;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use log::warn;
    use ring_clock::app::ClockApp;
    use ring_clock::config::{ConfigStore, timing};
    use ring_clock::connectivity::{StartupError, Supervisor};
    use ring_clock::control::control_channel;
    use ring_clock::esp32::{
        EspControlBus, EspProvisioner, EspTimeSync, EspWifiLink, FirmwareError, NvsConfigStore,
        Ws2812Ring,
    };
    use ring_clock::time::LocalClock;

    use super::ClockConfig;

    pub fn run() -> Result<(), FirmwareError> {
        let peripherals = Peripherals::take()?;
        let sys_loop = EspSystemEventLoop::take()?;
        let nvs_partition = EspDefaultNvsPartition::take()?;

        let mut store = NvsConfigStore::new(nvs_partition.clone())?;
        let config = match store.load() {
            Ok(config) => config.unwrap_or_default(),
            Err(err) => {
                warn!("failed to load stored configuration: {err}");
                ClockConfig::default()
            }
        }
        .with_build_defaults();

        let tx = TxRmtDriver::new(
            peripherals.rmt.channel0,
            peripherals.pins.gpio5,
            &TransmitConfig::new().clock_divider(1),
        )?;
        let ring = Ws2812Ring::new(tx)?;

        let link = EspWifiLink::new(peripherals.modem, sys_loop, nvs_partition)?;
        let (sender, inbox) = control_channel();
        let bus = EspControlBus::new(sender);
        let supervisor = Supervisor::new(link, bus, EspTimeSync::new(), config);
        let mut app = ClockApp::new(supervisor, ring, LocalClock, inbox);

        app.start(Instant::now(), &mut EspProvisioner::new(), &mut store)
            .map_err(|err| match err {
                StartupError::Provisioning(err) | StartupError::Store(err) => err,
            })?;

        loop {
            if let Err(err) = app.tick(Instant::now()) {
                warn!("failed to update LEDs: {err}");
            }
            FreeRtos::delay_ms(timing::FRAME_INTERVAL.as_millis() as u32);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    let config = ClockConfig::default().with_build_defaults();
    ring_clock::mock::run_interactive_terminal(config);
}
