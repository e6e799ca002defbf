use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use log::warn;

use super::FirmwareError;
use crate::config::{ClockConfig, ConfigStore};
use crate::overrides::parse_hex_color;

const NAMESPACE: &str = "ring_clock";

const KEY_SSID: &str = "ssid";
const KEY_PASSWORD: &str = "pass";
const KEY_MQTT_HOST: &str = "mqtt_host";
const KEY_MQTT_PORT: &str = "mqtt_port";
const KEY_COLOR_TOPIC: &str = "topic_color";
const KEY_BRIGHTNESS_TOPIC: &str = "topic_bright";
const KEY_COLOR: &str = "color";
const KEY_BRIGHTNESS: &str = "brightness";

/// Longest string value stored, including the terminator.
const MAX_VALUE_LEN: usize = 129;

/// [`ClockConfig`] persisted in NVS, one key per field.
pub struct NvsConfigStore {
    nvs: EspNvs<NvsDefault>,
}

impl NvsConfigStore {
    pub fn new(partition: EspDefaultNvsPartition) -> Result<Self, FirmwareError> {
        Ok(Self {
            nvs: EspNvs::new(partition, NAMESPACE, true)?,
        })
    }

    fn get_string(&self, key: &str) -> Result<Option<String>, FirmwareError> {
        let mut buffer = [0_u8; MAX_VALUE_LEN];
        Ok(self.nvs.get_str(key, &mut buffer)?.map(str::to_string))
    }
}

impl ConfigStore for NvsConfigStore {
    type Error = FirmwareError;

    fn load(&mut self) -> Result<Option<ClockConfig>, Self::Error> {
        let Some(wifi_ssid) = self.get_string(KEY_SSID)? else {
            return Ok(None);
        };

        let defaults = ClockConfig::default();
        let default_color = match self.get_string(KEY_COLOR)? {
            Some(hex) => parse_hex_color(&hex).unwrap_or_else(|err| {
                warn!("ignoring stored color '{hex}': {err}");
                defaults.default_color
            }),
            None => defaults.default_color,
        };

        Ok(Some(ClockConfig {
            wifi_ssid,
            wifi_password: self.get_string(KEY_PASSWORD)?.unwrap_or_default(),
            mqtt_host: self.get_string(KEY_MQTT_HOST)?.unwrap_or_default(),
            mqtt_port: self.nvs.get_u16(KEY_MQTT_PORT)?.unwrap_or(defaults.mqtt_port),
            color_topic: self
                .get_string(KEY_COLOR_TOPIC)?
                .unwrap_or(defaults.color_topic),
            brightness_topic: self
                .get_string(KEY_BRIGHTNESS_TOPIC)?
                .unwrap_or(defaults.brightness_topic),
            default_color,
            default_brightness: self
                .nvs
                .get_u8(KEY_BRIGHTNESS)?
                .unwrap_or(defaults.default_brightness),
        }))
    }

    fn save(&mut self, config: &ClockConfig) -> Result<(), Self::Error> {
        let color = config.default_color;
        self.nvs.set_str(KEY_SSID, &config.wifi_ssid)?;
        self.nvs.set_str(KEY_PASSWORD, &config.wifi_password)?;
        self.nvs.set_str(KEY_MQTT_HOST, &config.mqtt_host)?;
        self.nvs.set_u16(KEY_MQTT_PORT, config.mqtt_port)?;
        self.nvs.set_str(KEY_COLOR_TOPIC, &config.color_topic)?;
        self.nvs.set_str(KEY_BRIGHTNESS_TOPIC, &config.brightness_topic)?;
        self.nvs.set_str(
            KEY_COLOR,
            &format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b),
        )?;
        self.nvs.set_u8(KEY_BRIGHTNESS, config.default_brightness)?;
        Ok(())
    }
}
