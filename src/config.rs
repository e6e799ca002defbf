use smart_leds::RGB8;

use crate::control::ControlTopics;

/// Default MQTT broker port.
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Color used while no override is active.
pub const DEFAULT_COLOR: RGB8 = RGB8 {
    r: 255,
    g: 255,
    b: 255,
};

/// Brightness before the first brightness message arrives.
pub const DEFAULT_BRIGHTNESS: u8 = 64;

/// Loop and reconnect timing.
pub mod timing {
    use std::time::Duration;

    /// Pause between two render cycles.
    pub const FRAME_INTERVAL: Duration = Duration::from_secs(1);

    /// Network time is refreshed at least this often.
    pub const RESYNC_INTERVAL: Duration = Duration::from_secs(15 * 60);

    /// How long a link reconnect may poll before giving up for the cycle.
    pub const LINK_RECONNECT_WINDOW: Duration = Duration::from_secs(10);

    /// Poll period while waiting for the link to come up.
    pub const LINK_POLL_INTERVAL: Duration = Duration::from_secs(1);

    /// First wait after a failed bus connect.
    pub const BUS_BACKOFF_INITIAL: Duration = Duration::from_secs(2);

    /// Upper bound for the bus backoff.
    pub const BUS_BACKOFF_MAX: Duration = Duration::from_secs(60);

    /// Bus connect attempts made within one cycle.
    pub const BUS_ATTEMPTS_PER_CYCLE: u32 = 1;
}

/// Error types for configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("invalid port '{0}'")]
    InvalidPort(String),
    #[error("invalid color '{0}'")]
    InvalidColor(String),
}

/// Everything the device needs to get online and listen for control messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockConfig {
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub color_topic: String,
    pub brightness_topic: String,
    pub default_color: RGB8,
    pub default_brightness: u8,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            mqtt_host: String::new(),
            mqtt_port: DEFAULT_MQTT_PORT,
            color_topic: "ringclock/color".to_string(),
            brightness_topic: "ringclock/brightness".to_string(),
            default_color: DEFAULT_COLOR,
            default_brightness: DEFAULT_BRIGHTNESS,
        }
    }
}

impl ClockConfig {
    /// Fill empty network fields from values baked in at build time.
    pub fn with_build_defaults(mut self) -> Self {
        fill_from(&mut self.wifi_ssid, option_env!("CLOCK_WIFI_SSID"));
        fill_from(&mut self.wifi_password, option_env!("CLOCK_WIFI_PASSWORD"));
        fill_from(&mut self.mqtt_host, option_env!("CLOCK_MQTT_HOST"));
        self
    }

    /// Topic names for subscription and routing.
    pub fn topics(&self) -> ControlTopics {
        ControlTopics {
            color: self.color_topic.clone(),
            brightness: self.brightness_topic.clone(),
        }
    }

    /// Broker URL in the form the MQTT client expects.
    pub fn mqtt_url(&self) -> String {
        format!("mqtt://{}:{}", self.mqtt_host, self.mqtt_port)
    }

    /// Check the fields required for normal operation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("ssid", &self.wifi_ssid),
            ("mqtt_host", &self.mqtt_host),
            ("color_topic", &self.color_topic),
            ("brightness_topic", &self.brightness_topic),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField(name));
            }
        }
        if self.mqtt_port == 0 {
            return Err(ConfigError::InvalidPort(self.mqtt_port.to_string()));
        }
        Ok(())
    }
}

fn fill_from(field: &mut String, fallback: Option<&str>) {
    if field.is_empty()
        && let Some(value) = fallback
    {
        *field = value.trim().to_string();
    }
}

/// Persistent storage for [`ClockConfig`].
pub trait ConfigStore {
    /// Error type for storage failures.
    type Error: std::fmt::Debug + std::fmt::Display;

    /// Load the stored config, or `None` if nothing has been stored yet.
    fn load(&mut self) -> Result<Option<ClockConfig>, Self::Error>;

    fn save(&mut self, config: &ClockConfig) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn complete() -> ClockConfig {
        ClockConfig {
            wifi_ssid: "home".into(),
            wifi_password: "secret".into(),
            mqtt_host: "broker.local".into(),
            ..ClockConfig::default()
        }
    }

    #[test]
    fn default_needs_provisioning() {
        assert_eq!(
            ClockConfig::default().validate(),
            Err(ConfigError::MissingField("ssid"))
        );
    }

    #[test]
    fn complete_config_validates() {
        assert_eq!(complete().validate(), Ok(()));
    }

    #[test_case(|c: &mut ClockConfig| c.wifi_ssid.clear(), "ssid"; "ssid")]
    #[test_case(|c: &mut ClockConfig| c.mqtt_host = " ".into(), "mqtt_host"; "blank host")]
    #[test_case(|c: &mut ClockConfig| c.color_topic.clear(), "color_topic"; "color topic")]
    #[test_case(|c: &mut ClockConfig| c.brightness_topic.clear(), "brightness_topic"; "brightness topic")]
    fn missing_field_is_reported(mutate: fn(&mut ClockConfig), field: &'static str) {
        let mut config = complete();
        mutate(&mut config);
        assert_eq!(config.validate(), Err(ConfigError::MissingField(field)));
    }

    #[test]
    fn zero_port_is_invalid() {
        let config = ClockConfig {
            mqtt_port: 0,
            ..complete()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidPort("0".into())));
    }

    #[test]
    fn mqtt_url_includes_port() {
        assert_eq!(complete().mqtt_url(), "mqtt://broker.local:1883");
    }

    #[test]
    fn topics_follow_config() {
        let topics = complete().topics();
        assert_eq!(topics.color, "ringclock/color");
        assert_eq!(topics.brightness, "ringclock/brightness");
    }

    #[test]
    fn build_defaults_do_not_override_stored_values() {
        let config = complete().with_build_defaults();
        assert_eq!(config.wifi_ssid, "home");
        assert_eq!(config.mqtt_host, "broker.local");
    }
}
