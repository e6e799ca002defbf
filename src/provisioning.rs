//! Setup form served while the device is in provisioning mode.

use std::fmt::Write as _;

use crate::config::{ClockConfig, ConfigError};
use crate::overrides::parse_hex_color;

/// SSID of the open access point used for setup.
pub const SETUP_AP_SSID: &str = "RingClock-Setup";

/// Path the form posts to.
pub const SUBMIT_PATH: &str = "/save";

/// Largest form body accepted.
pub const MAX_FORM_LEN: usize = 1024;

/// Page shown after a successful submission.
pub const SAVED_HTML: &str = "<!DOCTYPE html><html><body><h1>Saved</h1>\
<p>The clock is connecting to your network.</p></body></html>";

/// Render the setup form pre-filled from `config`. The password is never echoed.
pub fn render_form(config: &ClockConfig) -> String {
    let mut html = String::from(
        "<!DOCTYPE html><html><head><meta name=\"viewport\" \
         content=\"width=device-width\"><title>Ring Clock Setup</title></head><body>\
         <h1>Ring Clock Setup</h1>",
    );
    let _ = write!(html, "<form method=\"post\" action=\"{SUBMIT_PATH}\">");
    text_input(&mut html, "Wi-Fi network", "ssid", "text", &config.wifi_ssid);
    text_input(&mut html, "Wi-Fi password", "password", "password", "");
    text_input(&mut html, "MQTT host", "mqtt_host", "text", &config.mqtt_host);
    text_input(
        &mut html,
        "MQTT port",
        "mqtt_port",
        "number",
        &config.mqtt_port.to_string(),
    );
    text_input(&mut html, "Color topic", "color_topic", "text", &config.color_topic);
    text_input(
        &mut html,
        "Brightness topic",
        "brightness_topic",
        "text",
        &config.brightness_topic,
    );
    let color = config.default_color;
    text_input(
        &mut html,
        "Default color",
        "default_color",
        "text",
        &format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b),
    );
    html.push_str("<button type=\"submit\">Save</button></form></body></html>");
    html
}

fn text_input(html: &mut String, label: &str, name: &str, kind: &str, value: &str) {
    let _ = write!(
        html,
        "<p><label>{label}<br><input type=\"{kind}\" name=\"{name}\" value=\"{}\"></label></p>",
        escape_html(value)
    );
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Build a configuration from an `application/x-www-form-urlencoded` body.
///
/// Fields that are absent keep their value from `current`. A blank password
/// keeps the stored one as long as the SSID is unchanged.
pub fn parse_submission(body: &[u8], current: &ClockConfig) -> Result<ClockConfig, ConfigError> {
    let mut config = current.clone();
    let mut password = None;

    for (key, value) in form_urlencoded::parse(body) {
        let value = value.trim();
        match key.as_ref() {
            "ssid" => config.wifi_ssid = value.to_string(),
            "password" => password = Some(value.to_string()),
            "mqtt_host" => config.mqtt_host = value.to_string(),
            "mqtt_port" => {
                config.mqtt_port = value
                    .parse()
                    .map_err(|_| ConfigError::InvalidPort(value.to_string()))?;
            }
            "color_topic" => config.color_topic = value.to_string(),
            "brightness_topic" => config.brightness_topic = value.to_string(),
            "default_color" if !value.is_empty() => {
                config.default_color = parse_hex_color(value)
                    .map_err(|_| ConfigError::InvalidColor(value.to_string()))?;
            }
            _ => {}
        }
    }

    match password {
        Some(password) if !password.is_empty() || config.wifi_ssid != current.wifi_ssid => {
            config.wifi_password = password;
        }
        _ => {}
    }

    config.validate()?;
    Ok(config)
}
