use smart_leds::RGB8;

/// Reasons a control payload is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("payload is empty")]
    Empty,
    #[error("expected 6 hex digits, got {0} characters")]
    BadLength(usize),
    #[error("'{0}' is not a hex color")]
    NotHex(String),
    #[error("'{0}' is not a number")]
    NotNumber(String),
    #[error("brightness {0} is out of range 0-255")]
    OutOfRange(i64),
    #[error("payload of {0} bytes is too long")]
    TooLong(usize),
    #[error("payload is not valid UTF-8")]
    NotUtf8,
}

/// Outcome of a valid color payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorUpdate {
    /// Override is now active with this color.
    Set(RGB8),
    /// Empty payload: override cleared, default color in effect.
    Cleared,
}

/// Parse `RRGGBB` or `#RRGGBB` into a color.
pub fn parse_hex_color(text: &str) -> Result<RGB8, PayloadError> {
    let hex = text.strip_prefix('#').unwrap_or(text);
    if hex.is_empty() {
        return Err(PayloadError::Empty);
    }
    if hex.len() != 6 {
        return Err(PayloadError::BadLength(hex.chars().count()));
    }
    // from_str_radix alone would accept a leading '+'
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(PayloadError::NotHex(text.to_string()));
    }
    let value =
        u32::from_str_radix(hex, 16).map_err(|_| PayloadError::NotHex(text.to_string()))?;
    Ok(RGB8::new((value >> 16) as u8, (value >> 8) as u8, value as u8))
}

/// Parse a decimal brightness in `0..=255`.
///
/// Only an optional `-` followed by ASCII digits is a number; no sign, no
/// whitespace.
pub fn parse_brightness(text: &str) -> Result<u8, PayloadError> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PayloadError::NotNumber(text.to_string()));
    }
    let value: i64 = text
        .parse()
        .map_err(|_| PayloadError::NotNumber(text.to_string()))?;
    u8::try_from(value).map_err(|_| PayloadError::OutOfRange(value))
}

/// Externally controlled color and brightness.
///
/// The color override supersedes the configured default only while active.
/// Brightness is a single value applied to every frame regardless of the
/// override flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOverride {
    active: bool,
    color: RGB8,
    brightness: u8,
    default_color: RGB8,
}

impl DisplayOverride {
    /// Inactive override falling back to `default_color`.
    pub const fn new(default_color: RGB8, brightness: u8) -> Self {
        Self {
            active: false,
            color: default_color,
            brightness,
            default_color,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Color to render with: the override if active, otherwise the default.
    #[inline]
    pub fn current_color(&self) -> RGB8 {
        if self.active {
            self.color
        } else {
            self.default_color
        }
    }

    /// Apply a color payload.
    ///
    /// An empty payload clears the override. A malformed one also clears it
    /// and is reported as an error.
    pub fn set_color_from_text(&mut self, text: &str) -> Result<ColorUpdate, PayloadError> {
        if text.is_empty() {
            self.clear();
            return Ok(ColorUpdate::Cleared);
        }
        match parse_hex_color(text) {
            Ok(color) => {
                self.active = true;
                self.color = color;
                Ok(ColorUpdate::Set(color))
            }
            Err(err) => {
                self.clear();
                Err(err)
            }
        }
    }

    /// Apply a color payload that may already have been rejected on receipt.
    ///
    /// A rejected payload counts as malformed and clears the override.
    pub fn set_color_from_payload(
        &mut self,
        payload: Result<&str, &PayloadError>,
    ) -> Result<ColorUpdate, PayloadError> {
        match payload {
            Ok(text) => self.set_color_from_text(text),
            Err(err) => {
                self.clear();
                Err(err.clone())
            }
        }
    }

    /// Apply a brightness payload. Invalid input leaves brightness unchanged.
    pub fn set_brightness_from_text(&mut self, text: &str) -> Result<u8, PayloadError> {
        let brightness = parse_brightness(text)?;
        self.brightness = brightness;
        Ok(brightness)
    }

    /// Deactivate the color override.
    #[inline]
    pub fn clear(&mut self) {
        self.active = false;
        self.color = self.default_color;
    }
}
