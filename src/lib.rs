//! Firmware for a circular LED clock face.
//!
//! Time is drawn as four seven-segment style digits on an 86 pixel ring.
//! Color and brightness can be overridden at runtime over MQTT; network
//! time keeps the wall clock current.

pub mod app;
pub mod compositor;
pub mod config;
pub mod connectivity;
pub mod control;
pub mod frame;
pub mod overrides;
pub mod provisioning;
pub mod segments;
pub mod time;

/// Trait for pushing a rendered frame to the LEDs.
///
/// Abstracts over the WS2812 ring (ESP32) and terminal rendering,
/// providing a uniform interface for the output side of the render loop.
pub trait ClockDisplay {
    /// Error type for display update failures.
    type Error: std::fmt::Debug + std::fmt::Display;

    /// Transmit `frame`, scaled by the global `brightness` (0-255).
    fn show(&mut self, frame: &frame::Frame, brightness: u8) -> Result<(), Self::Error>;
}

#[cfg(target_os = "espidf")]
pub mod esp32;

#[cfg(not(target_os = "espidf"))]
pub mod mock;
