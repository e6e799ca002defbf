use core::time::Duration;

use esp_idf_svc::hal::rmt::{PinState, Pulse, TxRmtDriver, VariableLengthSignal};
use smart_leds::RGB8;

use super::FirmwareError;
use crate::ClockDisplay;
use crate::frame::{Frame, NUM_LEDS};

/// Bits sent per pixel.
const BITS_PER_LED: usize = 24;

/// Pulses for one data bit: high time then low time.
#[derive(Debug, Clone, Copy)]
struct BitPulses {
    high: Pulse,
    low: Pulse,
}

/// WS2812 ring driven via the ESP32 RMT peripheral.
///
/// Each frame is encoded as one pulse train, GRB order, most significant
/// bit first.
pub struct Ws2812Ring {
    tx: TxRmtDriver<'static>,
    zero: BitPulses,
    one: BitPulses,
}

impl Ws2812Ring {
    /// Wrap an RMT channel already bound to the data pin.
    ///
    /// The channel must run with a clock divider small enough to resolve
    /// 350 ns.
    pub fn new(tx: TxRmtDriver<'static>) -> Result<Self, FirmwareError> {
        let ticks_hz = tx.counter_clock()?;
        let pulse = |state: PinState, nanos: u64| {
            Pulse::new_with_duration(ticks_hz, state, &Duration::from_nanos(nanos))
        };

        Ok(Self {
            zero: BitPulses {
                high: pulse(PinState::High, 350)?,
                low: pulse(PinState::Low, 800)?,
            },
            one: BitPulses {
                high: pulse(PinState::High, 700)?,
                low: pulse(PinState::Low, 600)?,
            },
            tx,
        })
    }

    fn encode(
        &self,
        pixels: impl Iterator<Item = RGB8>,
    ) -> Result<VariableLengthSignal, FirmwareError> {
        let mut signal = VariableLengthSignal::with_capacity(NUM_LEDS * BITS_PER_LED);
        for pixel in pixels {
            let grb = (u32::from(pixel.g) << 16) | (u32::from(pixel.r) << 8) | u32::from(pixel.b);
            for bit in (0..BITS_PER_LED).rev() {
                let pulses = if grb & (1 << bit) != 0 { &self.one } else { &self.zero };
                signal.push([&pulses.high, &pulses.low])?;
            }
        }
        Ok(signal)
    }
}

impl ClockDisplay for Ws2812Ring {
    type Error = FirmwareError;

    fn show(&mut self, frame: &Frame, brightness: u8) -> Result<(), Self::Error> {
        let signal = self.encode(frame.scaled(brightness))?;
        self.tx.start_blocking(&signal)?;
        Ok(())
    }
}
