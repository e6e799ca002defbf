use core::ops::Range;

use smart_leds::RGB8;

use crate::segments::segments_for;

/// Number of pixels on the ring.
pub const NUM_LEDS: usize = 86;

/// All pixels off.
pub const OFF: RGB8 = RGB8 { r: 0, g: 0, b: 0 };

/// In-memory image of the LED ring, painted each cycle and then transmitted.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pixels: [RGB8; NUM_LEDS],
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    /// Create a frame with every pixel off.
    #[inline]
    pub const fn new() -> Self {
        Self {
            pixels: [OFF; NUM_LEDS],
        }
    }

    /// Turn every pixel off.
    #[inline]
    pub fn clear(&mut self) {
        self.pixels = [OFF; NUM_LEDS];
    }

    #[inline]
    pub fn pixel(&self, index: usize) -> Option<RGB8> {
        self.pixels.get(index).copied()
    }

    #[inline]
    pub fn pixels(&self) -> &[RGB8] {
        &self.pixels
    }

    /// Set a single pixel. Indices past the end of the ring are ignored.
    #[inline]
    pub fn set(&mut self, index: usize, color: RGB8) {
        if let Some(pixel) = self.pixels.get_mut(index) {
            *pixel = color;
        }
    }

    /// Paint `range` with `color`, clipped to the ring.
    pub fn fill_range(&mut self, range: Range<usize>, color: RGB8) {
        let end = range.end.min(NUM_LEDS);
        let start = range.start.min(end);
        self.pixels[start..end].fill(color);
    }

    /// Light the segments of `digit` in the slot starting at `base`.
    ///
    /// Anything other than a decimal digit paints nothing.
    pub fn render_digit(&mut self, digit: u8, base: usize, color: RGB8) {
        let Some(segments) = segments_for(digit) else {
            log::debug!("refusing to render non-digit {digit} at {base}");
            return;
        };
        for segment in segments {
            self.fill_range(segment.range(base), color);
        }
    }

    /// Indices of all pixels that are not off.
    pub fn lit_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.pixels
            .iter()
            .enumerate()
            .filter(|(_, pixel)| **pixel != OFF)
            .map(|(index, _)| index)
    }

    /// Pixel stream scaled by the global `brightness` (0-255), ready for a driver.
    pub fn scaled(&self, brightness: u8) -> impl Iterator<Item = RGB8> + '_ {
        smart_leds::brightness(self.pixels.iter().copied(), brightness)
    }
}

impl core::fmt::Debug for Frame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Frame")
            .field("lit", &self.lit_indices().collect::<Vec<_>>())
            .finish()
    }
}
