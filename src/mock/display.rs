use std::io::{self, Write};

use smart_leds::RGB8;

use crate::ClockDisplay;
use crate::compositor::{HOURS_ONES, HOURS_TENS, MINUTES_ONES, MINUTES_TENS, SEPARATOR};
use crate::frame::{Frame, OFF};
use crate::segments::Segment;

/// Digit slots in reading order, left to right.
const SLOTS: [usize; 4] = [HOURS_TENS, HOURS_ONES, MINUTES_TENS, MINUTES_ONES];

/// Terminal-based clock face for development and testing.
///
/// Draws each digit slot as a seven-segment glyph in the pixel's
/// brightness-scaled truecolor, followed by the raw ring.
#[derive(Debug, Default)]
pub struct TerminalDisplay;

impl TerminalDisplay {
    pub fn new() -> Self {
        Self
    }
}

/// Error type for host display operations.
#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    #[error("failed to write to terminal: {0}")]
    Io(#[from] io::Error),
    #[error("display is offline")]
    Offline,
}

impl ClockDisplay for TerminalDisplay {
    type Error = DisplayError;

    fn show(&mut self, frame: &Frame, brightness: u8) -> Result<(), Self::Error> {
        render_frame(&mut io::stdout(), frame, brightness)
    }
}

/// Render a frame to any writer. Extracted for testability.
pub fn render_frame(w: &mut impl Write, frame: &Frame, brightness: u8) -> Result<(), DisplayError> {
    let scaled: Vec<RGB8> = frame.scaled(brightness).collect();
    let paint = |index: usize, glyph: &str| -> String {
        match frame.pixel(index) {
            Some(pixel) if pixel != OFF => {
                let c = scaled[index];
                format!("\x1b[38;2;{};{};{}m{glyph}\x1b[0m", c.r, c.g, c.b)
            }
            _ => " ".repeat(glyph.chars().count()),
        }
    };
    let horizontal = |base: usize, segment: Segment| paint(segment.range(base).start, "███");
    let vertical = |base: usize, segment: Segment| paint(segment.range(base).start, "█");

    for row in 0..5 {
        for (slot, base) in SLOTS.into_iter().enumerate() {
            let cell = match row {
                0 => format!(" {} ", horizontal(base, Segment::Top)),
                1 => format!(
                    "{}   {}",
                    vertical(base, Segment::UpperLeft),
                    vertical(base, Segment::UpperRight)
                ),
                2 => format!(" {} ", horizontal(base, Segment::Middle)),
                3 => format!(
                    "{}   {}",
                    vertical(base, Segment::LowerLeft),
                    vertical(base, Segment::LowerRight)
                ),
                _ => format!(" {} ", horizontal(base, Segment::Bottom)),
            };
            write!(w, " {cell}")?;
            if slot == 1 {
                let dot = match row {
                    1 => paint(SEPARATOR[0], "•"),
                    3 => paint(SEPARATOR[1], "•"),
                    _ => " ".to_string(),
                };
                write!(w, " {dot}")?;
            }
        }
        writeln!(w)?;
    }

    writeln!(w)?;
    let ring: String = (0..frame.pixels().len())
        .map(|index| match frame.pixel(index) {
            Some(pixel) if pixel != OFF => paint(index, "●"),
            _ => "·".to_string(),
        })
        .collect();
    writeln!(w, " {ring}")?;
    writeln!(
        w,
        " brightness {brightness:3} | lit {:2}",
        frame.lit_indices().count()
    )?;
    w.flush()?;
    Ok(())
}

/// Display that keeps the last frame it was shown instead of drawing it.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    last: Option<(Frame, u8)>,
    frames: u32,
    failing: bool,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent [`show`](ClockDisplay::show) calls fail.
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    /// Frames accepted so far.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last.as_ref().map(|(frame, _)| frame)
    }

    pub fn last_brightness(&self) -> Option<u8> {
        self.last.as_ref().map(|(_, brightness)| *brightness)
    }
}

impl ClockDisplay for RecordingDisplay {
    type Error = DisplayError;

    fn show(&mut self, frame: &Frame, brightness: u8) -> Result<(), Self::Error> {
        if self.failing {
            return Err(DisplayError::Offline);
        }
        self.last = Some((frame.clone(), brightness));
        self.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::compose_frame;
    use crate::time::TimeOfDay;

    const RED: RGB8 = RGB8 { r: 255, g: 0, b: 0 };

    fn render_to_string(frame: &Frame, brightness: u8) -> String {
        let mut buf = Vec::new();
        render_frame(&mut buf, frame, brightness).expect("rendering to buffer should succeed");
        String::from_utf8(buf).expect("output should be valid UTF-8")
    }

    fn clock(hour: u8, minute: u8) -> Frame {
        let mut frame = Frame::new();
        compose_frame(
            &mut frame,
            TimeOfDay::new(hour, minute).expect("valid time"),
            RED,
        );
        frame
    }

    #[test]
    fn dark_frame_has_no_color_codes() {
        let output = render_to_string(&Frame::new(), 255);

        assert!(!output.contains("\x1b[38;2"), "dark frame should not be colored");
        assert!(output.contains("lit  0"));
    }

    #[test]
    fn lit_pixels_use_truecolor() {
        let output = render_to_string(&clock(12, 34), 255);

        assert!(
            output.contains("\x1b[38;2;255;0;0m"),
            "lit segments should be drawn in red"
        );
    }

    #[test]
    fn brightness_scales_rendered_color() {
        let output = render_to_string(&clock(12, 34), 0);

        assert!(output.contains("\x1b[38;2;0;0;0m"));
        assert!(!output.contains("\x1b[38;2;255;0;0m"));
        assert!(output.contains("brightness   0"));
    }

    #[test]
    fn separator_is_drawn() {
        let output = render_to_string(&clock(1, 0), 255);

        assert!(output.contains("\x1b[38;2;255;0;0m•\x1b[0m"));
    }

    #[test]
    fn lit_count_matches_frame() {
        let frame = clock(8, 8);
        let output = render_to_string(&frame, 255);

        assert!(output.contains(&format!("lit {:2}", frame.lit_indices().count())));
    }

    #[test]
    fn recording_display_keeps_last_frame() {
        let mut display = RecordingDisplay::new();
        let frame = clock(9, 5);

        display.show(&Frame::new(), 10).expect("accepted");
        display.show(&frame, 20).expect("accepted");

        assert_eq!(display.frames(), 2);
        assert_eq!(display.last_frame(), Some(&frame));
        assert_eq!(display.last_brightness(), Some(20));
    }

    #[test]
    fn failing_recording_display_rejects_frames() {
        let mut display = RecordingDisplay::new();
        display.set_failing(true);

        assert!(matches!(
            display.show(&Frame::new(), 10),
            Err(DisplayError::Offline)
        ));
        assert_eq!(display.frames(), 0);
    }
}
