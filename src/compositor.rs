use smart_leds::RGB8;

use crate::frame::Frame;
use crate::time::TimeOfDay;

/// Base offset of the minutes-ones digit.
pub const MINUTES_ONES: usize = 0;
/// Base offset of the minutes-tens digit.
pub const MINUTES_TENS: usize = 21;
/// The two separator pixels between minutes and hours, lit every frame.
pub const SEPARATOR: [usize; 2] = [42, 43];
/// Base offset of the hours-ones digit (or the only hours digit before 10:00).
pub const HOURS_ONES: usize = 44;
/// Base offset of the hours-tens digit, dark before 10:00.
pub const HOURS_TENS: usize = 65;

/// Paint `time` onto `frame` in `color`, replacing whatever it held.
///
/// Hours below ten are drawn as a single digit in the hours-ones slot with
/// the tens slot left dark; there is no leading zero.
pub fn compose_frame(frame: &mut Frame, time: TimeOfDay, color: RGB8) {
    let (hour, minute) = (time.hour(), time.minute());

    frame.clear();
    frame.render_digit(minute % 10, MINUTES_ONES, color);
    frame.render_digit(minute / 10, MINUTES_TENS, color);
    for index in SEPARATOR {
        frame.set(index, color);
    }

    if hour > 9 {
        frame.render_digit(hour / 10, HOURS_TENS, color);
        frame.render_digit(hour % 10, HOURS_ONES, color);
    } else {
        frame.render_digit(hour, HOURS_ONES, color);
    }
}
