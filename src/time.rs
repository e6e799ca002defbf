use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

/// Timezone the clock face displays.
pub const TIMEZONE: Tz = chrono_tz::Europe::Berlin;

/// Wall-clock hour and minute, as shown on the face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Returns `None` unless `hour < 24` and `minute < 60`.
    pub const fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    #[inline]
    pub const fn hour(self) -> u8 {
        self.hour
    }

    #[inline]
    pub const fn minute(self) -> u8 {
        self.minute
    }

    /// Local time of day for a UTC instant.
    pub fn from_utc(instant: DateTime<Utc>) -> Self {
        let local = instant.with_timezone(&TIMEZONE);
        // chrono guarantees hour < 24 and minute < 60
        Self {
            hour: local.hour() as u8,
            minute: local.minute() as u8,
        }
    }
}

impl core::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl core::str::FromStr for TimeOfDay {
    type Err = ParseTimeError;

    /// Parses `H:MM` or `HH:MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseTimeError(s.to_string());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(err)?;
        if minute.len() != 2 {
            return Err(err());
        }
        let hour = hour.parse().map_err(|_| err())?;
        let minute = minute.parse().map_err(|_| err())?;
        Self::new(hour, minute).ok_or_else(err)
    }
}

/// Error when parsing a time of day.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time of day: '{0}'")]
pub struct ParseTimeError(String);

/// Source of the time shown on the face.
pub trait TimeSource {
    fn now(&self) -> TimeOfDay;
}

/// Reads the system wall clock (kept current by network time sync) in [`TIMEZONE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl TimeSource for LocalClock {
    fn now(&self) -> TimeOfDay {
        TimeOfDay::from_utc(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    #[test_case(0, 0; "midnight")]
    #[test_case(23, 59; "last minute")]
    fn accepts_valid_time(hour: u8, minute: u8) {
        let time = TimeOfDay::new(hour, minute).expect("valid");
        assert_eq!((time.hour(), time.minute()), (hour, minute));
    }

    #[test_case(24, 0; "hour overflow")]
    #[test_case(12, 60; "minute overflow")]
    fn rejects_invalid_time(hour: u8, minute: u8) {
        assert_eq!(TimeOfDay::new(hour, minute), None);
    }

    #[test]
    fn winter_time_is_utc_plus_one() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap();
        assert_eq!(TimeOfDay::from_utc(instant), TimeOfDay::new(9, 30).unwrap());
    }

    #[test]
    fn summer_time_is_utc_plus_two() {
        let instant = Utc.with_ymd_and_hms(2024, 7, 15, 22, 5, 0).unwrap();
        assert_eq!(TimeOfDay::from_utc(instant), TimeOfDay::new(0, 5).unwrap());
    }

    #[test_case("9:05", 9, 5; "single hour digit")]
    #[test_case("23:59", 23, 59; "two hour digits")]
    fn parse_time(input: &str, hour: u8, minute: u8) {
        assert_eq!(input.parse(), Ok(TimeOfDay::new(hour, minute).unwrap()));
    }

    #[test_case("24:00"; "hour out of range")]
    #[test_case("12:5"; "short minute")]
    #[test_case("noon"; "no colon")]
    fn parse_time_rejects(input: &str) {
        assert!(input.parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn display_pads_digits() {
        assert_eq!(TimeOfDay::new(7, 3).unwrap().to_string(), "07:03");
    }
}
