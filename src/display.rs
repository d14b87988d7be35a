//! Display frame encoding.
//!
//! The hardware is a pair of LTP305 modules, each showing two 5x7
//! characters: the left pair is the hour group, the right pair the minute
//! group. A frame is therefore four ASCII glyphs. Frames compare for
//! equality so the scheduler can skip the I2C write when nothing changed.

use crate::ra::{MS_PER_RA_MINUTE, Ra};

/// One frame for the four-character display: hour pair then minute pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayDigits([u8; 4]);

impl DisplayDigits {
    /// Shown while no valid calibration exists.
    pub const NEEDS_CALIBRATION: Self = Self(*b"CAL ");

    /// Shown when a collaborator keeps failing or the clock is implausible.
    pub const ERROR: Self = Self(*b"Err ");

    /// A zero-padded hour/minute pair, e.g. the clock or an RA value.
    pub const fn from_hm(hours: u8, minutes: u8) -> Self {
        Self([
            b'0' + hours / 10,
            b'0' + hours % 10,
            b'0' + minutes / 10,
            b'0' + minutes % 10,
        ])
    }

    /// A zero-padded four-digit number, e.g. the clock editor's year frame.
    pub const fn from_number(value: u16) -> Self {
        let v = value % 10_000;
        Self([
            b'0' + (v / 1000) as u8,
            b'0' + (v / 100 % 10) as u8,
            b'0' + (v / 10 % 10) as u8,
            b'0' + (v % 10) as u8,
        ])
    }

    /// The four glyphs, left to right.
    #[inline]
    pub const fn glyphs(&self) -> &[u8; 4] { &self.0 }
}

/// Encode an RA value for the display.
///
/// Minutes are rounded to nearest, carrying into the hour group and
/// wrapping 24h back to 0h when the carry lands on a full day.
pub fn format(ra: Ra) -> DisplayDigits {
    let total_minutes = (ra.as_millis() + MS_PER_RA_MINUTE / 2) / MS_PER_RA_MINUTE;
    let hours = (total_minutes / 60 % 24) as u8;
    let minutes = (total_minutes % 60) as u8;
    DisplayDigits::from_hm(hours, minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ra::MS_PER_RA_HOUR;

    #[test]
    fn test_format_plain_value() {
        assert_eq!(format(Ra::from_hm(5, 16)), DisplayDigits(*b"0516"));
        assert_eq!(format(Ra::from_hm(0, 0)), DisplayDigits(*b"0000"));
        assert_eq!(format(Ra::from_hm(23, 59)), DisplayDigits(*b"2359"));
    }

    #[test]
    fn test_format_rounds_to_nearest_minute() {
        // 12h30m29.9s rounds down, 12h30m30s rounds up.
        let base = 12 * MS_PER_RA_HOUR + 30 * MS_PER_RA_MINUTE;
        assert_eq!(format(Ra::from_millis(base + 29_900)), DisplayDigits(*b"1230"));
        assert_eq!(format(Ra::from_millis(base + 30_000)), DisplayDigits(*b"1231"));
    }

    #[test]
    fn test_format_carries_into_hour() {
        // 9h59m45s rounds to 10h00m.
        let ra = Ra::from_millis(9 * MS_PER_RA_HOUR + 59 * MS_PER_RA_MINUTE + 45_000);
        assert_eq!(format(ra), DisplayDigits(*b"1000"));
    }

    #[test]
    fn test_format_wraps_midnight_carry() {
        // 23.999h = 23h59m56.4s rounds to 24h00m, which wraps to 00h00m.
        let ra = Ra::from_millis(86_396_400);
        assert_eq!(format(ra), DisplayDigits(*b"0000"));
    }

    #[test]
    fn test_from_number_zero_pads() {
        assert_eq!(DisplayDigits::from_number(2025), DisplayDigits(*b"2025"));
        assert_eq!(DisplayDigits::from_number(7), DisplayDigits(*b"0007"));
    }

    #[test]
    fn test_indicator_frames_are_distinct() {
        assert_ne!(DisplayDigits::NEEDS_CALIBRATION, DisplayDigits::ERROR);
        assert_ne!(DisplayDigits::NEEDS_CALIBRATION, format(Ra::from_hm(0, 0)));
    }
}
