//! Right-ascension value type.
//!
//! RA is a celestial coordinate measured in hours over a 24-hour circle.
//! Internally a value is a count of milliseconds of the RA day, which keeps
//! the drift arithmetic in exact integers; one display minute is 60 000
//! units, so the representation carries far more resolution than the
//! two-digit minute group can show.

/// Milliseconds in one full RA circle (24 hours).
pub const MS_PER_RA_DAY: u32 = 86_400_000;

/// Milliseconds in one RA hour.
pub const MS_PER_RA_HOUR: u32 = 3_600_000;

/// Milliseconds in one RA minute.
pub const MS_PER_RA_MINUTE: u32 = 60_000;

/// A right-ascension value, always normalized to `[0h, 24h)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ra {
    millis: u32,
}

impl Ra {
    /// Create a value from milliseconds of the RA day, wrapping into range.
    pub const fn from_millis(millis: u32) -> Self {
        Self {
            millis: millis % MS_PER_RA_DAY,
        }
    }

    /// Create a value from whole hours and minutes, wrapping into range.
    pub const fn from_hm(hours: u8, minutes: u8) -> Self {
        Self::from_millis(hours as u32 * MS_PER_RA_HOUR + minutes as u32 * MS_PER_RA_MINUTE)
    }

    /// Raw milliseconds of the RA day.
    #[inline]
    pub const fn as_millis(&self) -> u32 { self.millis }

    /// Whole hours, truncated (0..=23).
    #[inline]
    pub const fn whole_hours(&self) -> u8 { (self.millis / MS_PER_RA_HOUR) as u8 }

    /// Minute within the hour, truncated (0..=59).
    #[inline]
    pub const fn minute_of_hour(&self) -> u8 {
        (self.millis % MS_PER_RA_HOUR / MS_PER_RA_MINUTE) as u8
    }

    /// This value shifted by a millisecond offset, wrapped into range.
    pub const fn wrapping_add_millis(&self, offset: u32) -> Self {
        // Both operands are below MS_PER_RA_DAY so the sum cannot overflow u32.
        Self::from_millis(self.millis + (offset % MS_PER_RA_DAY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hm() {
        let ra = Ra::from_hm(5, 16);
        assert_eq!(ra.whole_hours(), 5);
        assert_eq!(ra.minute_of_hour(), 16);
        assert_eq!(ra.as_millis(), 5 * MS_PER_RA_HOUR + 16 * MS_PER_RA_MINUTE);
    }

    #[test]
    fn test_from_millis_wraps() {
        let ra = Ra::from_millis(MS_PER_RA_DAY + 1234);
        assert_eq!(ra.as_millis(), 1234);
    }

    #[test]
    fn test_from_hm_wraps_past_midnight() {
        // 24h00m wraps to 0h00m
        assert_eq!(Ra::from_hm(24, 0), Ra::from_hm(0, 0));
    }

    #[test]
    fn test_wrapping_add_millis() {
        let ra = Ra::from_hm(23, 54);
        let shifted = ra.wrapping_add_millis(10 * MS_PER_RA_MINUTE);
        assert_eq!(shifted, Ra::from_hm(0, 4));
    }

    #[test]
    fn test_accessors_truncate() {
        // 12h30m plus 59.9s: still reads as 12h30m
        let ra = Ra::from_millis(12 * MS_PER_RA_HOUR + 30 * MS_PER_RA_MINUTE + 59_900);
        assert_eq!(ra.whole_hours(), 12);
        assert_eq!(ra.minute_of_hour(), 30);
    }
}
