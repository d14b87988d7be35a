//! The compensation engine.
//!
//! Stars return to the same position every sidereal day, about 3m56s short
//! of the solar day the clock tracks, so a fixed RA axis drifts forward
//! against clock time by that amount each day. Given the stored anchor
//! ("RA = target was correct at this instant") and the current time, the
//! corrected axis value is the anchor target advanced by the elapsed time
//! scaled to the sidereal rate, wrapped onto the 24-hour circle.
//!
//! All arithmetic is integer fixed-point. The sidereal ratio is held as a
//! decimal fraction over 10^10 and applied in milliseconds with an `i128`
//! intermediate, then reduced with a floor-style modulo over one day, so
//! the result is exact to under a millisecond for any elapsed span the
//! `i64` clock can express and no error accumulates between cycles.

use crate::ra::{MS_PER_RA_DAY, Ra};

/// Ratio of the solar day to the sidereal day, as a fraction over
/// [`SIDEREAL_RATE_DEN`]: 1.0027379093.
const SIDEREAL_RATE_NUM: i128 = 10_027_379_093;

/// Denominator of the sidereal rate fraction.
const SIDEREAL_RATE_DEN: i128 = 10_000_000_000;

/// A recorded calibration: the RA the axis was set to and the instant,
/// in unix seconds UTC, at which that setting was correct.
///
/// Exactly one anchor is live at a time; it is created only by an explicit
/// user recalibration and survives power loss via the calibration store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalibrationAnchor {
    pub target: Ra,
    pub calibrated_at: i64,
}

/// Compute the corrected RA axis value for the current instant.
///
/// Pure and side-effect free; safe to call at any rate. `now` may be
/// earlier than the calibration instant (the clock was set backwards) -
/// the floor modulo keeps the result in `[0h, 24h)` either way.
pub fn compute(anchor: &CalibrationAnchor, now_unix: i64) -> Ra {
    let elapsed_seconds = now_unix - anchor.calibrated_at;

    // Sidereal-scaled elapsed time in milliseconds. The multiplication can
    // reach ~10^23 for extreme i64 inputs, hence the i128 intermediate.
    let sidereal_ms = elapsed_seconds as i128 * 1000 * SIDEREAL_RATE_NUM / SIDEREAL_RATE_DEN;

    // Floor-style modulo: non-negative even for negative elapsed time.
    let drift_ms = sidereal_ms.rem_euclid(MS_PER_RA_DAY as i128) as u32;

    anchor.target.wrapping_add_millis(drift_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ra::{MS_PER_RA_HOUR, MS_PER_RA_MINUTE};

    const T0: i64 = 1_700_000_000;

    fn anchor(hours: u8, minutes: u8) -> CalibrationAnchor {
        CalibrationAnchor {
            target: Ra::from_hm(hours, minutes),
            calibrated_at: T0,
        }
    }

    #[test]
    fn test_identity_at_calibration_instant() {
        let a = anchor(12, 0);
        assert_eq!(compute(&a, a.calibrated_at), a.target);
    }

    #[test]
    fn test_one_solar_day_drift() {
        // After 86400s: drift = 86400 * 1.0027379093 mod 86400 = 236.555s
        // = 0.0657h, so 12.0h reads ~12h04m.
        let a = anchor(12, 0);
        let ra = compute(&a, T0 + 86_400);
        let expected_ms = 12 * MS_PER_RA_HOUR + 236_555;
        assert!(ra.as_millis().abs_diff(expected_ms) < 10);
        assert_eq!(ra.whole_hours(), 12);
        assert_eq!(ra.minute_of_hour(), 3); // truncated; rounds to 4 on display
    }

    #[test]
    fn test_result_always_in_range() {
        let a = anchor(23, 54);
        for elapsed in [-86_400_000i64, -1, 0, 1, 3_600, 86_400, 31_536_000, 99 * 31_536_000] {
            let ra = compute(&a, T0 + elapsed);
            assert!(ra.as_millis() < MS_PER_RA_DAY);
        }
    }

    #[test]
    fn test_wraps_past_midnight() {
        // 23.9h anchor pushed past 24h within a few hours of drift.
        let a = CalibrationAnchor {
            target: Ra::from_millis(23 * MS_PER_RA_HOUR + 54 * MS_PER_RA_MINUTE),
            calibrated_at: T0,
        };
        // 6h of clock time adds slightly more than 6h of drift.
        let ra = compute(&a, T0 + 6 * 3_600);
        assert!(ra.as_millis() < MS_PER_RA_DAY);
        assert_eq!(ra.whole_hours(), 5);
    }

    #[test]
    fn test_negative_elapsed_is_not_an_error() {
        // Clock stepped back one hour: the axis value is simply behind the
        // anchor by a sidereal hour, wrapped into range.
        let a = anchor(0, 30);
        let ra = compute(&a, T0 - 3_600);
        let sidereal_hour_ms = 3_609_856; // 3600s * 1.0027379093 * 1000
        let expected = Ra::from_millis(MS_PER_RA_DAY + 30 * MS_PER_RA_MINUTE - sidereal_hour_ms);
        assert!(ra.as_millis().abs_diff(expected.as_millis()) < 10);
    }

    #[test]
    fn test_periodicity_over_one_year() {
        // 365 solar days are almost exactly 366 sidereal days, so the
        // computed value returns to the target to within about a minute.
        let a = anchor(5, 16);
        let ra = compute(&a, T0 + 365 * 86_400);
        let diff = ra.as_millis().abs_diff(a.target.as_millis());
        let wrapped_diff = diff.min(MS_PER_RA_DAY - diff);
        assert!(wrapped_diff < 2 * MS_PER_RA_MINUTE, "off by {wrapped_diff} ms");
    }

    #[test]
    fn test_multi_year_span_precision() {
        // Two computations a day apart must differ by the same drift no
        // matter how far from the anchor they are taken (nothing
        // accumulates with span).
        let a = anchor(12, 0);
        let near = compute(&a, T0 + 86_400).as_millis() as i64
            - compute(&a, T0).as_millis() as i64;
        let decade = 10 * 365 * 86_400;
        let far = compute(&a, T0 + decade + 86_400).as_millis() as i64
            - compute(&a, T0 + decade).as_millis() as i64;
        let day = i64::from(MS_PER_RA_DAY);
        // Truncating division may land the two spans on opposite sides of a
        // millisecond boundary, never further apart than that.
        assert!((near.rem_euclid(day) - far.rem_euclid(day)).abs() <= 1);
    }
}
