//! Button debounce handling.
//!
//! Levels are sampled on the polling cadence and an edge is accepted only
//! after [`DEBOUNCE_SAMPLES`](crate::config::DEBOUNCE_SAMPLES) consecutive
//! identical readings, keeping the design single-threaded and deterministic
//! with no interrupt handlers. Press duration is counted in samples too:
//! holding past the long-press threshold fires [`Press::Long`] immediately,
//! a shorter hold fires [`Press::Short`] on release.

use crate::config::{DEBOUNCE_SAMPLES, LONG_PRESS_SAMPLES};

/// An accepted, debounced button press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Press {
    Short,
    Long,
}

/// Per-button debounce state with a stable-sample counter.
pub struct Debouncer {
    /// Debounced level (true = pressed).
    stable: bool,
    /// Consecutive samples disagreeing with the stable level.
    streak: u8,
    /// Samples the stable level has been held pressed.
    held: u16,
    /// Long press already reported for the current hold.
    long_fired: bool,
}

impl Debouncer {
    pub const fn new() -> Self {
        Self {
            stable: false,
            streak: 0,
            held: 0,
            long_fired: false,
        }
    }

    /// Feed one raw sample; returns a press when one completes.
    pub fn sample(&mut self, pressed: bool) -> Option<Press> {
        if pressed == self.stable {
            self.streak = 0;
        } else {
            self.streak += 1;
            if self.streak >= DEBOUNCE_SAMPLES {
                self.stable = pressed;
                self.streak = 0;
                if self.stable {
                    self.held = 0;
                    self.long_fired = false;
                } else if !self.long_fired {
                    return Some(Press::Short);
                }
            }
        }

        if self.stable {
            self.held = self.held.saturating_add(1);
            if self.held >= LONG_PRESS_SAMPLES && !self.long_fired {
                self.long_fired = true;
                return Some(Press::Long);
            }
        }

        None
    }
}

impl Default for Debouncer {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(d: &mut Debouncer, pressed: bool, samples: u16) -> Option<Press> {
        let mut event = None;
        for _ in 0..samples {
            if let Some(p) = d.sample(pressed) {
                assert!(event.is_none(), "more than one event for a single press");
                event = Some(p);
            }
        }
        event
    }

    #[test]
    fn test_short_press_fires_on_release() {
        let mut d = Debouncer::new();
        assert_eq!(run(&mut d, true, 10), None);
        assert_eq!(run(&mut d, false, 10), Some(Press::Short));
    }

    #[test]
    fn test_bounce_is_ignored() {
        let mut d = Debouncer::new();
        // Alternating samples never reach the stable threshold.
        for _ in 0..20 {
            assert_eq!(d.sample(true), None);
            assert_eq!(d.sample(false), None);
        }
    }

    #[test]
    fn test_glitch_shorter_than_threshold_is_ignored() {
        let mut d = Debouncer::new();
        assert_eq!(run(&mut d, true, u16::from(DEBOUNCE_SAMPLES) - 1), None);
        assert_eq!(run(&mut d, false, 10), None);
    }

    #[test]
    fn test_long_press_fires_while_held() {
        let mut d = Debouncer::new();
        assert_eq!(run(&mut d, true, LONG_PRESS_SAMPLES + 5), Some(Press::Long));
        // The release does not fire a second event.
        assert_eq!(run(&mut d, false, 10), None);
    }

    #[test]
    fn test_presses_repeat() {
        let mut d = Debouncer::new();
        for _ in 0..3 {
            assert_eq!(run(&mut d, true, 10), None);
            assert_eq!(run(&mut d, false, 10), Some(Press::Short));
        }
    }
}
