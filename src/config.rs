//! Build-time configuration constants.
//!
//! Everything tunable lives here: the polling cadence, the FRAM layout,
//! button debounce parameters and the plausibility window for clock
//! readings. There is no runtime configuration surface.

// =============================================================================
// Control Loop
// =============================================================================

/// Polling interval of the main loop in milliseconds.
///
/// 50 ms is fast enough for responsive buttons and far faster than the
/// display needs (the rendered value changes roughly every 15 seconds of
/// wall time at sidereal drift rates).
pub const POLL_INTERVAL_MS: u64 = 50;

/// Bounded retry count for a failing collaborator I/O call within one cycle.
/// After this many consecutive failures the cycle degrades to the error
/// frame instead of halting the loop.
pub const IO_RETRY_COUNT: u8 = 3;

// =============================================================================
// Button Debounce
// =============================================================================

/// Consecutive identical samples required before a button edge is accepted.
/// At the 50 ms poll interval this is 150 ms of stable signal.
pub const DEBOUNCE_SAMPLES: u8 = 3;

/// Held samples that turn a press into a long press (2 s at 50 ms polls).
pub const LONG_PRESS_SAMPLES: u16 = 40;

// =============================================================================
// FRAM Layout
// =============================================================================

/// Byte offset of calibration slot A in the FRAM.
pub const SLOT_A_OFFSET: u16 = 0;

/// Byte offset of calibration slot B in the FRAM.
pub const SLOT_B_OFFSET: u16 = 16;

/// Size of one calibration slot in bytes.
pub const SLOT_LEN: usize = 16;

// =============================================================================
// Time Plausibility
// =============================================================================

/// Earliest clock reading accepted as sane: 2022-01-01T00:00:00Z, before
/// which no unit of this device existed. An RTC that lost its backup
/// supply resets to 2000 and lands well below this.
pub const PLAUSIBLE_MIN_UNIX: i64 = 1_640_995_200;

/// Latest clock reading accepted as sane: 2100-01-01T00:00:00Z.
pub const PLAUSIBLE_MAX_UNIX: i64 = 4_102_444_800;

// =============================================================================
// Clock Editor
// =============================================================================

/// Year range the clock editor offers; matches the plausibility window.
pub const CLOCK_YEAR_MIN: u16 = 2022;

/// Upper end of the clock editor year range.
pub const CLOCK_YEAR_MAX: u16 = 2099;

/// Year seeding the clock editor when the RTC reading is unusable (a part
/// that lost backup power resets to 2000).
pub const DEFAULT_CLOCK_YEAR: u16 = 2025;

// =============================================================================
// Calibration Defaults
// =============================================================================

/// Default target RA hours seeded into the editor on a never-calibrated
/// device: Capella, the brightest star in Auriga (5h16m).
pub const DEFAULT_TARGET_RA_HOURS: u8 = 5;

/// Default target RA minutes (see [`DEFAULT_TARGET_RA_HOURS`]).
pub const DEFAULT_TARGET_RA_MINUTES: u8 = 16;
