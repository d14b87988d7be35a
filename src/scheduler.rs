//! The control loop state machine.
//!
//! One `poll()` call is one cycle: sample and debounce the buttons, read
//! the clock, compute and format the corrected RA, and push a frame to the
//! display only when it differs from the last one written. The firmware
//! calls `poll()` on a fixed interval and sleeps between calls.
//!
//! States:
//! - `Uncalibrated` - no valid anchor (first run, or the stored one failed
//!   validation). Shows the needs-calibration frame; only the calibration
//!   trigger is accepted.
//! - `Running` - periodic display refresh. The Mode button cycles between
//!   the corrected RA, the raw target RA and the clock; the Select button
//!   starts a recalibration.
//! - `Calibrating` - the target RA is edited field by field with Up/Down,
//!   Select switches fields, holding Select commits (capturing the current
//!   time as the new anchor instant), Mode cancels. A failed save shows
//!   the error frame and stays here so the user can retry.
//! - `SettingClock` - entered by holding Select from `Running` or
//!   `Uncalibrated`; the wall clock is edited field by field (year, month,
//!   day, hour, minute) and written to the RTC on commit. This is also the
//!   recovery path for an RTC that lost backup power and reads below the
//!   plausibility window.
//!
//! No condition stops the loop short of power loss: collaborator failures
//! are retried a bounded number of times within the cycle and then degrade
//! to the error frame.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use thiserror::Error;

use crate::config::{
    CLOCK_YEAR_MAX,
    CLOCK_YEAR_MIN,
    DEFAULT_CLOCK_YEAR,
    DEFAULT_TARGET_RA_HOURS,
    DEFAULT_TARGET_RA_MINUTES,
    IO_RETRY_COUNT,
    PLAUSIBLE_MAX_UNIX,
    PLAUSIBLE_MIN_UNIX,
};
use crate::debounce::{Debouncer, Press};
use crate::display::{DisplayDigits, format};
use crate::engine::{CalibrationAnchor, compute};
use crate::hal::{BUTTONS, Button, ButtonInput, DisplayDevice, HardwareError, NonVolatileStorage, TimeSource};
use crate::ra::Ra;
use crate::store::{CalibrationStore, LoadError};

/// Scheduler state. There is no terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Uncalibrated,
    Running,
    Calibrating,
    SettingClock,
}

/// What the Running state shows; cycled with the Mode button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayMode {
    CompensatedRa,
    TargetRa,
    Clock,
}

impl DisplayMode {
    const fn next(self) -> Self {
        match self {
            Self::CompensatedRa => Self::TargetRa,
            Self::TargetRa => Self::Clock,
            Self::Clock => Self::CompensatedRa,
        }
    }
}

/// Which half of the draft RA the editor is changing.
#[derive(Clone, Copy, PartialEq, Eq)]
enum EditField {
    Hours,
    Minutes,
}

/// Which component of the draft wall clock the clock editor is changing.
#[derive(Clone, Copy, PartialEq, Eq)]
enum ClockField {
    Year,
    Month,
    Day,
    Hour,
    Minute,
}

impl ClockField {
    const fn next(self) -> Self {
        match self {
            Self::Year => Self::Month,
            Self::Month => Self::Day,
            Self::Day => Self::Hour,
            Self::Hour => Self::Minute,
            Self::Minute => Self::Year,
        }
    }
}

/// Draft wall-clock value held while the clock editor is open.
#[derive(Clone, Copy)]
struct ClockDraft {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
}

impl ClockDraft {
    /// Seed for when the RTC reading is unusable.
    const fn fallback() -> Self {
        Self {
            year: DEFAULT_CLOCK_YEAR,
            month: 1,
            day: 1,
            hour: 12,
            minute: 0,
        }
    }

    fn from_datetime(now: NaiveDateTime) -> Self {
        Self {
            year: now.year() as u16,
            month: now.month() as u8,
            day: now.day() as u8,
            hour: now.hour() as u8,
            minute: now.minute() as u8,
        }
    }

    /// The committed instant, seconds zeroed. The day is clamped in case a
    /// month edit left it past the month's end.
    fn to_datetime(&self) -> Option<NaiveDateTime> {
        let day = self.day.min(days_in_month(self.year, self.month));
        NaiveDate::from_ymd_opt(i32::from(self.year), u32::from(self.month), u32::from(day))
            .and_then(|d| d.and_hms_opt(u32::from(self.hour), u32::from(self.minute), 0))
    }

    fn frame(&self, field: ClockField) -> DisplayDigits {
        match field {
            ClockField::Year => DisplayDigits::from_number(self.year),
            ClockField::Month | ClockField::Day => DisplayDigits::from_hm(self.month, self.day),
            ClockField::Hour | ClockField::Minute => DisplayDigits::from_hm(self.hour, self.minute),
        }
    }
}

const fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) {
                29
            } else {
                28
            }
        }
    }
}

/// A degraded condition observed during a cycle, for the firmware to log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("clock read failed: {0}")]
    Clock(HardwareError),
    /// The clock reported a value outside the sane window (unix seconds).
    #[error("implausible clock reading: {0}")]
    ImplausibleTime(i64),
    #[error("calibration save failed: {0}")]
    Save(HardwareError),
    #[error("clock set failed: {0}")]
    ClockSet(HardwareError),
    #[error("display write failed: {0}")]
    Render(HardwareError),
}

/// The control loop. Owns every collaborator and the loaded anchor; the
/// anchor is read from storage once at state entry and written only on an
/// explicit commit, never on the refresh path.
pub struct Scheduler<T, S, D, B> {
    time: T,
    store: CalibrationStore<S>,
    display: D,
    buttons: B,
    state: State,
    mode: DisplayMode,
    anchor: Option<CalibrationAnchor>,
    draft: Ra,
    field: EditField,
    clock_draft: ClockDraft,
    clock_field: ClockField,
    /// Latched after a failed commit until the next button press.
    commit_failed: bool,
    last_frame: Option<DisplayDigits>,
    debouncers: [Debouncer; 4],
    fault: Option<Fault>,
}

impl<T, S, D, B> Scheduler<T, S, D, B>
where
    T: TimeSource,
    S: NonVolatileStorage,
    D: DisplayDevice,
    B: ButtonInput,
{
    pub fn new(time: T, storage: S, display: D, buttons: B) -> Self {
        Self {
            time,
            store: CalibrationStore::new(storage),
            display,
            buttons,
            state: State::Uncalibrated,
            mode: DisplayMode::CompensatedRa,
            anchor: None,
            draft: Ra::from_hm(DEFAULT_TARGET_RA_HOURS, DEFAULT_TARGET_RA_MINUTES),
            field: EditField::Hours,
            clock_draft: ClockDraft::fallback(),
            clock_field: ClockField::Year,
            commit_failed: false,
            last_frame: None,
            debouncers: [const { Debouncer::new() }; 4],
            fault: None,
        }
    }

    /// Load the persisted anchor and pick the initial state.
    ///
    /// The error is returned so the caller can log the two failure kinds
    /// distinctly; either way the scheduler starts in `Uncalibrated`.
    pub fn init(&mut self) -> Result<(), LoadError> {
        match self.store.load() {
            Ok(anchor) => {
                self.anchor = Some(anchor);
                self.state = State::Running;
                Ok(())
            }
            Err(e) => {
                self.anchor = None;
                self.state = State::Uncalibrated;
                Err(e)
            }
        }
    }

    /// Current state, for logging.
    pub fn state(&self) -> State { self.state }

    /// Take the fault recorded by the last cycle, if any.
    pub fn take_fault(&mut self) -> Option<Fault> { self.fault.take() }

    /// Run one cycle of the control loop.
    pub fn poll(&mut self) {
        let presses = self.sample_buttons();

        // Any input acknowledges a latched commit failure.
        if self.commit_failed && presses.iter().any(Option::is_some) {
            self.commit_failed = false;
        }

        let frame = match self.state {
            State::Uncalibrated => self.poll_uncalibrated(&presses),
            State::Running => self.poll_running(&presses),
            State::Calibrating => self.poll_calibrating(&presses),
            State::SettingClock => self.poll_setting_clock(&presses),
        };

        self.render(frame);
    }

    fn sample_buttons(&mut self) -> [Option<Press>; 4] {
        let mut presses = [None; 4];
        for (i, id) in BUTTONS.iter().enumerate() {
            let raw = self.buttons.poll_pressed(*id);
            presses[i] = self.debouncers[i].sample(raw);
        }
        presses
    }

    fn press(presses: &[Option<Press>; 4], id: Button) -> Option<Press> {
        let idx = BUTTONS.iter().position(|b| *b == id)?;
        presses[idx]
    }

    fn poll_uncalibrated(&mut self, presses: &[Option<Press>; 4]) -> DisplayDigits {
        match Self::press(presses, Button::Select) {
            Some(Press::Short) => self.enter_calibrating(),
            Some(Press::Long) => self.enter_setting_clock(),
            None => {}
        }
        DisplayDigits::NEEDS_CALIBRATION
    }

    fn poll_running(&mut self, presses: &[Option<Press>; 4]) -> DisplayDigits {
        let Some(anchor) = self.anchor else {
            // Running without an anchor is a state bug; recover visibly.
            self.state = State::Uncalibrated;
            return DisplayDigits::NEEDS_CALIBRATION;
        };

        if Self::press(presses, Button::Mode) == Some(Press::Short) {
            self.mode = self.mode.next();
        }
        match Self::press(presses, Button::Select) {
            Some(Press::Short) => {
                self.enter_calibrating();
                return format(self.draft);
            }
            Some(Press::Long) => {
                self.enter_setting_clock();
                return self.clock_draft.frame(self.clock_field);
            }
            None => {}
        }

        match self.mode {
            DisplayMode::CompensatedRa => match self.read_clock_unix() {
                Ok(now) => format(compute(&anchor, now)),
                Err(_) => DisplayDigits::ERROR,
            },
            DisplayMode::TargetRa => format(anchor.target),
            DisplayMode::Clock => match self.read_clock() {
                Ok(now) => DisplayDigits::from_hm(now.hour() as u8, now.minute() as u8),
                Err(_) => DisplayDigits::ERROR,
            },
        }
    }

    fn poll_calibrating(&mut self, presses: &[Option<Press>; 4]) -> DisplayDigits {
        if Self::press(presses, Button::Mode) == Some(Press::Short) {
            // Cancel without writing anything.
            self.leave_editor();
            return self.state_entry_frame();
        }

        match Self::press(presses, Button::Select) {
            Some(Press::Short) => {
                self.field = match self.field {
                    EditField::Hours => EditField::Minutes,
                    EditField::Minutes => EditField::Hours,
                };
            }
            Some(Press::Long) => self.commit(),
            None => {}
        }

        if Self::press(presses, Button::Up) == Some(Press::Short) {
            self.adjust_draft(1);
        }
        if Self::press(presses, Button::Down) == Some(Press::Short) {
            self.adjust_draft(-1);
        }

        if self.state != State::Calibrating {
            // Commit succeeded this cycle.
            return self.state_entry_frame();
        }
        if self.commit_failed {
            DisplayDigits::ERROR
        } else {
            format(self.draft)
        }
    }

    fn poll_setting_clock(&mut self, presses: &[Option<Press>; 4]) -> DisplayDigits {
        if Self::press(presses, Button::Mode) == Some(Press::Short) {
            // Cancel without touching the RTC.
            self.leave_editor();
            return self.state_entry_frame();
        }

        match Self::press(presses, Button::Select) {
            Some(Press::Short) => self.clock_field = self.clock_field.next(),
            Some(Press::Long) => self.commit_clock(),
            None => {}
        }

        if Self::press(presses, Button::Up) == Some(Press::Short) {
            self.adjust_clock(1);
        }
        if Self::press(presses, Button::Down) == Some(Press::Short) {
            self.adjust_clock(-1);
        }

        if self.state != State::SettingClock {
            // Commit succeeded this cycle.
            return self.state_entry_frame();
        }
        if self.commit_failed {
            DisplayDigits::ERROR
        } else {
            self.clock_draft.frame(self.clock_field)
        }
    }

    fn enter_calibrating(&mut self) {
        self.draft = match self.anchor {
            Some(anchor) => anchor.target,
            None => Ra::from_hm(DEFAULT_TARGET_RA_HOURS, DEFAULT_TARGET_RA_MINUTES),
        };
        self.field = EditField::Hours;
        self.commit_failed = false;
        self.state = State::Calibrating;
    }

    /// Open the clock editor, seeded from the current reading when it is
    /// usable, else from the fallback draft.
    fn enter_setting_clock(&mut self) {
        let seed = self.read_clock().ok().filter(|now| {
            let year = now.year();
            year >= i32::from(CLOCK_YEAR_MIN) && year <= i32::from(CLOCK_YEAR_MAX)
        });
        self.clock_draft = match seed {
            Some(now) => ClockDraft::from_datetime(now),
            None => ClockDraft::fallback(),
        };
        self.clock_field = ClockField::Year;
        self.commit_failed = false;
        self.state = State::SettingClock;
    }

    /// Return from an editor to the state the anchor dictates.
    fn leave_editor(&mut self) {
        self.state = if self.anchor.is_some() {
            State::Running
        } else {
            State::Uncalibrated
        };
        self.commit_failed = false;
    }

    fn adjust_clock(&mut self, delta: i8) {
        let d = &mut self.clock_draft;
        match self.clock_field {
            ClockField::Year => {
                let span = i32::from(CLOCK_YEAR_MAX - CLOCK_YEAR_MIN) + 1;
                let offset = (i32::from(d.year) - i32::from(CLOCK_YEAR_MIN) + i32::from(delta))
                    .rem_euclid(span);
                d.year = CLOCK_YEAR_MIN + offset as u16;
            }
            ClockField::Month => {
                d.month = ((i16::from(d.month) - 1 + i16::from(delta)).rem_euclid(12) + 1) as u8;
            }
            ClockField::Day => {
                let len = i16::from(days_in_month(d.year, d.month));
                d.day = ((i16::from(d.day) - 1 + i16::from(delta)).rem_euclid(len) + 1) as u8;
            }
            ClockField::Hour => {
                d.hour = (i16::from(d.hour) + i16::from(delta)).rem_euclid(24) as u8;
            }
            ClockField::Minute => {
                d.minute = (i16::from(d.minute) + i16::from(delta)).rem_euclid(60) as u8;
            }
        }
    }

    /// Program the RTC from the draft. Stays in `SettingClock` on failure.
    fn commit_clock(&mut self) {
        let Some(now) = self.clock_draft.to_datetime() else {
            self.commit_failed = true;
            return;
        };

        let mut result = self.time.set_now(now);
        for _ in 0..IO_RETRY_COUNT {
            if result.is_ok() {
                break;
            }
            result = self.time.set_now(now);
        }

        match result {
            Ok(()) => self.leave_editor(),
            Err(e) => {
                self.fault = Some(Fault::ClockSet(e));
                self.commit_failed = true;
            }
        }
    }

    fn adjust_draft(&mut self, delta: i8) {
        let hours = self.draft.whole_hours();
        let minutes = self.draft.minute_of_hour();
        self.draft = match self.field {
            EditField::Hours => {
                Ra::from_hm((i16::from(hours) + i16::from(delta)).rem_euclid(24) as u8, minutes)
            }
            EditField::Minutes => {
                Ra::from_hm(hours, (i16::from(minutes) + i16::from(delta)).rem_euclid(60) as u8)
            }
        };
    }

    /// Build the new anchor from the draft and the current instant and
    /// persist it. Stays in `Calibrating` on any failure.
    fn commit(&mut self) {
        let now = match self.read_clock_unix() {
            Ok(now) => now,
            Err(_) => {
                self.commit_failed = true;
                return;
            }
        };

        let anchor = CalibrationAnchor {
            target: self.draft,
            calibrated_at: now,
        };

        let mut result = self.store.save(&anchor);
        for _ in 0..IO_RETRY_COUNT {
            if result.is_ok() {
                break;
            }
            result = self.store.save(&anchor);
        }

        match result {
            Ok(()) => {
                self.anchor = Some(anchor);
                self.state = State::Running;
                self.mode = DisplayMode::CompensatedRa;
            }
            Err(e) => {
                self.fault = Some(Fault::Save(e));
                self.commit_failed = true;
            }
        }
    }

    /// Frame to show immediately after a state transition, so the display
    /// updates in the same cycle as the transition.
    fn state_entry_frame(&mut self) -> DisplayDigits {
        match self.state {
            State::Uncalibrated => DisplayDigits::NEEDS_CALIBRATION,
            State::Calibrating => format(self.draft),
            State::SettingClock => self.clock_draft.frame(self.clock_field),
            State::Running => match (self.anchor, self.read_clock_unix()) {
                (Some(anchor), Ok(now)) => format(compute(&anchor, now)),
                _ => DisplayDigits::ERROR,
            },
        }
    }

    fn read_clock(&mut self) -> Result<chrono::NaiveDateTime, ()> {
        let mut result = self.time.now();
        for _ in 0..IO_RETRY_COUNT {
            if result.is_ok() {
                break;
            }
            result = self.time.now();
        }
        match result {
            Ok(now) => Ok(now),
            Err(e) => {
                self.fault = Some(Fault::Clock(e));
                Err(())
            }
        }
    }

    /// Clock reading as unix seconds, rejected if outside the sane window.
    fn read_clock_unix(&mut self) -> Result<i64, ()> {
        let now = self.read_clock()?.and_utc().timestamp();
        if !(PLAUSIBLE_MIN_UNIX..PLAUSIBLE_MAX_UNIX).contains(&now) {
            self.fault = Some(Fault::ImplausibleTime(now));
            return Err(());
        }
        Ok(now)
    }

    /// Write the frame to the hardware, skipping unchanged frames.
    fn render(&mut self, frame: DisplayDigits) {
        if self.last_frame == Some(frame) {
            return;
        }
        let mut result = self.display.render(&frame);
        for _ in 0..IO_RETRY_COUNT {
            if result.is_ok() {
                break;
            }
            result = self.display.render(&frame);
        }
        match result {
            Ok(()) => self.last_frame = Some(frame),
            Err(e) => {
                // Leave last_frame unset so the next cycle tries again.
                self.fault = Some(Fault::Render(e));
                self.last_frame = None;
            }
        }
    }
}
