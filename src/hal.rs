//! Collaborator contracts consumed by the core.
//!
//! The device set is fixed and known, so there is no dynamic dispatch in the
//! firmware; the traits exist so the scheduler stays generic over its
//! collaborators and the host tests can substitute in-memory doubles.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::display::DisplayDigits;

/// A bus or device failure on a collaborator call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum HardwareError {
    /// The I2C transfer failed or was not acknowledged.
    #[error("bus transfer failed")]
    Bus,
}

/// Real-time clock access.
///
/// Readings are wall-clock UTC; the scheduler rejects implausible values
/// itself, so implementations only report transport failures. `set_now`
/// programs the clock hardware, used by the clock editor.
pub trait TimeSource {
    fn now(&mut self) -> Result<NaiveDateTime, HardwareError>;
    fn set_now(&mut self, now: NaiveDateTime) -> Result<(), HardwareError>;
}

/// Byte-addressable non-volatile memory.
///
/// Write endurance is finite; callers must keep writes off the periodic
/// refresh path.
pub trait NonVolatileStorage {
    fn read_bytes(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), HardwareError>;
    fn write_bytes(&mut self, offset: u16, bytes: &[u8]) -> Result<(), HardwareError>;
}

/// The dual dot-matrix display, rendered one whole frame at a time.
pub trait DisplayDevice {
    fn render(&mut self, frame: &DisplayDigits) -> Result<(), HardwareError>;
}

/// The four control buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Button {
    /// Cycles the running display mode; cancels an edit in progress.
    Mode,
    /// Enters calibration (held: the clock editor), switches the edited
    /// field, commits when held in an editor.
    Select,
    /// Decrements the edited field.
    Down,
    /// Increments the edited field.
    Up,
}

/// All buttons, in scheduler sampling order.
pub const BUTTONS: [Button; 4] = [Button::Mode, Button::Select, Button::Down, Button::Up];

/// Raw button sampling. Levels are read by polling, never by interrupt;
/// debouncing happens in the scheduler.
pub trait ButtonInput {
    fn poll_pressed(&mut self, id: Button) -> bool;
}
