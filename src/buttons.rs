//! Button sampling for the four control buttons.
//!
//! The buttons sit on GPIO11..14 and are pulled down on the breadboard, so
//! pressed reads high. Levels are only sampled here; debouncing is the
//! scheduler's stable-sample counter.

use embassy_rp::gpio::Input;
use ra_compensator::hal::{Button, ButtonInput};

pub struct Buttons {
    mode: Input<'static>,
    select: Input<'static>,
    down: Input<'static>,
    up: Input<'static>,
}

impl Buttons {
    pub const fn new(
        mode: Input<'static>,
        select: Input<'static>,
        down: Input<'static>,
        up: Input<'static>,
    ) -> Self {
        Self {
            mode,
            select,
            down,
            up,
        }
    }
}

impl ButtonInput for Buttons {
    fn poll_pressed(&mut self, id: Button) -> bool {
        match id {
            Button::Mode => self.mode.is_high(),
            Button::Select => self.select.is_high(),
            Button::Down => self.down.is_high(),
            Button::Up => self.up.is_high(),
        }
    }
}
