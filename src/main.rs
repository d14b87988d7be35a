//! RA compensation firmware for the Raspberry Pi Pico (RP2040).
//!
//! Hardware, all on one I2C bus (SDA=GPIO16, SCL=GPIO17):
//! - RV3028 real-time clock breakout (0x52), battery backed
//! - MB85RC FRAM breakout (0x50) holding the calibration anchor
//! - Two LTP305 dot-matrix modules (0x61/0x62), hour pair and minute pair
//! - Four buttons on GPIO11..14, pulled down externally
//!
//! All logic lives in the `ra_compensator` library; this binary wires the
//! drivers to the scheduler and runs the polling loop.

#![cfg_attr(target_arch = "arm", no_std)]
#![cfg_attr(target_arch = "arm", no_main)]

#[cfg(target_arch = "arm")]
mod app;
#[cfg(target_arch = "arm")]
mod buttons;
#[cfg(target_arch = "arm")]
mod fram;
#[cfg(target_arch = "arm")]
mod ltp305;
#[cfg(target_arch = "arm")]
mod rv3028;

/// The real entry point is in `app`; host builds get a stub so the binary
/// target still links under `cargo test`.
#[cfg(not(target_arch = "arm"))]
fn main() {}
