//! RA compensation library - testable modules for the telescope display.
//!
//! A fixed, RA-aligned telescope axis drifts against clock time because the
//! Earth rotates once per sidereal day (~23h56m04s) while the clock tracks
//! the longer solar day. This library holds everything needed to turn a
//! stored calibration (a target RA and the instant it was true) and the
//! current time into the corrected RA value shown on the dual dot-matrix
//! display.
//!
//! The library contains the core logic that can be tested on the host
//! machine. The binary (`main.rs`) uses this library and adds the
//! embedded-specific code: I2C drivers for the RV3028 RTC, the FRAM breakout
//! and the LTP305 display pair.
//!
//! # Testing
//!
//! Run tests on host with:
//! ```bash
//! cargo test --lib
//! ```
//!
//! Tests run with `std` enabled (via `cfg_attr`), allowing use of the
//! standard test framework while the actual firmware runs as `no_std`.

// Use no_std only when NOT testing (tests need std for the test harness)
#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod debounce;
pub mod display;
pub mod engine;
pub mod hal;
pub mod ra;
pub mod scheduler;
pub mod store;
