//! Firmware wiring and the polling loop.

use core::cell::RefCell;

use defmt::{Debug2Format, info, warn};
use embassy_executor::Spawner;
use embassy_rp::gpio::{Input, Pull};
use embassy_rp::i2c::{Config as I2cConfig, I2c};
use embassy_time::Timer;
use embedded_hal_bus::i2c::RefCellDevice;
use ra_compensator::config::POLL_INTERVAL_MS;
use ra_compensator::scheduler::{Scheduler, State};
use ra_compensator::store::LoadError;
use {defmt_rtt as _, panic_probe as _};

use crate::buttons::Buttons;
use crate::fram::Mb85rc;
use crate::ltp305::Ltp305Pair;
use crate::rv3028::Rv3028;

/// LTP305 device addresses: left pair (hours), right pair (minutes).
const DISPLAY_LEFT_ADDR: u8 = 0x61;
const DISPLAY_RIGHT_ADDR: u8 = 0x62;

// Program metadata for `picotool info`
#[unsafe(link_section = ".bi_entries")]
#[used]
pub static PICOTOOL_ENTRIES: [embassy_rp::binary_info::EntryAddr; 4] = [
    embassy_rp::binary_info::rp_program_name!(c"pico-ra"),
    embassy_rp::binary_info::rp_program_description!(
        c"Telescope RA-axis compensation display"
    ),
    embassy_rp::binary_info::rp_cargo_version!(),
    embassy_rp::binary_info::rp_program_build_attribute!(),
];

const fn state_name(state: State) -> &'static str {
    match state {
        State::Uncalibrated => "Uncalibrated",
        State::Running => "Running",
        State::Calibrating => "Calibrating",
        State::SettingClock => "SettingClock",
    }
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("RA compensator starting...");

    let p = embassy_rp::init(Default::default());

    // One shared bus for the RTC, FRAM and both display controllers.
    let i2c = I2c::new_blocking(p.I2C0, p.PIN_17, p.PIN_16, I2cConfig::default());
    let i2c = RefCell::new(i2c);

    let mut rtc = Rv3028::new(RefCellDevice::new(&i2c));
    match rtc.init() {
        Ok(()) => info!("RTC ready"),
        // Not fatal: reads are retried every cycle and degrade visibly.
        Err(e) => warn!("RTC init failed: {}", Debug2Format(&e)),
    }

    let mut display = Ltp305Pair::new(
        RefCellDevice::new(&i2c),
        DISPLAY_LEFT_ADDR,
        DISPLAY_RIGHT_ADDR,
    );
    match display.init() {
        Ok(()) => info!("Display ready"),
        Err(e) => warn!("Display init failed: {}", Debug2Format(&e)),
    }

    let storage = Mb85rc::new(RefCellDevice::new(&i2c));

    let buttons = Buttons::new(
        Input::new(p.PIN_11, Pull::None),
        Input::new(p.PIN_12, Pull::None),
        Input::new(p.PIN_13, Pull::None),
        Input::new(p.PIN_14, Pull::None),
    );

    let mut scheduler = Scheduler::new(rtc, storage, display, buttons);
    match scheduler.init() {
        Ok(()) => info!("Calibration anchor loaded"),
        Err(LoadError::NotCalibrated) => info!("No calibration stored yet"),
        Err(LoadError::Checksum) => warn!("Stored calibration failed validation"),
        Err(LoadError::Hardware(e)) => {
            warn!("Calibration storage unreadable: {}", Debug2Format(&e));
        }
    }

    let mut last_state = scheduler.state();
    info!("State: {}", state_name(last_state));

    loop {
        scheduler.poll();

        if scheduler.state() != last_state {
            last_state = scheduler.state();
            info!("State: {}", state_name(last_state));
        }
        if let Some(fault) = scheduler.take_fault() {
            warn!("Cycle fault: {}", Debug2Format(&fault));
        }

        Timer::after_millis(POLL_INTERVAL_MS).await;
    }
}
