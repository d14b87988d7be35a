//! RV3028 real-time clock driver.
//!
//! The RV3028 is extremely low power (45 nA on backup) and factory
//! calibrated to +/-1 ppm at 25C, about a minute of drift every two years.
//! Time registers are BCD. Setup puts the part in 24-hour mode and enables
//! level backup switchover so it keeps time through power loss.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use embedded_hal::i2c::I2c;
use ra_compensator::hal::{HardwareError, TimeSource};

/// Fixed I2C address of the RV3028.
const ADDR: u8 = 0x52;

// Register map
const REG_SECONDS: u8 = 0x00;
const REG_CONTROL2: u8 = 0x10;
const REG_EEPROM_BACKUP: u8 = 0x37;

/// Control 2: 12/24-hour mode select (0 = 24-hour).
const CONTROL2_12_24: u8 = 0x02;

/// Backup register: BSM field (bits 3:2) = 0b11, level switching mode.
const BACKUP_BSM_MASK: u8 = 0x0C;
const BACKUP_BSM_LEVEL: u8 = 0x0C;

pub struct Rv3028<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> Rv3028<I2C> {
    pub const fn new(i2c: I2C) -> Self { Self { i2c } }

    /// Force 24-hour mode and level backup switchover.
    ///
    /// Both settings write the RAM mirrors, so they are reapplied on every
    /// power-up; the clock itself runs from backup either way.
    pub fn init(&mut self) -> Result<(), HardwareError> {
        let control2 = self.read_reg(REG_CONTROL2)?;
        self.write_reg(REG_CONTROL2, control2 & !CONTROL2_12_24)?;

        let backup = self.read_reg(REG_EEPROM_BACKUP)?;
        self.write_reg(REG_EEPROM_BACKUP, (backup & !BACKUP_BSM_MASK) | BACKUP_BSM_LEVEL)
    }

    /// Read the current date and time in one burst.
    pub fn datetime(&mut self) -> Result<NaiveDateTime, HardwareError> {
        // Seconds through year: 7 consecutive BCD registers.
        let mut regs = [0u8; 7];
        self.i2c
            .write_read(ADDR, &[REG_SECONDS], &mut regs)
            .map_err(|_| HardwareError::Bus)?;

        let second = bcd_to_dec(regs[0] & 0x7F);
        let minute = bcd_to_dec(regs[1] & 0x7F);
        let hour = bcd_to_dec(regs[2] & 0x3F);
        // regs[3] is the weekday, unused here.
        let day = bcd_to_dec(regs[4] & 0x3F);
        let month = bcd_to_dec(regs[5] & 0x1F);
        let year = 2000 + u16::from(bcd_to_dec(regs[6]));

        // Garbled BCD produces an impossible date; treat it as a bad read.
        NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
            .and_then(|d| d.and_hms_opt(u32::from(hour), u32::from(minute), u32::from(second)))
            .ok_or(HardwareError::Bus)
    }

    /// Program the time registers in one burst.
    ///
    /// The weekday register is free-running and unused by reads, but the
    /// part expects a 0..6 value, so it is written consistently anyway.
    pub fn set_datetime(&mut self, now: NaiveDateTime) -> Result<(), HardwareError> {
        let year = (now.year() - 2000).clamp(0, 99) as u8;
        let frame = [
            REG_SECONDS,
            dec_to_bcd(now.second() as u8),
            dec_to_bcd(now.minute() as u8),
            dec_to_bcd(now.hour() as u8),
            now.weekday().num_days_from_monday() as u8,
            dec_to_bcd(now.day() as u8),
            dec_to_bcd(now.month() as u8),
            dec_to_bcd(year),
        ];
        self.i2c.write(ADDR, &frame).map_err(|_| HardwareError::Bus)
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, HardwareError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(ADDR, &[reg], &mut buf)
            .map_err(|_| HardwareError::Bus)?;
        Ok(buf[0])
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), HardwareError> {
        self.i2c.write(ADDR, &[reg, value]).map_err(|_| HardwareError::Bus)
    }
}

impl<I2C: I2c> TimeSource for Rv3028<I2C> {
    fn now(&mut self) -> Result<NaiveDateTime, HardwareError> { self.datetime() }

    fn set_now(&mut self, now: NaiveDateTime) -> Result<(), HardwareError> {
        self.set_datetime(now)
    }
}

const fn bcd_to_dec(value: u8) -> u8 { (value >> 4) * 10 + (value & 0x0F) }

const fn dec_to_bcd(value: u8) -> u8 { (value / 10) << 4 | (value % 10) }
