//! MB85RC I2C FRAM driver.
//!
//! The breakout is byte addressable with a 16-bit big-endian address
//! prefix on every transfer. FRAM writes are immediate (no page buffer,
//! no write delay) and endurance is effectively unlimited, but the store
//! treats it conservatively anyway.

use embedded_hal::i2c::I2c;
use heapless::Vec;
use ra_compensator::hal::{HardwareError, NonVolatileStorage};

/// Fixed I2C address of the FRAM breakout (A0..A2 low).
const ADDR: u8 = 0x50;

/// Payload bytes per write transfer; keeps the transfer buffer small.
const WRITE_CHUNK: usize = 32;

pub struct Mb85rc<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> Mb85rc<I2C> {
    pub const fn new(i2c: I2C) -> Self { Self { i2c } }
}

impl<I2C: I2c> NonVolatileStorage for Mb85rc<I2C> {
    fn read_bytes(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), HardwareError> {
        self.i2c
            .write_read(ADDR, &offset.to_be_bytes(), buf)
            .map_err(|_| HardwareError::Bus)
    }

    fn write_bytes(&mut self, offset: u16, bytes: &[u8]) -> Result<(), HardwareError> {
        for (i, chunk) in bytes.chunks(WRITE_CHUNK).enumerate() {
            let chunk_offset = offset + (i * WRITE_CHUNK) as u16;
            // Address prefix and payload must go out in one transfer.
            // The frame capacity covers the address prefix plus a full chunk,
            // so these pushes cannot fail.
            let mut frame: Vec<u8, { 2 + WRITE_CHUNK }> = Vec::new();
            let _ = frame.extend_from_slice(&chunk_offset.to_be_bytes());
            let _ = frame.extend_from_slice(chunk);
            self.i2c.write(ADDR, &frame).map_err(|_| HardwareError::Bus)?;
        }
        Ok(())
    }
}
