//! Dual LTP305 dot-matrix display driver (IS31FL3730 controllers).
//!
//! Each breakout carries one IS31FL3730 driving two 5x7 matrices, so the
//! pair shows four characters: the left device is the hour group, the
//! right device the minute group. The two matrices on a device use
//! different buffer orientations: the left one is column-major (one byte
//! per column, bit per row), the right one row-major (one byte per row,
//! bit per column).

use embedded_hal::i2c::I2c;
use ra_compensator::display::DisplayDigits;
use ra_compensator::hal::{DisplayDevice, HardwareError};

// IS31FL3730 command registers
const CMD_MODE: u8 = 0x00;
const CMD_MATRIX_R: u8 = 0x01;
const CMD_UPDATE: u8 = 0x0C;
const CMD_OPTIONS: u8 = 0x0D;
const CMD_MATRIX_L: u8 = 0x0E;
const CMD_BRIGHTNESS: u8 = 0x19;

/// Both matrices on, 8x8 mode.
const MODE: u8 = 0b0001_1000;
/// 35 mA row current.
const OPTS: u8 = 0b0000_1110;
/// Fixed brightness (0..127); presentation tuning is not a concern here.
const BRIGHTNESS: u8 = 0x20;

/// 5x7 glyphs as column bitmasks, bit 0 = top row.
/// Digits plus the letters the indicator frames need.
const fn glyph(c: u8) -> [u8; 5] {
    match c {
        b'0' => [0x3e, 0x41, 0x41, 0x41, 0x3e],
        b'1' => [0x00, 0x42, 0x7f, 0x40, 0x00],
        b'2' => [0x42, 0x61, 0x51, 0x49, 0x46],
        b'3' => [0x21, 0x41, 0x45, 0x4b, 0x31],
        b'4' => [0x18, 0x14, 0x12, 0x7f, 0x10],
        b'5' => [0x27, 0x45, 0x45, 0x45, 0x39],
        b'6' => [0x3c, 0x4a, 0x49, 0x49, 0x30],
        b'7' => [0x01, 0x71, 0x09, 0x05, 0x03],
        b'8' => [0x36, 0x49, 0x49, 0x49, 0x36],
        b'9' => [0x06, 0x49, 0x49, 0x29, 0x1e],
        b'A' => [0x7e, 0x11, 0x11, 0x11, 0x7e],
        b'C' => [0x3e, 0x41, 0x41, 0x41, 0x22],
        b'E' => [0x7f, 0x49, 0x49, 0x49, 0x41],
        b'L' => [0x7f, 0x40, 0x40, 0x40, 0x40],
        b'r' => [0x7c, 0x08, 0x04, 0x04, 0x08],
        _ => [0x00, 0x00, 0x00, 0x00, 0x00], // space
    }
}

/// The two-device display pair as one render target.
pub struct Ltp305Pair<I2C> {
    i2c: I2C,
    left_addr: u8,
    right_addr: u8,
}

impl<I2C: I2c> Ltp305Pair<I2C> {
    pub const fn new(i2c: I2C, left_addr: u8, right_addr: u8) -> Self {
        Self {
            i2c,
            left_addr,
            right_addr,
        }
    }

    /// Configure both controllers and blank the matrices.
    pub fn init(&mut self) -> Result<(), HardwareError> {
        for addr in [self.left_addr, self.right_addr] {
            self.write(addr, CMD_MODE, &[MODE])?;
            self.write(addr, CMD_OPTIONS, &[OPTS])?;
            self.write(addr, CMD_BRIGHTNESS, &[BRIGHTNESS])?;
            self.show_pair(addr, b' ', b' ')?;
        }
        Ok(())
    }

    /// Push a character pair to one device and latch it.
    fn show_pair(&mut self, addr: u8, left: u8, right: u8) -> Result<(), HardwareError> {
        let left_glyph = glyph(left);
        let right_glyph = glyph(right);

        // Left matrix: column-major.
        let mut left_buf = [0u8; 8];
        left_buf[..5].copy_from_slice(&left_glyph);

        // Right matrix: row-major.
        let mut right_buf = [0u8; 8];
        for (col, &bits) in right_glyph.iter().enumerate() {
            for (row, row_bits) in right_buf.iter_mut().enumerate().take(7) {
                if bits >> row & 1 != 0 {
                    *row_bits |= 1 << col;
                }
            }
        }

        self.write(addr, CMD_MATRIX_L, &left_buf)?;
        self.write(addr, CMD_MATRIX_R, &right_buf)?;
        self.write(addr, CMD_UPDATE, &[0x01])
    }

    fn write(&mut self, addr: u8, cmd: u8, data: &[u8]) -> Result<(), HardwareError> {
        let mut frame = [0u8; 9];
        frame[0] = cmd;
        frame[1..=data.len()].copy_from_slice(data);
        self.i2c
            .write(addr, &frame[..=data.len()])
            .map_err(|_| HardwareError::Bus)
    }
}

impl<I2C: I2c> DisplayDevice for Ltp305Pair<I2C> {
    fn render(&mut self, frame: &DisplayDigits) -> Result<(), HardwareError> {
        let glyphs = frame.glyphs();
        self.show_pair(self.left_addr, glyphs[0], glyphs[1])?;
        self.show_pair(self.right_addr, glyphs[2], glyphs[3])
    }
}
