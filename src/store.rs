//! Durable storage for the calibration anchor.
//!
//! The anchor lives in two fixed FRAM slots. A save always writes the slot
//! that does *not* hold the current valid anchor, so power loss mid-write
//! can only corrupt the copy being replaced: the CRC rejects the torn slot
//! and the previous anchor remains readable. The valid slot with the newer
//! (wrapping) sequence number wins on load.
//!
//! Slot layout, 16 bytes:
//!
//! ```text
//! +--------+----------------------------------------+
//! | Offset | Purpose                                |
//! +--------+----------------------------------------+
//! |     0  | Magic (0x52, 'R')                      |
//! |     1  | Sequence number (wrapping)             |
//! |  2..6  | Target RA, ms of RA day (LE u32)       |
//! |  6..14 | Calibration instant, unix s (LE i64)   |
//! | 14..16 | CRC-16/CCITT-FALSE over bytes 0..14    |
//! +--------+----------------------------------------+
//! ```
//!
//! FRAM endurance is effectively unlimited but the contract here is the
//! conservative one: writes happen only on explicit user recalibration,
//! never on the periodic refresh path.

use thiserror::Error;

use crate::config::{SLOT_A_OFFSET, SLOT_B_OFFSET, SLOT_LEN};
use crate::engine::CalibrationAnchor;
use crate::hal::{HardwareError, NonVolatileStorage};
use crate::ra::{MS_PER_RA_DAY, Ra};

const SLOT_MAGIC: u8 = 0x52;
const CRC_OFFSET: usize = 14;

/// Why no anchor could be loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The anchor region has never been written. Expected on first run.
    #[error("no calibration stored")]
    NotCalibrated,
    /// The region holds data but no slot passes validation.
    #[error("stored calibration failed validation")]
    Checksum,
    /// The storage itself could not be read.
    #[error("calibration storage unreadable: {0}")]
    Hardware(#[from] HardwareError),
}

/// Mediates all access to the persisted anchor.
pub struct CalibrationStore<S> {
    storage: S,
}

impl<S: NonVolatileStorage> CalibrationStore<S> {
    pub const fn new(storage: S) -> Self { Self { storage } }

    /// Read and validate the anchor region.
    pub fn load(&mut self) -> Result<CalibrationAnchor, LoadError> {
        let (slot_a, slot_b) = self.read_slots()?;

        match (decode_slot(&slot_a), decode_slot(&slot_b)) {
            (Some((_, anchor)), None) | (None, Some((_, anchor))) => Ok(anchor),
            (Some((seq_a, a)), Some((seq_b, b))) => {
                // Wrapping comparison: the slots are written alternately so
                // the sequence numbers are always adjacent.
                if seq_a.wrapping_sub(seq_b) < 128 {
                    Ok(a)
                } else {
                    Ok(b)
                }
            }
            (None, None) => {
                if is_erased(&slot_a) && is_erased(&slot_b) {
                    Err(LoadError::NotCalibrated)
                } else {
                    Err(LoadError::Checksum)
                }
            }
        }
    }

    /// Persist a new anchor, replacing the previous one atomically.
    ///
    /// The write targets the inactive slot and carries the next sequence
    /// number; it becomes the load winner only once its CRC-covered bytes
    /// are all in place.
    pub fn save(&mut self, anchor: &CalibrationAnchor) -> Result<(), HardwareError> {
        let (slot_a, slot_b) = self.read_slots()?;

        let (target_offset, seq) = match (decode_slot(&slot_a), decode_slot(&slot_b)) {
            (Some((seq_a, _)), None) => (SLOT_B_OFFSET, seq_a.wrapping_add(1)),
            (None, Some((seq_b, _))) => (SLOT_A_OFFSET, seq_b.wrapping_add(1)),
            (Some((seq_a, _)), Some((seq_b, _))) => {
                if seq_a.wrapping_sub(seq_b) < 128 {
                    (SLOT_B_OFFSET, seq_a.wrapping_add(1))
                } else {
                    (SLOT_A_OFFSET, seq_b.wrapping_add(1))
                }
            }
            (None, None) => (SLOT_A_OFFSET, 0),
        };

        let slot = encode_slot(seq, anchor);
        self.storage.write_bytes(target_offset, &slot)
    }

    fn read_slots(&mut self) -> Result<([u8; SLOT_LEN], [u8; SLOT_LEN]), HardwareError> {
        let mut slot_a = [0u8; SLOT_LEN];
        let mut slot_b = [0u8; SLOT_LEN];
        self.storage.read_bytes(SLOT_A_OFFSET, &mut slot_a)?;
        self.storage.read_bytes(SLOT_B_OFFSET, &mut slot_b)?;
        Ok((slot_a, slot_b))
    }
}

fn encode_slot(seq: u8, anchor: &CalibrationAnchor) -> [u8; SLOT_LEN] {
    let mut slot = [0u8; SLOT_LEN];
    slot[0] = SLOT_MAGIC;
    slot[1] = seq;
    slot[2..6].copy_from_slice(&anchor.target.as_millis().to_le_bytes());
    slot[6..14].copy_from_slice(&anchor.calibrated_at.to_le_bytes());
    let crc = crc16_ccitt(&slot[..CRC_OFFSET]);
    slot[14..16].copy_from_slice(&crc.to_le_bytes());
    slot
}

fn decode_slot(slot: &[u8; SLOT_LEN]) -> Option<(u8, CalibrationAnchor)> {
    if slot[0] != SLOT_MAGIC {
        return None;
    }
    let crc = u16::from_le_bytes([slot[14], slot[15]]);
    if crc != crc16_ccitt(&slot[..CRC_OFFSET]) {
        return None;
    }
    let ra_ms = u32::from_le_bytes([slot[2], slot[3], slot[4], slot[5]]);
    if ra_ms >= MS_PER_RA_DAY {
        return None;
    }
    let calibrated_at = i64::from_le_bytes(slot[6..14].try_into().ok()?);
    Some((
        slot[1],
        CalibrationAnchor {
            target: Ra::from_millis(ra_ms),
            calibrated_at,
        },
    ))
}

/// Never-written FRAM reads as all zeros; EEPROM-style parts erase to 0xFF.
fn is_erased(slot: &[u8; SLOT_LEN]) -> bool {
    slot.iter().all(|&b| b == 0x00) || slot.iter().all(|&b| b == 0xFF)
}

/// CRC-16/CCITT-FALSE (poly 0x1021, init 0xFFFF).
fn crc16_ccitt(bytes: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in bytes {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGION_LEN: usize = 2 * SLOT_LEN;

    /// In-memory storage double. `fail_written` makes the next write land
    /// only that many bytes before reporting a bus error, simulating power
    /// loss mid-write; `fail_reads` makes every read report a bus error.
    struct MemStorage {
        bytes: [u8; REGION_LEN],
        fail_written: Option<usize>,
        fail_reads: bool,
    }

    impl MemStorage {
        fn erased(fill: u8) -> Self {
            Self {
                bytes: [fill; REGION_LEN],
                fail_written: None,
                fail_reads: false,
            }
        }
    }

    impl NonVolatileStorage for MemStorage {
        fn read_bytes(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), HardwareError> {
            if self.fail_reads {
                return Err(HardwareError::Bus);
            }
            let start = offset as usize;
            buf.copy_from_slice(&self.bytes[start..start + buf.len()]);
            Ok(())
        }

        fn write_bytes(&mut self, offset: u16, bytes: &[u8]) -> Result<(), HardwareError> {
            let start = offset as usize;
            if let Some(n) = self.fail_written.take() {
                self.bytes[start..start + n].copy_from_slice(&bytes[..n]);
                return Err(HardwareError::Bus);
            }
            self.bytes[start..start + bytes.len()].copy_from_slice(bytes);
            Ok(())
        }
    }

    fn anchor(hours: u8, minutes: u8, at: i64) -> CalibrationAnchor {
        CalibrationAnchor {
            target: Ra::from_hm(hours, minutes),
            calibrated_at: at,
        }
    }

    #[test]
    fn test_never_written_is_not_calibrated() {
        let mut store = CalibrationStore::new(MemStorage::erased(0x00));
        assert_eq!(store.load(), Err(LoadError::NotCalibrated));

        let mut store = CalibrationStore::new(MemStorage::erased(0xFF));
        assert_eq!(store.load(), Err(LoadError::NotCalibrated));
    }

    #[test]
    fn test_unreadable_storage_reports_hardware_error() {
        let mut store = CalibrationStore::new(MemStorage::erased(0x00));
        store.save(&anchor(5, 16, 1_700_000_000)).unwrap();

        store.storage.fail_reads = true;
        assert_eq!(store.load(), Err(LoadError::Hardware(HardwareError::Bus)));
        // A save also needs the slot headers, so it surfaces the same error.
        assert_eq!(
            store.save(&anchor(6, 0, 1_700_086_400)),
            Err(HardwareError::Bus)
        );
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut store = CalibrationStore::new(MemStorage::erased(0x00));
        let a = anchor(5, 16, 1_700_000_000);
        store.save(&a).unwrap();
        assert_eq!(store.load(), Ok(a));
    }

    #[test]
    fn test_last_write_wins() {
        let mut store = CalibrationStore::new(MemStorage::erased(0x00));
        store.save(&anchor(5, 16, 1_700_000_000)).unwrap();
        let newer = anchor(12, 30, 1_700_086_400);
        store.save(&newer).unwrap();
        assert_eq!(store.load(), Ok(newer));
    }

    #[test]
    fn test_saves_alternate_slots() {
        let mut store = CalibrationStore::new(MemStorage::erased(0x00));
        store.save(&anchor(1, 0, 100)).unwrap();
        let slot_a: [u8; SLOT_LEN] = store.storage.bytes[..SLOT_LEN].try_into().unwrap();
        store.save(&anchor(2, 0, 200)).unwrap();
        // The first slot is untouched by the second save.
        assert_eq!(&store.storage.bytes[..SLOT_LEN], &slot_a[..]);
        assert!(decode_slot(&store.storage.bytes[SLOT_LEN..].try_into().unwrap()).is_some());
    }

    #[test]
    fn test_corruption_is_detected_never_misread() {
        let mut store = CalibrationStore::new(MemStorage::erased(0x00));
        store.save(&anchor(5, 16, 1_700_000_000)).unwrap();

        // Flip one bit in every position in turn; the load must never
        // produce a silently different anchor.
        for bit in 0..(SLOT_LEN * 8) {
            let mut tampered = CalibrationStore::new(MemStorage::erased(0x00));
            tampered.storage.bytes = store.storage.bytes;
            tampered.storage.bytes[bit / 8] ^= 1 << (bit % 8);
            match tampered.load() {
                Err(LoadError::Checksum) => {}
                other => panic!("bit {bit}: expected checksum error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_interrupted_save_keeps_previous_anchor() {
        let mut store = CalibrationStore::new(MemStorage::erased(0x00));
        let old = anchor(5, 16, 1_700_000_000);
        store.save(&old).unwrap();

        // Power fails after 5 bytes of the replacement hit the other slot.
        store.storage.fail_written = Some(5);
        let result = store.save(&anchor(20, 0, 1_700_086_400));
        assert_eq!(result, Err(HardwareError::Bus));

        // The torn slot fails its CRC; the old anchor is still served.
        assert_eq!(store.load(), Ok(old));
    }

    #[test]
    fn test_sequence_number_wraps() {
        let mut store = CalibrationStore::new(MemStorage::erased(0x00));
        // Enough saves to wrap the u8 sequence counter.
        let mut last = anchor(0, 0, 0);
        for i in 0..300i64 {
            last = anchor((i % 24) as u8, (i % 60) as u8, 1_700_000_000 + i);
            store.save(&last).unwrap();
        }
        assert_eq!(store.load(), Ok(last));
    }
}
