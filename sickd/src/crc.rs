//! CRC-16 used by the SICK PLS/LMS serial telegrams
//!
//! A shift register with polynomial 0x8005 and zero seed, except that each
//! input byte is OR-ed with the previous input byte shifted into the high
//! half before it is folded in. There is no final XOR.

/// Generator polynomial.
pub const CRC_POLY: u16 = 0x8005;

/// Incremental checksum over a telegram.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SickCrc {
    crc: u16,
    prev: u16,
}

impl SickCrc {
    /// Fresh checksum with a zero seed.
    pub const fn new() -> Self {
        Self { crc: 0, prev: 0 }
    }

    /// Fold `bytes` into the checksum.
    pub fn update(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            let byte = u16::from(byte);
            self.crc = if self.crc & 0x8000 != 0 {
                (self.crc << 1) ^ CRC_POLY
            } else {
                self.crc << 1
            };
            self.crc ^= byte | self.prev;
            self.prev = byte << 8;
        }
    }

    /// Current checksum value.
    pub const fn value(&self) -> u16 {
        self.crc
    }
}

/// Checksum of a complete byte sequence.
pub fn crc16(bytes: &[u8]) -> u16 {
    let mut crc = SickCrc::new();
    crc.update(bytes);
    crc.value()
}
