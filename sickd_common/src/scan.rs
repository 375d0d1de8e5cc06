//! The scan record published by the daemon.
//!
//! A [`Scan`] is one complete sweep of the sensor: 180 range samples, a
//! range unit code and the sensor status byte. It is the only record the
//! shared region ever holds.

use serde::{Deserialize, Serialize};

/// Number of range samples in one scan.
pub const SCAN_SAMPLES: usize = 180;

/// Mask of the usable range bits in a raw sample. The upper six bits are
/// reserved by the protocol.
pub const RANGE_MASK: u16 = 0x03ff;

/// Size of a scan in its shared-memory wire form: little-endian samples
/// followed by the unit code and the status byte.
pub const SCAN_WIRE_SIZE: usize = SCAN_SAMPLES * 2 + 2;

/// Unit of the range samples.
///
/// The PLS telegram does not say which unit its samples are in; it depends
/// on how the sensor was set up, so it is configured per device. Samples are
/// published as raw integers in this unit and never converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum RangeUnit {
    /// Samples are in centimeters
    #[default]
    Centimeters = 0,
    /// Samples are in millimeters
    Millimeters = 1,
    /// Samples are in decimeters
    Decimeters = 2,
}

impl RangeUnit {
    /// Convert from the raw unit code. Returns `None` for reserved codes.
    #[inline]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Centimeters),
            1 => Some(Self::Millimeters),
            2 => Some(Self::Decimeters),
            _ => None,
        }
    }

    /// Number of millimeters in one sample unit.
    #[inline]
    pub const fn millimeters(self) -> u32 {
        match self {
            Self::Centimeters => 10,
            Self::Millimeters => 1,
            Self::Decimeters => 100,
        }
    }
}

/// One complete range scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scan {
    distance: [u16; SCAN_SAMPLES],
    unit: u8,
    status: u8,
}

impl Scan {
    /// Create a scan from already masked samples.
    pub const fn new(distance: [u16; SCAN_SAMPLES], unit: RangeUnit, status: u8) -> Self {
        Self {
            distance,
            unit: unit as u8,
            status,
        }
    }

    /// Range samples, one per degree.
    pub fn distance(&self) -> &[u16; SCAN_SAMPLES] {
        &self.distance
    }

    /// Range unit, `None` if a foreign writer stored a reserved code.
    pub fn unit(&self) -> Option<RangeUnit> {
        RangeUnit::from_code(self.unit)
    }

    /// Raw range unit code.
    pub fn unit_code(&self) -> u8 {
        self.unit
    }

    /// Sensor status byte.
    pub fn status(&self) -> u8 {
        self.status
    }

    /// Encode into the shared-memory wire form.
    pub fn to_wire(&self) -> [u8; SCAN_WIRE_SIZE] {
        let mut wire = [0u8; SCAN_WIRE_SIZE];
        for (chunk, sample) in wire.chunks_exact_mut(2).zip(self.distance.iter()) {
            chunk.copy_from_slice(&sample.to_le_bytes());
        }
        wire[SCAN_WIRE_SIZE - 2] = self.unit;
        wire[SCAN_WIRE_SIZE - 1] = self.status;
        wire
    }

    /// Decode from the shared-memory wire form.
    pub fn from_wire(wire: &[u8; SCAN_WIRE_SIZE]) -> Self {
        let mut distance = [0u16; SCAN_SAMPLES];
        for (sample, chunk) in distance.iter_mut().zip(wire.chunks_exact(2)) {
            *sample = u16::from_le_bytes([chunk[0], chunk[1]]);
        }
        Self {
            distance,
            unit: wire[SCAN_WIRE_SIZE - 2],
            status: wire[SCAN_WIRE_SIZE - 1],
        }
    }

    /// Cartesian points in sample units, x to the right and y forward.
    ///
    /// Sample `i` lies at angle `i / 179 * PI`, so the first and last
    /// samples sit on the x axis.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        let step = std::f64::consts::PI / (SCAN_SAMPLES - 1) as f64;
        self.distance.iter().enumerate().map(move |(i, &range)| {
            let theta = i as f64 * step;
            let r = f64::from(range);
            (r * theta.cos(), r * theta.sin())
        })
    }

    /// Largest range in the scan.
    pub fn max_range(&self) -> u16 {
        self.distance.iter().copied().max().unwrap_or(0)
    }
}

impl Default for Scan {
    fn default() -> Self {
        Self::new([0; SCAN_SAMPLES], RangeUnit::Centimeters, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Scan {
        let mut distance = [0u16; SCAN_SAMPLES];
        for (i, d) in distance.iter_mut().enumerate() {
            *d = (i as u16 * 5) & RANGE_MASK;
        }
        Scan::new(distance, RangeUnit::Millimeters, 0x11)
    }

    #[test]
    fn wire_form_is_little_endian() {
        let scan = ramp();
        let wire = scan.to_wire();
        // Sample 1 = 5, sample 60 = 300 = 0x012c
        assert_eq!(&wire[2..4], &[5, 0]);
        assert_eq!(&wire[120..122], &[0x2c, 0x01]);
        assert_eq!(wire[SCAN_WIRE_SIZE - 2], RangeUnit::Millimeters as u8);
        assert_eq!(wire[SCAN_WIRE_SIZE - 1], 0x11);
        assert_eq!(Scan::from_wire(&wire), scan);
    }

    #[test]
    fn reserved_unit_code_from_wire() {
        let mut wire = Scan::default().to_wire();
        wire[SCAN_WIRE_SIZE - 2] = 3;
        let scan = Scan::from_wire(&wire);
        assert_eq!(scan.unit(), None);
        assert_eq!(scan.unit_code(), 3);
    }

    #[test]
    fn unit_scale() {
        assert_eq!(RangeUnit::Centimeters.millimeters(), 10);
        assert_eq!(RangeUnit::from_code(2), Some(RangeUnit::Decimeters));
        assert_eq!(RangeUnit::from_code(3), None);
    }

    #[test]
    fn points_span_half_circle() {
        let scan = Scan::new([100; SCAN_SAMPLES], RangeUnit::Centimeters, 0);
        let points: Vec<_> = scan.points().collect();
        assert_eq!(points.len(), SCAN_SAMPLES);

        let (x0, y0) = points[0];
        assert!((x0 - 100.0).abs() < 1e-9 && y0.abs() < 1e-9);

        let (xn, yn) = points[SCAN_SAMPLES - 1];
        assert!((xn + 100.0).abs() < 1e-9 && yn.abs() < 1e-9);

        for (x, y) in points {
            assert!(y >= -1e-9);
            assert!(((x * x + y * y).sqrt() - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn max_range() {
        assert_eq!(ramp().max_range(), (179 * 5) & RANGE_MASK);
        assert_eq!(Scan::default().max_range(), 0);
    }
}
