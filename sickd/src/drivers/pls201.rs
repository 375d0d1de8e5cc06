//! SICK PLS 101/201 driver
//!
//! The sensor streams distance telegrams continuously once it is in
//! monitoring mode. Each carries 180 one-degree samples and a trailing
//! status byte:
//!
//! ```text
//! 0xB0 │ count (LE16) │ 180 × sample (LE16) │ status
//! ```
//!
//! Samples use the low 10 bits. The upper bits are flags the sensor sets on
//! dazzled or out-of-field readings and are masked off. The telegram does
//! not carry the range unit; scans are labelled with the unit configured for
//! the device.

use crate::driver::{Device, EventOutcome, ScanSink, SickDriver};
use crate::error::DeviceError;
use crate::framer::{FrameError, Framed, next_frame};
use crate::serial::open_port;
use sickd_common::config::DeviceConfig;
use sickd_common::scan::{RANGE_MASK, RangeUnit, SCAN_SAMPLES, Scan};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Identification text telegram.
pub const PKT_IDENT: u8 = 0x90;

/// Distance scan telegram.
pub const PKT_SCAN: u8 = 0xb0;

/// Type byte, count word, samples and status byte.
pub const SCAN_PAYLOAD_LEN: usize = 4 + 2 * SCAN_SAMPLES;

/// Malformed payload inside a checksum-valid telegram. The telegram is
/// consumed and nothing is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// Telegram without a type byte.
    #[error("empty payload")]
    Empty,

    /// Distance telegram whose sample count or length is not a full scan.
    #[error("distance payload with {count} samples in {len} bytes")]
    ScanLength {
        /// Declared sample count
        count: usize,
        /// Payload length
        len: usize,
    },
}

/// Decoded payload of one telegram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Device identification text
    Ident(String),
    /// One distance scan
    Scan(Box<Scan>),
    /// A telegram type this driver does not interpret
    Unknown(u8),
}

/// Decode the payload of a checksum-valid telegram, labelling scans with
/// `unit`.
pub fn decode_payload(payload: &[u8], unit: RangeUnit) -> Result<Payload, PayloadError> {
    let (&kind, body) = payload.split_first().ok_or(PayloadError::Empty)?;

    match kind {
        PKT_IDENT => Ok(Payload::Ident(
            String::from_utf8_lossy(body)
                .trim_end_matches(['\0', '\r', '\n'])
                .to_string(),
        )),
        PKT_SCAN => decode_scan(payload, unit).map(|scan| Payload::Scan(Box::new(scan))),
        other => Ok(Payload::Unknown(other)),
    }
}

fn decode_scan(payload: &[u8], unit: RangeUnit) -> Result<Scan, PayloadError> {
    let len = payload.len();
    if len < 3 {
        return Err(PayloadError::ScanLength { count: 0, len });
    }

    let count = usize::from(u16::from_le_bytes([payload[1], payload[2]]));
    if count != SCAN_SAMPLES || len != 4 + 2 * count {
        return Err(PayloadError::ScanLength { count, len });
    }

    let mut distance = [0u16; SCAN_SAMPLES];
    for (sample, raw) in distance.iter_mut().zip(payload[3..len - 1].chunks_exact(2)) {
        *sample = u16::from_le_bytes([raw[0], raw[1]]) & RANGE_MASK;
    }

    Ok(Scan::new(distance, unit, payload[len - 1]))
}

/// Build a distance payload, for simulators and tests.
pub fn encode_scan_payload(scan: &Scan) -> Vec<u8> {
    let mut payload = Vec::with_capacity(SCAN_PAYLOAD_LEN);
    payload.push(PKT_SCAN);
    payload.extend_from_slice(&(SCAN_SAMPLES as u16).to_le_bytes());
    for sample in scan.distance() {
        payload.extend_from_slice(&sample.to_le_bytes());
    }
    payload.push(scan.status());
    payload
}

/// What one framing step found, detached from the receive buffer.
enum Step {
    NeedMore,
    Noise(usize),
    Resync(FrameError),
    Packet(Result<Payload, PayloadError>),
}

/// Driver for the PLS 101/201 family.
pub struct Pls201Driver;

/// The driver instance the registry hands out.
pub static PLS201: Pls201Driver = Pls201Driver;

impl Pls201Driver {
    fn handle_payload(
        &self,
        device: &mut Device,
        sink: &mut dyn ScanSink,
        decoded: Result<Payload, PayloadError>,
    ) {
        device.stats_mut().packets += 1;
        match decoded {
            Ok(Payload::Scan(scan)) => {
                trace!("{}: scan, max range {}", device.port(), scan.max_range());
                sink.publish_scan(&scan);
                device.stats_mut().scans += 1;
            }
            Ok(Payload::Ident(text)) => {
                info!("{}: sensor identifies as '{}'", device.port(), text);
                device.set_ident(text);
            }
            Ok(Payload::Unknown(kind)) => {
                debug!("{}: ignoring telegram type {:#04x}", device.port(), kind);
                device.stats_mut().rejected += 1;
            }
            Err(e) => {
                warn!("{}: dropping telegram: {}", device.port(), e);
                device.stats_mut().rejected += 1;
            }
        }
    }
}

impl SickDriver for Pls201Driver {
    fn name(&self) -> &'static str {
        "pls201"
    }

    fn device_ids(&self) -> &'static [&'static str] {
        &["pls201", "pls201-113"]
    }

    fn open(&'static self, config: &DeviceConfig) -> Result<Device, DeviceError> {
        let port = open_port(&config.port, config.baudrate)?;
        let device = Device::new(config.port.clone(), Box::new(port), self);
        Ok(device.with_range_unit(config.range_unit))
    }

    fn process_events(
        &self,
        device: &mut Device,
        sink: &mut dyn ScanSink,
    ) -> Result<EventOutcome, DeviceError> {
        if device.read_available()? == 0 {
            return Ok(EventOutcome::Idle);
        }

        let unit = device.range_unit();
        loop {
            let (discard, step) = {
                let framed = next_frame(device.frame().filled());
                let step = match framed {
                    Framed::NeedMore { .. } => Step::NeedMore,
                    Framed::Noise { discard } => Step::Noise(discard),
                    Framed::Resync { error, .. } => Step::Resync(error),
                    Framed::Packet { packet, .. } => Step::Packet(decode_payload(packet.payload, unit)),
                };
                (framed.discard(), step)
            };
            device.frame_mut().consume(discard);

            match step {
                Step::NeedMore => break,
                Step::Noise(count) => {
                    device.stats_mut().noise_bytes += count as u64;
                    break;
                }
                Step::Resync(error) => {
                    debug!("{}: resync after {}", device.port(), error);
                    device.stats_mut().resyncs += 1;
                }
                Step::Packet(decoded) => self.handle_payload(device, sink, decoded),
            }

            if device.frame().is_empty() {
                break;
            }
        }

        if device.frame().is_full() {
            return Err(DeviceError::BufferFull {
                capacity: device.frame().capacity(),
            });
        }

        Ok(EventOutcome::Progress)
    }
}
