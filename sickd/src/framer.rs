//! Telegram framing for the SICK PLS/LMS serial protocol
//!
//! ```text
//! ┌──────┬─────────┬───────────────┬─────────────────┬─────────────┐
//! │ 0x02 │ address │ length (LE16) │ payload[length] │ CRC (LE16)  │
//! └──────┴─────────┴───────────────┴─────────────────┴─────────────┘
//!  ◄──────────── header ──────────►                  ◄── trailer ─►
//! ```
//!
//! [`next_frame`] looks at the bytes a device has accumulated and decides
//! how many leading bytes can go: a decoded telegram, garbage before a start
//! marker, or a single start marker that turned out to be false. Discarding
//! one byte on every corrupt header or checksum is what lets the stream
//! realign after line noise.

use crate::crc::crc16;
use thiserror::Error;
use tracing::{debug, trace};

/// Start of telegram marker.
pub const STX: u8 = 0x02;

/// Start marker, address and payload length.
pub const HEADER_LEN: usize = 4;

/// Trailing checksum.
pub const CRC_LEN: usize = 2;

/// Largest telegram accepted, header and checksum included.
pub const MAX_FRAME_LEN: usize = 700;

/// Recoverable protocol errors. The framer drops the start marker and
/// rescans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The length field announces a telegram larger than any the sensor sends.
    #[error("declared frame length {frame_len} exceeds {} bytes", MAX_FRAME_LEN)]
    LengthTooLarge {
        /// Total length implied by the header
        frame_len: usize,
    },

    /// The trailer does not match the checksum of header and payload.
    #[error("checksum mismatch: expected {expected:#06x}, computed {computed:#06x}")]
    ChecksumMismatch {
        /// Checksum carried by the trailer
        expected: u16,
        /// Checksum computed over the telegram
        computed: u16,
    },
}

/// One validated telegram, borrowed from the receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet<'a> {
    /// Destination address byte
    pub address: u8,
    /// Bytes between header and checksum
    pub payload: &'a [u8],
}

/// Framing decision for the current buffer contents.
///
/// Every variant carries the number of leading bytes the caller must drop
/// before calling again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framed<'a> {
    /// A telegram may start at `discard`; more bytes are needed to decide.
    NeedMore {
        /// Garbage before the start marker
        discard: usize,
    },
    /// No start marker anywhere; the whole buffer is noise.
    Noise {
        /// Buffer length
        discard: usize,
    },
    /// The telegram at the start marker is corrupt.
    Resync {
        /// Garbage before the start marker, plus the marker itself
        discard: usize,
        /// What was wrong with it
        error: FrameError,
    },
    /// A complete, checksum-valid telegram.
    Packet {
        /// Garbage before the telegram, plus the telegram
        discard: usize,
        /// The telegram
        packet: Packet<'a>,
    },
}

impl Framed<'_> {
    /// Leading bytes to drop.
    pub fn discard(&self) -> usize {
        match *self {
            Framed::NeedMore { discard }
            | Framed::Noise { discard }
            | Framed::Resync { discard, .. }
            | Framed::Packet { discard, .. } => discard,
        }
    }

    /// Whether the caller has to wait for more input before framing again.
    pub fn needs_more(&self) -> bool {
        matches!(self, Framed::NeedMore { .. })
    }
}

/// Decide what to do with the leading bytes of `buf`.
pub fn next_frame(buf: &[u8]) -> Framed<'_> {
    let Some(start) = buf.iter().position(|&b| b == STX) else {
        if !buf.is_empty() {
            trace!("Discarding {} bytes of noise", buf.len());
        }
        return Framed::Noise { discard: buf.len() };
    };

    let frame = &buf[start..];
    if frame.len() < HEADER_LEN {
        return Framed::NeedMore { discard: start };
    }

    let payload_len = usize::from(u16::from_le_bytes([frame[2], frame[3]]));
    let frame_len = HEADER_LEN + payload_len + CRC_LEN;
    if frame_len > MAX_FRAME_LEN {
        debug!("Resync: declared frame length {} too large", frame_len);
        return Framed::Resync {
            discard: start + 1,
            error: FrameError::LengthTooLarge { frame_len },
        };
    }

    if frame.len() < frame_len {
        return Framed::NeedMore { discard: start };
    }

    let body_end = HEADER_LEN + payload_len;
    let expected = u16::from_le_bytes([frame[body_end], frame[body_end + 1]]);
    let computed = crc16(&frame[..body_end]);
    if expected != computed {
        debug!(
            "Resync: checksum mismatch (expected {:#06x}, computed {:#06x})",
            expected, computed
        );
        return Framed::Resync {
            discard: start + 1,
            error: FrameError::ChecksumMismatch { expected, computed },
        };
    }

    Framed::Packet {
        discard: start + frame_len,
        packet: Packet {
            address: frame[1],
            payload: &frame[HEADER_LEN..body_end],
        },
    }
}

/// Build a complete telegram around `payload`.
///
/// # Panics
///
/// Panics if the telegram would exceed [`MAX_FRAME_LEN`].
pub fn encode_frame(address: u8, payload: &[u8]) -> Vec<u8> {
    let frame_len = HEADER_LEN + payload.len() + CRC_LEN;
    assert!(frame_len <= MAX_FRAME_LEN, "payload too large for one telegram");

    let mut frame = Vec::with_capacity(frame_len);
    frame.push(STX);
    frame.push(address);
    frame.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    frame.extend_from_slice(payload);
    let crc = crc16(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_frame() -> Vec<u8> {
        vec![0x02, 0x01, 0x05, 0x00, 0x90, 0x41, 0x42, 0x43, 0x44, 0x19, 0x2a]
    }

    #[test]
    fn test_encode_matches_reference_bytes() {
        assert_eq!(encode_frame(0x01, &[0x90, b'A', b'B', b'C', b'D']), id_frame());
    }

    #[test]
    fn test_complete_frame() {
        let buf = id_frame();
        match next_frame(&buf) {
            Framed::Packet { discard, packet } => {
                assert_eq!(discard, buf.len());
                assert_eq!(packet.address, 0x01);
                assert_eq!(packet.payload, &[0x90, b'A', b'B', b'C', b'D']);
            }
            other => panic!("expected packet, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_buffer_is_noise() {
        assert_eq!(next_frame(&[]), Framed::Noise { discard: 0 });
    }

    #[test]
    fn test_no_marker_discards_everything() {
        let buf = [0x00, 0xff, 0x13, 0x37];
        assert_eq!(next_frame(&buf), Framed::Noise { discard: 4 });
    }

    #[test]
    fn test_partial_header_keeps_marker() {
        let buf = [0xaa, 0xbb, 0x02, 0x01];
        let framed = next_frame(&buf);
        assert_eq!(framed, Framed::NeedMore { discard: 2 });
        assert!(framed.needs_more());
    }

    #[test]
    fn test_partial_frame_waits() {
        let buf = id_frame();
        for cut in 0..buf.len() {
            assert_eq!(
                next_frame(&buf[..cut]).discard(),
                0,
                "cut at {cut} must not discard"
            );
        }
    }

    #[test]
    fn test_oversized_length_discards_one() {
        let mut buf = vec![0x02, 0x01, 0xff, 0xff];
        buf.extend_from_slice(&[0u8; 32]);
        match next_frame(&buf) {
            Framed::Resync { discard, error } => {
                assert_eq!(discard, 1);
                assert_eq!(
                    error,
                    FrameError::LengthTooLarge {
                        frame_len: 0xffff + HEADER_LEN + CRC_LEN
                    }
                );
            }
            other => panic!("expected resync, got {other:?}"),
        }
    }

    #[test]
    fn test_largest_frame_accepted() {
        let payload = vec![0x55; MAX_FRAME_LEN - HEADER_LEN - CRC_LEN];
        let buf = encode_frame(0x80, &payload);
        assert_eq!(buf.len(), MAX_FRAME_LEN);
        assert_eq!(next_frame(&buf).discard(), MAX_FRAME_LEN);
    }

    #[test]
    fn test_checksum_mismatch_discards_one() {
        let mut buf = id_frame();
        let last = buf.len() - 1;
        buf[last] ^= 0x01;
        match next_frame(&buf) {
            Framed::Resync { discard, error } => {
                assert_eq!(discard, 1);
                assert!(matches!(error, FrameError::ChecksumMismatch { .. }));
            }
            other => panic!("expected resync, got {other:?}"),
        }
    }

    #[test]
    fn test_garbage_prefix_counted_in_discard() {
        let mut buf = vec![0x11, 0x22, 0x33];
        buf.extend_from_slice(&id_frame());
        assert_eq!(next_frame(&buf).discard(), buf.len());
    }

    #[test]
    fn test_only_first_frame_consumed() {
        let mut buf = id_frame();
        buf.extend_from_slice(&id_frame());
        assert_eq!(next_frame(&buf).discard(), id_frame().len());
    }
}
