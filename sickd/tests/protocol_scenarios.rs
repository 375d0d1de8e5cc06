//! PLS201 wire protocol scenarios

use sickd::crc::crc16;
use sickd::drivers::pls201::{Payload, PayloadError, decode_payload, encode_scan_payload};
use sickd::framer::{FrameError, Framed, encode_frame, next_frame};
use sickd_common::scan::{RangeUnit, SCAN_SAMPLES, Scan};

fn with_crc(mut bytes: Vec<u8>) -> Vec<u8> {
    let crc = crc16(&bytes);
    bytes.extend_from_slice(&crc.to_le_bytes());
    bytes
}

fn scan_frame() -> Vec<u8> {
    let scan = Scan::new([420; SCAN_SAMPLES], RangeUnit::Centimeters, 0);
    let payload = encode_scan_payload(&scan);
    let mut bytes = vec![0x02, 0x80];
    bytes.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    bytes.extend_from_slice(&payload);
    with_crc(bytes)
}

#[test]
fn test_identification_telegram() {
    let buf = with_crc(vec![0x02, 0x01, 0x05, 0x00, 0x90, 0x41, 0x42, 0x43, 0x44]);
    assert_eq!(buf.len(), 11);

    let Framed::Packet { discard, packet } = next_frame(&buf) else {
        panic!("expected a packet");
    };
    assert_eq!(discard, 11);
    assert_eq!(
        decode_payload(packet.payload, RangeUnit::Centimeters),
        Ok(Payload::Ident("ABCD".to_string()))
    );
}

#[test]
fn test_oversized_length_field() {
    let mut buf = vec![0x02, 0x01, 0xff, 0xff];
    buf.extend_from_slice(&[0x90; 64]);

    let framed = next_frame(&buf);
    assert_eq!(framed.discard(), 1);
    assert!(matches!(
        framed,
        Framed::Resync {
            error: FrameError::LengthTooLarge { .. },
            ..
        }
    ));
}

#[test]
fn test_scan_with_bad_checksum() {
    let mut buf = scan_frame();
    let crc_lo = buf.len() - 2;
    buf[crc_lo] ^= 0x40;

    let framed = next_frame(&buf);
    assert_eq!(framed.discard(), 1);
    assert!(matches!(
        framed,
        Framed::Resync {
            error: FrameError::ChecksumMismatch { .. },
            ..
        }
    ));
}

#[test]
fn test_scan_telegram_decodes() {
    let buf = scan_frame();
    let Framed::Packet { discard, packet } = next_frame(&buf) else {
        panic!("expected a packet");
    };
    assert_eq!(discard, buf.len());

    let Ok(Payload::Scan(scan)) = decode_payload(packet.payload, RangeUnit::Centimeters) else {
        panic!("expected a scan");
    };
    assert!(scan.distance().iter().all(|&d| d == 420));
    assert_eq!(scan.unit(), Some(RangeUnit::Centimeters));
}

#[test]
fn test_unknown_type_is_consumed() {
    let buf = with_crc(vec![0x02, 0x80, 0x02, 0x00, 0xa0, 0x10]);
    let Framed::Packet { discard, packet } = next_frame(&buf) else {
        panic!("expected a packet");
    };
    assert_eq!(discard, buf.len());
    assert_eq!(
        decode_payload(packet.payload, RangeUnit::Centimeters),
        Ok(Payload::Unknown(0xa0))
    );
}

#[test]
fn test_scan_with_flagged_count_word_is_rejected() {
    let scan = Scan::new([420; SCAN_SAMPLES], RangeUnit::Centimeters, 0);
    let mut payload = encode_scan_payload(&scan);
    payload[1..3].copy_from_slice(&0xc0b4u16.to_le_bytes());
    let buf = encode_frame(0x80, &payload);

    let Framed::Packet { discard, packet } = next_frame(&buf) else {
        panic!("expected a packet");
    };
    assert_eq!(discard, buf.len());
    assert!(matches!(
        decode_payload(packet.payload, RangeUnit::Centimeters),
        Err(PayloadError::ScanLength { count: 0xc0b4, .. })
    ));
}
