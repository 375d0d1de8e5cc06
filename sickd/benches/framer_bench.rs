//! Checksum and framing throughput

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use sickd::crc::crc16;
use sickd::drivers::pls201::{decode_payload, encode_scan_payload};
use sickd::framer::{Framed, encode_frame, next_frame};
use sickd_common::scan::{RangeUnit, SCAN_SAMPLES, Scan};
use std::hint::black_box;

fn scan_telegram() -> Vec<u8> {
    let mut distance = [0u16; SCAN_SAMPLES];
    for (i, d) in distance.iter_mut().enumerate() {
        *d = 400 + (i as u16 % 50);
    }
    let scan = Scan::new(distance, RangeUnit::Centimeters, 0);
    encode_frame(0x80, &encode_scan_payload(&scan))
}

fn bench_crc(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc16");
    for len in [16usize, 370, 700] {
        let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &data, |b, data| {
            b.iter(|| black_box(crc16(black_box(data))));
        });
    }
    group.finish();
}

fn bench_frame_scan(c: &mut Criterion) {
    let telegram = scan_telegram();

    c.bench_function("frame_and_decode_scan", |b| {
        b.iter(|| {
            if let Framed::Packet { packet, .. } = next_frame(black_box(&telegram)) {
                black_box(decode_payload(packet.payload, RangeUnit::Centimeters).ok());
            }
        });
    });
}

fn bench_resync(c: &mut Criterion) {
    // Every byte is a start marker, so every candidate is checksummed and
    // fails.
    let noise = vec![0x02u8; 1024];

    c.bench_function("resync_marker_storm", |b| {
        b.iter(|| {
            let mut rest = &noise[..];
            while let Framed::Resync { discard, .. } = next_frame(rest) {
                rest = &rest[discard..];
            }
            black_box(rest.len())
        });
    });
}

criterion_group!(benches, bench_crc, bench_frame_scan, bench_resync);
criterion_main!(benches);
