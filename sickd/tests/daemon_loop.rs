//! Event loop, driver and publisher working together

use sickd::drivers::pls201::{PLS201, encode_scan_payload};
use sickd::framer::encode_frame;
use sickd::{Device, DriverRegistry, EventLoop, SickdCore, SickdError};
use sickd_common::config::SickdConfig;
use sickd_common::scan::{RangeUnit, SCAN_SAMPLES, Scan};
use sickd_shared_memory::ScanPublisher;
use std::io::Write;
use std::os::unix::net::UnixStream;
use std::time::Duration;

fn pair_device(port: &str) -> (Device, UnixStream) {
    let (ours, theirs) = UnixStream::pair().unwrap();
    ours.set_nonblocking(true).unwrap();
    (Device::new(port, Box::new(ours), &PLS201), theirs)
}

fn scan_telegram(value: u16) -> Vec<u8> {
    let scan = Scan::new([value; SCAN_SAMPLES], RangeUnit::Centimeters, 0);
    encode_frame(0x80, &encode_scan_payload(&scan))
}

fn test_core() -> SickdCore {
    let mut config = SickdConfig::default();
    config.daemon.poll_timeout_ms = 50;
    let mut core = SickdCore::new(config, DriverRegistry::with_builtin()).unwrap();
    core.attach_publisher(ScanPublisher::anonymous(0x5349_434b).unwrap());
    core
}

#[test]
fn test_scans_reach_consumers() {
    let mut events = EventLoop::new();
    let mut publisher = ScanPublisher::anonymous(0x5349_434b).unwrap();
    let mut poller = publisher.poller();

    let (device, mut sensor) = pair_device("sensor0");
    let fd = device.raw_fd();
    events.add(device, fd);

    sensor.write_all(&scan_telegram(321)).unwrap();
    let serviced = events
        .run_once(Duration::from_millis(500), &mut publisher)
        .unwrap();
    assert_eq!(serviced, 1);

    let result = poller.poll();
    assert_eq!(result.stamp, 0);
    assert!(result.scan.unwrap().distance().iter().all(|&d| d == 321));
}

#[test]
fn test_two_devices_share_the_region() {
    let mut core = test_core();
    let (a, mut sensor_a) = pair_device("sensor-a");
    let (b, mut sensor_b) = pair_device("sensor-b");
    core.add_device(a);
    core.add_device(b);

    sensor_a.write_all(&scan_telegram(100)).unwrap();
    sensor_b.write_all(&scan_telegram(200)).unwrap();

    for _ in 0..10 {
        if core.published() == 2 {
            break;
        }
        core.step().unwrap();
    }
    assert_eq!(core.published(), 2);
}

#[test]
fn test_telegram_split_across_reads() {
    let mut core = test_core();
    let (device, mut sensor) = pair_device("slow");
    core.add_device(device);

    let telegram = scan_telegram(77);
    for chunk in telegram.chunks(64) {
        sensor.write_all(chunk).unwrap();
        core.step().unwrap();
    }
    assert_eq!(core.published(), 1);
}

#[test]
fn test_line_noise_between_scans() {
    let mut core = test_core();
    let (device, mut sensor) = pair_device("noisy");
    core.add_device(device);

    let mut stream = vec![0xff, 0x02, 0x00, 0xff, 0xff, 0x13];
    stream.extend_from_slice(&scan_telegram(10));
    stream.extend_from_slice(&[0x55; 20]);
    stream.extend_from_slice(&scan_telegram(11));
    sensor.write_all(&stream).unwrap();

    for _ in 0..5 {
        core.step().unwrap();
    }
    assert_eq!(core.published(), 2);
}

#[test]
fn test_disconnect_is_fatal() {
    let mut core = test_core();
    let (device, sensor) = pair_device("unplugged");
    core.add_device(device);
    drop(sensor);

    match core.step() {
        Err(SickdError::Device(fault)) => assert_eq!(fault.port, "unplugged"),
        other => panic!("expected device fault, got {other:?}"),
    }
    assert!(core.events().is_empty());
}
