//! Sensor driver trait and the device it opens.
//!
//! This module defines:
//! - `SickDriver` trait - Interface for pluggable sensor protocol drivers
//! - `Device` struct - One open sensor: byte stream, driver and receive buffer
//! - `ScanSink` trait - Where decoded scans go
//! - `EventOutcome` enum - Result of servicing a readable device

use crate::error::DeviceError;
use crate::raw_frame::RawFrame;
use sickd_common::config::DeviceConfig;
use sickd_common::scan::{RangeUnit, Scan};
use sickd_shared_memory::ScanPublisher;
use std::io::{self, Read};
use std::os::fd::{AsFd, AsRawFd, RawFd};
use tracing::trace;

/// Readable, pollable byte stream of a sensor.
///
/// Serial ports in production; socket pairs and pipes in tests.
pub trait SerialLink: Read + AsFd + Send {}

impl<T: Read + AsFd + Send> SerialLink for T {}

/// Receives every scan a driver decodes.
pub trait ScanSink {
    /// Hand over one decoded scan.
    fn publish_scan(&mut self, scan: &Scan);
}

impl ScanSink for ScanPublisher {
    fn publish_scan(&mut self, scan: &Scan) {
        self.publish(scan);
    }
}

impl ScanSink for Vec<Scan> {
    fn publish_scan(&mut self, scan: &Scan) {
        self.push(*scan);
    }
}

/// Result of one `process_events` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Bytes were read and framed.
    Progress,
    /// Nothing was available to read.
    Idle,
}

/// Per-device protocol counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Bytes read from the link
    pub bytes_read: u64,
    /// Checksum-valid telegrams
    pub packets: u64,
    /// Scans handed to the sink
    pub scans: u64,
    /// Telegrams dropped for a bad length or checksum
    pub resyncs: u64,
    /// Bytes dropped outside any telegram
    pub noise_bytes: u64,
    /// Valid telegrams with a malformed or unknown payload
    pub rejected: u64,
}

/// One open sensor.
pub struct Device {
    port: String,
    link: Box<dyn SerialLink>,
    driver: &'static dyn SickDriver,
    frame: RawFrame,
    range_unit: RangeUnit,
    ident: Option<String>,
    stats: DeviceStats,
}

impl Device {
    /// Wrap an open byte stream.
    pub fn new(
        port: impl Into<String>,
        link: Box<dyn SerialLink>,
        driver: &'static dyn SickDriver,
    ) -> Self {
        Self {
            port: port.into(),
            link,
            driver,
            frame: RawFrame::new(),
            range_unit: RangeUnit::default(),
            ident: None,
            stats: DeviceStats::default(),
        }
    }

    /// Set the unit decoded scans are labelled with.
    pub fn with_range_unit(mut self, unit: RangeUnit) -> Self {
        self.range_unit = unit;
        self
    }

    /// Unit decoded scans are labelled with.
    pub fn range_unit(&self) -> RangeUnit {
        self.range_unit
    }

    /// Port the device was opened on.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Driver servicing the device.
    pub fn driver(&self) -> &'static dyn SickDriver {
        self.driver
    }

    /// Descriptor to wait on for readability.
    pub fn raw_fd(&self) -> RawFd {
        self.link.as_fd().as_raw_fd()
    }

    /// Receive buffer.
    pub fn frame(&self) -> &RawFrame {
        &self.frame
    }

    /// Receive buffer, mutable.
    pub fn frame_mut(&mut self) -> &mut RawFrame {
        &mut self.frame
    }

    /// Last identification text the sensor sent.
    pub fn ident(&self) -> Option<&str> {
        self.ident.as_deref()
    }

    /// Record identification text.
    pub fn set_ident(&mut self, ident: String) {
        self.ident = Some(ident);
    }

    /// Protocol counters.
    pub fn stats(&self) -> &DeviceStats {
        &self.stats
    }

    /// Protocol counters, mutable.
    pub fn stats_mut(&mut self) -> &mut DeviceStats {
        &mut self.stats
    }

    /// One bounded read into the receive buffer.
    ///
    /// Returns the number of bytes appended, zero when the link has nothing
    /// to give right now.
    ///
    /// # Errors
    ///
    /// - `DeviceError::BufferFull` if there is no room to read into
    /// - `DeviceError::Disconnected` on end of stream
    /// - `DeviceError::Io` on any other read failure
    pub fn read_available(&mut self) -> Result<usize, DeviceError> {
        if self.frame.is_full() {
            return Err(DeviceError::BufferFull {
                capacity: self.frame.capacity(),
            });
        }

        match self.frame.fill_from(&mut self.link) {
            Ok(0) => Err(DeviceError::Disconnected {
                port: self.port.clone(),
            }),
            Ok(read) => {
                self.stats.bytes_read += read as u64;
                trace!("{}: read {} bytes", self.port, read);
                Ok(read)
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
                Ok(0)
            }
            Err(e) => Err(DeviceError::Io(e)),
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("port", &self.port)
            .field("driver", &self.driver.name())
            .field("frame", &self.frame)
            .field("range_unit", &self.range_unit)
            .field("stats", &self.stats)
            .finish()
    }
}

/// Trait defining the interface for sensor protocol drivers.
///
/// Drivers carry no per-instance state; everything that belongs to one
/// sensor lives in its [`Device`]. A driver is selected at startup by
/// matching the configured compatible string against [`device_ids`].
///
/// # Lifecycle
///
/// 1. `open()` - Open and configure the port, once per configured sensor
/// 2. `process_events()` - Called by the event loop whenever the port is readable
/// 3. `close()` - Called at shutdown, or after a fatal device error
///
/// [`device_ids`]: SickDriver::device_ids
pub trait SickDriver: Send + Sync {
    /// Returns the driver's unique name.
    fn name(&self) -> &'static str;

    /// Compatible strings the driver answers to.
    fn device_ids(&self) -> &'static [&'static str];

    /// Whether the driver handles devices declared as `compatible`.
    fn identify(&self, compatible: &str) -> bool {
        self.device_ids().contains(&compatible)
    }

    /// Open the port described by `config`.
    ///
    /// # Errors
    /// Returns `DeviceError::Open` or `DeviceError::Configure` if the port
    /// cannot be used.
    fn open(&'static self, config: &DeviceConfig) -> Result<Device, DeviceError>;

    /// Release a device. The default drops it, closing the port.
    fn close(&self, device: Device) {
        tracing::info!("Closed {} ({})", device.port(), self.name());
    }

    /// Read what the device has to give and decode every complete telegram.
    ///
    /// Performs exactly one bounded read. Decoded scans go to `sink`.
    ///
    /// # Errors
    /// Any `DeviceError` is fatal for the device.
    fn process_events(
        &self,
        device: &mut Device,
        sink: &mut dyn ScanSink,
    ) -> Result<EventOutcome, DeviceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::net::UnixStream;

    struct NullDriver;

    impl SickDriver for NullDriver {
        fn name(&self) -> &'static str {
            "null"
        }

        fn device_ids(&self) -> &'static [&'static str] {
            &["null", "null-2"]
        }

        fn open(&'static self, config: &DeviceConfig) -> Result<Device, DeviceError> {
            let (link, _) = UnixStream::pair()?;
            Ok(Device::new(config.port.clone(), Box::new(link), self))
        }

        fn process_events(
            &self,
            _device: &mut Device,
            _sink: &mut dyn ScanSink,
        ) -> Result<EventOutcome, DeviceError> {
            Ok(EventOutcome::Idle)
        }
    }

    static NULL: NullDriver = NullDriver;

    fn pair_device() -> (Device, UnixStream) {
        let (ours, theirs) = UnixStream::pair().unwrap();
        ours.set_nonblocking(true).unwrap();
        (Device::new("test", Box::new(ours), &NULL), theirs)
    }

    #[test]
    fn test_identify_uses_id_table() {
        assert!(NULL.identify("null"));
        assert!(NULL.identify("null-2"));
        assert!(!NULL.identify("pls201"));
    }

    #[test]
    fn test_read_available() {
        let (mut device, mut peer) = pair_device();

        assert_eq!(device.read_available().unwrap(), 0);

        peer.write_all(&[1, 2, 3]).unwrap();
        assert_eq!(device.read_available().unwrap(), 3);
        assert_eq!(device.frame().filled(), &[1, 2, 3]);
        assert_eq!(device.stats().bytes_read, 3);
    }

    #[test]
    fn test_read_after_hangup() {
        let (mut device, peer) = pair_device();
        drop(peer);
        assert!(matches!(
            device.read_available(),
            Err(DeviceError::Disconnected { .. })
        ));
    }

    #[test]
    fn test_read_into_full_buffer() {
        let (mut device, _peer) = pair_device();
        let capacity = device.frame().capacity();
        device.frame_mut().extend_from_slice(&vec![0; capacity]);
        assert!(matches!(
            device.read_available(),
            Err(DeviceError::BufferFull { capacity: 1024 })
        ));
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut sink: Vec<Scan> = Vec::new();
        sink.publish_scan(&Scan::default());
        assert_eq!(sink.len(), 1);
    }
}
