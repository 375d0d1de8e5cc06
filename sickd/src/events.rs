//! Readiness multiplexer over the open devices
//!
//! Single threaded: one `poll(2)` wait per [`EventLoop::run_once`], then every
//! ready device is serviced to completion in turn. The wait is always
//! bounded so the caller gets control back often enough to notice a
//! shutdown request.

use crate::driver::{Device, ScanSink};
use crate::error::{DeviceFault, SickdError, SickdResult};
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use std::os::fd::{BorrowedFd, RawFd};
use std::time::Duration;
use tracing::{debug, error, trace};

/// A registered device and the handle it is polled on.
struct Entry {
    handle: RawFd,
    device: Device,
}

/// Owns the devices being serviced, keyed by their pollable handle.
#[derive(Default)]
pub struct EventLoop {
    entries: Vec<Entry>,
}

impl EventLoop {
    /// Empty loop.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start servicing `device` when `handle` becomes readable.
    ///
    /// `handle` must stay open for as long as the device is registered;
    /// normally it is the device's own descriptor.
    pub fn add(&mut self, device: Device, handle: RawFd) {
        debug!("Watching {} on fd {}", device.port(), handle);
        self.entries.push(Entry { handle, device });
    }

    /// Stop servicing the device registered under `handle` and hand it back.
    pub fn remove(&mut self, handle: RawFd) -> Option<Device> {
        let idx = self.entries.iter().position(|e| e.handle == handle)?;
        let entry = self.entries.swap_remove(idx);
        debug!("Stopped watching {} on fd {}", entry.device.port(), handle);
        Some(entry.device)
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no device is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered device under `handle`.
    pub fn device(&self, handle: RawFd) -> Option<&Device> {
        self.entries
            .iter()
            .find(|e| e.handle == handle)
            .map(|e| &e.device)
    }

    /// Registered handles, in no particular order.
    pub fn handles(&self) -> Vec<RawFd> {
        self.entries.iter().map(|e| e.handle).collect()
    }

    /// Remove and return every device.
    pub fn drain(&mut self) -> Vec<Device> {
        self.entries.drain(..).map(|e| e.device).collect()
    }

    /// Wait up to `timeout` for readable devices and service each one.
    ///
    /// Returns the number of devices serviced. A wait interrupted by a
    /// signal services nothing and returns zero.
    ///
    /// # Errors
    ///
    /// - `SickdError::Device` with the handle of the first device whose
    ///   driver reported a fatal error; devices after it are not serviced
    /// - `SickdError::Poll` if the wait itself failed
    pub fn run_once(&mut self, timeout: Duration, sink: &mut dyn ScanSink) -> SickdResult<usize> {
        let ready = self.wait(timeout)?;
        let mut serviced = 0;

        for idx in ready {
            let Entry { handle, device } = &mut self.entries[idx];
            let driver = device.driver();
            match driver.process_events(device, sink) {
                Ok(outcome) => {
                    trace!("fd {}: {:?}", handle, outcome);
                    serviced += 1;
                }
                Err(source) => {
                    error!("{} (fd {}) failed: {}", device.port(), handle, source);
                    return Err(SickdError::Device(DeviceFault {
                        handle: *handle,
                        port: device.port().to_string(),
                        source,
                    }));
                }
            }
        }

        Ok(serviced)
    }

    /// Indices of the entries whose handle is readable or hung up.
    fn wait(&self, timeout: Duration) -> SickdResult<Vec<usize>> {
        let mut fds: Vec<PollFd<'_>> = self
            .entries
            .iter()
            .map(|e| {
                // SAFETY: the handle belongs to the device stored next to it
                // and stays open while the entry exists.
                let fd = unsafe { BorrowedFd::borrow_raw(e.handle) };
                PollFd::new(fd, PollFlags::POLLIN)
            })
            .collect();

        match poll(&mut fds, poll_timeout(timeout)) {
            Ok(0) => return Ok(Vec::new()),
            Ok(_) => {}
            Err(Errno::EINTR) => return Ok(Vec::new()),
            Err(e) => return Err(SickdError::Poll(e)),
        }

        // Hang-ups and errors are handed to the driver too; its read
        // reports them.
        Ok(fds
            .iter()
            .enumerate()
            .filter(|(_, fd)| fd.revents().is_some_and(|r| !r.is_empty()))
            .map(|(idx, _)| idx)
            .collect())
    }
}

fn poll_timeout(timeout: Duration) -> PollTimeout {
    let millis = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
    PollTimeout::from(millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::pls201::PLS201;
    use sickd_common::scan::Scan;
    use std::os::unix::net::UnixStream;

    fn pair_device(port: &str) -> (Device, UnixStream) {
        let (ours, theirs) = UnixStream::pair().unwrap();
        ours.set_nonblocking(true).unwrap();
        (Device::new(port, Box::new(ours), &PLS201), theirs)
    }

    #[test]
    fn test_add_and_remove() {
        let mut events = EventLoop::new();
        let (a, _pa) = pair_device("a");
        let (b, _pb) = pair_device("b");
        let (c, _pc) = pair_device("c");
        let (fa, fb, fc) = (a.raw_fd(), b.raw_fd(), c.raw_fd());
        events.add(a, fa);
        events.add(b, fb);
        events.add(c, fc);

        let removed = events.remove(fa).unwrap();
        assert_eq!(removed.port(), "a");
        assert_eq!(events.len(), 2);

        // Last entry moved into the freed slot
        let mut handles = events.handles();
        handles.sort();
        let mut expected = vec![fb, fc];
        expected.sort();
        assert_eq!(handles, expected);
        assert_eq!(events.device(fc).map(|d| d.port()), Some("c"));

        assert!(events.remove(fa).is_none());
    }

    #[test]
    fn test_timeout_without_input() {
        let mut events = EventLoop::new();
        let (device, _peer) = pair_device("quiet");
        let fd = device.raw_fd();
        events.add(device, fd);

        let mut sink: Vec<Scan> = Vec::new();
        let serviced = events
            .run_once(Duration::from_millis(10), &mut sink)
            .unwrap();
        assert_eq!(serviced, 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_empty_loop_waits_out_timeout() {
        let mut events = EventLoop::new();
        let mut sink: Vec<Scan> = Vec::new();
        assert_eq!(
            events.run_once(Duration::from_millis(1), &mut sink).unwrap(),
            0
        );
    }

    #[test]
    fn test_poll_timeout_clamps() {
        assert_eq!(poll_timeout(Duration::from_millis(100)), PollTimeout::from(100u16));
        assert_eq!(poll_timeout(Duration::from_secs(3600)), PollTimeout::from(u16::MAX));
    }
}
