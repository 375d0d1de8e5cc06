//! Error types of the daemon
//!
//! Recoverable protocol errors live next to the code that produces them
//! ([`FrameError`](crate::framer::FrameError),
//! [`PayloadError`](crate::drivers::pls201::PayloadError)). The types here are
//! fatal: a [`DeviceError`] ends its device, a [`SickdError`] ends the
//! daemon.

use sickd_common::config::ConfigError;
use sickd_shared_memory::ShmError;
use std::io;
use std::os::fd::RawFd;
use thiserror::Error;

/// Fatal fault of one device.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Reading the byte stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The byte stream reached end of file or hung up.
    #[error("device {port} disconnected")]
    Disconnected {
        /// Port of the device
        port: String,
    },

    /// The receive buffer filled up without yielding a telegram.
    #[error("receive buffer full ({capacity} bytes) without a decodable telegram")]
    BufferFull {
        /// Receive buffer capacity
        capacity: usize,
    },

    /// The serial port could not be opened.
    #[error("failed to open {port}: {source}")]
    Open {
        /// Port path
        port: String,
        /// Cause
        source: io::Error,
    },

    /// The serial line could not be configured.
    #[error("failed to configure {port}: {source}")]
    Configure {
        /// Port path
        port: String,
        /// Cause
        source: nix::Error,
    },
}

/// Driver selection and device start up errors.
#[derive(Debug, Error)]
pub enum DriverError {
    /// No registered driver answers to the compatible string.
    #[error("no driver compatible with '{0}'")]
    DriverNotFound(String),

    /// The selected driver failed to open its device.
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// A device failed while the event loop serviced it.
#[derive(Debug, Error)]
#[error("device {port} (fd {handle}) failed: {source}")]
pub struct DeviceFault {
    /// Registry handle of the failed device
    pub handle: RawFd,
    /// Port of the failed device
    pub port: String,
    /// Cause
    #[source]
    pub source: DeviceError,
}

/// Fatal daemon error.
#[derive(Debug, Error)]
pub enum SickdError {
    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Driver selection or device open failed.
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    /// The shared scan region could not be set up.
    #[error("shared memory error: {0}")]
    Shm(#[from] ShmError),

    /// A device failed at run time.
    #[error(transparent)]
    Device(#[from] DeviceFault),

    /// Waiting for device readiness failed.
    #[error("poll failed: {0}")]
    Poll(nix::Error),

    /// `run` was called before `init`.
    #[error("daemon not initialized")]
    NotInitialized,
}

/// Result alias for daemon operations.
pub type SickdResult<T> = Result<T, SickdError>;
