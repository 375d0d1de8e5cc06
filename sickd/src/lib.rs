//! # sickd
//!
//! Daemon for SICK PLS laser rangefinders. It reads the sensor's serial
//! byte stream, frames and checksums the telegrams, decodes distance scans
//! and publishes the latest one to a shared memory region that any number
//! of consumer processes poll without locking.
//!
//! # Module Structure
//!
//! - [`crc`] - Telegram checksum
//! - [`framer`] - Start marker search, length sanity, checksum check, resync
//! - [`raw_frame`] - Per-device receive buffer
//! - [`driver`] - `SickDriver` trait, `Device`, `ScanSink`
//! - [`driver_registry`] - Compatible string to driver lookup
//! - [`drivers`] - Driver implementations
//! - [`serial`] - Raw tty setup
//! - [`events`] - Readiness multiplexer
//! - [`core`] - Start up, loop and shutdown
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────────────────────────────────────┐   ┌──────────────┐
//! │  PLS201   │   │                   sickd                      │   │  Consumers   │
//! │  (tty)    ├──►│ EventLoop ─► SickDriver ─► framer ─► decode  ├──►│  ScanPoller  │
//! └───────────┘   │                                    │         │   └──────────────┘
//!                 │                              ScanPublisher   │
//!                 └──────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod core;
pub mod crc;
pub mod driver;
pub mod driver_registry;
pub mod drivers;
pub mod error;
pub mod events;
pub mod framer;
pub mod raw_frame;
pub mod serial;

pub use crate::core::SickdCore;
pub use crate::driver::{Device, EventOutcome, ScanSink, SickDriver};
pub use crate::driver_registry::DriverRegistry;
pub use crate::error::{DeviceError, DriverError, SickdError, SickdResult};
pub use crate::events::EventLoop;
pub use crate::framer::{FrameError, Framed, Packet, next_frame};
