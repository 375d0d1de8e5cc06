//! Prelude module for common re-exports.
//!
//! ```rust
//! use sickd_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, DaemonConfig, DeviceConfig, LogLevel, SharedConfig, SickdConfig,
};

// ─── Scan Data ──────────────────────────────────────────────────────
pub use crate::scan::{RANGE_MASK, RangeUnit, SCAN_SAMPLES, SCAN_WIRE_SIZE, Scan};

// ─── Shared Region ──────────────────────────────────────────────────
pub use crate::shm::consts::{REGION_SIZE, SICKD_SHMEM_KEY, STAMP_NO_DATA};
