//! sickd Common Library
//!
//! Types and constants shared between the `sickd` daemon and every process
//! that consumes its scans through shared memory.
//!
//! # Module Structure
//!
//! - [`scan`] - The published scan record and its range unit
//! - [`shm`] - Shared region key, stamp sentinel and layout constants
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use sickd_common::prelude::*;
//!
//! let scan = Scan::new([500; SCAN_SAMPLES], RangeUnit::Centimeters, 0);
//! assert_eq!(scan.unit(), Some(RangeUnit::Centimeters));
//! assert_eq!(SICKD_SHMEM_KEY, 0x4b43_4953);
//! ```

pub mod config;
pub mod prelude;
pub mod scan;
pub mod shm;
