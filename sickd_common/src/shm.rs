//! Shared memory constants.
//!
//! This module contains:
//! - `consts`: The region key, stamp sentinel and byte layout of the region.
//!
//! The publish/poll protocol itself lives in `sickd_shared_memory`.

pub mod consts;
