//! Shared region constants.
//!
//! These define the byte-exact layout of the scan region. They are the
//! single source of truth - the producer and every consumer build must agree
//! on them.
//!
//! ```text
//! offset  size  field
//!      0     4  key        ("SICK" read as a little-endian u32)
//!      4     4  reserved   (zero)
//!      8     8  pre stamp  (native-endian atomic u64)
//!     16     8  post stamp (native-endian atomic u64)
//!     24   360  samples    (180 x little-endian u16)
//!    384     1  unit code
//!    385     1  status
//!    386     6  padding to 8-byte alignment
//! ```

use crate::scan::SCAN_WIRE_SIZE;

/// Key of the shared scan region: the string "SICK" read as a
/// little-endian integer.
pub const SICKD_SHMEM_KEY: u32 = u32::from_le_bytes(*b"SICK");

/// Stamp value meaning "no scan has been published yet".
///
/// It is reserved: the producer never publishes it as a sequence value.
pub const STAMP_NO_DATA: u64 = u64::MAX;

/// Permission bits of the region created by the producer.
pub const SHMEM_MODE: u32 = 0o644;

/// Byte offset of the key field.
pub const KEY_OFFSET: usize = 0;

/// Byte offset of the `pre` stamp.
pub const PRE_STAMP_OFFSET: usize = 8;

/// Byte offset of the `post` stamp.
pub const POST_STAMP_OFFSET: usize = 16;

/// Byte offset of the scan wire image.
pub const SCAN_OFFSET: usize = 24;

/// Total size of the region in bytes.
pub const REGION_SIZE: usize = (SCAN_OFFSET + SCAN_WIRE_SIZE).next_multiple_of(8);
