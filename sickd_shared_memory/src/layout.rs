//! Byte layout of the shared scan region and its ordered accessors
//!
//! The region is never handed out as a plain aggregate. Every field is an
//! atomic, and the scan image is moved in and out word by word, so readers
//! racing a publish see stale or torn bytes but never undefined behavior.
//! The stamps tell them which one it was.

use sickd_common::scan::{SCAN_WIRE_SIZE, Scan};
use sickd_common::shm::consts::{
    KEY_OFFSET, POST_STAMP_OFFSET, PRE_STAMP_OFFSET, REGION_SIZE, SCAN_OFFSET, STAMP_NO_DATA,
};
use static_assertions::const_assert_eq;
use std::mem::{align_of, offset_of, size_of};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering, fence};

/// Number of 64-bit words holding the scan image.
pub const SCAN_WORDS: usize = SCAN_WIRE_SIZE.div_ceil(8);

/// Shared scan region, mapped in place over the shared memory.
#[repr(C, align(8))]
pub struct ScanRegion {
    /// Region key, written once by the producer
    key: AtomicU32,
    /// Reserved, always zero
    reserved: AtomicU32,
    /// Stamp written before the scan image
    pre: AtomicU64,
    /// Stamp written after the scan image
    post: AtomicU64,
    /// Scan wire image, native-endian words over little-endian bytes
    scan: [AtomicU64; SCAN_WORDS],
}

const_assert_eq!(offset_of!(ScanRegion, key), KEY_OFFSET);
const_assert_eq!(offset_of!(ScanRegion, pre), PRE_STAMP_OFFSET);
const_assert_eq!(offset_of!(ScanRegion, post), POST_STAMP_OFFSET);
const_assert_eq!(offset_of!(ScanRegion, scan), SCAN_OFFSET);
const_assert_eq!(size_of::<ScanRegion>(), REGION_SIZE);
const_assert_eq!(align_of::<ScanRegion>(), 8);

impl ScanRegion {
    /// Reset the region to "no data" and stamp it with `key`.
    pub(crate) fn initialize(&self, key: u32) {
        self.pre.store(STAMP_NO_DATA, Ordering::Release);
        self.post.store(STAMP_NO_DATA, Ordering::Release);
        self.reserved.store(0, Ordering::Relaxed);
        self.key.store(key, Ordering::Release);
    }

    /// Key stored in the region header.
    pub fn key(&self) -> u32 {
        self.key.load(Ordering::Acquire)
    }

    /// Current `pre` stamp.
    #[inline]
    pub fn pre(&self) -> u64 {
        self.pre.load(Ordering::Acquire)
    }

    /// Current `post` stamp.
    #[inline]
    pub fn post(&self) -> u64 {
        self.post.load(Ordering::Acquire)
    }

    /// Announce a publish: `pre` becomes visible before any scan word.
    #[inline]
    pub(crate) fn begin_publish(&self, stamp: u64) {
        self.pre.store(stamp, Ordering::Release);
        fence(Ordering::Release);
    }

    /// Complete a publish: every scan word is visible before `post`.
    #[inline]
    pub(crate) fn end_publish(&self, stamp: u64) {
        self.post.store(stamp, Ordering::Release);
    }

    /// Store `words[range]` into the region.
    pub(crate) fn store_words(&self, words: &[u64; SCAN_WORDS], range: std::ops::Range<usize>) {
        for idx in range {
            self.scan[idx].store(words[idx], Ordering::Relaxed);
        }
    }

    /// Copy the scan image out of the region.
    ///
    /// The acquire fence after the copy orders it before the caller's
    /// re-read of `pre`.
    pub(crate) fn load_words(&self) -> [u64; SCAN_WORDS] {
        let mut words = [0u64; SCAN_WORDS];
        for (word, slot) in words.iter_mut().zip(self.scan.iter()) {
            *word = slot.load(Ordering::Relaxed);
        }
        fence(Ordering::Acquire);
        words
    }

    /// Overwrite both stamps. Only valid while no publish is in flight.
    #[cfg(test)]
    pub(crate) fn set_stamps(&self, stamp: u64) {
        self.pre.store(stamp, Ordering::Release);
        self.post.store(stamp, Ordering::Release);
    }
}

/// Pack a scan into region words.
pub fn scan_to_words(scan: &Scan) -> [u64; SCAN_WORDS] {
    let mut bytes = [0u8; SCAN_WORDS * 8];
    bytes[..SCAN_WIRE_SIZE].copy_from_slice(&scan.to_wire());

    let mut words = [0u64; SCAN_WORDS];
    for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(8)) {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(chunk);
        *word = u64::from_ne_bytes(raw);
    }
    words
}

/// Unpack region words into a scan.
pub fn words_to_scan(words: &[u64; SCAN_WORDS]) -> Scan {
    let mut bytes = [0u8; SCAN_WORDS * 8];
    for (chunk, word) in bytes.chunks_exact_mut(8).zip(words.iter()) {
        chunk.copy_from_slice(&word.to_ne_bytes());
    }

    let mut wire = [0u8; SCAN_WIRE_SIZE];
    wire.copy_from_slice(&bytes[..SCAN_WIRE_SIZE]);
    Scan::from_wire(&wire)
}
