//! Sequence stamp arithmetic
//!
//! Stamps count publishes. They wrap around and never take the value
//! [`STAMP_NO_DATA`], which is reserved for "nothing published yet". The
//! sequence space therefore has `u64::MAX` values: `0..u64::MAX`.

pub use sickd_common::shm::consts::STAMP_NO_DATA;

/// Stamp following `stamp`, skipping the sentinel.
///
/// The successor of the sentinel itself is `0`, which makes the first
/// publish into a freshly initialized region stamp `0`.
#[inline]
pub const fn next(stamp: u64) -> u64 {
    let next = stamp.wrapping_add(1);
    if next == STAMP_NO_DATA {
        next.wrapping_add(1)
    } else {
        next
    }
}

/// Check whether a stamp refers to a published scan.
#[inline]
pub const fn is_published(stamp: u64) -> bool {
    stamp != STAMP_NO_DATA
}

/// Number of publishes between two observed stamps.
///
/// A gap of one means nothing was missed. A gap of zero means the stamp did
/// not change. The first observation after the sentinel counts as a gap of
/// one, since publishes before a consumer started are not its misses.
#[inline]
pub const fn gap(previous: u64, current: u64) -> u64 {
    if !is_published(current) {
        return 0;
    }
    if !is_published(previous) {
        return 1;
    }
    if current >= previous {
        current - previous
    } else {
        // Wrapped: count up to the sentinel (excluded), then from zero.
        (STAMP_NO_DATA - previous) + current
    }
}
