//! Lock-free consumer side of the scan region

use crate::error::ShmResult;
use crate::layout::words_to_scan;
use crate::region::MappedRegion;
use crate::stamp::{self, STAMP_NO_DATA};
use sickd_common::scan::Scan;
use std::sync::Arc;
use tracing::debug;

/// Outcome of one [`ScanPoller::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollResult<'a> {
    /// Stamp of the returned scan, or the sentinel when nothing was ever
    /// published.
    pub stamp: u64,
    /// Publishes since the previous poll. Zero when the scan did not change.
    pub gap: u64,
    /// Freshest complete scan, `None` before the first publish.
    pub scan: Option<&'a Scan>,
}

impl PollResult<'_> {
    /// Whether this poll returned a scan not seen before.
    pub fn is_new(&self) -> bool {
        self.gap > 0
    }

    /// Publishes that happened between two polls and were never seen.
    pub fn missed(&self) -> u64 {
        self.gap.saturating_sub(1)
    }

    /// Whether the region has never received a publish.
    pub fn is_empty(&self) -> bool {
        self.stamp == STAMP_NO_DATA
    }
}

/// Polls the region for the newest scan.
///
/// Polling never blocks the producer and has no effect on the region. The
/// copy loop retries for as long as publishes keep overlapping it; at the
/// sensor's few-hertz scan rate that is at most once or twice.
pub struct ScanPoller {
    mapped: Arc<MappedRegion>,
    last_stamp: u64,
    latest: Option<Scan>,
    missed: u64,
    retries: u64,
}

impl ScanPoller {
    /// Attach the cross-process region under `key`.
    pub fn attach(key: u32) -> ShmResult<Self> {
        Ok(Self::from_mapped(Arc::new(MappedRegion::attach(key)?)))
    }

    pub(crate) fn from_mapped(mapped: Arc<MappedRegion>) -> Self {
        Self {
            mapped,
            last_stamp: STAMP_NO_DATA,
            latest: None,
            missed: 0,
            retries: 0,
        }
    }

    /// Return the freshest complete scan and its stamp.
    pub fn poll(&mut self) -> PollResult<'_> {
        let region = self.mapped.region();

        // Fast path: nothing new, the scan slot is not touched.
        if region.pre() == self.last_stamp {
            return PollResult {
                stamp: self.last_stamp,
                gap: 0,
                scan: self.latest.as_ref(),
            };
        }

        let (stamp, words) = loop {
            let post = region.post();
            let words = region.load_words();
            if region.pre() == post {
                break (post, words);
            }
            self.retries += 1;
            std::hint::spin_loop();
        };

        if !stamp::is_published(stamp) {
            // The producer restarted and reset the region.
            self.last_stamp = STAMP_NO_DATA;
            self.latest = None;
            return PollResult {
                stamp: STAMP_NO_DATA,
                gap: 0,
                scan: None,
            };
        }

        let gap = stamp::gap(self.last_stamp, stamp);
        if gap > 1 {
            self.missed += gap - 1;
            debug!("Missed {} scan(s) before stamp {}", gap - 1, stamp);
        }

        self.last_stamp = stamp;
        self.latest = Some(words_to_scan(&words));

        PollResult {
            stamp,
            gap,
            scan: self.latest.as_ref(),
        }
    }

    /// Check whether a publish completed or started since the last poll.
    pub fn has_changed(&self) -> bool {
        self.mapped.region().pre() != self.last_stamp
    }

    /// Stamp of the last observed scan, or the sentinel.
    pub fn last_stamp(&self) -> u64 {
        self.last_stamp
    }

    /// Last observed scan.
    pub fn latest(&self) -> Option<&Scan> {
        self.latest.as_ref()
    }

    /// Total publishes missed since this poller was created.
    pub fn missed_updates(&self) -> u64 {
        self.missed
    }

    /// Copies discarded because a publish overlapped them.
    pub fn torn_reads(&self) -> u64 {
        self.retries
    }

    /// Region key.
    pub fn key(&self) -> u32 {
        self.mapped.key()
    }
}
