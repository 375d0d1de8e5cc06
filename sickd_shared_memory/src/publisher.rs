//! Single writer side of the scan region

use crate::error::ShmResult;
use crate::layout::{SCAN_WORDS, scan_to_words};
use crate::poller::ScanPoller;
use crate::region::MappedRegion;
use crate::stamp::{self, STAMP_NO_DATA};
use sickd_common::scan::Scan;
use std::sync::Arc;
use tracing::trace;

/// Publishes scans into the region. Exactly one per region.
///
/// A publish is the seqlock write sequence:
///
/// 1. next stamp = `pre` + 1, skipping the sentinel
/// 2. store it into `pre` (release)
/// 3. copy the scan image
/// 4. store it into `post` (release)
///
/// Readers that see `pre != post`, or `pre` move while they copy, know a
/// publish overlapped their read and retry.
pub struct ScanPublisher {
    mapped: Arc<MappedRegion>,
    published: u64,
}

impl ScanPublisher {
    /// Create the cross-process region under `key`, reset to "no data".
    pub fn create(key: u32) -> ShmResult<Self> {
        Ok(Self::from_mapped(MappedRegion::create(key)?))
    }

    /// Create a region private to this process.
    pub fn anonymous(key: u32) -> ShmResult<Self> {
        Ok(Self::from_mapped(MappedRegion::anonymous(key)?))
    }

    fn from_mapped(mapped: MappedRegion) -> Self {
        Self {
            mapped: Arc::new(mapped),
            published: 0,
        }
    }

    /// Publish `scan`, returning its stamp.
    pub fn publish(&mut self, scan: &Scan) -> u64 {
        self.publish_paced(scan, || {})
    }

    /// Publish with `pace` called between the steps of the write sequence:
    /// after `pre` is stored and again halfway through the scan copy.
    pub(crate) fn publish_paced(&mut self, scan: &Scan, mut pace: impl FnMut()) -> u64 {
        let region = self.mapped.region();
        let words = scan_to_words(scan);
        let stamp = stamp::next(region.pre());

        region.begin_publish(stamp);
        pace();
        region.store_words(&words, 0..SCAN_WORDS / 2);
        pace();
        region.store_words(&words, SCAN_WORDS / 2..SCAN_WORDS);
        region.end_publish(stamp);

        self.published += 1;
        trace!("Published scan {}", stamp);
        stamp
    }

    /// Stamp of the last publish, or the sentinel.
    pub fn stamp(&self) -> u64 {
        let post = self.mapped.region().post();
        if self.published == 0 { STAMP_NO_DATA } else { post }
    }

    /// Number of publishes through this publisher.
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Region key.
    pub fn key(&self) -> u32 {
        self.mapped.key()
    }

    /// A poller sharing this publisher's mapping.
    pub fn poller(&self) -> ScanPoller {
        ScanPoller::from_mapped(Arc::clone(&self.mapped))
    }

    #[cfg(test)]
    pub(crate) fn mapped(&self) -> &MappedRegion {
        &self.mapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sickd_common::scan::{RangeUnit, SCAN_SAMPLES};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    fn filled(value: u16) -> Scan {
        Scan::new([value; SCAN_SAMPLES], RangeUnit::Centimeters, (value & 0xff) as u8)
    }

    #[test]
    fn test_first_publish_is_stamp_zero() {
        let mut publisher = ScanPublisher::anonymous(1).unwrap();
        assert_eq!(publisher.stamp(), STAMP_NO_DATA);

        assert_eq!(publisher.publish(&filled(1)), 0);
        assert_eq!(publisher.publish(&filled(2)), 1);
        assert_eq!(publisher.stamp(), 1);
        assert_eq!(publisher.published(), 2);

        let region = publisher.mapped().region();
        assert_eq!(region.pre(), region.post());
    }

    #[test]
    fn test_publish_skips_sentinel() {
        let mut publisher = ScanPublisher::anonymous(1).unwrap();
        publisher.mapped().region().set_stamps(STAMP_NO_DATA - 1);

        let stamp = publisher.publish(&filled(3));
        assert_ne!(stamp, STAMP_NO_DATA);
        assert_eq!(stamp, 0);
    }

    #[test]
    fn test_stamps_disagree_while_publishing() {
        let mut publisher = ScanPublisher::anonymous(1).unwrap();
        publisher.publish(&filled(1));

        let mapped = Arc::clone(&publisher.mapped);
        let mut seen = Vec::new();
        publisher.publish_paced(&filled(2), || {
            let region = mapped.region();
            seen.push((region.pre(), region.post()));
        });

        assert_eq!(seen, vec![(1, 0), (1, 0)]);
    }

    /// Readers never observe a scan mixing two publishes, even with the
    /// writer stalling between every step of the write sequence.
    #[test]
    fn test_concurrent_polls_never_tear() {
        let mut publisher = ScanPublisher::anonymous(1).unwrap();
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let mut poller = publisher.poller();
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    let mut updates = 0u64;
                    let mut last_value = 0u16;
                    loop {
                        let finished = done.load(Ordering::Acquire);
                        let result = poller.poll();
                        if let Some(scan) = result.scan {
                            let first = scan.distance()[0];
                            assert!(
                                scan.distance().iter().all(|&d| d == first),
                                "torn scan at stamp {}",
                                result.stamp
                            );
                            assert_eq!(scan.status(), (first & 0xff) as u8);
                            assert!(first >= last_value, "scan went backwards");
                            last_value = first;
                            if result.is_new() {
                                updates += 1;
                            }
                        }
                        if finished {
                            break;
                        }
                    }
                    updates
                })
            })
            .collect();

        for value in 1..=200u16 {
            publisher.publish_paced(&filled(value), || {
                thread::sleep(Duration::from_micros(50));
            });
        }
        done.store(true, Ordering::Release);

        for reader in readers {
            let updates = reader.join().unwrap();
            assert!(updates > 0);
        }
    }
}
