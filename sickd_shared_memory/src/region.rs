//! Mapped scan region with its backing memory

use crate::error::{ShmError, ShmResult};
use crate::layout::ScanRegion;
use crate::platform::{SysvSegment, attach_segment, create_segment};
use memmap2::MmapMut;
use sickd_common::shm::consts::{REGION_SIZE, SHMEM_MODE};
use tracing::info;

/// Memory behind a mapped region.
enum Backing {
    /// Cross-process System V segment
    Sysv(SysvSegment),
    /// Private anonymous mapping, shared only inside this process
    Anonymous(MmapMut),
}

/// A scan region mapped into this process.
pub struct MappedRegion {
    key: u32,
    backing: Backing,
}

impl MappedRegion {
    /// Create the cross-process region under `key` and reset it to "no data".
    pub fn create(key: u32) -> ShmResult<Self> {
        let segment = create_segment(key, REGION_SIZE, SHMEM_MODE)?;
        let mapped = Self::new(key, Backing::Sysv(segment));
        mapped.region().initialize(key);

        info!("Created shared scan region {:#010x} ({} bytes)", key, REGION_SIZE);
        Ok(mapped)
    }

    /// Attach the cross-process region under `key` read-only.
    pub fn attach(key: u32) -> ShmResult<Self> {
        let segment = attach_segment(key, REGION_SIZE)?;
        let mapped = Self::new(key, Backing::Sysv(segment));

        let found = mapped.region().key();
        if found != key {
            return Err(ShmError::LayoutMismatch { key, found });
        }

        info!("Attached shared scan region {:#010x}", key);
        Ok(mapped)
    }

    /// Create an in-process region, for tests and embedding.
    pub fn anonymous(key: u32) -> ShmResult<Self> {
        let mmap = MmapMut::map_anon(REGION_SIZE)?;
        let mapped = Self::new(key, Backing::Anonymous(mmap));
        mapped.region().initialize(key);
        Ok(mapped)
    }

    fn new(key: u32, backing: Backing) -> Self {
        Self { key, backing }
    }

    /// Region key.
    pub fn key(&self) -> u32 {
        self.key
    }

    /// Whether the region is shared with other processes.
    pub fn is_cross_process(&self) -> bool {
        matches!(self.backing, Backing::Sysv(_))
    }

    /// Typed view of the mapping.
    pub fn region(&self) -> &ScanRegion {
        let base = match &self.backing {
            Backing::Sysv(segment) => segment.as_ptr(),
            Backing::Anonymous(mmap) => mmap.as_ptr(),
        };
        // SAFETY: both backings are page aligned, at least REGION_SIZE long
        // and live as long as `self`. ScanRegion is all atomics, so shared
        // references to it are sound while other processes write.
        unsafe { &*base.cast::<ScanRegion>() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sickd_common::shm::consts::STAMP_NO_DATA;

    #[test]
    fn test_anonymous_region_is_initialized() {
        let mapped = MappedRegion::anonymous(0x1234).unwrap();
        assert!(!mapped.is_cross_process());
        assert_eq!(mapped.region().key(), 0x1234);
        assert_eq!(mapped.region().pre(), STAMP_NO_DATA);
        assert_eq!(mapped.region().post(), STAMP_NO_DATA);
    }

    #[test]
    fn test_attach_checks_header_key() {
        let key = 0x5400_0000 | (std::process::id() & 0xffff);
        let created = MappedRegion::create(key).unwrap();
        assert!(created.is_cross_process());

        let attached = MappedRegion::attach(key).unwrap();
        assert_eq!(attached.region().pre(), STAMP_NO_DATA);
        assert_eq!(attached.key(), key);
    }
}
