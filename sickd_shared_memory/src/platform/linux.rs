//! System V shared memory segments
//!
//! The scan region is published under a fixed numeric key so that consumers
//! built independently of the daemon can find it without any naming
//! convention beyond the key.

use crate::error::{ShmError, ShmResult};
use nix::errno::Errno;
use std::ptr::NonNull;
use tracing::{debug, warn};

/// An attached System V shared memory segment.
///
/// Detached on drop. The creating side also marks the segment for removal,
/// so it disappears once the last consumer detaches.
pub struct SysvSegment {
    key: u32,
    id: libc::c_int,
    addr: NonNull<u8>,
    size: usize,
    owner: bool,
}

// The mapping is process-shared memory; all access goes through atomics.
unsafe impl Send for SysvSegment {}
unsafe impl Sync for SysvSegment {}

impl SysvSegment {
    /// Base address of the mapping.
    pub fn as_ptr(&self) -> *const u8 {
        self.addr.as_ptr()
    }

    /// Segment key.
    pub fn key(&self) -> u32 {
        self.key
    }

    /// Segment identifier returned by `shmget`.
    pub fn id(&self) -> libc::c_int {
        self.id
    }

    /// Size requested at attach time.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether this handle created the segment and removes it on drop.
    pub fn is_owner(&self) -> bool {
        self.owner
    }
}

impl Drop for SysvSegment {
    fn drop(&mut self) {
        // SAFETY: addr came from a successful shmat and is detached once.
        if unsafe { libc::shmdt(self.addr.as_ptr().cast()) } < 0 {
            warn!("shmdt failed for key {:#010x}: {}", self.key, Errno::last());
        }

        if self.owner {
            match mark_removed(self.id) {
                Ok(()) => debug!("Shared region {:#010x} marked for removal", self.key),
                Err(errno) => {
                    warn!("shmctl(IPC_RMID) failed for key {:#010x}: {}", self.key, errno)
                }
            }
        }
    }
}

/// Create (or reuse) the segment under `key` and attach it read-write.
pub fn create_segment(key: u32, size: usize, mode: u32) -> ShmResult<SysvSegment> {
    let flags = libc::IPC_CREAT | (mode & 0o777) as libc::c_int;
    let id = shmget(key, size, flags)?;
    let addr = match shmat(key, id, 0) {
        Ok(addr) => addr,
        Err(e) => {
            // Nobody is attached yet, so the segment goes away right here
            if let Err(errno) = mark_removed(id) {
                warn!("shmctl(IPC_RMID) failed for key {:#010x}: {}", key, errno);
            }
            return Err(e);
        }
    };

    Ok(SysvSegment {
        key,
        id,
        addr,
        size,
        owner: true,
    })
}

/// Attach an existing segment under `key` read-only.
pub fn attach_segment(key: u32, size: usize) -> ShmResult<SysvSegment> {
    let id = shmget(key, size, 0)?;
    let addr = shmat(key, id, libc::SHM_RDONLY)?;

    Ok(SysvSegment {
        key,
        id,
        addr,
        size,
        owner: false,
    })
}

fn shmget(key: u32, size: usize, flags: libc::c_int) -> ShmResult<libc::c_int> {
    // SAFETY: plain syscall, no pointers involved.
    let id = unsafe { libc::shmget(key as libc::key_t, size, flags) };
    if id < 0 {
        return Err(map_errno(key, size, Errno::last()));
    }
    Ok(id)
}

fn shmat(key: u32, id: libc::c_int, flags: libc::c_int) -> ShmResult<NonNull<u8>> {
    // SAFETY: a null address lets the kernel pick the mapping location.
    let addr = unsafe { libc::shmat(id, std::ptr::null(), flags) };
    if addr as isize == -1 {
        return Err(map_errno(key, 0, Errno::last()));
    }
    NonNull::new(addr.cast::<u8>()).ok_or(ShmError::Nix {
        source: Errno::EFAULT,
    })
}

fn mark_removed(id: libc::c_int) -> Result<(), Errno> {
    // SAFETY: IPC_RMID takes no buffer.
    let ret = unsafe { libc::shmctl(id, libc::IPC_RMID, std::ptr::null_mut()) };
    if ret < 0 {
        return Err(Errno::last());
    }
    Ok(())
}

fn map_errno(key: u32, size: usize, errno: Errno) -> ShmError {
    match errno {
        Errno::ENOENT => ShmError::NotFound { key },
        Errno::EACCES | Errno::EPERM => ShmError::PermissionDenied { key },
        Errno::EINVAL if size > 0 => ShmError::SizeMismatch {
            key,
            expected: size,
        },
        other => ShmError::Nix { source: other },
    }
}
