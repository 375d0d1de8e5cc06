//! Error types for shared memory operations

use thiserror::Error;

/// Errors that can occur while creating or attaching the scan region
#[derive(Error, Debug)]
pub enum ShmError {
    /// No region exists under the key
    #[error("Shared region not found: key {key:#010x} (is sickd running?)")]
    NotFound {
        /// Region key
        key: u32,
    },

    /// Permission denied
    #[error("Permission denied accessing shared region: key {key:#010x}")]
    PermissionDenied {
        /// Region key
        key: u32,
    },

    /// A region exists under the key but is smaller than the scan region
    #[error("Shared region {key:#010x} has an incompatible size (expected {expected} bytes)")]
    SizeMismatch {
        /// Region key
        key: u32,
        /// Expected region size in bytes
        expected: usize,
    },

    /// The region does not carry the expected key in its header
    #[error("Shared region {key:#010x} is not a scan region (header key {found:#010x})")]
    LayoutMismatch {
        /// Region key
        key: u32,
        /// Key found in the region header
        found: u32,
    },

    /// IO error
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },

    /// Nix system call error
    #[error("System call error: {source}")]
    Nix {
        /// Source nix error
        #[from]
        source: nix::Error,
    },
}

/// Result type for shared memory operations
pub type ShmResult<T> = Result<T, ShmError>;
