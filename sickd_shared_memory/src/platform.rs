//! Platform-specific shared memory backends

pub mod linux;

pub use linux::{SysvSegment, attach_segment, create_segment};
