//! # sickd Shared Memory
//!
//! Lock-free, single-writer multi-reader exchange of the latest range scan
//! between the `sickd` daemon and any number of consumer processes.
//!
//! The region holds one scan and two stamps, `pre` and `post`. The daemon
//! bumps `pre`, copies the scan, then sets `post` to the same value. A
//! consumer reads `post`, copies the scan and re-reads `pre`; if the two
//! differ a publish overlapped the copy and it tries again. Nothing ever
//! blocks the producer.
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────────────┐    ┌─────────────────┐
//! │  sickd          │    │  Shared Region "SICK"    │    │  Consumer 1     │
//! │                 │    │                          │    │                 │
//! │ ScanPublisher   ├───►│ key | pre | post | Scan  ├───►│ ScanPoller      │
//! │                 │    │                          │    │                 │
//! └─────────────────┘    └──────────────────────────┘    └─────────────────┘
//!                                     │                  ┌─────────────────┐
//!                                     └─────────────────►│  Consumer N     │
//!                                                        │ ScanPoller      │
//!                                                        └─────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use sickd_common::scan::{RangeUnit, SCAN_SAMPLES, Scan};
//! use sickd_shared_memory::{STAMP_NO_DATA, ScanPublisher};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Producer (in-process region; the daemon uses `ScanPublisher::create`)
//! let mut publisher = ScanPublisher::anonymous(0x4b43_4953)?;
//!
//! // Consumer (other processes use `ScanPoller::attach`)
//! let mut poller = publisher.poller();
//! assert_eq!(poller.poll().stamp, STAMP_NO_DATA);
//!
//! let scan = Scan::new([500; SCAN_SAMPLES], RangeUnit::Centimeters, 0);
//! let stamp = publisher.publish(&scan);
//!
//! let result = poller.poll();
//! assert_eq!(result.stamp, stamp);
//! assert_eq!(result.scan, Some(&scan));
//! # Ok(())
//! # }
//! ```
//!
//! ## Thread Safety
//!
//! - **ScanPublisher**: exactly one per region, across all processes
//! - **ScanPoller**: one per consuming thread; any number per region

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod layout;
pub mod platform;
pub mod poller;
pub mod publisher;
pub mod region;
pub mod stamp;

pub use error::{ShmError, ShmResult};
pub use layout::ScanRegion;
pub use poller::{PollResult, ScanPoller};
pub use publisher::ScanPublisher;
pub use region::MappedRegion;
pub use sickd_common::shm::consts::{REGION_SIZE, SICKD_SHMEM_KEY, STAMP_NO_DATA};

/// Initialize tracing for consumer programs without their own subscriber
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_line_number(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
