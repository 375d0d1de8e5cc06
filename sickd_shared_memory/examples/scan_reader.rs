//! Console consumer: polls the daemon's region and prints each new scan
//!
//! ```bash
//! cargo run -p sickd_shared_memory --example scan_reader
//! ```

use sickd_shared_memory::{SICKD_SHMEM_KEY, ScanPoller, ShmResult, init_tracing};
use std::time::Duration;

fn main() -> ShmResult<()> {
    init_tracing();

    let key = std::env::args()
        .nth(1)
        .and_then(|arg| u32::from_str_radix(arg.trim_start_matches("0x"), 16).ok())
        .unwrap_or(SICKD_SHMEM_KEY);

    let mut poller = match ScanPoller::attach(key) {
        Ok(p) => p,
        Err(e) => {
            println!("Failed to attach to region {key:#010x}: {e}");
            println!("Start sickd or sickd_shmgen first.");
            return Err(e);
        }
    };

    println!("Polling region {key:#010x} every 200ms (Ctrl-C to exit)");

    loop {
        let result = poller.poll();
        if result.is_empty() {
            println!("No data yet");
        } else if let (true, Some(scan)) = (result.is_new(), result.scan) {
            let (x, y) = scan.points().nth(90).unwrap_or_default();
            println!(
                "stamp {:>6}  unit {:?}  status {:#04x}  max {:>4}  ahead ({:.0}, {:.0})",
                result.stamp,
                scan.unit(),
                scan.status(),
                scan.max_range(),
                x,
                y
            );
            if result.missed() > 0 {
                println!("  missed {} scan(s)", result.missed());
            }
        }

        std::thread::sleep(Duration::from_millis(200));
    }
}
