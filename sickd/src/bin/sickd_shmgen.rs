//! # sickd_shmgen
//!
//! Publishes synthetic scans into the shared scan region so consumers can
//! be exercised without a sensor: a circle of about 500 cm with ±35 cm of
//! noise and a 200 cm wide-angle dip that rotates by 10 samples per scan,
//! at roughly two scans per second.
//!
//! ```bash
//! sickd_shmgen --count 20
//! sickd_shmgen --key 0x4b434953 --interval-ms 100 --jitter-ms 0
//! ```

use clap::Parser;
use rand::Rng;
use sickd_common::scan::{RangeUnit, SCAN_SAMPLES, Scan};
use sickd_shared_memory::{SICKD_SHMEM_KEY, ScanPublisher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{Level, debug, error, info};
use tracing_subscriber::EnvFilter;

/// Radius of the simulated room.
const BASE_RANGE: u16 = 500;

/// Peak noise added to every sample.
const NOISE: i32 = 35;

/// Range inside the dip.
const DIP_RANGE: u16 = 200;

/// Samples covered by the dip.
const DIP_WIDTH: usize = 30;

/// Samples the dip moves per scan.
const DIP_STEP: usize = 10;

/// sickd_shmgen - synthetic scan publisher
#[derive(Parser, Debug)]
#[command(name = "sickd_shmgen")]
#[command(version)]
#[command(about = "Publish synthetic range scans to the sickd shared region")]
struct Args {
    /// Region key, decimal or 0x-prefixed hex
    #[arg(short, long, value_parser = parse_key, default_value_t = SICKD_SHMEM_KEY)]
    key: u32,

    /// Stop after this many scans
    #[arg(short = 'n', long)]
    count: Option<u64>,

    /// Mean time between scans
    #[arg(long, default_value_t = 500)]
    interval_ms: u64,

    /// Random deviation from the interval, either way
    #[arg(long, default_value_t = 100)]
    jitter_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    if let Err(e) = run() {
        error!("sickd_shmgen failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let mut publisher = ScanPublisher::create(args.key)?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })?;

    let mut rng = rand::thread_rng();
    let mut seq = 0u64;
    while running.load(Ordering::SeqCst) && args.count.is_none_or(|count| seq < count) {
        let scan = synthetic_scan(seq, &mut rng);
        let stamp = publisher.publish(&scan);
        debug!("Published synthetic scan {} as stamp {}", seq, stamp);
        seq += 1;

        thread::sleep(next_delay(args.interval_ms, args.jitter_ms, &mut rng));
    }

    info!("Published {} synthetic scans", publisher.published());
    Ok(())
}

/// Scan number `seq`: noisy circle with a rotating dip.
fn synthetic_scan(seq: u64, rng: &mut impl Rng) -> Scan {
    let dip_start = (seq as usize * DIP_STEP) % SCAN_SAMPLES;

    let mut distance = [0u16; SCAN_SAMPLES];
    for (i, sample) in distance.iter_mut().enumerate() {
        let in_dip = (i + SCAN_SAMPLES - dip_start) % SCAN_SAMPLES < DIP_WIDTH;
        let base = if in_dip { DIP_RANGE } else { BASE_RANGE };
        *sample = (i32::from(base) + rng.gen_range(-NOISE..=NOISE)) as u16;
    }

    Scan::new(distance, RangeUnit::Centimeters, 0)
}

fn next_delay(interval_ms: u64, jitter_ms: u64, rng: &mut impl Rng) -> Duration {
    let low = interval_ms.saturating_sub(jitter_ms);
    let high = interval_ms + jitter_ms;
    Duration::from_millis(rng.gen_range(low..=high))
}

fn parse_key(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid key '{s}': {e}"))
}
