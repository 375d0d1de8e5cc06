//! # sickd daemon binary
//!
//! Opens the configured sensors, decodes their scans and publishes the
//! latest one to the shared scan region.
//!
//! # Usage
//!
//! ```bash
//! # Devices from the configuration file
//! sickd --config /etc/sickd/sickd.toml
//!
//! # One sensor from the command line
//! sickd --port /dev/ttyUSB0 --baud 9600
//!
//! # Verbose, JSON logs
//! sickd -v --json
//! ```

use clap::Parser;
use sickd::{DriverRegistry, SickdCore, SickdResult};
use sickd_common::config::{
    DEFAULT_BAUDRATE, DEFAULT_COMPATIBLE, DEFAULT_CONFIG_PATH, DEFAULT_PORT,
    DeviceConfig, LogLevel, SickdConfig,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// sickd - SICK PLS laser rangefinder daemon
#[derive(Parser, Debug)]
#[command(name = "sickd")]
#[command(version)]
#[command(about = "SICK PLS laser rangefinder daemon publishing scans to shared memory")]
#[command(long_about = None)]
struct Args {
    /// Configuration file. Defaults to /etc/sickd/sickd.toml when present.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Serial port of a single sensor (replaces configured devices)
    #[arg(short, long, value_name = "TTY")]
    port: Option<String>,

    /// Compatible string of the single sensor
    #[arg(long, value_name = "ID")]
    compatible: Option<String>,

    /// Line speed of the single sensor
    #[arg(short, long, value_name = "BAUD")]
    baud: Option<u32>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    /// Print the built-in drivers and their compatible strings, then exit
    #[arg(long)]
    list_drivers: bool,
}

fn main() {
    if let Err(e) = run() {
        error!("sickd failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let registry = DriverRegistry::with_builtin();

    if args.list_drivers {
        for (name, ids) in registry.list_drivers() {
            println!("{name}: {}", ids.join(", "));
        }
        return Ok(());
    }

    let loaded = resolve_config(&args);
    let level = if args.verbose {
        LogLevel::Debug
    } else {
        loaded
            .as_ref()
            .map(|config| config.shared.log_level)
            .unwrap_or_default()
    };
    setup_tracing(level, args.json);

    let config = loaded?;
    info!("sickd v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut core = SickdCore::new(config, registry)?;

    let running = core.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    if let Err(e) = core.init() {
        core.shutdown();
        return Err(e.into());
    }

    let result = core.run();
    core.shutdown();
    result?;

    info!("sickd shutdown complete");
    Ok(())
}

/// Configuration file (explicit, or the default path if it exists), with a
/// single command line device replacing the configured ones.
fn resolve_config(args: &Args) -> SickdResult<SickdConfig> {
    let mut config = match &args.config {
        Some(path) => SickdCore::load_config(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            SickdCore::load_config(Path::new(DEFAULT_CONFIG_PATH))?
        }
        None => SickdConfig::default(),
    };

    if args.port.is_some() || args.compatible.is_some() || args.baud.is_some() {
        config.devices = vec![DeviceConfig {
            compatible: args
                .compatible
                .clone()
                .unwrap_or_else(|| DEFAULT_COMPATIBLE.to_string()),
            port: args.port.clone().unwrap_or_else(|| DEFAULT_PORT.to_string()),
            baudrate: args.baud.unwrap_or(DEFAULT_BAUDRATE),
            ..DeviceConfig::default()
        }];
    }

    Ok(config)
}

/// Setup tracing subscriber. `RUST_LOG` overrides the configured level.
fn setup_tracing(level: LogLevel, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
