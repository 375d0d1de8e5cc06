//! Daemon core: device start up, the event loop and shutdown.
//!
//! `SickdCore` owns everything the daemon runs on: the configuration, the
//! driver registry, the event loop with its devices and the scan publisher.

use crate::driver::Device;
use crate::driver_registry::DriverRegistry;
use crate::error::{SickdError, SickdResult};
use crate::events::EventLoop;
use sickd_common::config::{ConfigLoader, SickdConfig};
use sickd_shared_memory::ScanPublisher;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Daemon state between start up and shutdown.
pub struct SickdCore {
    /// Daemon configuration
    config: SickdConfig,
    /// Drivers available for configured devices
    registry: DriverRegistry,
    /// Open devices
    events: EventLoop,
    /// Shared scan region, present after init
    publisher: Option<ScanPublisher>,
    /// Cleared to stop the loop
    running: Arc<AtomicBool>,
    /// Loop counters
    stats: LoopStats,
}

/// Event loop counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoopStats {
    /// Completed `run_once` calls
    pub iterations: u64,
    /// Waits that timed out with nothing to read
    pub idle_waits: u64,
    /// Device services across all iterations
    pub serviced: u64,
}

impl SickdCore {
    /// Create a daemon core from a validated configuration.
    ///
    /// # Errors
    /// Returns `SickdError::Config` if validation fails.
    pub fn new(config: SickdConfig, registry: DriverRegistry) -> SickdResult<Self> {
        config.validate()?;

        info!(
            "SickdCore created with {} device(s), poll timeout {}ms",
            config.devices.len(),
            config.daemon.poll_timeout_ms
        );

        Ok(Self {
            config,
            registry,
            events: EventLoop::new(),
            publisher: None,
            running: Arc::new(AtomicBool::new(true)),
            stats: LoopStats::default(),
        })
    }

    /// Load the daemon configuration from a TOML file.
    pub fn load_config(path: &Path) -> SickdResult<SickdConfig> {
        info!("Loading configuration from {:?}", path);
        let config = SickdConfig::load(path)?;
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Flag the loop checks between waits. Clear it to stop.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Create the shared scan region and open every configured device.
    ///
    /// # Errors
    /// Fails on the first device whose driver cannot be found or opened,
    /// or if the shared region cannot be created.
    pub fn init(&mut self) -> SickdResult<()> {
        let publisher = ScanPublisher::create(self.config.daemon.shm_key)?;
        self.attach_publisher(publisher);
        self.open_devices()
    }

    /// Use `publisher` for decoded scans instead of creating the region.
    pub fn attach_publisher(&mut self, publisher: ScanPublisher) {
        info!("Publishing scans to region {:#010x}", publisher.key());
        self.publisher = Some(publisher);
    }

    /// Open every configured device through its driver.
    pub fn open_devices(&mut self) -> SickdResult<()> {
        for device_config in &self.config.devices {
            let driver = self.registry.driver_for(&device_config.compatible)?;
            info!(
                "Opening {} as '{}' with driver {}",
                device_config.port,
                device_config.compatible,
                driver.name()
            );
            let device = driver
                .open(device_config)
                .map_err(crate::error::DriverError::from)?;
            let handle = device.raw_fd();
            self.events.add(device, handle);
        }
        Ok(())
    }

    /// Register an already open device.
    pub fn add_device(&mut self, device: Device) {
        let handle = device.raw_fd();
        self.events.add(device, handle);
    }

    /// One bounded wait and the servicing of every ready device.
    ///
    /// A device that fails is removed and closed before the error is
    /// returned.
    pub fn step(&mut self) -> SickdResult<usize> {
        let publisher = self.publisher.as_mut().ok_or(SickdError::NotInitialized)?;
        let timeout = self.config.daemon.poll_timeout();

        let result = self.events.run_once(timeout, publisher);
        self.stats.iterations += 1;

        match result {
            Ok(0) => {
                self.stats.idle_waits += 1;
                Ok(0)
            }
            Ok(serviced) => {
                self.stats.serviced += serviced as u64;
                Ok(serviced)
            }
            Err(SickdError::Device(fault)) => {
                if let Some(device) = self.events.remove(fault.handle) {
                    device.driver().close(device);
                }
                Err(SickdError::Device(fault))
            }
            Err(e) => Err(e),
        }
    }

    /// Run the event loop until the running flag is cleared or a device
    /// fails.
    ///
    /// # Errors
    /// Any device failure ends the loop; the daemon treats it as fatal.
    pub fn run(&mut self) -> SickdResult<()> {
        if self.publisher.is_none() {
            return Err(SickdError::NotInitialized);
        }

        info!(
            "Starting event loop with {} device(s)",
            self.events.len()
        );

        while self.running.load(Ordering::SeqCst) {
            self.step()?;

            if self.stats.iterations % 1000 == 0 {
                debug!(
                    "Event loop: {} iterations, {} idle, {} services, {} scans published",
                    self.stats.iterations,
                    self.stats.idle_waits,
                    self.stats.serviced,
                    self.published()
                );
            }
        }

        info!(
            "Event loop stopped after {} iterations ({} scans published)",
            self.stats.iterations,
            self.published()
        );
        Ok(())
    }

    /// Stop the loop, close every device and release the shared region.
    pub fn shutdown(&mut self) {
        info!("Shutdown requested");
        self.running.store(false, Ordering::SeqCst);

        for device in self.events.drain() {
            device.driver().close(device);
        }

        if let Some(publisher) = self.publisher.take() {
            info!(
                "Releasing region {:#010x} after {} scans",
                publisher.key(),
                publisher.published()
            );
        } else {
            warn!("Shutdown before the shared region was created");
        }
    }

    /// Scans published so far.
    pub fn published(&self) -> u64 {
        self.publisher.as_ref().map_or(0, ScanPublisher::published)
    }

    /// Event loop counters.
    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Open devices.
    pub fn events(&self) -> &EventLoop {
        &self.events
    }

    /// Configured readiness wait.
    pub fn poll_timeout(&self) -> Duration {
        self.config.daemon.poll_timeout()
    }
}
