//! Driver registry for sensor drivers.
//!
//! Provides a `DriverRegistry` struct mapping compatible strings to drivers.
//! The registry is built at startup and owned by the daemon; there is no
//! global driver table.

use crate::driver::SickDriver;
use crate::drivers::register_all_drivers;
use crate::error::DriverError;
use tracing::debug;

/// Registry of available sensor drivers.
pub struct DriverRegistry {
    drivers: Vec<&'static dyn SickDriver>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            drivers: Vec::new(),
        }
    }

    /// Registry holding every built-in driver.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        register_all_drivers(&mut registry);
        registry
    }

    /// Register a driver.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, driver: &'static dyn SickDriver) {
        if self.drivers.iter().any(|d| d.name() == driver.name()) {
            panic!("Driver '{}' is already registered", driver.name());
        }
        debug!(
            "Registered driver '{}' for {:?}",
            driver.name(),
            driver.device_ids()
        );
        self.drivers.push(driver);
    }

    /// First driver answering to `compatible`.
    pub fn find(&self, compatible: &str) -> Option<&'static dyn SickDriver> {
        self.drivers.iter().copied().find(|d| d.identify(compatible))
    }

    /// Driver for `compatible`.
    ///
    /// # Errors
    /// Returns `DriverError::DriverNotFound` if no registered driver answers
    /// to it.
    pub fn driver_for(&self, compatible: &str) -> Result<&'static dyn SickDriver, DriverError> {
        self.find(compatible)
            .ok_or_else(|| DriverError::DriverNotFound(compatible.to_string()))
    }

    /// Registered drivers with their compatible strings, in registration order.
    pub fn list_drivers(&self) -> Vec<(&'static str, &'static [&'static str])> {
        self.drivers
            .iter()
            .map(|d| (d.name(), d.device_ids()))
            .collect()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
