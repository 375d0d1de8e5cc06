//! Sensor driver implementations.
//!
//! - [`pls201`] - SICK PLS 101/201 over RS-232/RS-422
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `SickDriver` trait from [`crate::driver`]
//! 3. Add a `static` instance and register it in [`register_all_drivers`]

pub mod pls201;

use crate::driver_registry::DriverRegistry;

/// Register all built-in drivers.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    registry.register(&pls201::PLS201);
}
