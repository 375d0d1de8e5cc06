//! The configuration shipped in `config/` stays loadable and valid

use sickd_common::config::{ConfigLoader, LogLevel, SickdConfig};
use sickd_common::shm::consts::SICKD_SHMEM_KEY;
use std::path::Path;

#[test]
fn test_shipped_config_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/sickd.toml");
    let config = SickdConfig::load(&path).unwrap();
    config.validate().unwrap();

    assert_eq!(config.shared.log_level, LogLevel::Info);
    assert_eq!(config.daemon.shm_key, SICKD_SHMEM_KEY);
    assert_eq!(config.devices.len(), 1);
    assert_eq!(config.devices[0].compatible, "pls201");
    assert_eq!(config.devices[0].baudrate, 9600);
}

#[test]
fn test_shipped_config_matches_defaults() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/sickd.toml");
    let shipped = SickdConfig::load(&path).unwrap();
    let defaults = SickdConfig::default();

    assert_eq!(shipped.devices, defaults.devices);
    assert_eq!(shipped.daemon.poll_timeout_ms, defaults.daemon.poll_timeout_ms);
}
