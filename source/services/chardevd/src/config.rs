// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Daemon configuration: socket location plus the device sizing table.

use std::path::{Path, PathBuf};

use char_bufdev::{ConfigError, DeviceConfig};
use serde::Deserialize;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "CHARDEVD_CONFIG";
/// Socket path used when none is configured.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/chardevd.sock";

/// Top-level `chardevd` configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Unix socket the daemon listens on.
    pub socket_path: PathBuf,
    /// Device sizing and node naming.
    pub device: DeviceConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { socket_path: PathBuf::from(DEFAULT_SOCKET_PATH), device: DeviceConfig::default() }
    }
}

impl ServiceConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.device.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Loads the file named by `CHARDEVD_CONFIG`, or defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
