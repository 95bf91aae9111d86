// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Static sizing for the buffered character device (TOML, fixed at init)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: 6 unit tests

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Node name prefix used when none is configured.
pub const DEFAULT_NAME_PREFIX: &str = "advanced_driver";
/// Maximum number of endpoints used when none is configured.
pub const DEFAULT_MAX_ENDPOINTS: usize = 5;
/// Per-endpoint buffer capacity in bytes used when none is configured.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;
/// Largest accepted `max_endpoints`; ids must also fit the daemon's `u32` wire fields.
pub const MAX_ENDPOINTS_LIMIT: usize = 4096;
/// Largest accepted `buffer_capacity` (64 KiB, one daemon write frame).
pub const MAX_BUFFER_CAPACITY: usize = 64 * 1024;

/// Errors raised while loading or validating a [`DeviceConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    /// Config file is not valid TOML for this schema.
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Values parsed but are inconsistent.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Capacity constants and naming for one device instance.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    /// Prefix concatenated with the decimal endpoint id to form node names.
    pub name_prefix: String,
    /// Upper bound on the number of endpoints ever created.
    pub max_endpoints: usize,
    /// Size of each endpoint buffer in bytes.
    pub buffer_capacity: usize,
    /// Endpoints published eagerly during init.
    pub initial_endpoints: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            max_endpoints: DEFAULT_MAX_ENDPOINTS,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            initial_endpoints: 1,
        }
    }
}

impl DeviceConfig {
    /// Parses and validates a TOML document; missing keys take their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks the invariants the registry relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name_prefix.is_empty() {
            return Err(ConfigError::Invalid("name_prefix must not be empty".into()));
        }
        if self.max_endpoints == 0 || self.max_endpoints > MAX_ENDPOINTS_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_endpoints must be within 1..={MAX_ENDPOINTS_LIMIT}, got {}",
                self.max_endpoints
            )));
        }
        if self.buffer_capacity == 0 || self.buffer_capacity > MAX_BUFFER_CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "buffer_capacity must be within 1..={MAX_BUFFER_CAPACITY}, got {}",
                self.buffer_capacity
            )));
        }
        if self.initial_endpoints == 0 || self.initial_endpoints > self.max_endpoints {
            return Err(ConfigError::Invalid(format!(
                "initial_endpoints must be within 1..={}, got {}",
                self.max_endpoints, self.initial_endpoints
            )));
        }
        Ok(())
    }

    /// Node name published for endpoint `id`.
    pub fn node_name(&self, id: usize) -> String {
        format!("{}{}", self.name_prefix, id)
    }
}
