// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error kinds surfaced by the buffered character device.

use thiserror::Error;

use crate::config::ConfigError;
use crate::provider::ProviderError;

/// Result alias used throughout the driver.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors returned by registry, channel and control operations.
///
/// None of these is fatal to the subsystem: a failed creation or transfer never
/// invalidates other endpoints or channels.
#[derive(Debug, Error)]
pub enum Error {
    /// Creation requested while every slot is in use.
    #[error("endpoint registry full ({capacity} endpoints)")]
    ResourceExhausted {
        /// Configured maximum endpoint count.
        capacity: usize,
    },
    /// Identifier is not below the current endpoint count.
    #[error("no endpoint with id {0}")]
    NotFound(usize),
    /// Caller memory became inaccessible during a copy.
    #[error("transfer fault while copying caller memory")]
    TransferFault,
    /// The device-node provider rejected a newly reserved endpoint.
    #[error("failed to publish node for endpoint {id}: {source}")]
    PublishFailed {
        /// Identifier that was reserved and rolled back.
        id: usize,
        /// Provider failure.
        #[source]
        source: ProviderError,
    },
    /// Control path received an unrecognized request code.
    #[error("invalid control command {0:#x}")]
    InvalidCommand(u32),
    /// Strict write refused input longer than the endpoint capacity.
    #[error("write of {len} bytes exceeds endpoint capacity {capacity}")]
    Truncated {
        /// Length of the rejected input.
        len: usize,
        /// Endpoint buffer capacity.
        capacity: usize,
    },
    /// Configuration could not be loaded or is inconsistent.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

const ENOMEM: i32 = 12;
const ENODEV: i32 = 19;
const EFAULT: i32 = 14;
const EINVAL: i32 = 22;
const EFBIG: i32 = 27;

impl Error {
    /// Negative errno matching what a kernel character driver returns for this kind.
    pub fn errno(&self) -> i32 {
        match self {
            Self::ResourceExhausted { .. } => -ENOMEM,
            Self::NotFound(_) => -ENODEV,
            Self::TransferFault | Self::PublishFailed { .. } => -EFAULT,
            Self::InvalidCommand(_) | Self::Config(_) => -EINVAL,
            Self::Truncated { .. } => -EFBIG,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_matches_driver_convention() {
        assert_eq!(Error::ResourceExhausted { capacity: 5 }.errno(), -12);
        assert_eq!(Error::NotFound(7).errno(), -19);
        assert_eq!(Error::TransferFault.errno(), -14);
        assert_eq!(Error::InvalidCommand(0xdead).errno(), -22);
        let publish = Error::PublishFailed { id: 3, source: ProviderError::Rejected("busy".into()) };
        assert_eq!(publish.errno(), -14);
    }

    #[test]
    fn display_names_the_identifier() {
        assert_eq!(Error::NotFound(4).to_string(), "no endpoint with id 4");
        assert_eq!(Error::InvalidCommand(0x6102).to_string(), "invalid control command 0x6102");
    }
}
