// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Administrative control path (ioctl-style request codes)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: 5 unit tests

use std::sync::Arc;

use log::warn;

use crate::error::{Error, Result};
use crate::registry::Registry;

/// Request type byte shared by every control code of this device.
pub const IOC_MAGIC: u8 = b'a';

/// Encodes a no-argument request code the way Linux `_IO(type, nr)` does.
pub const fn io(ty: u8, nr: u8) -> u32 {
    ((ty as u32) << 8) | nr as u32
}

/// Creates the next endpoint.
pub const CMD_CREATE_ENDPOINT: u32 = io(IOC_MAGIC, 1);

/// Decoded control request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    /// Grow the registry by one endpoint.
    CreateEndpoint,
}

impl ControlCommand {
    /// Wire request code.
    pub const fn code(self) -> u32 {
        match self {
            Self::CreateEndpoint => CMD_CREATE_ENDPOINT,
        }
    }
}

impl TryFrom<u32> for ControlCommand {
    type Error = Error;

    fn try_from(code: u32) -> Result<Self> {
        match code {
            CMD_CREATE_ENDPOINT => Ok(Self::CreateEndpoint),
            other => Err(Error::InvalidCommand(other)),
        }
    }
}

/// Successful control outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlReply {
    /// A new endpoint was created and published.
    Created {
        /// Identifier of the new endpoint (the previous count).
        id: usize,
        /// Published node name.
        node: String,
    },
}

/// Entry point for administrative requests against a registry.
pub struct ControlChannel {
    registry: Arc<Registry>,
}

impl ControlChannel {
    /// Binds the control path to `registry`.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Decodes and executes a raw request code.
    pub fn ioctl(&self, code: u32) -> Result<ControlReply> {
        let command = ControlCommand::try_from(code).inspect_err(|_| {
            warn!("bufdev: unknown control command {code:#x}");
        })?;
        self.execute(command)
    }

    /// Executes a decoded request.
    pub fn execute(&self, command: ControlCommand) -> Result<ControlReply> {
        match command {
            ControlCommand::CreateEndpoint => {
                let id = self.registry.create_endpoint()?;
                Ok(ControlReply::Created { id, node: self.registry.node_name(id) })
            }
        }
    }

    /// Registry this control path administers.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}
