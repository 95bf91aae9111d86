// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(clippy::all, missing_docs)]

//! CONTEXT: Buffered character device: bounded endpoint registry, per-open channels and
//! a control path that grows the registry at runtime
//!
//! OWNERS: @runtime
//!
//! STATUS: Functional
//!
//! API_STABILITY: Unstable
//!
//! TEST_COVERAGE:
//!   - Unit tests next to each module
//!   - Integration tests: `source/drivers/char/bufdev/tests/` (lifecycle, concurrency, properties)
//!
//! PUBLIC API:
//!   - Registry: slot table, `create_endpoint()`, `resolve()`, `open()`
//!   - Channel: `read()`, `write()`, `write_strict()`, `release()`
//!   - ControlChannel: `ioctl(CMD_CREATE_ENDPOINT)`
//!   - NodeProvider / MemoryNodeProvider: device-node publishing seam
//!
//! DEPENDENCIES:
//!   - parking_lot: per-endpoint and creation locks
//!   - serde/toml: `DeviceConfig`

pub mod channel;
pub mod config;
pub mod control;
pub mod endpoint;
pub mod error;
pub mod provider;
pub mod registry;
pub mod user;

pub use channel::Channel;
pub use config::{ConfigError, DeviceConfig};
pub use control::{ControlChannel, ControlCommand, ControlReply, CMD_CREATE_ENDPOINT};
pub use endpoint::EndpointState;
pub use error::{Error, Result};
pub use provider::{MemoryNodeProvider, NodeProvider, ProviderError};
pub use registry::{Registry, RegistryStats};
pub use user::{Fault, UserSink, UserSource};
