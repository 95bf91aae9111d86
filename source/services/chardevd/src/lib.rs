// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! CONTEXT: chardevd daemon: exposes the buffered character device over a byte-frame
//! protocol (open/read/write/release plus the create-endpoint control request)
//!
//! OWNERS: @runtime
//!
//! STATUS: Functional
//!
//! API_STABILITY: Unstable
//!
//! TEST_COVERAGE:
//!   - Unit tests next to each module
//!   - Integration tests: `source/services/chardevd/tests/` (protocol decode, loopback sessions)
//!
//! PUBLIC API:
//!   - `protocol`: v1 frame codec
//!   - `transport`: `Transport` trait, loopback pair, Unix socket transport
//!   - `Dispatcher`: per-connection handle table
//!   - `Client`: typed request helpers (used by `chardev-trigger`)
//!   - `service_main_loop()`: daemon entry loop

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod protocol;
pub mod transport;

mod std_server;

pub use client::{Client, ClientError};
pub use config::ServiceConfig;
pub use dispatcher::{Dispatcher, ServiceError};
pub use std_server::*;
pub use transport::{loopback_pair, LoopbackTransport, Transport, TransportError};
#[cfg(unix)]
pub use transport::UnixTransport;
