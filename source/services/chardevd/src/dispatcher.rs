// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Per-connection request dispatcher mapping wire handles to device channels
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: 5 unit tests, loopback tests in `tests/loopback.rs`
//!
//! Channels left open when the dispatcher is dropped are released with it.

use std::collections::HashMap;
use std::sync::Arc;

use char_bufdev::{Channel, ControlChannel, ControlReply, Registry};
use log::{debug, warn};
use parking_lot::Mutex;
use thiserror::Error;

use crate::protocol::{
    decode_request, device_status, encode_response, Request, STATUS_BAD_HANDLE, STATUS_OK,
    STATUS_TOO_LARGE,
};

/// Error types produced by the dispatcher.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Device rejected the operation.
    #[error(transparent)]
    Device(#[from] char_bufdev::Error),
    /// Handle is unknown or already released.
    #[error("bad handle {0}")]
    BadHandle(u32),
    /// A device value does not fit its `u32` wire field.
    #[error("value {0} does not fit the wire format")]
    OutOfRange(usize),
}

impl ServiceError {
    /// Wire status reported for this error.
    pub fn status(&self) -> u8 {
        match self {
            Self::Device(err) => device_status(err),
            Self::BadHandle(_) => STATUS_BAD_HANDLE,
            Self::OutOfRange(_) => STATUS_TOO_LARGE,
        }
    }
}

fn wire_u32(value: usize) -> Result<u32, ServiceError> {
    u32::try_from(value).map_err(|_| ServiceError::OutOfRange(value))
}

struct HandleTable {
    next: u32,
    channels: HashMap<u32, Arc<Mutex<Channel>>>,
}

impl HandleTable {
    fn insert(&mut self, channel: Channel) -> u32 {
        // Zero is never handed out; skip ids still in use after wraparound.
        let mut handle = self.next.max(1);
        while self.channels.contains_key(&handle) {
            handle = handle.wrapping_add(1).max(1);
        }
        self.next = handle.wrapping_add(1).max(1);
        self.channels.insert(handle, Arc::new(Mutex::new(channel)));
        handle
    }
}

/// Shared dispatcher state for one client connection.
pub struct Dispatcher {
    registry: Arc<Registry>,
    control: ControlChannel,
    handles: Mutex<HandleTable>,
}

impl Dispatcher {
    /// Creates a dispatcher serving `registry`.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            control: ControlChannel::new(registry.clone()),
            registry,
            handles: Mutex::new(HandleTable { next: 1, channels: HashMap::new() }),
        }
    }

    fn channel(&self, handle: u32) -> Result<Arc<Mutex<Channel>>, ServiceError> {
        self.handles
            .lock()
            .channels
            .get(&handle)
            .cloned()
            .ok_or(ServiceError::BadHandle(handle))
    }

    /// Opens endpoint `id` and returns the new handle.
    pub fn open(&self, id: u32) -> Result<u32, ServiceError> {
        let channel = self.registry.open(id as usize)?;
        let handle = self.handles.lock().insert(channel);
        debug!("chardevd: handle {handle} -> endpoint {id}");
        Ok(handle)
    }

    /// Reads up to `max_len` bytes through `handle`.
    pub fn read(&self, handle: u32, max_len: u32) -> Result<Vec<u8>, ServiceError> {
        let channel = self.channel(handle)?;
        let bytes = channel.lock().read(max_len as usize)?;
        Ok(bytes)
    }

    /// Writes `bytes` through `handle`, returning the number stored.
    pub fn write(&self, handle: u32, bytes: &[u8]) -> Result<u32, ServiceError> {
        let channel = self.channel(handle)?;
        let stored = channel.lock().write(bytes)?;
        wire_u32(stored)
    }

    /// Releases `handle`.
    pub fn release(&self, handle: u32) -> Result<(), ServiceError> {
        let channel = self
            .handles
            .lock()
            .channels
            .remove(&handle)
            .ok_or(ServiceError::BadHandle(handle))?;
        // Another request may still hold the channel briefly; it is released on last drop.
        if let Ok(channel) = Arc::try_unwrap(channel) {
            channel.into_inner().release();
        }
        Ok(())
    }

    /// Issues a control request, returning the created endpoint id.
    pub fn ioctl(&self, cmd: u32) -> Result<u32, ServiceError> {
        match self.control.ioctl(cmd)? {
            ControlReply::Created { id, node } => {
                debug!("chardevd: control created {node}");
                wire_u32(id)
            }
        }
    }

    /// Number of open handles.
    pub fn open_handles(&self) -> usize {
        self.handles.lock().channels.len()
    }

    /// Decodes `frame`, executes it and encodes the response.
    pub fn handle_frame(&self, frame: &[u8]) -> Vec<u8> {
        let request = match decode_request(frame) {
            Ok(request) => request,
            Err(err) => {
                warn!("chardevd: rejected frame: {err}");
                let op = frame.get(3).copied().unwrap_or(0);
                return encode_response(op, err.status(), &[]);
            }
        };
        let op = request.opcode();
        let result = match request {
            Request::Open { id } => self.open(id).map(|h| h.to_le_bytes().to_vec()),
            Request::Read { handle, max_len } => self.read(handle, max_len),
            Request::Write { handle, bytes } => {
                self.write(handle, &bytes).map(|n| n.to_le_bytes().to_vec())
            }
            Request::Release { handle } => self.release(handle).map(|()| Vec::new()),
            Request::Ioctl { cmd } => self.ioctl(cmd).map(|id| id.to_le_bytes().to_vec()),
        };
        match result {
            Ok(payload) => encode_response(op, STATUS_OK, &payload),
            Err(err) => {
                warn!("chardevd: op {op} failed: {err}");
                encode_response(op, err.status(), &[])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use char_bufdev::{DeviceConfig, MemoryNodeProvider};

    fn dispatcher() -> Dispatcher {
        let registry =
            Registry::init(DeviceConfig::default(), MemoryNodeProvider::new()).expect("init");
        Dispatcher::new(registry)
    }

    #[test]
    fn handles_start_at_one_and_increase() {
        let d = dispatcher();
        assert_eq!(d.open(0).expect("open"), 1);
        assert_eq!(d.open(0).expect("open"), 2);
        assert_eq!(d.open_handles(), 2);
    }

    #[test]
    fn release_twice_reports_bad_handle() {
        let d = dispatcher();
        let h = d.open(0).expect("open");
        d.release(h).expect("release");
        assert!(matches!(d.release(h), Err(ServiceError::BadHandle(_))));
        assert!(matches!(d.read(h, 4), Err(ServiceError::BadHandle(_))));
    }

    #[test]
    fn handle_table_skips_live_handles_after_wrap() {
        let mut table = HandleTable { next: u32::MAX, channels: HashMap::new() };
        let registry =
            Registry::init(DeviceConfig::default(), MemoryNodeProvider::new()).expect("init");
        assert_eq!(table.insert(registry.open(0).expect("open")), u32::MAX);
        assert_eq!(table.insert(registry.open(0).expect("open")), 1);
        table.next = 1;
        assert_eq!(table.insert(registry.open(0).expect("open")), 2);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn oversized_values_are_refused_for_the_wire() {
        assert_eq!(wire_u32(4096).expect("fits"), 4096);
        let err = wire_u32(u32::MAX as usize + 1).expect_err("too wide");
        assert!(matches!(err, ServiceError::OutOfRange(_)));
        assert_eq!(err.status(), STATUS_TOO_LARGE);
    }

    #[test]
    fn write_then_read_through_handles() {
        let d = dispatcher();
        let h = d.open(0).expect("open");
        assert_eq!(d.write(h, b"hello").expect("write"), 5);
        assert_eq!(d.read(h, 2).expect("read"), b"he");
        assert_eq!(d.read(h, 64).expect("read"), b"llo");
    }
}
