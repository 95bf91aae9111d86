// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Per-open session on one endpoint (open/read/write/release)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: 8 unit tests
//!
//! A channel names its endpoint by id and re-resolves it through the registry on every
//! call, so it always sees the live `(buffer, len)` pair under the endpoint lock.

use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::user::{UserSink, UserSource};

/// Open session bound to one endpoint, carrying the read cursor.
pub struct Channel {
    registry: Arc<Registry>,
    endpoint_id: usize,
    cursor: usize,
}

impl Channel {
    /// Opens endpoint `id` with the cursor at offset zero.
    pub fn open(registry: &Arc<Registry>, id: usize) -> Result<Self> {
        if let Err(err) = registry.resolve(id) {
            debug!("bufdev: open of endpoint {id} rejected");
            return Err(err);
        }
        debug!("bufdev: endpoint {id} opened");
        Ok(Self { registry: Arc::clone(registry), endpoint_id: id, cursor: 0 })
    }

    /// Endpoint this channel is bound to.
    pub fn endpoint_id(&self) -> usize {
        self.endpoint_id
    }

    /// Offset of the next sequential read.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Copies up to `dst.capacity()` bytes from the cursor into `dst`.
    ///
    /// Returns 0 at end of data. On a fault the cursor does not move.
    pub fn read_into<S>(&mut self, dst: &mut S) -> Result<usize>
    where
        S: UserSink + ?Sized,
    {
        let state = self.registry.resolve(self.endpoint_id)?;
        let chunk = state.read_at(self.cursor, dst.capacity());
        let n = chunk.len();
        if n == 0 {
            return Ok(0);
        }
        dst.copy_to_user(chunk).map_err(|_| Error::TransferFault)?;
        drop(state);
        self.cursor += n;
        debug!("bufdev: endpoint {} read {n} bytes", self.endpoint_id);
        Ok(n)
    }

    /// Reads up to `max_len` bytes from the cursor; an empty result means end of data.
    pub fn read(&mut self, max_len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max_len.min(self.registry.buffer_capacity())];
        let n = self.read_into(buf.as_mut_slice())?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Replaces the endpoint contents with the first `capacity` bytes of `src`.
    ///
    /// Longer input is truncated silently. The cursor is reset to zero. A fault leaves the
    /// endpoint untouched.
    pub fn write_from<S>(&mut self, src: &S) -> Result<usize>
    where
        S: UserSource + ?Sized,
    {
        let n = src.len().min(self.registry.buffer_capacity());
        let mut staged = vec![0u8; n];
        src.copy_from_user(&mut staged).map_err(|_| Error::TransferFault)?;

        let stored = self.registry.resolve(self.endpoint_id)?.overwrite(&staged);
        self.cursor = 0;
        debug!("bufdev: endpoint {} wrote {stored} bytes", self.endpoint_id);
        Ok(stored)
    }

    /// Writes `bytes`, truncating at the endpoint capacity.
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        self.write_from(bytes)
    }

    /// Writes `bytes`, refusing input that would not fit instead of truncating it.
    pub fn write_strict(&mut self, bytes: &[u8]) -> Result<usize> {
        let capacity = self.registry.buffer_capacity();
        if bytes.len() > capacity {
            return Err(Error::Truncated { len: bytes.len(), capacity });
        }
        self.write_from(bytes)
    }

    /// Ends the session. Endpoint contents are unaffected.
    pub fn release(self) {
        debug!("bufdev: endpoint {} released", self.endpoint_id);
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("endpoint_id", &self.endpoint_id)
            .field("cursor", &self.cursor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceConfig;
    use crate::provider::MemoryNodeProvider;
    use crate::user::{Fault, UserSink, UserSource};

    fn registry() -> Arc<Registry> {
        Registry::init(DeviceConfig::default(), MemoryNodeProvider::new()).expect("init")
    }

    struct FaultySink;

    impl UserSink for FaultySink {
        fn capacity(&self) -> usize {
            64
        }

        fn copy_to_user(&mut self, _src: &[u8]) -> core::result::Result<(), Fault> {
            Err(Fault)
        }
    }

    struct FaultySource(usize);

    impl UserSource for FaultySource {
        fn len(&self) -> usize {
            self.0
        }

        fn copy_from_user(&self, _dst: &mut [u8]) -> core::result::Result<(), Fault> {
            Err(Fault)
        }
    }

    #[test]
    fn sequential_reads_advance_cursor() {
        let registry = registry();
        let mut ch = registry.open(0).expect("open");
        assert_eq!(ch.write(b"hello").expect("write"), 5);
        assert_eq!(ch.read(2).expect("read"), b"he");
        assert_eq!(ch.cursor(), 2);
        assert_eq!(ch.read(100).expect("read"), b"llo");
        assert_eq!(ch.cursor(), 5);
        assert!(ch.read(100).expect("eof").is_empty());
    }

    #[test]
    fn write_overwrites_instead_of_appending() {
        let registry = registry();
        let mut ch = registry.open(0).expect("open");
        ch.write(b"abcde").expect("write");
        ch.write(b"xy").expect("write");
        assert_eq!(registry.resolve(0).expect("resolve").len(), 2);
        assert_eq!(ch.read(1024).expect("read"), b"xy");
    }

    #[test]
    fn write_resets_cursor() {
        let registry = registry();
        let mut ch = registry.open(0).expect("open");
        ch.write(b"0123456789").expect("write");
        ch.read(7).expect("read");
        ch.write(b"abc").expect("write");
        assert_eq!(ch.cursor(), 0);
        assert_eq!(ch.read(2).expect("read"), b"ab");
    }

    #[test]
    fn oversized_write_truncates() {
        let registry = registry();
        let mut ch = registry.open(0).expect("open");
        let payload: Vec<u8> = (0..2000u32).map(|i| (i % 251) as u8).collect();
        assert_eq!(ch.write(&payload).expect("write"), 1024);
        assert_eq!(ch.read(2000).expect("read"), &payload[..1024]);
    }

    #[test]
    fn strict_write_refuses_oversized_input() {
        let registry = registry();
        let mut ch = registry.open(0).expect("open");
        ch.write(b"keep").expect("write");
        let err = ch.write_strict(&[0u8; 1025]).expect_err("too long");
        assert!(matches!(err, Error::Truncated { len: 1025, capacity: 1024 }));
        assert_eq!(ch.read(16).expect("read"), b"keep");
        assert_eq!(ch.write_strict(&[7u8; 1024]).expect("fits"), 1024);
    }

    #[test]
    fn read_fault_keeps_cursor() {
        let registry = registry();
        let mut ch = registry.open(0).expect("open");
        ch.write(b"hello").expect("write");
        ch.read(1).expect("read");
        let err = ch.read_into(&mut FaultySink).expect_err("fault");
        assert!(matches!(err, Error::TransferFault));
        assert_eq!(ch.cursor(), 1);
        assert_eq!(ch.read(16).expect("read"), b"ello");
    }

    #[test]
    fn write_fault_leaves_endpoint_unchanged() {
        let registry = registry();
        let mut ch = registry.open(0).expect("open");
        ch.write(b"stable").expect("write");
        ch.read(3).expect("read");
        let err = ch.write_from(&FaultySource(10)).expect_err("fault");
        assert!(matches!(err, Error::TransferFault));
        assert_eq!(ch.cursor(), 3);
        assert_eq!(registry.resolve(0).expect("resolve").contents(), b"stable");
    }

    #[test]
    fn open_beyond_count_fails() {
        let registry = registry();
        assert!(matches!(registry.open(1), Err(Error::NotFound(1))));
        registry.create_endpoint().expect("create");
        registry.open(1).expect("open after create").release();
    }
}
