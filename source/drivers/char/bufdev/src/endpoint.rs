// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-endpoint fixed-capacity buffer and its valid-length marker.

/// Backing storage for one endpoint.
///
/// Bytes beyond `len` are stale and never handed out.
#[derive(Debug)]
pub struct EndpointState {
    buffer: Box<[u8]>,
    len: usize,
}

impl EndpointState {
    /// Creates a zeroed buffer of `capacity` bytes holding no data.
    pub fn new(capacity: usize) -> Self {
        Self { buffer: vec![0u8; capacity].into_boxed_slice(), len: 0 }
    }

    /// Fixed buffer capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Number of valid bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true when no data has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Valid contents.
    pub fn contents(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    /// Up to `max` valid bytes starting at `offset`; empty at or past the end.
    pub fn read_at(&self, offset: usize, max: usize) -> &[u8] {
        if offset >= self.len {
            return &[];
        }
        let end = offset + core::cmp::min(max, self.len - offset);
        &self.buffer[offset..end]
    }

    /// Replaces the contents with the first `capacity()` bytes of `src`.
    ///
    /// Returns the number of bytes stored; the excess is dropped silently.
    pub fn overwrite(&mut self, src: &[u8]) -> usize {
        let n = core::cmp::min(src.len(), self.capacity());
        self.buffer[..n].copy_from_slice(&src[..n]);
        self.len = n;
        n
    }
}
