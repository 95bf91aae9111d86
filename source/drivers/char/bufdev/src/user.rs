// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Caller-memory seam: the moral equivalent of `copy_to_user` / `copy_from_user`.
//!
//! A transfer either copies everything it was asked to or reports a fault; callers rely on
//! that to keep endpoint state and cursors untouched on failure.

/// Marker error for a caller buffer that became inaccessible mid-copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fault;

/// Destination for bytes read out of an endpoint.
pub trait UserSink {
    /// Maximum number of bytes the caller is willing to receive.
    fn capacity(&self) -> usize;

    /// Copies `src` to the start of the caller buffer. `src.len() <= capacity()`.
    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), Fault>;
}

/// Source of bytes written into an endpoint.
pub trait UserSource {
    /// Number of bytes the caller offers.
    fn len(&self) -> usize;

    /// Returns true when the caller offers no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fills `dst` with the first `dst.len()` offered bytes.
    fn copy_from_user(&self, dst: &mut [u8]) -> Result<(), Fault>;
}

impl UserSink for [u8] {
    fn capacity(&self) -> usize {
        self.len()
    }

    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), Fault> {
        let dst = self.get_mut(..src.len()).ok_or(Fault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl UserSource for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_from_user(&self, dst: &mut [u8]) -> Result<(), Fault> {
        let src = self.get(..dst.len()).ok_or(Fault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}
