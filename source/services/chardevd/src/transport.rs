// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Frame transports for chardevd (in-process loopback, Unix stream socket)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: 2 unit tests

use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;

use crate::protocol::MAX_FRAME_LEN;

/// Transport abstraction used by the daemon and its clients.
pub trait Transport {
    /// Error surfaced by the transport implementation.
    type Error: Into<TransportError>;

    /// Receives the next frame; `None` once the peer has gone away.
    fn recv(&mut self) -> core::result::Result<Option<Vec<u8>>, Self::Error>;

    /// Sends a frame to the peer.
    fn send(&mut self, frame: &[u8]) -> core::result::Result<(), Self::Error>;
}

/// Transport level failures surfaced by [`Transport`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection closed by the peer.
    #[error("transport closed")]
    Closed,
    /// I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Peer announced a frame beyond protocol bounds.
    #[error("frame of {0} bytes exceeds limit")]
    Oversized(usize),
}

/// One end of an in-process frame channel.
pub struct LoopbackTransport {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
}

/// Creates a connected `(client, server)` loopback pair.
pub fn loopback_pair() -> (LoopbackTransport, LoopbackTransport) {
    let (client_tx, server_rx) = crossbeam_channel::unbounded();
    let (server_tx, client_rx) = crossbeam_channel::unbounded();
    (
        LoopbackTransport { tx: client_tx, rx: client_rx },
        LoopbackTransport { tx: server_tx, rx: server_rx },
    )
}

impl Transport for LoopbackTransport {
    type Error = TransportError;

    fn recv(&mut self) -> core::result::Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.rx.recv().ok())
    }

    fn send(&mut self, frame: &[u8]) -> core::result::Result<(), Self::Error> {
        self.tx.send(frame.to_vec()).map_err(|_| TransportError::Closed)
    }
}

#[cfg(unix)]
pub use unix::UnixTransport;

#[cfg(unix)]
mod unix {
    use std::io::{ErrorKind, Read, Write};
    use std::os::unix::net::UnixStream;
    use std::path::Path;

    use super::{Transport, TransportError, MAX_FRAME_LEN};

    /// Length-prefixed (`u32` little-endian) frames over a Unix stream socket.
    pub struct UnixTransport {
        stream: UnixStream,
    }

    impl UnixTransport {
        /// Wraps an accepted or connected stream.
        pub fn new(stream: UnixStream) -> Self {
            Self { stream }
        }

        /// Connects to the daemon socket at `path`.
        pub fn connect(path: impl AsRef<Path>) -> Result<Self, TransportError> {
            Ok(Self::new(UnixStream::connect(path)?))
        }
    }

    impl Transport for UnixTransport {
        type Error = TransportError;

        fn recv(&mut self) -> Result<Option<Vec<u8>>, Self::Error> {
            let mut len = [0u8; 4];
            match self.stream.read_exact(&mut len) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(None),
                Err(err) => return Err(err.into()),
            }
            let len = u32::from_le_bytes(len) as usize;
            if len > MAX_FRAME_LEN {
                return Err(TransportError::Oversized(len));
            }
            let mut frame = vec![0u8; len];
            self.stream.read_exact(&mut frame)?;
            Ok(Some(frame))
        }

        fn send(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
            if frame.len() > MAX_FRAME_LEN {
                return Err(TransportError::Oversized(frame.len()));
            }
            self.stream.write_all(&(frame.len() as u32).to_le_bytes())?;
            self.stream.write_all(frame)?;
            self.stream.flush()?;
            Ok(())
        }
    }
}
