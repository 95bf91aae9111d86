// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Typed client for the chardevd wire protocol over any [`Transport`].

use thiserror::Error;

use crate::protocol::{
    decode_response, encode_request, response_u32, DecodeError, Request, Response, STATUS_OK,
};
use crate::transport::{Transport, TransportError};

/// Errors surfaced to client callers.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failed or closed before a response arrived.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// Response could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    /// Daemon answered with a non-OK status.
    #[error("request op {op} failed with status {status}")]
    Status {
        /// Request opcode.
        op: u8,
        /// Wire status code.
        status: u8,
    },
}

/// Request/response client.
pub struct Client<T> {
    transport: T,
}

impl<T: Transport> Client<T> {
    /// Wraps a connected transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Sends `request` and waits for its OK response.
    pub fn call(&mut self, request: &Request) -> Result<Response, ClientError> {
        let op = request.opcode();
        self.transport
            .send(&encode_request(request))
            .map_err(|err| ClientError::Transport(err.into()))?;
        let frame = self
            .transport
            .recv()
            .map_err(|err| ClientError::Transport(err.into()))?
            .ok_or(TransportError::Closed)?;
        let response = decode_response(&frame)?;
        if response.op != op {
            return Err(DecodeError::Malformed.into());
        }
        if response.status != STATUS_OK {
            return Err(ClientError::Status { op, status: response.status });
        }
        Ok(response)
    }

    /// Opens endpoint `id`.
    pub fn open(&mut self, id: u32) -> Result<u32, ClientError> {
        Ok(response_u32(&self.call(&Request::Open { id })?)?)
    }

    /// Reads up to `max_len` bytes.
    pub fn read(&mut self, handle: u32, max_len: u32) -> Result<Vec<u8>, ClientError> {
        Ok(self.call(&Request::Read { handle, max_len })?.payload)
    }

    /// Writes `bytes`, returning the number stored.
    pub fn write(&mut self, handle: u32, bytes: &[u8]) -> Result<u32, ClientError> {
        let request = Request::Write { handle, bytes: bytes.to_vec() };
        Ok(response_u32(&self.call(&request)?)?)
    }

    /// Releases `handle`.
    pub fn release(&mut self, handle: u32) -> Result<(), ClientError> {
        self.call(&Request::Release { handle }).map(|_| ())
    }

    /// Issues control request `cmd`, returning the created endpoint id.
    pub fn ioctl(&mut self, cmd: u32) -> Result<u32, ClientError> {
        Ok(response_u32(&self.call(&Request::Ioctl { cmd })?)?)
    }
}
