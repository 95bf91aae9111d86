// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! CONTEXT: chardevd wire protocol v1 (versioned byte frames; bounded inputs)
//!
//! OWNERS: @runtime
//!
//! STATUS: Experimental
//!
//! API_STABILITY: Unstable
//!
//! TEST_COVERAGE: Tests in `source/services/chardevd/tests/protocol.rs`
//!   - Decode: all opcodes, reject malformed/unsupported/oversized frames
//!   - Property tests for panic-freedom on arbitrary input

use char_bufdev::Error as DeviceError;

pub const MAGIC0: u8 = b'C';
pub const MAGIC1: u8 = b'D';
pub const VERSION: u8 = 1;

pub const OP_OPEN: u8 = 1;
pub const OP_READ: u8 = 2;
pub const OP_WRITE: u8 = 3;
pub const OP_RELEASE: u8 = 4;
pub const OP_IOCTL: u8 = 5;

/// Set on the opcode of every response frame.
pub const OP_RESPONSE: u8 = 0x80;

pub const STATUS_OK: u8 = 0;
pub const STATUS_MALFORMED: u8 = 1;
pub const STATUS_UNSUPPORTED: u8 = 2;
pub const STATUS_EXHAUSTED: u8 = 3;
pub const STATUS_NOT_FOUND: u8 = 4;
pub const STATUS_FAULT: u8 = 5;
pub const STATUS_PUBLISH_FAILED: u8 = 6;
pub const STATUS_INVALID_COMMAND: u8 = 7;
pub const STATUS_BAD_HANDLE: u8 = 8;
pub const STATUS_TOO_LARGE: u8 = 9;

/// Largest read a single request may ask for.
pub const MAX_READ_LEN: u32 = 64 * 1024;
/// Largest write payload accepted in one frame.
pub const MAX_WRITE_LEN: usize = 64 * 1024;
/// Largest frame either side will accept.
pub const MAX_FRAME_LEN: usize = HEADER_LEN + 4 + MAX_WRITE_LEN;

const HEADER_LEN: usize = 4;

/// A decoded v1 request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    Open { id: u32 },
    Read { handle: u32, max_len: u32 },
    Write { handle: u32, bytes: Vec<u8> },
    Release { handle: u32 },
    Ioctl { cmd: u32 },
}

impl Request {
    /// Opcode carried by this request.
    pub fn opcode(&self) -> u8 {
        match self {
            Self::Open { .. } => OP_OPEN,
            Self::Read { .. } => OP_READ,
            Self::Write { .. } => OP_WRITE,
            Self::Release { .. } => OP_RELEASE,
            Self::Ioctl { .. } => OP_IOCTL,
        }
    }
}

/// A decoded v1 response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub op: u8,
    pub status: u8,
    pub payload: Vec<u8>,
}

/// Decode errors for v1 frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[must_use = "decode errors must be handled"]
pub enum DecodeError {
    #[error("malformed frame")]
    Malformed,
    #[error("unsupported version or opcode")]
    Unsupported,
    #[error("frame exceeds protocol bounds")]
    TooLarge,
}

impl DecodeError {
    /// Wire status reported for this error.
    pub fn status(self) -> u8 {
        match self {
            Self::Malformed => STATUS_MALFORMED,
            Self::Unsupported => STATUS_UNSUPPORTED,
            Self::TooLarge => STATUS_TOO_LARGE,
        }
    }
}

/// Maps a device error onto its wire status.
pub fn device_status(err: &DeviceError) -> u8 {
    match err {
        DeviceError::ResourceExhausted { .. } => STATUS_EXHAUSTED,
        DeviceError::NotFound(_) => STATUS_NOT_FOUND,
        DeviceError::TransferFault => STATUS_FAULT,
        DeviceError::PublishFailed { .. } => STATUS_PUBLISH_FAILED,
        DeviceError::InvalidCommand(_) => STATUS_INVALID_COMMAND,
        DeviceError::Truncated { .. } => STATUS_TOO_LARGE,
        DeviceError::Config(_) => STATUS_UNSUPPORTED,
    }
}

fn check_header(frame: &[u8]) -> Result<u8, DecodeError> {
    if frame.len() > MAX_FRAME_LEN {
        return Err(DecodeError::TooLarge);
    }
    if frame.len() < HEADER_LEN || frame[0] != MAGIC0 || frame[1] != MAGIC1 {
        return Err(DecodeError::Malformed);
    }
    if frame[2] != VERSION {
        return Err(DecodeError::Unsupported);
    }
    Ok(frame[3])
}

fn read_u32(body: &[u8], at: usize) -> Result<u32, DecodeError> {
    let bytes = body.get(at..at + 4).ok_or(DecodeError::Malformed)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn exact_u32(body: &[u8]) -> Result<u32, DecodeError> {
    if body.len() != 4 {
        return Err(DecodeError::Malformed);
    }
    read_u32(body, 0)
}

/// Decodes a request frame.
pub fn decode_request(frame: &[u8]) -> Result<Request, DecodeError> {
    let op = check_header(frame)?;
    let body = &frame[HEADER_LEN..];
    match op {
        OP_OPEN => Ok(Request::Open { id: exact_u32(body)? }),
        OP_READ => {
            // [handle:u32le, max_len:u32le]
            if body.len() != 8 {
                return Err(DecodeError::Malformed);
            }
            let max_len = read_u32(body, 4)?;
            if max_len > MAX_READ_LEN {
                return Err(DecodeError::TooLarge);
            }
            Ok(Request::Read { handle: read_u32(body, 0)?, max_len })
        }
        OP_WRITE => {
            // [handle:u32le, bytes...]
            let handle = read_u32(body, 0)?;
            let bytes = &body[4..];
            if bytes.len() > MAX_WRITE_LEN {
                return Err(DecodeError::TooLarge);
            }
            Ok(Request::Write { handle, bytes: bytes.to_vec() })
        }
        OP_RELEASE => Ok(Request::Release { handle: exact_u32(body)? }),
        OP_IOCTL => Ok(Request::Ioctl { cmd: exact_u32(body)? }),
        _ => Err(DecodeError::Unsupported),
    }
}

/// Encodes a request frame.
pub fn encode_request(request: &Request) -> Vec<u8> {
    let mut frame = vec![MAGIC0, MAGIC1, VERSION, request.opcode()];
    match request {
        Request::Open { id } => frame.extend_from_slice(&id.to_le_bytes()),
        Request::Read { handle, max_len } => {
            frame.extend_from_slice(&handle.to_le_bytes());
            frame.extend_from_slice(&max_len.to_le_bytes());
        }
        Request::Write { handle, bytes } => {
            frame.extend_from_slice(&handle.to_le_bytes());
            frame.extend_from_slice(bytes);
        }
        Request::Release { handle } => frame.extend_from_slice(&handle.to_le_bytes()),
        Request::Ioctl { cmd } => frame.extend_from_slice(&cmd.to_le_bytes()),
    }
    frame
}

/// Encodes a response frame for request opcode `op`.
pub fn encode_response(op: u8, status: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_LEN + 1 + payload.len());
    frame.extend_from_slice(&[MAGIC0, MAGIC1, VERSION, op | OP_RESPONSE, status]);
    frame.extend_from_slice(payload);
    frame
}

/// Decodes a response frame.
pub fn decode_response(frame: &[u8]) -> Result<Response, DecodeError> {
    let op = check_header(frame)?;
    if op & OP_RESPONSE == 0 {
        return Err(DecodeError::Malformed);
    }
    let status = *frame.get(HEADER_LEN).ok_or(DecodeError::Malformed)?;
    Ok(Response { op: op & !OP_RESPONSE, status, payload: frame[HEADER_LEN + 1..].to_vec() })
}

/// Reads the single `u32` payload carried by open/write/ioctl responses.
pub fn response_u32(response: &Response) -> Result<u32, DecodeError> {
    exact_u32(&response.payload)
}
