// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Loopback session tests for chardevd (client <-> dispatcher over a frame channel)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: 7 integration tests
//!
//! TEST_SCENARIOS:
//!   - trigger-style create requests until the registry is full
//!   - write/read through wire handles, truncation at buffer capacity
//!   - error statuses for unknown handles, ids and control codes
//!   - publish failure reported as a status with the registry unchanged
//!   - undecodable frames answered with a status while the session stays up
//!   - handles left open are released when the connection ends

use std::sync::Arc;
use std::thread;

use char_bufdev::{DeviceConfig, MemoryNodeProvider, Registry, CMD_CREATE_ENDPOINT};
use chardevd::protocol::{
    decode_response, encode_request, Request, MAGIC0, MAGIC1, OP_IOCTL, OP_READ, STATUS_BAD_HANDLE,
    STATUS_EXHAUSTED, STATUS_INVALID_COMMAND, STATUS_MALFORMED, STATUS_NOT_FOUND,
    STATUS_PUBLISH_FAILED, STATUS_TOO_LARGE, STATUS_UNSUPPORTED,
};
use chardevd::{
    loopback_pair, serve_connection, Client, ClientError, LoopbackTransport, Transport,
};

fn session(
    registry: Arc<Registry>,
) -> (Client<LoopbackTransport>, thread::JoinHandle<chardevd::Result<()>>) {
    let (client, server) = loopback_pair();
    let worker = thread::spawn(move || serve_connection(server, registry));
    (Client::new(client), worker)
}

fn registry() -> (Arc<Registry>, Arc<MemoryNodeProvider>) {
    let provider = Arc::new(MemoryNodeProvider::new());
    let registry = Registry::init(DeviceConfig::default(), provider.clone()).expect("init");
    (registry, provider)
}

fn status_of(err: ClientError) -> u8 {
    match err {
        ClientError::Status { status, .. } => status,
        other => panic!("expected status error, got {other}"),
    }
}

#[test]
fn create_until_exhausted() {
    let (registry, provider) = registry();
    let (mut client, worker) = session(registry.clone());
    for expected in 1..5 {
        assert_eq!(client.ioctl(CMD_CREATE_ENDPOINT).expect("create"), expected);
    }
    let err = client.ioctl(CMD_CREATE_ENDPOINT).expect_err("full");
    assert_eq!(status_of(err), STATUS_EXHAUSTED);
    assert_eq!(provider.nodes().len(), 5);
    drop(client);
    worker.join().expect("join").expect("serve");
    assert_eq!(registry.count(), 5);
}

#[test]
fn write_read_over_wire() {
    let (registry, _provider) = registry();
    let (mut client, worker) = session(registry);
    let handle = client.open(0).expect("open");
    assert_eq!(client.write(handle, &[9u8; 2000]).expect("write"), 1024);
    let first = client.read(handle, 1000).expect("read");
    assert_eq!(first.len(), 1000);
    let rest = client.read(handle, 1000).expect("read");
    assert_eq!(rest.len(), 24);
    assert!(client.read(handle, 1000).expect("eof").is_empty());
    client.release(handle).expect("release");
    drop(client);
    worker.join().expect("join").expect("serve");
}

#[test]
fn error_statuses() {
    let (registry, _provider) = registry();
    let (mut client, worker) = session(registry);
    assert_eq!(status_of(client.open(3).expect_err("unpublished")), STATUS_NOT_FOUND);
    assert_eq!(status_of(client.read(77, 4).expect_err("unknown")), STATUS_BAD_HANDLE);
    assert_eq!(status_of(client.ioctl(0x6102).expect_err("bad cmd")), STATUS_INVALID_COMMAND);
    drop(client);
    worker.join().expect("join").expect("serve");
}

#[test]
fn separate_connections_share_endpoints() {
    let (registry, _provider) = registry();
    let (mut writer, writer_worker) = session(registry.clone());
    let (mut reader, reader_worker) = session(registry);
    let wh = writer.open(0).expect("open");
    writer.write(wh, b"shared").expect("write");
    let rh = reader.open(0).expect("open");
    assert_eq!(reader.read(rh, 64).expect("read"), b"shared");
    drop(writer);
    drop(reader);
    writer_worker.join().expect("join").expect("serve");
    reader_worker.join().expect("join").expect("serve");
}

#[test]
fn closing_connection_releases_channels() {
    let (registry, provider) = registry();
    let (mut client, worker) = session(registry.clone());
    client.open(0).expect("open");
    client.open(0).expect("open");
    drop(client);
    worker.join().expect("join").expect("serve");
    // Only the test's own reference keeps the registry alive now.
    assert_eq!(Arc::strong_count(&registry), 1);
    drop(registry);
    assert!(provider.nodes().is_empty());
}

#[test]
fn publish_failure_is_reported_and_rolled_back() {
    let (registry, provider) = registry();
    let (mut client, worker) = session(registry.clone());
    provider.fail_next_publish();
    let err = client.ioctl(CMD_CREATE_ENDPOINT).expect_err("publish fails");
    assert_eq!(status_of(err), STATUS_PUBLISH_FAILED);
    assert_eq!(registry.count(), 1);
    assert_eq!(status_of(client.open(1).expect_err("rolled back")), STATUS_NOT_FOUND);
    assert_eq!(client.ioctl(CMD_CREATE_ENDPOINT).expect("retry"), 1);
    drop(client);
    worker.join().expect("join").expect("serve");
}

#[test]
fn undecodable_frames_get_status_replies() {
    let (registry, _provider) = registry();
    let (mut raw, server) = loopback_pair();
    let worker = thread::spawn(move || serve_connection(server, registry));

    let mut exchange = |frame: &[u8]| {
        raw.send(frame).expect("send");
        let reply = raw.recv().expect("recv").expect("reply");
        decode_response(&reply).expect("decode")
    };

    let response = exchange(&[MAGIC0, MAGIC1, 9, OP_IOCTL]);
    assert_eq!(response.status, STATUS_UNSUPPORTED);

    let response = exchange(&[MAGIC0, MAGIC1, 1, OP_IOCTL, 1]);
    assert_eq!((response.op, response.status), (OP_IOCTL, STATUS_MALFORMED));

    let mut oversized = encode_request(&Request::Read { handle: 1, max_len: 0 });
    oversized[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
    let response = exchange(&oversized);
    assert_eq!((response.op, response.status), (OP_READ, STATUS_TOO_LARGE));

    let response = exchange(&encode_request(&Request::Ioctl { cmd: CMD_CREATE_ENDPOINT }));
    assert_eq!(response.payload, 1u32.to_le_bytes());

    drop(raw);
    worker.join().expect("join").expect("serve");
}
