// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Administrative trigger: asks chardevd to create the next endpoint
//!
//! Exit codes follow sysexits: 66 when the daemon socket cannot be opened, 74 when the
//! control request fails.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::debug;

const EX_NOINPUT: u8 = 66;
const EX_IOERR: u8 = 74;

/// Send the create-endpoint control request to chardevd.
#[derive(Parser, Debug)]
#[command(name = "chardev-trigger")]
struct Args {
    /// Daemon socket.
    #[arg(long, default_value = chardevd::config::DEFAULT_SOCKET_PATH)]
    socket: PathBuf,

    /// Raw control code, decimal or `0x`-prefixed hex (defaults to create-endpoint).
    #[arg(long, default_value_t = char_bufdev::CMD_CREATE_ENDPOINT, value_parser = parse_code)]
    code: u32,
}

fn parse_code(raw: &str) -> Result<u32, String> {
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    parsed.map_err(|err| format!("invalid control code {raw:?}: {err}"))
}

#[cfg(unix)]
fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let transport = match chardevd::UnixTransport::connect(&args.socket) {
        Ok(transport) => transport,
        Err(err) => {
            eprintln!("Failed to open {}: {err}", args.socket.display());
            return ExitCode::from(EX_NOINPUT);
        }
    };
    let mut client = chardevd::Client::new(transport);

    println!("Sending control command {:#x} to create endpoint", args.code);
    debug!("chardev-trigger: socket {}", args.socket.display());
    match client.ioctl(args.code) {
        Ok(id) => {
            println!("Control command sent successfully; new endpoint {id}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Failed to send control command: {err}");
            ExitCode::from(EX_IOERR)
        }
    }
}

#[cfg(not(unix))]
fn main() -> ExitCode {
    let _ = Args::parse();
    eprintln!("chardev-trigger: unix sockets unavailable on this platform");
    ExitCode::from(EX_IOERR)
}
