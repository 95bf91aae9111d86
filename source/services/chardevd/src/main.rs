// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: chardevd entrypoint wiring config and logging to the shared service loop

use std::path::PathBuf;

use clap::Parser;

/// Buffered character device daemon.
#[derive(Parser, Debug)]
#[command(name = "chardevd")]
struct Args {
    /// TOML config file (overrides CHARDEVD_CONFIG).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Socket path (overrides the config file).
    #[arg(long)]
    socket: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    let config = match args.config {
        Some(path) => chardevd::ServiceConfig::load(path),
        None => chardevd::ServiceConfig::from_env(),
    };
    let mut config = match config {
        Ok(config) => config,
        Err(err) => {
            eprintln!("chardevd: {err}");
            std::process::exit(2);
        }
    };
    if let Some(socket) = args.socket {
        config.socket_path = socket;
    }
    if let Err(err) = chardevd::service_main_loop(config, chardevd::ReadyNotifier::new(|| {})) {
        eprintln!("chardevd: exited with error: {err}");
        std::process::exit(1);
    }
}
