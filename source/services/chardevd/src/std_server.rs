// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: chardevd host backend (std): Unix socket listener, one dispatcher per connection
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Loopback tests in `source/services/chardevd/tests/loopback.rs`

use std::sync::Arc;

use char_bufdev::{ConfigError, Registry};
use log::{error, info};
use thiserror::Error;

use crate::config::ServiceConfig;
use crate::dispatcher::Dispatcher;
use crate::transport::{Transport, TransportError};

/// Result alias used by the service.
pub type Result<T> = core::result::Result<T, ServerError>;

/// Errors that end a connection or the daemon.
///
/// Decode and dispatch failures never end a session; they are answered with a status
/// byte by [`Dispatcher::handle_frame`].
#[derive(Debug, Error)]
pub enum ServerError {
    /// Transport level failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// Host I/O failure outside a transport (bind, spawn).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Device initialization failed.
    #[error("device error: {0}")]
    Device(#[from] char_bufdev::Error),
    /// No listener is available on this platform.
    #[error("transport unsupported")]
    Unsupported,
}

/// Notifies init when the service is ready.
pub struct ReadyNotifier(Box<dyn FnOnce() + Send>);

impl ReadyNotifier {
    /// Creates a notifier from `func`.
    pub fn new<F>(func: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Box::new(func))
    }

    /// Emits the ready marker.
    pub fn notify(self) {
        (self.0)();
    }
}

/// Serves frames from `transport` until the peer goes away.
pub fn run_loop<T>(transport: &mut T, dispatcher: &Dispatcher) -> Result<()>
where
    T: Transport,
{
    while let Some(frame) = transport
        .recv()
        .map_err(|err| ServerError::Transport(err.into()))?
    {
        if frame.is_empty() {
            continue;
        }
        let response = dispatcher.handle_frame(&frame);
        transport
            .send(&response)
            .map_err(|err| ServerError::Transport(err.into()))?;
    }
    Ok(())
}

/// Serves one client connection with its own handle table.
pub fn serve_connection<T>(mut transport: T, registry: Arc<Registry>) -> Result<()>
where
    T: Transport,
{
    let dispatcher = Dispatcher::new(registry);
    let result = run_loop(&mut transport, &dispatcher);
    let leaked = dispatcher.open_handles();
    if leaked > 0 {
        info!("chardevd: connection closed; releasing {leaked} open handles");
    }
    result
}

/// Runs the daemon: initializes the device, then serves clients on the configured socket.
pub fn service_main_loop(config: ServiceConfig, notifier: ReadyNotifier) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::net::UnixListener;

        use char_bufdev::MemoryNodeProvider;
        use log::warn;

        use crate::transport::UnixTransport;

        let registry = Registry::init(config.device.clone(), MemoryNodeProvider::new())?;
        let device = registry.config();
        info!(
            "chardevd: device nodes {}0..{}{}",
            device.name_prefix,
            device.name_prefix,
            device.max_endpoints - 1
        );
        match std::fs::remove_file(&config.socket_path) {
            Ok(()) => info!("chardevd: removed stale socket {}", config.socket_path.display()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        let listener = UnixListener::bind(&config.socket_path)?;
        info!("chardevd: ready on {}", config.socket_path.display());
        notifier.notify();

        for stream in listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(err) => {
                    warn!("chardevd: accept failed: {err}");
                    continue;
                }
            };
            let registry = registry.clone();
            std::thread::Builder::new()
                .name("chardevd-conn".into())
                .spawn(move || {
                    if let Err(err) = serve_connection(UnixTransport::new(stream), registry) {
                        error!("chardevd: connection error: {err}");
                    }
                })?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        let _ = config;
        notifier.notify();
        Err(ServerError::Unsupported)
    }
}
