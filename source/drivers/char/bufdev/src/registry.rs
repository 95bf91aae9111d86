// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Bounded endpoint registry with serialized reserve/publish/commit creation
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: 8 unit tests, integration tests in `tests/`
//!
//! All `max_endpoints` slots are allocated up front; creation only fills the next empty
//! slot. Identifiers are dense (`0..count`) and never reused. `count` is published with
//! release ordering only after the node is live, so `resolve` needs no registry lock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::{error, info, warn};
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::channel::Channel;
use crate::config::DeviceConfig;
use crate::endpoint::EndpointState;
use crate::error::{Error, Result};
use crate::provider::NodeProvider;

/// Point-in-time view of registry occupancy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegistryStats {
    /// Active endpoints.
    pub count: usize,
    /// Maximum endpoints.
    pub capacity: usize,
    /// Per-endpoint buffer size in bytes.
    pub buffer_capacity: usize,
}

/// Owner of every endpoint slot and of the published node names.
pub struct Registry {
    config: DeviceConfig,
    provider: Box<dyn NodeProvider>,
    slots: Box<[Mutex<Option<EndpointState>>]>,
    count: AtomicUsize,
    // Held across reserve -> initialize -> publish -> commit.
    create_lock: Mutex<()>,
}

impl Registry {
    /// Allocates all slots and publishes the initial endpoints.
    ///
    /// If any initial publish fails, nodes published so far are withdrawn before the
    /// error is returned.
    pub fn init<P>(config: DeviceConfig, provider: P) -> Result<Arc<Self>>
    where
        P: NodeProvider + 'static,
    {
        config.validate()?;
        let slots = (0..config.max_endpoints).map(|_| Mutex::new(None)).collect();
        let registry = Self {
            config,
            provider: Box::new(provider),
            slots,
            count: AtomicUsize::new(0),
            create_lock: Mutex::new(()),
        };
        for _ in 0..registry.config.initial_endpoints {
            registry.create_endpoint()?;
        }
        info!(
            "bufdev: initialized; {} of {} endpoints, {} byte buffers",
            registry.count(),
            registry.capacity(),
            registry.buffer_capacity()
        );
        Ok(Arc::new(registry))
    }

    /// Instantiates and publishes the next endpoint, returning its identifier.
    pub fn create_endpoint(&self) -> Result<usize> {
        let _creating = self.create_lock.lock();
        let id = self.count.load(Ordering::Acquire);
        let slot = match self.slots.get(id) {
            Some(slot) => slot,
            None => {
                warn!("bufdev: maximum number of endpoints reached ({id})");
                return Err(Error::ResourceExhausted { capacity: self.capacity() });
            }
        };

        *slot.lock() = Some(EndpointState::new(self.config.buffer_capacity));
        let name = self.config.node_name(id);
        if let Err(source) = self.provider.publish(id, &name) {
            *slot.lock() = None;
            error!("bufdev: failed to publish /dev/{name}: {source}");
            return Err(Error::PublishFailed { id, source });
        }

        self.count.store(id + 1, Ordering::Release);
        info!("bufdev: created endpoint {id}; count={}", id + 1);
        info!("bufdev: published node /dev/{name}");
        Ok(id)
    }

    /// Locks and returns the live state of endpoint `id`.
    pub fn resolve(&self, id: usize) -> Result<MappedMutexGuard<'_, EndpointState>> {
        if id >= self.count() {
            return Err(Error::NotFound(id));
        }
        let slot = self.slots.get(id).ok_or(Error::NotFound(id))?;
        MutexGuard::try_map(slot.lock(), Option::as_mut).map_err(|_| Error::NotFound(id))
    }

    /// Opens a new channel on endpoint `id`.
    pub fn open(self: &Arc<Self>, id: usize) -> Result<Channel> {
        Channel::open(self, id)
    }

    /// Number of active endpoints.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Maximum number of endpoints.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Per-endpoint buffer capacity in bytes.
    pub fn buffer_capacity(&self) -> usize {
        self.config.buffer_capacity
    }

    /// Node name for endpoint `id`.
    pub fn node_name(&self, id: usize) -> String {
        self.config.node_name(id)
    }

    /// Configuration the registry was initialized with.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Current occupancy.
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            count: self.count(),
            capacity: self.capacity(),
            buffer_capacity: self.buffer_capacity(),
        }
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        let count = *self.count.get_mut();
        for id in 0..count {
            let name = self.config.node_name(id);
            if let Err(err) = self.provider.withdraw(id, &name) {
                warn!("bufdev: withdraw /dev/{name} failed: {err}");
            }
            if let Some(slot) = self.slots.get_mut(id) {
                *slot.get_mut() = None;
            }
        }
        info!("bufdev: unloaded; withdrew {count} nodes");
    }
}
