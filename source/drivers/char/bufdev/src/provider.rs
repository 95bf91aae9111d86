// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Device-node provider seam (publish/withdraw discoverable endpoint names)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: 3 unit tests
//!
//! PUBLIC API:
//!   - NodeProvider: trait implemented by the host node-publishing facility
//!   - MemoryNodeProvider: in-process node table with fault injection

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use parking_lot::Mutex;
use thiserror::Error;

/// Failures reported by a [`NodeProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// A node with this name is already published.
    #[error("node {0} already exists")]
    Exists(String),
    /// No node with this name is published.
    #[error("node {0} not published")]
    Missing(String),
    /// The provider refused the request.
    #[error("provider rejected request: {0}")]
    Rejected(String),
}

/// External facility that exposes endpoints under discoverable names.
pub trait NodeProvider: Send + Sync {
    /// Publishes `name` for endpoint `id`.
    fn publish(&self, id: usize, name: &str) -> Result<(), ProviderError>;

    /// Withdraws a previously published node.
    fn withdraw(&self, id: usize, name: &str) -> Result<(), ProviderError>;
}

#[derive(Default)]
struct NodeTable {
    nodes: BTreeMap<String, usize>,
    fail_next: bool,
    fail_ids: BTreeSet<usize>,
}

/// Node table kept in process memory.
///
/// Stands in for the host device-node facility on hosts that have none, and lets tests
/// inject publish failures.
#[derive(Default)]
pub struct MemoryNodeProvider {
    table: Mutex<NodeTable>,
}

impl MemoryNodeProvider {
    /// Creates an empty node table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next publish call fail once.
    pub fn fail_next_publish(&self) {
        self.table.lock().fail_next = true;
    }

    /// Makes every publish of endpoint `id` fail until cleared.
    pub fn fail_publish_of(&self, id: usize) {
        self.table.lock().fail_ids.insert(id);
    }

    /// Clears all injected failures.
    pub fn clear_faults(&self) {
        let mut table = self.table.lock();
        table.fail_next = false;
        table.fail_ids.clear();
    }

    /// Currently published node names in lexical order.
    pub fn nodes(&self) -> Vec<String> {
        self.table.lock().nodes.keys().cloned().collect()
    }

    /// Endpoint id published under `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.table.lock().nodes.get(name).copied()
    }
}

impl NodeProvider for MemoryNodeProvider {
    fn publish(&self, id: usize, name: &str) -> Result<(), ProviderError> {
        let mut table = self.table.lock();
        if std::mem::take(&mut table.fail_next) || table.fail_ids.contains(&id) {
            return Err(ProviderError::Rejected(format!("injected failure for {name}")));
        }
        if table.nodes.contains_key(name) {
            return Err(ProviderError::Exists(name.to_string()));
        }
        table.nodes.insert(name.to_string(), id);
        debug!("bufdev: node /dev/{name} -> endpoint {id}");
        Ok(())
    }

    fn withdraw(&self, _id: usize, name: &str) -> Result<(), ProviderError> {
        self.table
            .lock()
            .nodes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ProviderError::Missing(name.to_string()))
    }
}

/// Shared providers publish through the pointee, so callers can keep a handle for inspection.
impl<P: NodeProvider + ?Sized> NodeProvider for std::sync::Arc<P> {
    fn publish(&self, id: usize, name: &str) -> Result<(), ProviderError> {
        (**self).publish(id, name)
    }

    fn withdraw(&self, id: usize, name: &str) -> Result<(), ProviderError> {
        (**self).withdraw(id, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_then_withdraw() {
        let provider = MemoryNodeProvider::new();
        provider.publish(0, "advanced_driver0").expect("publish");
        assert_eq!(provider.lookup("advanced_driver0"), Some(0));
        provider.withdraw(0, "advanced_driver0").expect("withdraw");
        assert!(provider.nodes().is_empty());
        assert!(matches!(
            provider.withdraw(0, "advanced_driver0"),
            Err(ProviderError::Missing(_))
        ));
    }

    #[test]
    fn duplicate_publish_rejected() {
        let provider = MemoryNodeProvider::new();
        provider.publish(1, "dev1").expect("publish");
        assert_eq!(provider.publish(1, "dev1"), Err(ProviderError::Exists("dev1".into())));
    }

    #[test]
    fn injected_failure_fires_once() {
        let provider = MemoryNodeProvider::new();
        provider.fail_next_publish();
        assert!(matches!(provider.publish(0, "dev0"), Err(ProviderError::Rejected(_))));
        provider.publish(0, "dev0").expect("second attempt succeeds");
    }
}
