use std::sync::Arc;

use crate::config::AppConfig;
use crate::domains::{Domain, StoreKind};
use crate::exec::Executor;
use crate::logging::Log;
use crate::mutation::MutationEngine;
use crate::platform::Platform;
use crate::resources::{AdapterInventory, ResourceInventory};
use crate::snapshot::SnapshotStore;
use crate::store::{ConfigStore, NetshStore, RegistryStore};

/// Shared context for task execution.
pub struct Context {
    /// Loaded configuration.
    pub config: Arc<AppConfig>,
    /// Detected platform information.
    pub platform: Arc<Platform>,
    /// Logger for output and step recording.
    pub log: Arc<dyn Log>,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Store for registry-backed domains.
    pub registry: Arc<dyn ConfigStore>,
    /// Store for netsh-backed domains.
    pub netsh: Arc<dyn ConfigStore>,
    /// Network adapter discovery.
    pub inventory: Arc<dyn ResourceInventory>,
    /// Where snapshots are kept.
    pub snapshots: SnapshotStore,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("platform", &self.platform)
            .field("log", &"<dyn Log>")
            .field("executor", &self.executor)
            .field("registry", &self.registry)
            .field("netsh", &self.netsh)
            .field("inventory", &"<dyn ResourceInventory>")
            .field("snapshots", &self.snapshots)
            .finish()
    }
}

impl Context {
    /// Create a context wired to the real system.
    #[must_use]
    pub fn new(config: AppConfig, log: Arc<dyn Log>, executor: Arc<dyn Executor>) -> Self {
        let timeout = config.command_timeout();
        let snapshots = SnapshotStore::new(config.state_dir());
        Self {
            config: Arc::new(config),
            platform: Arc::new(Platform::detect()),
            log,
            registry: Arc::new(RegistryStore),
            netsh: Arc::new(NetshStore::new(Arc::clone(&executor), timeout)),
            inventory: Arc::new(AdapterInventory::new(Arc::clone(&executor), timeout)),
            executor,
            snapshots,
        }
    }

    /// Replace the logger, returning the updated context.
    #[must_use]
    pub fn with_log(mut self, log: Arc<dyn Log>) -> Self {
        self.log = log;
        self
    }

    /// Replace both stores and the inventory, returning the updated context.
    #[must_use]
    pub fn with_backends(
        mut self,
        registry: Arc<dyn ConfigStore>,
        netsh: Arc<dyn ConfigStore>,
        inventory: Arc<dyn ResourceInventory>,
    ) -> Self {
        self.registry = registry;
        self.netsh = netsh;
        self.inventory = inventory;
        self
    }

    /// The store that backs `kind`.
    #[must_use]
    pub fn store(&self, kind: StoreKind) -> &dyn ConfigStore {
        match kind {
            StoreKind::Registry => self.registry.as_ref(),
            StoreKind::Netsh => self.netsh.as_ref(),
        }
    }

    /// A mutation engine for `domain` over this context's backends.
    #[must_use]
    pub fn engine(&self, domain: Domain) -> MutationEngine<'_> {
        let spec = domain.spec();
        MutationEngine::new(
            spec,
            self.store(spec.store),
            self.inventory.as_ref(),
            &self.snapshots,
            self.log.as_ref(),
        )
    }
}
