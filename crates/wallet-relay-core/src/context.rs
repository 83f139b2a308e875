use std::sync::{Mutex, MutexGuard};

use crate::chain_registry::ChainRegistry;
use crate::domain::AppMode;
use crate::permission::PermissionGate;
use crate::ports::SigningPort;

/// Process-owned state threaded into the dispatcher.
pub struct RuntimeContext<S: SigningPort> {
    pub chain_registry: Mutex<ChainRegistry>,
    pub signing_engine: S,
    pub permission_gate: PermissionGate,
}

impl<S: SigningPort> RuntimeContext<S> {
    pub fn new(
        chain_registry: ChainRegistry,
        signing_engine: S,
        permission_gate: PermissionGate,
    ) -> Self {
        Self {
            chain_registry: Mutex::new(chain_registry),
            signing_engine,
            permission_gate,
        }
    }

    /// Guard over the registry. Never hold it across an `.await`.
    pub fn registry(&self) -> MutexGuard<'_, ChainRegistry> {
        self.chain_registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn selected_chain_id(&self) -> Option<u64> {
        self.registry().selected_chain_id()
    }

    pub fn app_mode(&self) -> AppMode {
        self.permission_gate.mode()
    }
}
