use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use wallet_relay_core::{PortError, StoragePort};

/// Process-local key/value store standing in for the page's local storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStorage {
    pub fn keys(&self) -> Result<Vec<String>, PortError> {
        let g = self
            .inner
            .lock()
            .map_err(|e| PortError::Transport(format!("storage lock poisoned: {e}")))?;
        Ok(g.keys().cloned().collect())
    }
}

impl StoragePort for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, PortError> {
        let g = self
            .inner
            .lock()
            .map_err(|e| PortError::Transport(format!("storage lock poisoned: {e}")))?;
        Ok(g.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), PortError> {
        let mut g = self
            .inner
            .lock()
            .map_err(|e| PortError::Transport(format!("storage lock poisoned: {e}")))?;
        g.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}
