use std::sync::{Arc, Mutex};

use alloy::primitives::B256;
use serde::Serialize;
use serde_json::Value;

use wallet_relay_core::{ActivityPort, PortError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityEntry {
    Transaction {
        chain_id: u64,
        tx_hash: B256,
    },
    File {
        chain_id: u64,
        message: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        verifying_contract: Option<String>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct MemoryActivityLog {
    entries: Arc<Mutex<Vec<ActivityEntry>>>,
}

impl MemoryActivityLog {
    pub fn entries(&self) -> Result<Vec<ActivityEntry>, PortError> {
        let g = self
            .entries
            .lock()
            .map_err(|e| PortError::Transport(format!("activity lock poisoned: {e}")))?;
        Ok(g.clone())
    }

    fn push(&self, entry: ActivityEntry) -> Result<(), PortError> {
        let mut g = self
            .entries
            .lock()
            .map_err(|e| PortError::Transport(format!("activity lock poisoned: {e}")))?;
        g.push(entry);
        Ok(())
    }
}

impl ActivityPort for MemoryActivityLog {
    fn record_transaction(&self, chain_id: u64, tx_hash: B256) -> Result<(), PortError> {
        tracing::debug!(chain_id, %tx_hash, "transaction activity");
        self.push(ActivityEntry::Transaction { chain_id, tx_hash })
    }

    fn record_file_activity(
        &self,
        chain_id: u64,
        message: &Value,
        verifying_contract: Option<&str>,
    ) -> Result<(), PortError> {
        tracing::debug!(chain_id, "file activity");
        self.push(ActivityEntry::File {
            chain_id,
            message: message.clone(),
            verifying_contract: verifying_contract.map(str::to_owned),
        })
    }
}
