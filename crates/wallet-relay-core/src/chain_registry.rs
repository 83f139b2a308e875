use crate::domain::{ChainConfig, NativeCurrency};
use crate::ports::PortError;

pub const ETHEREUM_MAINNET_CHAIN_ID: u64 = 1;

/// Known chains in insertion order plus the selected chain id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainRegistry {
    chains: Vec<ChainConfig>,
    selected: Option<u64>,
}

impl ChainRegistry {
    pub fn new(chains: Vec<ChainConfig>, selected: Option<u64>) -> Result<Self, PortError> {
        let mut registry = Self::default();
        for chain in chains {
            registry.insert_new(chain)?;
        }
        match selected {
            Some(chain_id) => {
                registry.select(chain_id)?;
            }
            None => registry.selected = registry.chains.first().map(|c| c.chain_id),
        }
        Ok(registry)
    }

    pub fn chains(&self) -> &[ChainConfig] {
        &self.chains
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn get(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }

    pub fn contains(&self, chain_id: u64) -> bool {
        self.get(chain_id).is_some()
    }

    pub fn selected_chain_id(&self) -> Option<u64> {
        self.selected
    }

    pub fn selected(&self) -> Option<&ChainConfig> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn native_currency(&self) -> Option<&NativeCurrency> {
        self.selected().map(|c| &c.native_currency)
    }

    pub fn is_ethereum_mainnet(&self) -> bool {
        self.selected == Some(ETHEREUM_MAINNET_CHAIN_ID)
    }

    /// True when any registered chain lists `url`, primary or fallback.
    pub fn has_rpc_url(&self, url: &str) -> bool {
        self.chains
            .iter()
            .any(|c| c.rpc_urls.iter().any(|u| u == url))
    }

    pub fn select(&mut self, chain_id: u64) -> Result<&ChainConfig, PortError> {
        let idx = self
            .chains
            .iter()
            .position(|c| c.chain_id == chain_id)
            .ok_or_else(|| PortError::NotFound(format!("chain {chain_id} is not registered")))?;
        self.selected = Some(chain_id);
        Ok(&self.chains[idx])
    }

    /// Adds a new chain, or merges the rpc urls of `config` into an existing
    /// chain with the same id. Either way the chain ends up selected.
    pub fn add_network(&mut self, config: ChainConfig) -> Result<&ChainConfig, PortError> {
        let chain_id = config.chain_id;
        if self.contains(chain_id) {
            self.merge_rpc_urls(chain_id, &config.rpc_urls)?;
        } else {
            self.insert_new(config)?;
        }
        self.select(chain_id)
    }

    pub fn merge_rpc_urls(&mut self, chain_id: u64, urls: &[String]) -> Result<(), PortError> {
        let chain = self
            .chains
            .iter_mut()
            .find(|c| c.chain_id == chain_id)
            .ok_or_else(|| PortError::NotFound(format!("chain {chain_id} is not registered")))?;
        for url in urls {
            if !url.is_empty() && !chain.rpc_urls.contains(url) {
                chain.rpc_urls.push(url.clone());
            }
        }
        Ok(())
    }

    fn insert_new(&mut self, config: ChainConfig) -> Result<(), PortError> {
        let primary = config
            .primary_rpc_url()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                PortError::Validation(format!("chain {} has no rpc url", config.chain_id))
            })?;
        if self.contains(config.chain_id) {
            return Err(PortError::Conflict(format!(
                "chain {} already registered",
                config.chain_id
            )));
        }
        if self.has_rpc_url(primary) {
            return Err(PortError::Conflict(format!(
                "rpc url {primary} already registered"
            )));
        }
        self.chains.push(config);
        Ok(())
    }
}
