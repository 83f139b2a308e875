use wallet_relay_core::{AppMode, ChainConfig, NativeCurrency, DEFAULT_FORWARDER_NAME};

pub const ENV_RPC_URL: &str = "WALLET_RELAY_RPC_URL";
pub const ENV_APP_MODE: &str = "WALLET_RELAY_APP_MODE";
pub const ENV_CHAIN_ID: &str = "WALLET_RELAY_CHAIN_ID";
pub const ENV_ENDPOINT_TIMEOUT_MS: &str = "WALLET_RELAY_ENDPOINT_TIMEOUT_MS";
pub const ENV_FORWARDER_NAME: &str = "WALLET_RELAY_FORWARDER_NAME";

#[derive(Debug, Clone)]
pub struct WalletConfig {
    pub app_mode: AppMode,
    pub chains: Vec<ChainConfig>,
    pub selected_chain_id: u64,
    /// Overrides the selected chain's primary rpc url when set.
    pub rpc_url: Option<String>,
    pub endpoint_timeout_ms: u64,
    pub forwarder_name: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            app_mode: AppMode::Widget,
            chains: default_chains(),
            selected_chain_id: 1,
            rpc_url: None,
            endpoint_timeout_ms: 15_000,
            forwarder_name: DEFAULT_FORWARDER_NAME.to_owned(),
        }
    }
}

impl WalletConfig {
    /// Keeps the current timeout when `raw` is not a whole number of ms.
    pub fn apply_endpoint_timeout(&mut self, raw: &str) {
        match raw.trim().parse::<u64>() {
            Ok(ms) => self.endpoint_timeout_ms = ms,
            Err(e) => {
                tracing::warn!(error = %e, value = raw, "ignoring {ENV_ENDPOINT_TIMEOUT_MS}")
            }
        }
    }

    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var(ENV_APP_MODE) {
            match v.parse() {
                Ok(mode) => cfg.app_mode = mode,
                Err(e) => tracing::warn!(error = %e, "ignoring {ENV_APP_MODE}"),
            }
        }
        if let Ok(v) = std::env::var(ENV_CHAIN_ID) {
            match wallet_relay_core::params::parse_chain_id_str(&v) {
                Ok(chain_id) => cfg.selected_chain_id = chain_id,
                Err(e) => tracing::warn!(error = %e, "ignoring {ENV_CHAIN_ID}"),
            }
        }
        if let Ok(v) = std::env::var(ENV_ENDPOINT_TIMEOUT_MS) {
            cfg.apply_endpoint_timeout(&v);
        }
        if let Ok(v) = std::env::var(ENV_RPC_URL) {
            if !v.trim().is_empty() {
                cfg.rpc_url = Some(v.trim().to_owned());
            }
        }
        if let Ok(v) = std::env::var(ENV_FORWARDER_NAME) {
            if !v.is_empty() {
                cfg.forwarder_name = v;
            }
        }
        cfg
    }

    /// Selected chain after applying the rpc url override.
    pub fn selected_chain(&self) -> Option<ChainConfig> {
        let mut chain = self
            .chains
            .iter()
            .find(|c| c.chain_id == self.selected_chain_id)
            .cloned()?;
        if let Some(url) = &self.rpc_url {
            chain.rpc_urls.retain(|u| u != url);
            chain.rpc_urls.insert(0, url.clone());
        }
        Some(chain)
    }

    /// Configured chains with the selected one carrying the override.
    pub fn registry_chains(&self) -> Vec<ChainConfig> {
        let selected = self.selected_chain();
        self.chains
            .iter()
            .map(|c| match &selected {
                Some(s) if s.chain_id == c.chain_id => s.clone(),
                _ => c.clone(),
            })
            .collect()
    }
}

fn builtin(chain_id: u64, name: &str, rpc: &str, explorer: &str, symbol: &str) -> ChainConfig {
    ChainConfig {
        chain_id,
        chain_name: name.to_owned(),
        rpc_urls: vec![rpc.to_owned()],
        block_explorer_urls: vec![explorer.to_owned()],
        native_currency: NativeCurrency {
            symbol: symbol.to_owned(),
            decimals: 18,
        },
        is_custom: false,
    }
}

pub fn default_chains() -> Vec<ChainConfig> {
    vec![
        builtin(
            1,
            "Ethereum Mainnet",
            "https://cloudflare-eth.com",
            "https://etherscan.io",
            "ETH",
        ),
        builtin(
            11155111,
            "Ethereum Sepolia",
            "https://rpc.sepolia.org",
            "https://sepolia.etherscan.io",
            "ETH",
        ),
        builtin(
            137,
            "Polygon Mainnet",
            "https://polygon-rpc.com",
            "https://polygonscan.com",
            "MATIC",
        ),
        builtin(
            10,
            "Optimism",
            "https://mainnet.optimism.io",
            "https://optimistic.etherscan.io",
            "ETH",
        ),
        builtin(
            42161,
            "Arbitrum One",
            "https://arb1.arbitrum.io/rpc",
            "https://arbiscan.io",
            "ETH",
        ),
    ]
}
