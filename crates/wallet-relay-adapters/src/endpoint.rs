//! Remote JSON-RPC endpoint and the replaceable slot that holds it.
//!
//! The slot is swapped wholesale by `set_provider`/`set_rpc_config`; calls
//! already in flight keep the connection they started with.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::OnceCell;

use wallet_relay_core::params::parse_chain_id;
use wallet_relay_core::{ChainConfig, PortError};

#[allow(async_fn_in_trait)]
pub trait RpcEndpoint {
    fn url(&self) -> &str;
    async fn request(&self, method: &str, params: Value) -> Result<Value, PortError>;
}

pub trait EndpointFactory {
    type Endpoint: RpcEndpoint;
    fn connect(&self, url: &str) -> Result<Self::Endpoint, PortError>;
}

#[derive(Debug)]
pub struct HttpRpcEndpoint {
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpRpcEndpoint {
    pub fn new(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
            next_id: AtomicU64::new(1),
        }
    }
}

impl RpcEndpoint for HttpRpcEndpoint {
    fn url(&self) -> &str {
        &self.url
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, PortError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PortError::Transport(format!("rpc request {method} failed: {e}")))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| PortError::Transport(format!("rpc json decode failed: {e}")))?;
        if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
            return Err(rpc_error(err));
        }
        if !status.is_success() {
            return Err(PortError::Transport(format!("rpc status {status}: {body}")));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| PortError::Transport(format!("rpc response to {method} missing result")))
    }
}

fn rpc_error(err: &Value) -> PortError {
    let code = err.get("code").and_then(Value::as_i64);
    let message = err.get("message").and_then(Value::as_str);
    match (code, message) {
        (Some(code), Some(message)) => PortError::Rpc {
            code,
            message: message.to_owned(),
            data: err.get("data").cloned(),
        },
        _ => PortError::Transport(format!("rpc returned error: {err}")),
    }
}

#[derive(Debug, Clone)]
pub struct HttpEndpointFactory {
    client: reqwest::Client,
}

impl HttpEndpointFactory {
    pub fn new(timeout_ms: u64) -> Result<Self, PortError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| PortError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }
}

impl EndpointFactory for HttpEndpointFactory {
    type Endpoint = HttpRpcEndpoint;

    fn connect(&self, url: &str) -> Result<HttpRpcEndpoint, PortError> {
        reqwest::Url::parse(url)
            .map_err(|e| PortError::Validation(format!("invalid rpc url {url}: {e}")))?;
        Ok(HttpRpcEndpoint::new(url, self.client.clone()))
    }
}

/// One endpoint plus its detected chain id.
#[derive(Debug)]
pub struct Connection<E> {
    pub endpoint: E,
    chain_id: OnceCell<u64>,
}

impl<E: RpcEndpoint> Connection<E> {
    pub fn new(endpoint: E, known_chain_id: Option<u64>) -> Self {
        Self {
            endpoint,
            chain_id: OnceCell::new_with(known_chain_id),
        }
    }

    /// At most one `eth_chainId` round-trip per connection.
    pub async fn chain_id(&self) -> Result<u64, PortError> {
        self.chain_id
            .get_or_try_init(|| async {
                let raw = self.endpoint.request("eth_chainId", json!([])).await?;
                parse_chain_id(&raw).map_err(PortError::Validation)
            })
            .await
            .copied()
    }
}

pub struct EndpointHandle<F: EndpointFactory> {
    factory: Arc<F>,
    current: Arc<Mutex<Option<Arc<Connection<F::Endpoint>>>>>,
}

impl<F: EndpointFactory> Clone for EndpointHandle<F> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
            current: Arc::clone(&self.current),
        }
    }
}

impl<F: EndpointFactory> EndpointHandle<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory: Arc::new(factory),
            current: Arc::new(Mutex::new(None)),
        }
    }

    pub fn set_provider(&self, url: &str) -> Result<(), PortError> {
        let endpoint = self.factory.connect(url)?;
        self.install(Connection::new(endpoint, None))
    }

    /// Connects to the chain's primary url; the configured chain id seeds the
    /// cache so no detection round-trip is needed.
    pub fn set_rpc_config(&self, config: &ChainConfig) -> Result<(), PortError> {
        let url = config.primary_rpc_url().ok_or_else(|| {
            PortError::Validation(format!("chain {} has no rpc url", config.chain_id))
        })?;
        let endpoint = self.factory.connect(url)?;
        self.install(Connection::new(endpoint, Some(config.chain_id)))
    }

    fn install(&self, connection: Connection<F::Endpoint>) -> Result<(), PortError> {
        let url = connection.endpoint.url().to_owned();
        let mut g = self
            .current
            .lock()
            .map_err(|e| PortError::Transport(format!("endpoint lock poisoned: {e}")))?;
        *g = Some(Arc::new(connection));
        tracing::info!(url, "rpc endpoint replaced");
        Ok(())
    }

    pub fn current(&self) -> Result<Arc<Connection<F::Endpoint>>, PortError> {
        let g = self
            .current
            .lock()
            .map_err(|e| PortError::Transport(format!("endpoint lock poisoned: {e}")))?;
        g.clone()
            .ok_or_else(|| PortError::Transport("no rpc endpoint configured".to_owned()))
    }

    pub fn url(&self) -> Option<String> {
        self.current()
            .ok()
            .map(|c| c.endpoint.url().to_owned())
    }

    pub async fn chain_id(&self) -> Result<u64, PortError> {
        self.current()?.chain_id().await
    }

    pub async fn request(&self, method: &str, params: Value) -> Result<Value, PortError> {
        self.current()?.endpoint.request(method, params).await
    }
}
