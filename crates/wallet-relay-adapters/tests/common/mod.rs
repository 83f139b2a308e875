#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::thread;

use alloy::primitives::Address;
use serde_json::{json, Value};
use tiny_http::{Response, Server};

use wallet_relay_adapters::{EndpointHandle, HttpEndpointFactory, KeyMaterial, SigningEngine};
use wallet_relay_core::{ChainConfig, NativeCurrency};

pub const TEST_PRIVATE_KEY: &str =
    "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

pub type Handler = dyn Fn(&str, &Value) -> Result<Value, (i64, String)> + Send + Sync;

/// Scripted JSON-RPC endpoint. Every call is recorded as `(method, params)`.
pub struct RpcServer {
    pub url: String,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl RpcServer {
    pub fn spawn(handler: Box<Handler>) -> Self {
        let server = Server::http("127.0.0.1:0").expect("start server");
        let url = format!("http://{}", server.server_addr());
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&calls);

        thread::spawn(move || {
            for mut req in server.incoming_requests() {
                let mut body = String::new();
                if req.as_reader().read_to_string(&mut body).is_err() {
                    continue;
                }
                let payload: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
                let method = payload["method"].as_str().unwrap_or_default().to_owned();
                let params = payload["params"].clone();
                if let Ok(mut g) = recorded.lock() {
                    g.push((method.clone(), params.clone()));
                }
                let reply = match handler(&method, &params) {
                    Ok(result) => json!({"jsonrpc": "2.0", "id": payload["id"], "result": result}),
                    Err((code, message)) => json!({
                        "jsonrpc": "2.0",
                        "id": payload["id"],
                        "error": {"code": code, "message": message},
                    }),
                };
                let _ = req.respond(Response::from_string(reply.to_string()));
            }
        });

        Self { url, calls }
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|(m, _)| m).collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.methods().iter().filter(|m| *m == method).count()
    }
}

/// Answers the usual fill-in calls for a legacy transaction on chain 5.
pub fn chain_node(method: &str, _params: &Value) -> Result<Value, (i64, String)> {
    match method {
        "eth_chainId" => Ok(json!("0x5")),
        "eth_getTransactionCount" => Ok(json!("0x3")),
        "eth_gasPrice" => Ok(json!("0x3b9aca00")),
        "eth_maxPriorityFeePerGas" => Ok(json!("0x59682f00")),
        "eth_estimateGas" => Ok(json!("0x5208")),
        "eth_sendRawTransaction" => Ok(json!(
            "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
        )),
        "eth_blockNumber" => Ok(json!("0x10")),
        _ => Err((-32000, "execution reverted".to_owned())),
    }
}

pub fn key() -> KeyMaterial {
    KeyMaterial::from_hex(TEST_PRIVATE_KEY).expect("test key")
}

pub fn key_address() -> Address {
    key().address()
}

pub fn foreign_address() -> Address {
    "0x2000000000000000000000000000000000000002"
        .parse()
        .expect("foreign address")
}

pub fn engine_for(url: &str) -> SigningEngine<HttpEndpointFactory> {
    let handle = EndpointHandle::new(HttpEndpointFactory::new(5_000).expect("factory"));
    handle.set_provider(url).expect("set provider");
    SigningEngine::new(key(), handle)
}

pub fn goerli(url: &str) -> ChainConfig {
    ChainConfig {
        chain_id: 5,
        chain_name: "Goerli".to_owned(),
        rpc_urls: vec![url.to_owned()],
        block_explorer_urls: vec![],
        native_currency: NativeCurrency {
            symbol: "ETH".to_owned(),
            decimals: 18,
        },
        is_custom: false,
    }
}
