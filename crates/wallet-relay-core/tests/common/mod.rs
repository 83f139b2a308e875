#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use alloy::primitives::{Address, Bytes, B256};
use serde_json::{json, Value};

use wallet_relay_core::{
    ActivityPort, AppMode, AssetContract, AssetIntrospectionPort, ChainConfig, ChainRegistry,
    ClockPort, Dispatcher, HostPort, NativeCurrency, Nft, NftType, PermissionGate, PortError,
    ReplyPort, Request, RequestId, RpcReply, RuntimeContext, SigningPort, StoragePort, TransactionParams,
    WatchAssetOptions, WatchContext,
};

pub const NO_WALLET: &str = "No Wallet found for the provided address";

pub fn wallet_address() -> Address {
    "0x1000000000000000000000000000000000000001"
        .parse()
        .expect("valid wallet address")
}

pub fn chain(chain_id: u64, name: &str, url: &str) -> ChainConfig {
    ChainConfig {
        chain_id,
        chain_name: name.to_owned(),
        rpc_urls: vec![url.to_owned()],
        block_explorer_urls: vec![],
        native_currency: NativeCurrency {
            symbol: "ETH".to_owned(),
            decimals: 18,
        },
        is_custom: false,
    }
}

pub fn default_registry() -> ChainRegistry {
    ChainRegistry::new(
        vec![
            chain(1, "Ethereum Mainnet", "https://eth.rpc.example"),
            chain(5, "Goerli", "https://goerli.rpc.example"),
        ],
        Some(1),
    )
    .expect("registry")
}

#[derive(Debug, Default)]
pub struct MockSigner {
    pub address: Address,
    pub calls: Mutex<Vec<String>>,
    pub rpc_configs: Mutex<Vec<ChainConfig>>,
    pub reject_rpc_config: AtomicBool,
}

impl MockSigner {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn rpc_configs(&self) -> Vec<ChainConfig> {
        self.rpc_configs.lock().expect("config lock").clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().expect("calls lock").push(call.to_owned());
    }

    fn check(&self, address: &str) -> Result<(), PortError> {
        if address.eq_ignore_ascii_case(&self.address.to_string()) {
            Ok(())
        } else {
            Err(PortError::Access(NO_WALLET.to_owned()))
        }
    }
}

impl SigningPort for MockSigner {
    fn accounts(&self) -> Vec<Address> {
        vec![self.address]
    }

    async fn chain_id(&self) -> Result<u64, PortError> {
        self.record("chain_id");
        Ok(1)
    }

    async fn sign(&self, address: &str, _message_hash: &str) -> Result<Bytes, PortError> {
        self.check(address)?;
        self.record("sign");
        Ok(Bytes::from(vec![0x11; 65]))
    }

    async fn personal_sign(&self, address: &str, _message: &str) -> Result<Bytes, PortError> {
        self.check(address)?;
        self.record("personal_sign");
        Ok(Bytes::from(vec![0x22; 65]))
    }

    async fn sign_typed_data(&self, address: &str, _typed_data: &str) -> Result<Bytes, PortError> {
        self.check(address)?;
        self.record("sign_typed_data");
        Ok(Bytes::from(vec![0x33; 65]))
    }

    async fn encryption_public_key(&self, address: &str) -> Result<String, PortError> {
        self.check(address)?;
        self.record("encryption_public_key");
        Ok("02aa".to_owned())
    }

    async fn decrypt(&self, _ciphertext: &str, address: &str) -> Result<String, PortError> {
        self.check(address)?;
        self.record("decrypt");
        Ok("plaintext".to_owned())
    }

    async fn sign_transaction(
        &self,
        _tx: &TransactionParams,
        address: &str,
    ) -> Result<Bytes, PortError> {
        self.check(address)?;
        self.record("sign_transaction");
        Ok(Bytes::from(vec![0x02, 0xf8]))
    }

    async fn send_transaction(
        &self,
        tx: &TransactionParams,
        address: &str,
    ) -> Result<B256, PortError> {
        self.check(address)?;
        self.record(&format!("send_transaction gas_limit={:?}", tx.gas_limit));
        Ok(B256::repeat_byte(0xab))
    }

    async fn forward(&self, method: &str, _params: &Value) -> Result<Value, PortError> {
        self.record(&format!("forward {method}"));
        if method == "eth_failing" {
            return Err(PortError::Rpc {
                code: -32000,
                message: "execution reverted".to_owned(),
                data: None,
            });
        }
        Ok(json!("0x0"))
    }

    fn set_rpc_config(&self, config: &ChainConfig) -> Result<(), PortError> {
        if self.reject_rpc_config.load(Ordering::SeqCst) {
            return Err(PortError::Transport("endpoint unavailable".to_owned()));
        }
        self.rpc_configs
            .lock()
            .expect("config lock")
            .push(config.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub replies: Mutex<Vec<(String, RpcReply)>>,
}

impl RecordingTransport {
    pub fn replies(&self) -> Vec<(String, RpcReply)> {
        self.replies.lock().expect("reply lock").clone()
    }

    pub fn reply_for(&self, id: u64) -> RpcReply {
        self.replies()
            .into_iter()
            .map(|(_, reply)| reply)
            .find(|reply| reply.id == RequestId::from(id))
            .expect("reply for id")
    }
}

impl ReplyPort for RecordingTransport {
    fn reply(&self, method: &str, reply: RpcReply) -> Result<(), PortError> {
        self.replies
            .lock()
            .expect("reply lock")
            .push((method.to_owned(), reply));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    PendingCount(usize),
    OpenPopup,
    ClosePopup,
}

#[derive(Debug, Default)]
pub struct RecordingHost {
    pub events: Mutex<Vec<HostEvent>>,
}

impl RecordingHost {
    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().expect("host lock").clone()
    }

    fn push(&self, event: HostEvent) -> Result<(), PortError> {
        self.events.lock().expect("host lock").push(event);
        Ok(())
    }
}

impl HostPort for RecordingHost {
    fn send_pending_request_count(&self, count: usize) -> Result<(), PortError> {
        self.push(HostEvent::PendingCount(count))
    }

    fn open_popup(&self) -> Result<(), PortError> {
        self.push(HostEvent::OpenPopup)
    }

    fn close_popup(&self) -> Result<(), PortError> {
        self.push(HostEvent::ClosePopup)
    }
}

/// Resolves any address; `options.name` doubles as the NFT collection name.
#[derive(Debug, Default)]
pub struct StaticAssets;

impl AssetIntrospectionPort for StaticAssets {
    async fn resolve_token(
        &self,
        _ctx: &WatchContext,
        options: &WatchAssetOptions,
    ) -> Result<AssetContract, PortError> {
        let address = options
            .address
            .parse()
            .map_err(|_| PortError::Validation("invalid contract address".to_owned()))?;
        Ok(AssetContract {
            address,
            symbol: options.symbol.clone().unwrap_or_else(|| "TKN".to_owned()),
            decimals: options.decimals.unwrap_or(18),
            name: options.name.clone(),
            logo: options.image.clone(),
        })
    }

    async fn resolve_nft(
        &self,
        _ctx: &WatchContext,
        nft_type: NftType,
        options: &WatchAssetOptions,
    ) -> Result<Nft, PortError> {
        let address = options
            .address
            .parse()
            .map_err(|_| PortError::Validation("invalid contract address".to_owned()))?;
        let token_id = match options.token_id.as_ref() {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(PortError::Validation("token id required".to_owned())),
        };
        Ok(Nft {
            address,
            token_id,
            collection_name: options.name.clone().unwrap_or_default(),
            name: None,
            image_url: options.image.clone(),
            nft_type,
        })
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    pub items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn json(&self, key: &str) -> Option<Value> {
        self.items
            .lock()
            .expect("storage lock")
            .get(key)
            .map(|raw| serde_json::from_str(raw).expect("stored json"))
    }
}

impl StoragePort for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, PortError> {
        Ok(self.items.lock().expect("storage lock").get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), PortError> {
        self.items
            .lock()
            .expect("storage lock")
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActivityRecord {
    Transaction(u64, B256),
    File(u64, Value, Option<String>),
}

#[derive(Debug, Default)]
pub struct RecordingActivity {
    pub records: Mutex<Vec<ActivityRecord>>,
}

impl RecordingActivity {
    pub fn records(&self) -> Vec<ActivityRecord> {
        self.records.lock().expect("activity lock").clone()
    }
}

impl ActivityPort for RecordingActivity {
    fn record_transaction(&self, chain_id: u64, tx_hash: B256) -> Result<(), PortError> {
        self.records
            .lock()
            .expect("activity lock")
            .push(ActivityRecord::Transaction(chain_id, tx_hash));
        Ok(())
    }

    fn record_file_activity(
        &self,
        chain_id: u64,
        message: &Value,
        verifying_contract: Option<&str>,
    ) -> Result<(), PortError> {
        self.records
            .lock()
            .expect("activity lock")
            .push(ActivityRecord::File(
                chain_id,
                message.clone(),
                verifying_contract.map(str::to_owned),
            ));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct TestClock {
    now: AtomicU64,
}

impl ClockPort for TestClock {
    fn now_ms(&self) -> Result<u64, PortError> {
        Ok(self.now.fetch_add(1, Ordering::SeqCst) + 1_739_750_400_000)
    }
}

pub type TestDispatcher = Dispatcher<
    MockSigner,
    RecordingTransport,
    RecordingHost,
    StaticAssets,
    MemoryStorage,
    RecordingActivity,
    TestClock,
>;

pub fn new_dispatcher(mode: AppMode, registry: ChainRegistry) -> TestDispatcher {
    Dispatcher::new(
        RuntimeContext::new(
            registry,
            MockSigner::new(wallet_address()),
            PermissionGate::new(mode),
        ),
        RecordingTransport::default(),
        RecordingHost::default(),
        StaticAssets,
        MemoryStorage::default(),
        RecordingActivity::default(),
        TestClock::default(),
    )
}

pub fn request(id: u64, method: &str, params: Value) -> Request {
    Request::new(id, method, params)
}

/// Executes everything currently ready, in FIFO order.
pub async fn drain_ready(dispatcher: &TestDispatcher) {
    while let Some(ready) = dispatcher.queue.try_next_ready() {
        dispatcher.process(ready).await;
    }
}

pub fn error_text(reply: &RpcReply) -> String {
    reply
        .error
        .as_ref()
        .map(ToString::to_string)
        .expect("reply carries an error")
}
