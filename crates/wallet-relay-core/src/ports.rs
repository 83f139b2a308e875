use alloy::primitives::{Address, Bytes, B256};
use serde_json::Value;
use thiserror::Error;

use crate::domain::{AssetContract, ChainConfig, Nft, NftType};
use crate::params::{TransactionParams, WatchAssetOptions};
use crate::reply::RpcReply;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PortError {
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("{0}")]
    Access(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("rpc error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },
}

/// Key-holding side of the wallet. Addresses are passed as received so the
/// implementation can apply its own (case-insensitive) ownership check.
#[allow(async_fn_in_trait)]
pub trait SigningPort {
    fn accounts(&self) -> Vec<Address>;
    async fn chain_id(&self) -> Result<u64, PortError>;
    async fn sign(&self, address: &str, message_hash: &str) -> Result<Bytes, PortError>;
    async fn personal_sign(&self, address: &str, message: &str) -> Result<Bytes, PortError>;
    async fn sign_typed_data(&self, address: &str, typed_data: &str) -> Result<Bytes, PortError>;
    async fn encryption_public_key(&self, address: &str) -> Result<String, PortError>;
    async fn decrypt(&self, ciphertext: &str, address: &str) -> Result<String, PortError>;
    async fn sign_transaction(
        &self,
        tx: &TransactionParams,
        address: &str,
    ) -> Result<Bytes, PortError>;
    async fn send_transaction(
        &self,
        tx: &TransactionParams,
        address: &str,
    ) -> Result<B256, PortError>;
    async fn forward(&self, method: &str, params: &Value) -> Result<Value, PortError>;
    fn set_rpc_config(&self, config: &ChainConfig) -> Result<(), PortError>;
}

pub trait ReplyPort {
    fn reply(&self, method: &str, reply: RpcReply) -> Result<(), PortError>;
}

/// Side channel to the embedding page. Calls are fire-and-forget.
pub trait HostPort {
    fn send_pending_request_count(&self, count: usize) -> Result<(), PortError>;
    fn open_popup(&self) -> Result<(), PortError>;
    fn close_popup(&self) -> Result<(), PortError>;
}

pub trait StoragePort {
    fn get_item(&self, key: &str) -> Result<Option<String>, PortError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), PortError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchContext {
    pub wallet_address: Address,
    pub chain_id: u64,
    pub is_ethereum_mainnet: bool,
}

/// On-chain lookups backing `wallet_watchAsset`.
#[allow(async_fn_in_trait)]
pub trait AssetIntrospectionPort {
    async fn resolve_token(
        &self,
        ctx: &WatchContext,
        options: &WatchAssetOptions,
    ) -> Result<AssetContract, PortError>;
    async fn resolve_nft(
        &self,
        ctx: &WatchContext,
        nft_type: NftType,
        options: &WatchAssetOptions,
    ) -> Result<Nft, PortError>;
}

pub trait ActivityPort {
    fn record_transaction(&self, chain_id: u64, tx_hash: B256) -> Result<(), PortError>;
    fn record_file_activity(
        &self,
        chain_id: u64,
        message: &Value,
        verifying_contract: Option<&str>,
    ) -> Result<(), PortError>;
}

pub trait ClockPort {
    fn now_ms(&self) -> Result<u64, PortError>;
}
