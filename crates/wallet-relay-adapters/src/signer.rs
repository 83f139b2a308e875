//! The key-holding signing engine.
//!
//! Every keyed operation checks the caller-supplied address against the held
//! key before doing anything else, network calls included.

use std::fmt;

use alloy::dyn_abi::TypedData;
use alloy::eips::eip2718::Encodable2718;
use alloy::hex;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use k256::{PublicKey, SecretKey};
use serde_json::{json, Value};
use zeroize::Zeroizing;

use wallet_relay_core::{ChainConfig, PortError, SigningPort, TransactionParams};

use crate::crypto::{decrypt_envelope, public_key_hex, EncryptedEnvelope};
use crate::endpoint::{EndpointFactory, EndpointHandle};
use crate::tx::fill_from_endpoint;

pub const NO_WALLET_FOR_ADDRESS: &str = "No Wallet found for the provided address";

pub struct KeyMaterial {
    address: Address,
    public_key: PublicKey,
    secret: SecretKey,
    signer: PrivateKeySigner,
}

impl KeyMaterial {
    /// Parses a 32-byte private key given as hex, with or without `0x`.
    pub fn from_hex(raw: &str) -> Result<Self, PortError> {
        let bytes = Zeroizing::new(
            hex::decode(raw.trim())
                .map_err(|_| PortError::Validation("private key is not valid hex".to_owned()))?,
        );
        if bytes.len() != 32 {
            return Err(PortError::Validation(
                "private key must be 32 bytes".to_owned(),
            ));
        }
        let secret = SecretKey::from_slice(&bytes)
            .map_err(|_| PortError::Validation("private key out of range".to_owned()))?;
        let signer = PrivateKeySigner::from_slice(&bytes)
            .map_err(|_| PortError::Validation("private key out of range".to_owned()))?;
        Ok(Self {
            address: signer.address(),
            public_key: secret.public_key(),
            secret,
            signer,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Uncompressed SEC1 public key, `0x04…`.
    pub fn public_key_hex(&self) -> String {
        public_key_hex(&self.public_key)
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    fn owns(&self, address: &str) -> bool {
        address
            .trim()
            .eq_ignore_ascii_case(&self.address.to_string())
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("address", &self.address)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

pub struct SigningEngine<F: EndpointFactory> {
    key: KeyMaterial,
    endpoint: EndpointHandle<F>,
}

impl<F: EndpointFactory> SigningEngine<F> {
    pub fn new(key: KeyMaterial, endpoint: EndpointHandle<F>) -> Self {
        Self { key, endpoint }
    }

    pub fn address(&self) -> Address {
        self.key.address()
    }

    pub fn endpoint(&self) -> &EndpointHandle<F> {
        &self.endpoint
    }

    pub fn set_provider(&self, url: &str) -> Result<(), PortError> {
        self.endpoint.set_provider(url)
    }

    fn resolve(&self, address: &str) -> Result<&KeyMaterial, PortError> {
        if self.key.owns(address) {
            Ok(&self.key)
        } else {
            Err(PortError::Access(NO_WALLET_FOR_ADDRESS.to_owned()))
        }
    }

    async fn build_signed(&self, tx: &TransactionParams, address: &str) -> Result<Bytes, PortError> {
        let key = self.resolve(address)?;
        let request = fill_from_endpoint(&self.endpoint, tx, key.address()).await?;
        let wallet = EthereumWallet::from(key.signer.clone());
        let envelope = request
            .build(&wallet)
            .await
            .map_err(|e| PortError::Validation(format!("failed to sign transaction: {e}")))?;
        Ok(Bytes::from(envelope.encoded_2718()))
    }
}

/// `0x` hex is decoded, anything else is taken as UTF-8 text.
fn message_bytes(message: &str) -> Vec<u8> {
    match message.strip_prefix("0x") {
        Some(body) => hex::decode(body).unwrap_or_else(|_| message.as_bytes().to_vec()),
        None => message.as_bytes().to_vec(),
    }
}

/// Left-pads to 32 bytes; longer input keeps its trailing 32 bytes.
fn digest_32(raw: &[u8]) -> B256 {
    let mut out = [0u8; 32];
    if raw.len() >= 32 {
        out.copy_from_slice(&raw[raw.len() - 32..]);
    } else {
        out[32 - raw.len()..].copy_from_slice(raw);
    }
    B256::from(out)
}

fn signature_bytes(signature: alloy::primitives::Signature) -> Bytes {
    Bytes::from(signature.as_bytes().to_vec())
}

impl<F: EndpointFactory> SigningPort for SigningEngine<F> {
    fn accounts(&self) -> Vec<Address> {
        vec![self.key.address()]
    }

    async fn chain_id(&self) -> Result<u64, PortError> {
        self.endpoint.chain_id().await
    }

    async fn sign(&self, address: &str, message_hash: &str) -> Result<Bytes, PortError> {
        let key = self.resolve(address)?;
        let stripped = message_hash.strip_prefix("0x").unwrap_or(message_hash);
        let raw = hex::decode(stripped)
            .map_err(|e| PortError::Validation(format!("message hash is not hex: {e}")))?;
        let signature = key
            .signer
            .sign_hash_sync(&digest_32(&raw))
            .map_err(|e| PortError::Validation(format!("eth_sign failed: {e}")))?;
        Ok(signature_bytes(signature))
    }

    async fn personal_sign(&self, address: &str, message: &str) -> Result<Bytes, PortError> {
        let key = self.resolve(address)?;
        let signature = key
            .signer
            .sign_message_sync(&message_bytes(message))
            .map_err(|e| PortError::Validation(format!("personal_sign failed: {e}")))?;
        Ok(signature_bytes(signature))
    }

    async fn sign_typed_data(&self, address: &str, typed_data: &str) -> Result<Bytes, PortError> {
        let key = self.resolve(address)?;
        let parsed: TypedData = serde_json::from_str(typed_data)
            .map_err(|e| PortError::Validation(format!("invalid typed data: {e}")))?;
        let hash = parsed
            .eip712_signing_hash()
            .map_err(|e| PortError::Validation(format!("typed data hash failed: {e}")))?;
        let signature = key
            .signer
            .sign_hash_sync(&hash)
            .map_err(|e| PortError::Validation(format!("typed data signing failed: {e}")))?;
        Ok(signature_bytes(signature))
    }

    async fn encryption_public_key(&self, address: &str) -> Result<String, PortError> {
        Ok(self.resolve(address)?.public_key_hex())
    }

    async fn decrypt(&self, ciphertext: &str, address: &str) -> Result<String, PortError> {
        let key = self.resolve(address)?;
        let envelope = EncryptedEnvelope::parse(ciphertext)?;
        let plain = decrypt_envelope(&key.secret, &envelope)?;
        String::from_utf8(plain)
            .map_err(|e| PortError::Validation(format!("decrypted payload is not utf-8: {e}")))
    }

    async fn sign_transaction(
        &self,
        tx: &TransactionParams,
        address: &str,
    ) -> Result<Bytes, PortError> {
        self.build_signed(tx, address).await
    }

    async fn send_transaction(
        &self,
        tx: &TransactionParams,
        address: &str,
    ) -> Result<B256, PortError> {
        let raw = self.build_signed(tx, address).await?;
        let result = self
            .endpoint
            .request("eth_sendRawTransaction", json!([raw]))
            .await?;
        let hash = result.as_str().ok_or_else(|| {
            PortError::Transport("eth_sendRawTransaction result must be string".to_owned())
        })?;
        let hash: B256 = hash
            .parse()
            .map_err(|e| PortError::Transport(format!("invalid transaction hash: {e}")))?;
        tracing::info!(%hash, "transaction broadcast");
        Ok(hash)
    }

    async fn forward(&self, method: &str, params: &Value) -> Result<Value, PortError> {
        self.endpoint.request(method, params.clone()).await
    }

    fn set_rpc_config(&self, config: &ChainConfig) -> Result<(), PortError> {
        self.endpoint.set_rpc_config(config)
    }
}
