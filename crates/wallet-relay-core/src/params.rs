//! Typed request parameters.
//!
//! Every inbound method call is parsed into [`RequestParams`] at ingest, and
//! again from the queued request when it executes; parsing is pure so both
//! passes agree. Shape errors become `invalid params` replies at ingest
//! instead of surfacing later as missing fields.

use alloy::eips::eip2930::AccessList;
use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::domain::NftType;
use crate::error::DispatchError;

pub mod methods {
    pub const ETH_ACCOUNTS: &str = "eth_accounts";
    pub const ETH_REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
    pub const ETH_CHAIN_ID: &str = "eth_chainId";
    pub const ETH_SIGN: &str = "eth_sign";
    pub const PERSONAL_SIGN: &str = "personal_sign";
    pub const ETH_SIGN_TYPED_DATA_V4: &str = "eth_signTypedData_v4";
    pub const ETH_GET_ENCRYPTION_PUBLIC_KEY: &str = "eth_getEncryptionPublicKey";
    pub const ETH_DECRYPT: &str = "eth_decrypt";
    pub const ETH_SEND_TRANSACTION: &str = "eth_sendTransaction";
    pub const ETH_SIGN_TRANSACTION: &str = "eth_signTransaction";
    pub const WALLET_SWITCH_ETHEREUM_CHAIN: &str = "wallet_switchEthereumChain";
    pub const WALLET_ADD_ETHEREUM_CHAIN: &str = "wallet_addEthereumChain";
    pub const WALLET_WATCH_ASSET: &str = "wallet_watchAsset";
}

/// Fields a transaction object may carry into signing. Anything else is
/// dropped before deserialization.
pub const ALLOWED_TRANSACTION_FIELDS: [&str; 14] = [
    "to",
    "from",
    "nonce",
    "gasLimit",
    "gasPrice",
    "data",
    "value",
    "chainId",
    "type",
    "accessList",
    "maxPriorityFeePerGas",
    "maxFeePerGas",
    "customData",
    "ccipReadEnabled",
];

#[derive(Debug, Clone, PartialEq)]
pub enum RequestParams {
    Accounts,
    ChainId,
    EthSign {
        address: String,
        message_hash: String,
    },
    PersonalSign {
        message: String,
        address: String,
    },
    SignTypedDataV4 {
        address: String,
        typed_data: String,
        envelope: TypedDataEnvelope,
    },
    EncryptionPublicKey {
        address: String,
    },
    Decrypt {
        ciphertext: String,
        address: String,
    },
    SendTransaction(TransactionParams),
    SignTransaction(TransactionParams),
    SwitchChain(SwitchChainParams),
    AddChain(AddChainParams),
    WatchAsset(WatchAssetParams),
    Passthrough {
        method: String,
        params: Value,
    },
}

impl RequestParams {
    pub fn parse(method: &str, params: &Value) -> Result<Self, DispatchError> {
        match method {
            methods::ETH_ACCOUNTS | methods::ETH_REQUEST_ACCOUNTS => Ok(Self::Accounts),
            methods::ETH_CHAIN_ID => Ok(Self::ChainId),
            methods::ETH_SIGN => Ok(Self::EthSign {
                address: string_at(params, 0, "address")?,
                message_hash: string_at(params, 1, "message")?,
            }),
            methods::PERSONAL_SIGN => Ok(Self::PersonalSign {
                message: string_at(params, 0, "message")?,
                address: string_at(params, 1, "address")?,
            }),
            methods::ETH_SIGN_TYPED_DATA_V4 => {
                let address = string_at(params, 0, "address")?;
                let typed_data = match param_at(params, 1) {
                    Some(Value::String(raw)) => raw.clone(),
                    Some(obj @ Value::Object(_)) => obj.to_string(),
                    _ => return Err(DispatchError::invalid_params("required params missing")),
                };
                let envelope = TypedDataEnvelope::parse(&typed_data)?;
                Ok(Self::SignTypedDataV4 {
                    address,
                    typed_data,
                    envelope,
                })
            }
            methods::ETH_GET_ENCRYPTION_PUBLIC_KEY => Ok(Self::EncryptionPublicKey {
                address: string_at(params, 0, "address")?,
            }),
            methods::ETH_DECRYPT => Ok(Self::Decrypt {
                ciphertext: string_at(params, 0, "ciphertext")?,
                address: string_at(params, 1, "address")?,
            }),
            methods::ETH_SEND_TRANSACTION => Ok(Self::SendTransaction(
                TransactionParams::from_request_value(first_object(params)?)?,
            )),
            methods::ETH_SIGN_TRANSACTION => Ok(Self::SignTransaction(
                TransactionParams::from_request_value(first_object(params)?)?,
            )),
            methods::WALLET_SWITCH_ETHEREUM_CHAIN => {
                Ok(Self::SwitchChain(from_object(first_object(params)?)?))
            }
            methods::WALLET_ADD_ETHEREUM_CHAIN => {
                Ok(Self::AddChain(from_object(first_object(params)?)?))
            }
            methods::WALLET_WATCH_ASSET => {
                Ok(Self::WatchAsset(from_object(first_object(params)?)?))
            }
            other => Ok(Self::Passthrough {
                method: other.to_owned(),
                params: params.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataDomain {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub chain_id: Option<Value>,
    #[serde(default)]
    pub verifying_contract: Option<String>,
}

/// The parts of an EIP-712 payload the dispatcher looks at before signing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypedDataEnvelope {
    #[serde(default)]
    pub domain: Option<TypedDataDomain>,
    #[serde(default)]
    pub message: Value,
}

impl TypedDataEnvelope {
    pub fn parse(raw: &str) -> Result<Self, DispatchError> {
        serde_json::from_str(raw)
            .map_err(|e| DispatchError::invalid_params(format!("invalid typed data: {e}")))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchChainParams {
    #[serde(default)]
    pub chain_id: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeCurrencyParams {
    #[serde(default, deserialize_with = "null_as_default")]
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "quantity::opt_u8")]
    pub decimals: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    #[serde(default)]
    pub chain_id: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub chain_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rpc_urls: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub block_explorer_urls: Vec<String>,
    #[serde(default)]
    pub native_currency: Option<NativeCurrencyParams>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetKind {
    Erc20,
    Nft(NftType),
    Unsupported(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchAssetOptions {
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "quantity::opt_u8")]
    pub decimals: Option<u8>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub token_id: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchAssetParams {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub asset_type: String,
    #[serde(default)]
    pub options: WatchAssetOptions,
}

impl WatchAssetParams {
    pub fn kind(&self) -> AssetKind {
        match self.asset_type.to_ascii_lowercase().as_str() {
            "erc20" => AssetKind::Erc20,
            "erc721" => AssetKind::Nft(NftType::Erc721),
            "erc1155" => AssetKind::Nft(NftType::Erc1155),
            _ => AssetKind::Unsupported(self.asset_type.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionParams {
    #[serde(
        default,
        deserialize_with = "opt_address",
        skip_serializing_if = "Option::is_none"
    )]
    pub to: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(
        default,
        deserialize_with = "quantity::opt_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub nonce: Option<u64>,
    #[serde(
        default,
        deserialize_with = "quantity::opt_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub gas_limit: Option<u64>,
    #[serde(
        default,
        deserialize_with = "quantity::opt_u128",
        skip_serializing_if = "Option::is_none"
    )]
    pub gas_price: Option<u128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    #[serde(
        default,
        deserialize_with = "quantity::opt_u256",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<U256>,
    #[serde(
        default,
        deserialize_with = "quantity::opt_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub chain_id: Option<u64>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "quantity::opt_u8",
        skip_serializing_if = "Option::is_none"
    )]
    pub tx_type: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_list: Option<AccessList>,
    #[serde(
        default,
        deserialize_with = "quantity::opt_u128",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_priority_fee_per_gas: Option<u128>,
    #[serde(
        default,
        deserialize_with = "quantity::opt_u128",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_fee_per_gas: Option<u128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ccip_read_enabled: Option<bool>,
}

impl TransactionParams {
    /// Renames a legacy `gas` field, drops fields outside the allow-list and
    /// parses the rest.
    pub fn from_request_value(value: &Value) -> Result<Self, DispatchError> {
        let obj = value
            .as_object()
            .ok_or_else(|| DispatchError::invalid_params("transaction params must be an object"))?;
        let filtered: Map<String, Value> = normalize_legacy_gas(obj.clone())
            .into_iter()
            .filter(|(key, _)| ALLOWED_TRANSACTION_FIELDS.contains(&key.as_str()))
            .collect();
        serde_json::from_value(Value::Object(filtered))
            .map_err(|e| DispatchError::invalid_params(format!("invalid transaction params: {e}")))
    }

    pub fn uses_dynamic_fees(&self) -> bool {
        self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some()
    }
}

/// `gasLimit = gas || gasLimit`, with `gas` removed.
pub fn normalize_legacy_gas(mut tx: Map<String, Value>) -> Map<String, Value> {
    if let Some(gas) = tx.remove("gas") {
        if is_truthy(&gas) {
            tx.insert("gasLimit".to_owned(), gas);
        }
    }
    tx
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Accepts `0x`-prefixed hex, decimal strings and JSON numbers.
pub fn parse_chain_id(value: &Value) -> Result<u64, String> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    let s = value
        .as_str()
        .ok_or_else(|| "chain id must be string or number".to_owned())?;
    parse_chain_id_str(s)
}

pub fn parse_chain_id_str(raw: &str) -> Result<u64, String> {
    let raw = raw.trim();
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(|e| format!("invalid hex chain id: {e}"))
    } else {
        raw.parse()
            .map_err(|e| format!("invalid chain id: {e}"))
    }
}

fn param_at(params: &Value, index: usize) -> Option<&Value> {
    params.as_array().and_then(|items| items.get(index))
}

fn string_at(params: &Value, index: usize, name: &str) -> Result<String, DispatchError> {
    param_at(params, index)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| DispatchError::invalid_params(format!("missing {name} at params[{index}]")))
}

fn first_object(params: &Value) -> Result<&Value, DispatchError> {
    let candidate = match params {
        Value::Array(items) => items.first(),
        obj @ Value::Object(_) => Some(obj),
        _ => None,
    };
    candidate
        .filter(|v| v.is_object())
        .ok_or_else(|| DispatchError::invalid_params("required params missing"))
}

fn from_object<T: for<'de> Deserialize<'de>>(value: &Value) -> Result<T, DispatchError> {
    serde_json::from_value(value.clone())
        .map_err(|e| DispatchError::invalid_params(format!("invalid params: {e}")))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn opt_address<'de, D>(deserializer: D) -> Result<Option<Address>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.is_empty() => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Numeric fields arrive as JSON numbers, hex quantities or decimal strings.
pub mod quantity {
    use alloy::primitives::U256;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn parse(value: &Value) -> Result<U256, String> {
        match value {
            Value::Number(n) => n
                .as_u64()
                .map(U256::from)
                .ok_or_else(|| format!("quantity must be a non-negative integer: {n}")),
            Value::String(s) => parse_str(s),
            other => Err(format!("quantity must be a number or string, got {other}")),
        }
    }

    pub fn parse_str(raw: &str) -> Result<U256, String> {
        let raw = raw.trim();
        if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            if hex.is_empty() {
                return Ok(U256::ZERO);
            }
            U256::from_str_radix(hex, 16).map_err(|e| format!("invalid hex quantity {raw}: {e}"))
        } else {
            U256::from_str_radix(raw, 10).map_err(|e| format!("invalid quantity {raw}: {e}"))
        }
    }

    fn opt<'de, D>(deserializer: D) -> Result<Option<U256>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(v) => parse(&v).map(Some).map_err(serde::de::Error::custom),
        }
    }

    pub fn opt_u256<'de, D>(deserializer: D) -> Result<Option<U256>, D::Error>
    where
        D: Deserializer<'de>,
    {
        opt(deserializer)
    }

    pub fn opt_u128<'de, D>(deserializer: D) -> Result<Option<u128>, D::Error>
    where
        D: Deserializer<'de>,
    {
        opt(deserializer)?
            .map(|q| u128::try_from(q).map_err(|_| serde::de::Error::custom("quantity overflows u128")))
            .transpose()
    }

    pub fn opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        opt(deserializer)?
            .map(|q| u64::try_from(q).map_err(|_| serde::de::Error::custom("quantity overflows u64")))
            .transpose()
    }

    pub fn opt_u8<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        opt(deserializer)?
            .map(|q| u8::try_from(q).map_err(|_| serde::de::Error::custom("quantity overflows u8")))
            .transpose()
    }
}
