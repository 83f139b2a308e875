//! Parameter checks run before any registry or engine mutation.
//!
//! Each validator returns the checked value on success so execution never
//! re-reads untyped params.

use serde_json::Value;
use url::Url;

use crate::chain_registry::ChainRegistry;
use crate::domain::{
    AssetContract, ChainConfig, NativeCurrency, Nft, NftType, DEFAULT_NATIVE_DECIMALS,
};
use crate::error::DispatchError;
use crate::params::{
    is_truthy, parse_chain_id, AddChainParams, SwitchChainParams, TypedDataEnvelope,
    WatchAssetOptions,
};
use crate::ports::{AssetIntrospectionPort, PortError, WatchContext};
use crate::reply::{codes, ReplyError};

pub const REQUIRED_PARAMS_MISSING: &str = "required params missing";

pub fn validate_switch_chain_params(
    params: &SwitchChainParams,
    registry: &ChainRegistry,
) -> Result<u64, DispatchError> {
    let raw = match params.chain_id.as_ref() {
        Some(v) if is_truthy(v) => v,
        _ => return Err(ReplyError::message("Please provide chain id").into()),
    };
    match parse_chain_id(raw) {
        Ok(chain_id) if registry.contains(chain_id) => Ok(chain_id),
        _ => Err(ReplyError::rpc(
            codes::UNRECOGNIZED_CHAIN,
            format!("Chain Id {} is not in the list", display_value(raw)),
        )
        .into()),
    }
}

/// Returns the config a new chain would be registered with. For an id that
/// is already known only its rpc urls are used, as a merge.
pub fn validate_add_network_params(
    params: &AddChainParams,
    registry: &ChainRegistry,
) -> Result<ChainConfig, DispatchError> {
    let symbol = params
        .native_currency
        .as_ref()
        .map(|c| c.symbol.as_str())
        .unwrap_or_default();
    let primary = params.rpc_urls.first().map(String::as_str).unwrap_or_default();
    let chain_id_present = params.chain_id.as_ref().is_some_and(is_truthy);

    if params.chain_name.is_empty() || primary.is_empty() || !chain_id_present || symbol.is_empty()
    {
        return Err(DispatchError::invalid_params(REQUIRED_PARAMS_MISSING));
    }
    if let Some(bad) = params
        .rpc_urls
        .iter()
        .find(|u| !u.is_empty() && !is_http_url(u))
    {
        return Err(DispatchError::invalid_params(format!("Invalid RPC URL - {bad}")));
    }
    if registry.has_rpc_url(primary) {
        return Err(DispatchError::invalid_params(format!(
            "RPC URL - {primary} already exists, please use different one"
        )));
    }

    let raw_id = params.chain_id.as_ref().unwrap_or(&Value::Null);
    let chain_id = parse_chain_id(raw_id).map_err(DispatchError::invalid_params)?;
    let decimals = params
        .native_currency
        .as_ref()
        .and_then(|c| c.decimals)
        .filter(|d| *d != 0)
        .unwrap_or(DEFAULT_NATIVE_DECIMALS);

    Ok(ChainConfig {
        chain_id,
        chain_name: params.chain_name.clone(),
        rpc_urls: params.rpc_urls.clone(),
        block_explorer_urls: params.block_explorer_urls.clone(),
        native_currency: NativeCurrency {
            symbol: symbol.to_owned(),
            decimals,
        },
        is_custom: true,
    })
}

/// Absolute `http`/`https` url with a host.
pub fn is_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
}

pub fn validate_typed_data_domain(
    envelope: &TypedDataEnvelope,
    selected_chain_id: Option<u64>,
) -> Result<(), DispatchError> {
    let raw = envelope
        .domain
        .as_ref()
        .and_then(|d| d.chain_id.as_ref())
        .filter(|v| is_truthy(v))
        .ok_or_else(|| DispatchError::invalid_params(REQUIRED_PARAMS_MISSING))?;
    let selected = selected_chain_id
        .ok_or_else(|| DispatchError::Protocol("no chain selected".to_owned()))?;

    match parse_chain_id(raw) {
        Ok(domain_chain_id) if domain_chain_id == selected => Ok(()),
        _ => Err(DispatchError::Protocol(format!(
            "domain chain ID {} does not match network chain id {selected}",
            display_value(raw)
        ))),
    }
}

/// Unsupported asset types are reported with the type string as received.
pub fn unsupported_asset(asset_type: &str) -> DispatchError {
    ReplyError::message(format!("Asset of type '{asset_type}' not supported")).into()
}

pub async fn validate_add_token_params<A: AssetIntrospectionPort>(
    introspection: &A,
    ctx: &WatchContext,
    options: &WatchAssetOptions,
) -> Result<AssetContract, DispatchError> {
    introspection
        .resolve_token(ctx, options)
        .await
        .map_err(introspection_error)
}

pub async fn validate_add_nft_params<A: AssetIntrospectionPort>(
    introspection: &A,
    ctx: &WatchContext,
    nft_type: NftType,
    options: &WatchAssetOptions,
) -> Result<Nft, DispatchError> {
    introspection
        .resolve_nft(ctx, nft_type, options)
        .await
        .map_err(introspection_error)
}

fn introspection_error(err: PortError) -> DispatchError {
    let message = match err {
        PortError::Validation(m)
        | PortError::NotFound(m)
        | PortError::Access(m)
        | PortError::Conflict(m)
        | PortError::Transport(m) => m,
        PortError::Rpc { message, .. } => message,
        other @ PortError::NotImplemented(_) => other.to_string(),
    };
    DispatchError::invalid_params(message)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
