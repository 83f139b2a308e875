use std::cmp::Ordering;

use alloy::primitives::{Address, U256};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::{AssetContract, Nft};
use crate::ports::{PortError, StoragePort};

pub fn asset_contracts_key(wallet: &Address, chain_id: u64) -> String {
    format!("{wallet}/{chain_id}/asset-contracts")
}

pub fn nfts_key(wallet: &Address, chain_id: u64) -> String {
    format!("{wallet}/{chain_id}/nfts")
}

pub fn load_asset_contracts<S: StoragePort>(
    storage: &S,
    wallet: &Address,
    chain_id: u64,
) -> Result<Vec<AssetContract>, PortError> {
    load_array(storage, &asset_contracts_key(wallet, chain_id))
}

pub fn load_nfts<S: StoragePort>(
    storage: &S,
    wallet: &Address,
    chain_id: u64,
) -> Result<Vec<Nft>, PortError> {
    load_array(storage, &nfts_key(wallet, chain_id))
}

/// Appends without deduplication; a token watched twice is stored twice.
pub fn append_asset_contract<S: StoragePort>(
    storage: &S,
    wallet: &Address,
    chain_id: u64,
    contract: AssetContract,
) -> Result<usize, PortError> {
    let key = asset_contracts_key(wallet, chain_id);
    let mut contracts: Vec<AssetContract> = load_array(storage, &key)?;
    contracts.push(contract);
    store_array(storage, &key, &contracts)?;
    Ok(contracts.len())
}

/// Appends and re-sorts the stored NFT list. Duplicates are kept.
pub fn insert_nft<S: StoragePort>(
    storage: &S,
    wallet: &Address,
    chain_id: u64,
    nft: Nft,
) -> Result<usize, PortError> {
    let key = nfts_key(wallet, chain_id);
    let mut nfts: Vec<Nft> = load_array(storage, &key)?;
    nfts.push(nft);
    sort_nfts(&mut nfts);
    store_array(storage, &key, &nfts)?;
    Ok(nfts.len())
}

pub fn sort_nfts(nfts: &mut [Nft]) {
    nfts.sort_by(|a, b| {
        compare_token_ids(&a.token_id, &b.token_id)
            .then_with(|| a.collection_name.cmp(&b.collection_name))
    });
}

/// Numeric when both ids are decimal integers, lexicographic otherwise.
pub fn compare_token_ids(a: &str, b: &str) -> Ordering {
    match (U256::from_str_radix(a, 10), U256::from_str_radix(b, 10)) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

fn load_array<S: StoragePort, T: DeserializeOwned>(
    storage: &S,
    key: &str,
) -> Result<Vec<T>, PortError> {
    match storage.get_item(key)? {
        None => Ok(Vec::new()),
        Some(raw) if raw.trim().is_empty() => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| PortError::Validation(format!("corrupt stored list at {key}: {e}"))),
    }
}

fn store_array<S: StoragePort, T: Serialize>(
    storage: &S,
    key: &str,
    items: &[T],
) -> Result<(), PortError> {
    let raw = serde_json::to_string(items)
        .map_err(|e| PortError::Validation(format!("serialize list for {key}: {e}")))?;
    storage.set_item(key, &raw)
}
