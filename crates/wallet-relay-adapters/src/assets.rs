//! On-chain lookups behind `wallet_watchAsset`.

use alloy::dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy::hex;
use alloy::json_abi::Function;
use alloy::primitives::{Address, U256};
use serde_json::json;

use wallet_relay_core::params::quantity;
use wallet_relay_core::{
    AssetContract, AssetIntrospectionPort, Nft, NftType, PortError, WatchAssetOptions,
    WatchContext,
};

use crate::endpoint::{EndpointFactory, EndpointHandle};

const SYMBOL: &str = "function symbol() view returns (string)";
const NAME: &str = "function name() view returns (string)";
const DECIMALS: &str = "function decimals() view returns (uint8)";
const OWNER_OF: &str = "function ownerOf(uint256 tokenId) view returns (address)";
const BALANCE_OF_1155: &str =
    "function balanceOf(address account, uint256 id) view returns (uint256)";

pub struct ContractIntrospector<F: EndpointFactory> {
    endpoint: EndpointHandle<F>,
}

impl<F: EndpointFactory> ContractIntrospector<F> {
    pub fn new(endpoint: EndpointHandle<F>) -> Self {
        Self { endpoint }
    }

    async fn call(
        &self,
        contract: Address,
        signature: &str,
        args: &[DynSolValue],
    ) -> Result<DynSolValue, PortError> {
        let function = Function::parse(signature)
            .map_err(|e| PortError::Validation(format!("bad abi signature {signature}: {e}")))?;
        let data = function
            .abi_encode_input(args)
            .map_err(|e| PortError::Validation(format!("abi encoding failed: {e}")))?;
        let raw = self
            .endpoint
            .request(
                "eth_call",
                json!([{ "to": contract, "data": hex::encode_prefixed(data) }, "latest"]),
            )
            .await?;
        let text = raw
            .as_str()
            .ok_or_else(|| PortError::Transport("eth_call result must be string".to_owned()))?;
        let bytes = hex::decode(text)
            .map_err(|e| PortError::Transport(format!("eth_call result is not hex: {e}")))?;
        let mut outputs = function.abi_decode_output(&bytes).map_err(|e| {
            PortError::Validation(format!("{} returned undecodable data: {e}", function.name))
        })?;
        if outputs.is_empty() {
            return Err(PortError::Validation(format!(
                "{} returned no data",
                function.name
            )));
        }
        Ok(outputs.swap_remove(0))
    }

    async fn call_string(&self, contract: Address, signature: &str) -> Result<String, PortError> {
        match self.call(contract, signature, &[]).await? {
            DynSolValue::String(s) => Ok(s),
            other => Err(PortError::Validation(format!(
                "expected string, got {other:?}"
            ))),
        }
    }

    async fn call_uint(
        &self,
        contract: Address,
        signature: &str,
        args: &[DynSolValue],
    ) -> Result<U256, PortError> {
        self.call(contract, signature, args)
            .await?
            .as_uint()
            .map(|(value, _)| value)
            .ok_or_else(|| PortError::Validation("expected uint output".to_owned()))
    }

    async fn ensure_owner(
        &self,
        ctx: &WatchContext,
        nft_type: NftType,
        contract: Address,
        token_id: U256,
    ) -> Result<(), PortError> {
        let owned = match nft_type {
            NftType::Erc721 => {
                let owner = self
                    .call(contract, OWNER_OF, &[DynSolValue::Uint(token_id, 256)])
                    .await?
                    .as_address()
                    .ok_or_else(|| PortError::Validation("expected address output".to_owned()))?;
                owner == ctx.wallet_address
            }
            NftType::Erc1155 => {
                let balance = self
                    .call_uint(
                        contract,
                        BALANCE_OF_1155,
                        &[
                            DynSolValue::Address(ctx.wallet_address),
                            DynSolValue::Uint(token_id, 256),
                        ],
                    )
                    .await?;
                !balance.is_zero()
            }
        };
        if owned {
            Ok(())
        } else {
            Err(PortError::Validation(format!(
                "Token {token_id} is not owned by {}",
                ctx.wallet_address
            )))
        }
    }
}

fn contract_address(options: &WatchAssetOptions) -> Result<Address, PortError> {
    if options.address.trim().is_empty() {
        return Err(PortError::Validation("Contract address is required".to_owned()));
    }
    options
        .address
        .trim()
        .parse()
        .map_err(|_| PortError::Validation(format!("Invalid contract address {}", options.address)))
}

impl<F: EndpointFactory> AssetIntrospectionPort for ContractIntrospector<F> {
    async fn resolve_token(
        &self,
        _ctx: &WatchContext,
        options: &WatchAssetOptions,
    ) -> Result<AssetContract, PortError> {
        let address = contract_address(options)?;
        let symbol = self.call_string(address, SYMBOL).await?;
        let decimals = self.call_uint(address, DECIMALS, &[]).await?;
        let decimals = u8::try_from(decimals)
            .map_err(|_| PortError::Validation(format!("decimals out of range: {decimals}")))?;
        if let Some(requested) = options.decimals {
            if requested != decimals {
                return Err(PortError::Validation(format!(
                    "Decimals mismatch: contract reports {decimals}, got {requested}"
                )));
            }
        }
        let name = match &options.name {
            Some(name) => Some(name.clone()),
            None => self.call_string(address, NAME).await.ok(),
        };
        Ok(AssetContract {
            address,
            symbol: options.symbol.clone().unwrap_or(symbol),
            decimals,
            name,
            logo: options.image.clone(),
        })
    }

    async fn resolve_nft(
        &self,
        ctx: &WatchContext,
        nft_type: NftType,
        options: &WatchAssetOptions,
    ) -> Result<Nft, PortError> {
        let address = contract_address(options)?;
        let raw_id = options
            .token_id
            .as_ref()
            .ok_or_else(|| PortError::Validation("Token id is required".to_owned()))?;
        let token_id = quantity::parse(raw_id).map_err(PortError::Validation)?;
        self.ensure_owner(ctx, nft_type, address, token_id).await?;
        let collection_name = match self.call_string(address, NAME).await {
            Ok(name) if !name.is_empty() => name,
            _ => options.name.clone().unwrap_or_else(|| "Unknown".to_owned()),
        };
        tracing::debug!(%address, %token_id, "nft ownership confirmed");
        Ok(Nft {
            address,
            token_id: token_id.to_string(),
            collection_name,
            name: options.name.clone(),
            image_url: options.image.clone(),
            nft_type,
        })
    }
}
