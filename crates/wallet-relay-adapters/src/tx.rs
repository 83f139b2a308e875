use alloy::primitives::{Address, TxKind};
use alloy::rpc::types::{TransactionInput, TransactionRequest};
use serde_json::{json, Value};

use wallet_relay_core::params::quantity;
use wallet_relay_core::{PortError, TransactionParams};

use crate::endpoint::{EndpointFactory, EndpointHandle};

/// Maps the allow-listed transaction fields onto an alloy request.
pub fn to_transaction_request(tx: &TransactionParams, from: Address) -> TransactionRequest {
    TransactionRequest {
        from: Some(from),
        to: Some(tx.to.map_or(TxKind::Create, TxKind::Call)),
        nonce: tx.nonce,
        gas: tx.gas_limit,
        gas_price: tx.gas_price,
        max_fee_per_gas: tx.max_fee_per_gas,
        max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
        value: tx.value,
        input: TransactionInput::maybe_input(tx.data.clone()),
        chain_id: tx.chain_id,
        access_list: tx.access_list.clone(),
        transaction_type: tx.tx_type,
        ..Default::default()
    }
}

/// Builds the alloy request for `tx` and fills nonce, chain id, fees and gas
/// limit from the endpoint where the caller left them out.
pub async fn fill_from_endpoint<F: EndpointFactory>(
    endpoint: &EndpointHandle<F>,
    tx: &TransactionParams,
    from: Address,
) -> Result<TransactionRequest, PortError> {
    let mut request = to_transaction_request(tx, from);

    if request.chain_id.is_none() {
        request.chain_id = Some(endpoint.chain_id().await?);
    }
    if request.nonce.is_none() {
        let raw = endpoint
            .request("eth_getTransactionCount", json!([from, "pending"]))
            .await?;
        request.nonce = Some(to_u64(&raw, "eth_getTransactionCount")?);
    }

    if tx.uses_dynamic_fees() {
        if request.max_priority_fee_per_gas.is_none() {
            let raw = endpoint
                .request("eth_maxPriorityFeePerGas", json!([]))
                .await?;
            request.max_priority_fee_per_gas = Some(to_u128(&raw, "eth_maxPriorityFeePerGas")?);
        }
        if request.max_fee_per_gas.is_none() {
            let base = fetch_gas_price(endpoint).await?;
            let tip = request.max_priority_fee_per_gas.unwrap_or_default();
            request.max_fee_per_gas = Some(base.saturating_mul(2).saturating_add(tip));
        }
    } else if request.gas_price.is_none() {
        request.gas_price = Some(fetch_gas_price(endpoint).await?);
    }

    if request.gas.is_none() {
        let call = serde_json::to_value(&request)
            .map_err(|e| PortError::Validation(format!("serialize tx for estimate: {e}")))?;
        let raw = endpoint.request("eth_estimateGas", json!([call])).await?;
        request.gas = Some(to_u64(&raw, "eth_estimateGas")?);
    }
    Ok(request)
}

async fn fetch_gas_price<F: EndpointFactory>(
    endpoint: &EndpointHandle<F>,
) -> Result<u128, PortError> {
    let raw = endpoint.request("eth_gasPrice", json!([])).await?;
    to_u128(&raw, "eth_gasPrice")
}

fn to_u64(raw: &Value, method: &str) -> Result<u64, PortError> {
    let q = quantity::parse(raw).map_err(|e| PortError::Transport(format!("{method}: {e}")))?;
    u64::try_from(q).map_err(|_| PortError::Transport(format!("{method}: quantity overflows u64")))
}

fn to_u128(raw: &Value, method: &str) -> Result<u128, PortError> {
    let q = quantity::parse(raw).map_err(|e| PortError::Transport(format!("{method}: {e}")))?;
    u128::try_from(q)
        .map_err(|_| PortError::Transport(format!("{method}: quantity overflows u128")))
}
