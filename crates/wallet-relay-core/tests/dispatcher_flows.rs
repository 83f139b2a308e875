mod common;

use std::sync::atomic::Ordering;

use alloy::primitives::B256;
use serde_json::json;

use common::{
    default_registry, drain_ready, error_text, new_dispatcher, request, wallet_address,
    ActivityRecord, HostEvent, NO_WALLET,
};
use wallet_relay_core::assets::{asset_contracts_key, nfts_key};
use wallet_relay_core::reply::codes;
use wallet_relay_core::{AppMode, ChainRegistry, DispatchState, RequestId};

fn polygon_params() -> serde_json::Value {
    json!([{
        "chainId": "0x89",
        "chainName": "Polygon",
        "rpcUrls": ["https://rpc.example"],
        "nativeCurrency": {"symbol": "MATIC"}
    }])
}

#[tokio::test]
async fn polygon_is_added_to_an_empty_registry() {
    let dispatcher = new_dispatcher(AppMode::NoUi, ChainRegistry::default());
    dispatcher
        .ingest(request(1, "wallet_addEthereumChain", polygon_params()))
        .await;
    drain_ready(&dispatcher).await;

    let reply = dispatcher.transport.reply_for(1);
    assert!(!reply.is_error(), "unexpected error: {reply:?}");
    let result = reply.result.expect("result");
    assert!(result.as_str().expect("string result").contains("Polygon"));

    let registry = dispatcher.context.registry();
    let polygon = registry.get(137).expect("chain 137 registered");
    assert_eq!(polygon.chain_name, "Polygon");
    assert_eq!(polygon.native_currency.decimals, 18);
    assert!(polygon.is_custom);
    assert_eq!(registry.selected_chain_id(), Some(137));
    drop(registry);

    let pushed = dispatcher.context.signing_engine.rpc_configs();
    assert_eq!(pushed.last().map(|c| c.chain_id), Some(137));
}

#[tokio::test]
async fn duplicate_primary_rpc_url_leaves_registry_unchanged() {
    let dispatcher = new_dispatcher(AppMode::Widget, default_registry());
    let before = dispatcher.context.registry().clone();

    dispatcher
        .ingest(request(
            1,
            "wallet_addEthereumChain",
            json!([{
                "chainId": "0x89",
                "chainName": "Polygon",
                "rpcUrls": ["https://goerli.rpc.example"],
                "nativeCurrency": {"symbol": "MATIC", "decimals": 18}
            }]),
        ))
        .await;

    let reply = dispatcher.transport.reply_for(1);
    let error = reply.error.expect("validation error");
    assert_eq!(error.code(), Some(codes::INVALID_PARAMS));
    assert!(error
        .to_string()
        .contains("RPC URL - https://goerli.rpc.example already exists"));
    assert_eq!(*dispatcher.context.registry(), before);
    assert_eq!(dispatcher.queue.pending_count(), 0);
    assert!(!dispatcher.host.events().contains(&HostEvent::OpenPopup));
}

#[tokio::test]
async fn switch_selects_chain_without_touching_others() {
    let dispatcher = new_dispatcher(AppMode::Full, default_registry());
    let before = dispatcher.context.registry().chains().to_vec();

    dispatcher
        .ingest(request(1, "wallet_switchEthereumChain", json!([{"chainId": "0x5"}])))
        .await;
    assert_eq!(dispatcher.queue.pending_count(), 1);
    assert_eq!(
        dispatcher.state_of(&RequestId::from(1u64)),
        Some(DispatchState::Pending)
    );

    dispatcher.approve(&RequestId::from(1u64)).expect("approve");
    drain_ready(&dispatcher).await;

    let reply = dispatcher.transport.reply_for(1);
    assert_eq!(reply.result, Some(json!("Chain changed to Goerli")));
    let registry = dispatcher.context.registry();
    assert_eq!(registry.selected_chain_id(), Some(5));
    assert_eq!(registry.chains(), before.as_slice());
    drop(registry);
    assert_eq!(dispatcher.in_flight(), 0);
}

#[tokio::test]
async fn failed_endpoint_swap_keeps_the_registry() {
    let dispatcher = new_dispatcher(AppMode::NoUi, default_registry());
    let before = dispatcher.context.registry().clone();
    dispatcher
        .context
        .signing_engine
        .reject_rpc_config
        .store(true, Ordering::SeqCst);

    dispatcher
        .ingest(request(1, "wallet_addEthereumChain", polygon_params()))
        .await;
    dispatcher
        .ingest(request(2, "wallet_switchEthereumChain", json!([{"chainId": "0x5"}])))
        .await;
    drain_ready(&dispatcher).await;

    for id in [1, 2] {
        let reply = dispatcher.transport.reply_for(id);
        assert!(error_text(&reply).contains("endpoint unavailable"));
    }
    assert_eq!(*dispatcher.context.registry(), before);

    dispatcher
        .context
        .signing_engine
        .reject_rpc_config
        .store(false, Ordering::SeqCst);
    dispatcher
        .ingest(request(3, "wallet_addEthereumChain", polygon_params()))
        .await;
    drain_ready(&dispatcher).await;

    assert!(dispatcher.transport.reply_for(3).result.is_some());
    assert_eq!(dispatcher.context.selected_chain_id(), Some(137));
    let configs = dispatcher.context.signing_engine.rpc_configs();
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].rpc_urls, vec!["https://rpc.example".to_owned()]);
}

#[tokio::test]
async fn switch_to_unknown_chain_replies_4902() {
    let dispatcher = new_dispatcher(AppMode::Widget, default_registry());
    dispatcher
        .ingest(request(1, "wallet_switchEthereumChain", json!([{"chainId": "0x89"}])))
        .await;

    let error = dispatcher.transport.reply_for(1).error.expect("error");
    assert_eq!(error.code(), Some(codes::UNRECOGNIZED_CHAIN));
    assert_eq!(dispatcher.context.registry().selected_chain_id(), Some(1));

    dispatcher
        .ingest(request(2, "wallet_switchEthereumChain", json!([{}])))
        .await;
    let reply = dispatcher.transport.reply_for(2);
    assert_eq!(error_text(&reply), "Please provide chain id");
}

#[tokio::test]
async fn auto_approved_requests_never_enter_pending() {
    let dispatcher = new_dispatcher(AppMode::NoUi, default_registry());
    dispatcher
        .ingest(request(
            1,
            "personal_sign",
            json!(["0x68656c6c6f", wallet_address().to_string()]),
        ))
        .await;

    assert_eq!(dispatcher.queue.pending_count(), 0);
    assert_eq!(
        dispatcher.state_of(&RequestId::from(1u64)),
        Some(DispatchState::AutoApproved)
    );
    assert!(!dispatcher.host.events().contains(&HostEvent::OpenPopup));

    drain_ready(&dispatcher).await;
    let reply = dispatcher.transport.reply_for(1);
    assert!(!reply.is_error());
    assert_eq!(
        dispatcher.context.signing_engine.calls(),
        vec!["personal_sign".to_owned()]
    );
}

#[tokio::test]
async fn denied_request_replies_user_deny_without_side_effects() {
    let dispatcher = new_dispatcher(AppMode::Widget, default_registry());
    let before = dispatcher.context.registry().clone();

    dispatcher
        .ingest(request(1, "wallet_switchEthereumChain", json!([{"chainId": 5}])))
        .await;
    dispatcher
        .ingest(request(
            2,
            "personal_sign",
            json!(["0x68656c6c6f", wallet_address().to_string()]),
        ))
        .await;
    dispatcher.deny(&RequestId::from(1u64)).expect("deny 1");
    dispatcher.deny(&RequestId::from(2u64)).expect("deny 2");
    drain_ready(&dispatcher).await;

    for id in [1, 2] {
        let reply = dispatcher.transport.reply_for(id);
        assert_eq!(
            serde_json::to_value(&reply.error).expect("serialize"),
            json!("user_deny")
        );
        assert!(reply.result.is_none());
    }
    assert_eq!(*dispatcher.context.registry(), before);
    assert!(dispatcher.context.signing_engine.calls().is_empty());
    assert!(dispatcher.context.signing_engine.rpc_configs().is_empty());
}

#[tokio::test]
async fn typed_data_chain_mismatch_never_reaches_the_signer() {
    let dispatcher = new_dispatcher(AppMode::NoUi, default_registry());
    let typed_data = json!({
        "domain": {"name": "Example", "chainId": 137},
        "types": {},
        "primaryType": "Mail",
        "message": {}
    })
    .to_string();
    dispatcher
        .ingest(request(
            1,
            "eth_signTypedData_v4",
            json!([wallet_address().to_string(), typed_data]),
        ))
        .await;
    drain_ready(&dispatcher).await;

    let reply = dispatcher.transport.reply_for(1);
    let text = error_text(&reply);
    assert!(text.contains("137"), "{text}");
    assert!(text.contains("network chain id 1"), "{text}");
    assert!(dispatcher.context.signing_engine.calls().is_empty());
}

#[tokio::test]
async fn forwarder_typed_data_records_file_activity() {
    let dispatcher = new_dispatcher(AppMode::NoUi, default_registry());
    let typed_data = json!({
        "domain": {
            "name": "Arcana Forwarder",
            "chainId": "0x1",
            "verifyingContract": "0x000000000000000000000000000000000000f0f0"
        },
        "message": {"did": "file-1"}
    })
    .to_string();
    dispatcher
        .ingest(request(
            1,
            "eth_signTypedData_v4",
            json!([wallet_address().to_string(), typed_data]),
        ))
        .await;
    drain_ready(&dispatcher).await;

    assert!(!dispatcher.transport.reply_for(1).is_error());
    assert_eq!(
        dispatcher.activity.records(),
        vec![ActivityRecord::File(
            1,
            json!({"did": "file-1"}),
            Some("0x000000000000000000000000000000000000f0f0".to_owned())
        )]
    );
}

#[tokio::test]
async fn personal_sign_for_foreign_address_is_an_access_error() {
    let dispatcher = new_dispatcher(AppMode::NoUi, default_registry());
    dispatcher
        .ingest(request(
            1,
            "personal_sign",
            json!(["0x68656c6c6f", "0x2000000000000000000000000000000000000002"]),
        ))
        .await;
    drain_ready(&dispatcher).await;

    let reply = dispatcher.transport.reply_for(1);
    assert_eq!(error_text(&reply), NO_WALLET);
    assert!(dispatcher.context.signing_engine.calls().is_empty());
}

#[tokio::test]
async fn send_transaction_renames_gas_and_records_activity() {
    let dispatcher = new_dispatcher(AppMode::NoUi, default_registry());
    dispatcher
        .ingest(request(
            1,
            "eth_sendTransaction",
            json!([{
                "from": wallet_address().to_string(),
                "to": "0x000000000000000000000000000000000000cafe",
                "gas": "0x5208",
                "value": "0x1"
            }]),
        ))
        .await;
    drain_ready(&dispatcher).await;

    let reply = dispatcher.transport.reply_for(1);
    let hash = B256::repeat_byte(0xab);
    assert_eq!(reply.result, Some(json!(hash)));
    assert_eq!(
        dispatcher.context.signing_engine.calls(),
        vec!["send_transaction gas_limit=Some(21000)".to_owned()]
    );
    assert_eq!(
        dispatcher.activity.records(),
        vec![ActivityRecord::Transaction(1, hash)]
    );
}

#[tokio::test]
async fn unknown_methods_are_relayed_with_remote_errors() {
    let dispatcher = new_dispatcher(AppMode::Widget, default_registry());
    dispatcher
        .ingest(request(1, "eth_getBalance", json!(["0x1", "latest"])))
        .await;
    dispatcher.ingest(request(2, "eth_failing", json!([]))).await;
    drain_ready(&dispatcher).await;

    assert_eq!(dispatcher.transport.reply_for(1).result, Some(json!("0x0")));
    let error = dispatcher.transport.reply_for(2).error.expect("remote error");
    assert_eq!(error.code(), Some(-32000));
    assert!(error.to_string().contains("execution reverted"));
}

#[tokio::test]
async fn nfts_are_stored_sorted_by_token_id_then_collection() {
    let dispatcher = new_dispatcher(AppMode::NoUi, default_registry());
    let contract = "0x000000000000000000000000000000000000beef";
    for (id, token_id, collection) in [(1, 5, "B"), (2, 2, "A"), (3, 5, "A")] {
        dispatcher
            .ingest(request(
                id,
                "wallet_watchAsset",
                json!({
                    "type": "ERC721",
                    "options": {"address": contract, "tokenId": token_id, "name": collection}
                }),
            ))
            .await;
    }
    drain_ready(&dispatcher).await;

    for id in 1..=3 {
        assert_eq!(
            dispatcher.transport.reply_for(id).result,
            Some(json!("Token Added successfully"))
        );
    }
    let stored = dispatcher
        .storage
        .json(&nfts_key(&wallet_address(), 1))
        .expect("stored nfts");
    let order: Vec<(String, String)> = stored
        .as_array()
        .expect("array")
        .iter()
        .map(|n| {
            (
                n["tokenId"].as_str().expect("token id").to_owned(),
                n["collectionName"].as_str().expect("collection").to_owned(),
            )
        })
        .collect();
    assert_eq!(
        order,
        vec![
            ("2".to_owned(), "A".to_owned()),
            ("5".to_owned(), "A".to_owned()),
            ("5".to_owned(), "B".to_owned()),
        ]
    );
}

#[tokio::test]
async fn watched_tokens_are_appended_without_dedup() {
    let dispatcher = new_dispatcher(AppMode::NoUi, default_registry());
    let params = json!({
        "type": "ERC20",
        "options": {"address": "0x000000000000000000000000000000000000cafe", "symbol": "CAFE"}
    });
    dispatcher
        .ingest(request(1, "wallet_watchAsset", params.clone()))
        .await;
    dispatcher.ingest(request(2, "wallet_watchAsset", params)).await;
    drain_ready(&dispatcher).await;

    let stored = dispatcher
        .storage
        .json(&asset_contracts_key(&wallet_address(), 1))
        .expect("stored tokens");
    assert_eq!(stored.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn unsupported_asset_type_is_rejected_at_ingestion() {
    let dispatcher = new_dispatcher(AppMode::Widget, default_registry());
    dispatcher
        .ingest(request(
            1,
            "wallet_watchAsset",
            json!({"type": "ERC777", "options": {"address": "0x0"}}),
        ))
        .await;

    let reply = dispatcher.transport.reply_for(1);
    assert_eq!(error_text(&reply), "Asset of type 'ERC777' not supported");
    assert_eq!(dispatcher.queue.pending_count(), 0);
}

#[tokio::test]
async fn run_loop_closes_popup_in_widget_mode_once_nothing_is_pending() {
    let dispatcher = new_dispatcher(AppMode::Widget, default_registry());
    dispatcher
        .ingest(request(
            1,
            "personal_sign",
            json!(["0x68656c6c6f", wallet_address().to_string()]),
        ))
        .await;
    dispatcher.approve(&RequestId::from(1u64)).expect("approve");
    dispatcher.shutdown();
    dispatcher.run().await;

    let events = dispatcher.host.events();
    assert_eq!(events.first(), Some(&HostEvent::OpenPopup));
    assert_eq!(events.last(), Some(&HostEvent::ClosePopup));
    assert!(events.contains(&HostEvent::PendingCount(1)));
    assert!(!dispatcher.transport.reply_for(1).is_error());
}

#[tokio::test]
async fn duplicate_in_flight_id_is_rejected() {
    let dispatcher = new_dispatcher(AppMode::Widget, default_registry());
    let params = json!(["0x68656c6c6f", wallet_address().to_string()]);
    dispatcher
        .ingest(request(1, "personal_sign", params.clone()))
        .await;
    dispatcher.ingest(request(1, "personal_sign", params)).await;

    let error = dispatcher.transport.reply_for(1).error.expect("duplicate");
    assert_eq!(error.code(), Some(codes::INVALID_REQUEST));
    assert_eq!(dispatcher.queue.pending_count(), 1);
}
