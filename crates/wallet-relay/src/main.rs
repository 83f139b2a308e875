//! wallet-relay: stdio host bridge for the wallet request broker.

use eyre::{eyre, WrapErr};
use zeroize::Zeroizing;

use wallet_relay_adapters::{
    ChannelHost, ContractIntrospector, EndpointHandle, HttpEndpointFactory, KeyMaterial,
    MemoryActivityLog, MemoryStorage, SigningEngine, SystemClock, WalletConfig,
};
use wallet_relay_core::{ChainRegistry, Dispatcher, PermissionGate, RuntimeContext};

mod bridge;

const ENV_PRIVATE_KEY: &str = "WALLET_RELAY_PRIVATE_KEY";

#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    // stdout carries the protocol, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = WalletConfig::from_env();
    let key = load_key()?;
    tracing::info!(address = %key.address(), mode = ?config.app_mode, "starting wallet-relay");

    let selected = config
        .selected_chain()
        .ok_or_else(|| eyre!("chain {} is not configured", config.selected_chain_id))?;
    let endpoint = EndpointHandle::new(HttpEndpointFactory::new(config.endpoint_timeout_ms)?);
    endpoint
        .set_rpc_config(&selected)
        .wrap_err("failed to connect rpc endpoint")?;

    let registry = ChainRegistry::new(config.registry_chains(), Some(selected.chain_id))
        .wrap_err("invalid chain configuration")?;
    let assets = ContractIntrospector::new(endpoint.clone());
    let engine = SigningEngine::new(key, endpoint);
    let context = RuntimeContext::new(registry, engine, PermissionGate::new(config.app_mode));

    let (host, outbound) = ChannelHost::new();
    let dispatcher = Dispatcher::new(
        context,
        host.clone(),
        host,
        assets,
        MemoryStorage::default(),
        MemoryActivityLog::default(),
        SystemClock,
    )
    .with_forwarder_name(config.forwarder_name.clone());

    // The serve block owns the dispatcher; dropping it closes the outbound
    // channel so the writer can finish.
    let serve = async move {
        let (read, ()) = tokio::join!(bridge::read_inbound(&dispatcher), dispatcher.run());
        read
    };
    let (read, write) = tokio::join!(serve, bridge::write_outbound(outbound));
    read?;
    write?;
    tracing::info!("wallet-relay stopped");
    Ok(())
}

fn load_key() -> eyre::Result<KeyMaterial> {
    let raw = Zeroizing::new(
        std::env::var(ENV_PRIVATE_KEY).wrap_err_with(|| format!("{ENV_PRIVATE_KEY} is not set"))?,
    );
    KeyMaterial::from_hex(&raw).wrap_err_with(|| format!("{ENV_PRIVATE_KEY} is invalid"))
}
