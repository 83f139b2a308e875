use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use alloy::primitives::B256;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::assets::{append_asset_contract, insert_nft};
use crate::chain_registry::ChainRegistry;
use crate::context::RuntimeContext;
use crate::domain::{
    AppMode, AssetContract, ChainConfig, Nft, PendingEntry, Request, RequestId, TimestampMs,
};
use crate::error::DispatchError;
use crate::params::{
    AddChainParams, AssetKind, RequestParams, SwitchChainParams, TypedDataEnvelope,
    WatchAssetParams,
};
use crate::ports::{
    ActivityPort, AssetIntrospectionPort, ClockPort, HostPort, ReplyPort, SigningPort,
    StoragePort, WatchContext,
};
use crate::queue::{Decision, ReadyEntry, RequestQueue};
use crate::reply::{codes, ReplyError, RpcReply};
use crate::state_machine::{dispatch_transition, DispatchAction, DispatchState};
use crate::validation::{
    unsupported_asset, validate_add_network_params, validate_add_nft_params,
    validate_add_token_params, validate_switch_chain_params, validate_typed_data_domain,
};

pub const DEFAULT_FORWARDER_NAME: &str = "Arcana Forwarder";

enum ResolvedAsset {
    Token(AssetContract),
    Nft(Nft),
}

pub struct Dispatcher<S, R, H, A, St, Ac, C>
where
    S: SigningPort,
    R: ReplyPort,
    H: HostPort,
    A: AssetIntrospectionPort,
    St: StoragePort,
    Ac: ActivityPort,
    C: ClockPort,
{
    pub context: RuntimeContext<S>,
    pub queue: RequestQueue,
    pub transport: R,
    pub host: H,
    pub assets: A,
    pub storage: St,
    pub activity: Ac,
    pub clock: C,
    pub forwarder_name: String,
    states: Mutex<HashMap<RequestId, DispatchState>>,
}

impl<S, R, H, A, St, Ac, C> Dispatcher<S, R, H, A, St, Ac, C>
where
    S: SigningPort,
    R: ReplyPort,
    H: HostPort,
    A: AssetIntrospectionPort,
    St: StoragePort,
    Ac: ActivityPort,
    C: ClockPort,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: RuntimeContext<S>,
        transport: R,
        host: H,
        assets: A,
        storage: St,
        activity: Ac,
        clock: C,
    ) -> Self {
        Self {
            context,
            queue: RequestQueue::new(),
            transport,
            host,
            assets,
            storage,
            activity,
            clock,
            forwarder_name: DEFAULT_FORWARDER_NAME.to_owned(),
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_forwarder_name(mut self, name: impl Into<String>) -> Self {
        self.forwarder_name = name.into();
        self
    }

    /// Parses, validates and classifies `request`. Requests that fail
    /// validation are replied to here and never queued.
    pub async fn ingest(&self, request: Request) {
        let id = request.id.clone();
        let method = request.method.clone();

        if !self.begin(&id) {
            warn!(%id, method, "duplicate request id");
            let reply = RpcReply::failure(
                id.clone(),
                ReplyError::rpc(
                    codes::INVALID_REQUEST,
                    format!("request {id} is already in flight"),
                ),
            );
            self.deliver(&method, reply);
            return;
        }

        if let Err(err) = self.admit(request).await {
            self.finish(&id, &method, Err(err));
        }
        self.report_pending_count();
    }

    async fn admit(&self, request: Request) -> Result<(), DispatchError> {
        let params = RequestParams::parse(&request.method, &request.params)?;
        self.validate(&params).await?;
        self.advance(&request.id, DispatchAction::Validate)?;

        let requires_approval = self
            .context
            .permission_gate
            .requires_approval(&request.method);
        let queued_at = TimestampMs(self.clock.now_ms()?);
        let action = if requires_approval {
            DispatchAction::AwaitApproval
        } else {
            DispatchAction::AutoApprove
        };
        self.advance(&request.id, action)?;

        if requires_approval {
            if let Err(err) = self.host.open_popup() {
                warn!(error = %err, "failed to open approval popup");
            }
        }
        let id = request.id.clone();
        self.queue
            .push(PendingEntry {
                request,
                requires_approval,
                queued_at,
            })
            .inspect_err(|_| self.forget(&id))?;
        Ok(())
    }

    async fn validate(&self, params: &RequestParams) -> Result<(), DispatchError> {
        match params {
            RequestParams::SwitchChain(p) => {
                validate_switch_chain_params(p, &self.context.registry())?;
            }
            RequestParams::AddChain(p) => {
                validate_add_network_params(p, &self.context.registry())?;
            }
            RequestParams::SignTypedDataV4 { envelope, .. } => {
                validate_typed_data_domain(envelope, self.context.selected_chain_id())?;
            }
            RequestParams::WatchAsset(p) => {
                let ctx = self.watch_context()?;
                self.resolve_asset(p, &ctx).await?;
            }
            _ => {}
        }
        Ok(())
    }

    pub fn approve(&self, id: &RequestId) -> Result<(), DispatchError> {
        self.queue.approve(id)?;
        self.report_pending_count();
        Ok(())
    }

    pub fn deny(&self, id: &RequestId) -> Result<(), DispatchError> {
        self.queue.deny(id)?;
        self.report_pending_count();
        Ok(())
    }

    /// Consumer loop. Returns once the queue is closed and drained.
    pub async fn run(&self) {
        while let Some(ready) = self.queue.next_ready().await {
            self.process(ready).await;
            let pending = self.report_pending_count();
            if pending == 0 && self.context.app_mode() == AppMode::Widget {
                if let Err(err) = self.host.close_popup() {
                    warn!(error = %err, "failed to close approval popup");
                }
            }
        }
        debug!("request queue closed");
    }

    pub fn shutdown(&self) {
        self.queue.close();
    }

    pub async fn process(&self, ready: ReadyEntry) {
        let ReadyEntry { entry, decision } = ready;
        let request = entry.request;
        let id = &request.id;

        let result: Result<Value, DispatchError> = match decision {
            Decision::Denied => self
                .advance(id, DispatchAction::Deny)
                .and(Err(DispatchError::UserDenied)),
            Decision::Approved | Decision::AutoApproved => {
                let granted = if decision == Decision::Approved {
                    self.advance(id, DispatchAction::Grant).map(|_| ())
                } else {
                    Ok(())
                };
                match granted {
                    Ok(()) => {
                        let outcome = self.execute(&request).await;
                        self.advance(id, DispatchAction::Execute).and(outcome)
                    }
                    Err(err) => Err(err),
                }
            }
        };
        self.finish(id, &request.method, result);
    }

    pub async fn execute(&self, request: &Request) -> Result<Value, DispatchError> {
        let params = RequestParams::parse(&request.method, &request.params)?;
        let engine = &self.context.signing_engine;

        match params {
            RequestParams::Accounts => Ok(json!(engine
                .accounts()
                .iter()
                .map(|a| a.to_checksum(None))
                .collect::<Vec<_>>())),
            RequestParams::ChainId => Ok(json!(format!("{:#x}", engine.chain_id().await?))),
            RequestParams::EthSign {
                address,
                message_hash,
            } => Ok(json!(engine.sign(&address, &message_hash).await?)),
            RequestParams::PersonalSign { message, address } => {
                Ok(json!(engine.personal_sign(&address, &message).await?))
            }
            RequestParams::SignTypedDataV4 {
                address,
                typed_data,
                envelope,
            } => {
                validate_typed_data_domain(&envelope, self.context.selected_chain_id())?;
                let signature = engine.sign_typed_data(&address, &typed_data).await?;
                self.record_file_activity(&envelope);
                Ok(json!(signature))
            }
            RequestParams::EncryptionPublicKey { address } => {
                Ok(json!(engine.encryption_public_key(&address).await?))
            }
            RequestParams::Decrypt {
                ciphertext,
                address,
            } => Ok(json!(engine.decrypt(&ciphertext, &address).await?)),
            RequestParams::SendTransaction(tx) => {
                let from = tx.from.clone().unwrap_or_default();
                let tx_hash = engine.send_transaction(&tx, &from).await?;
                self.record_transaction(tx_hash);
                Ok(json!(tx_hash))
            }
            RequestParams::SignTransaction(tx) => {
                let from = tx.from.clone().unwrap_or_default();
                Ok(json!(engine.sign_transaction(&tx, &from).await?))
            }
            RequestParams::SwitchChain(p) => self.switch_chain(&p),
            RequestParams::AddChain(p) => self.add_network(&p),
            RequestParams::WatchAsset(p) => self.watch_asset(&p).await,
            RequestParams::Passthrough { method, params } => {
                Ok(engine.forward(&method, &params).await?)
            }
        }
    }

    fn switch_chain(&self, params: &SwitchChainParams) -> Result<Value, DispatchError> {
        let config = self.commit_chain_change(|registry| {
            let chain_id = validate_switch_chain_params(params, registry)?;
            Ok(registry.select(chain_id)?.clone())
        })?;
        info!(chain_id = config.chain_id, chain = %config.chain_name, "switched chain");
        Ok(json!(format!("Chain changed to {}", config.chain_name)))
    }

    fn add_network(&self, params: &AddChainParams) -> Result<Value, DispatchError> {
        let config = self.commit_chain_change(|registry| {
            let candidate = validate_add_network_params(params, registry)?;
            Ok(registry.add_network(candidate)?.clone())
        })?;
        info!(chain_id = config.chain_id, chain = %config.chain_name, "added network");
        Ok(json!(format!("Added the network {}", params.chain_name)))
    }

    /// Applies `change` to a copy of the registry. The copy replaces the
    /// registry only after the signing engine has moved to the chain it
    /// returns; on any error the registry is left as it was.
    fn commit_chain_change<F>(&self, change: F) -> Result<ChainConfig, DispatchError>
    where
        F: FnOnce(&mut ChainRegistry) -> Result<ChainConfig, DispatchError>,
    {
        let mut registry = self.context.registry();
        let mut staged = registry.clone();
        let config = change(&mut staged)?;
        self.context.signing_engine.set_rpc_config(&config)?;
        *registry = staged;
        Ok(config)
    }

    async fn watch_asset(&self, params: &WatchAssetParams) -> Result<Value, DispatchError> {
        let ctx = self.watch_context()?;
        let stored = match self.resolve_asset(params, &ctx).await? {
            ResolvedAsset::Token(contract) => {
                append_asset_contract(&self.storage, &ctx.wallet_address, ctx.chain_id, contract)?
            }
            ResolvedAsset::Nft(nft) => {
                insert_nft(&self.storage, &ctx.wallet_address, ctx.chain_id, nft)?
            }
        };
        debug!(chain_id = ctx.chain_id, stored, "asset watched");
        Ok(json!("Token Added successfully"))
    }

    async fn resolve_asset(
        &self,
        params: &WatchAssetParams,
        ctx: &WatchContext,
    ) -> Result<ResolvedAsset, DispatchError> {
        match params.kind() {
            AssetKind::Erc20 => {
                validate_add_token_params(&self.assets, ctx, &params.options)
                    .await
                    .map(ResolvedAsset::Token)
            }
            AssetKind::Nft(nft_type) => {
                validate_add_nft_params(&self.assets, ctx, nft_type, &params.options)
                    .await
                    .map(ResolvedAsset::Nft)
            }
            AssetKind::Unsupported(asset_type) => Err(unsupported_asset(&asset_type)),
        }
    }

    fn watch_context(&self) -> Result<WatchContext, DispatchError> {
        let wallet_address = self
            .context
            .signing_engine
            .accounts()
            .first()
            .copied()
            .ok_or_else(|| DispatchError::Access("No Wallet found".to_owned()))?;
        let registry = self.context.registry();
        let chain_id = registry
            .selected_chain_id()
            .ok_or_else(|| DispatchError::Protocol("no chain selected".to_owned()))?;
        Ok(WatchContext {
            wallet_address,
            chain_id,
            is_ethereum_mainnet: registry.is_ethereum_mainnet(),
        })
    }

    fn record_transaction(&self, tx_hash: B256) {
        let Some(chain_id) = self.context.selected_chain_id() else {
            return;
        };
        if let Err(err) = self.activity.record_transaction(chain_id, tx_hash) {
            error!(%tx_hash, error = %err, "failed to record transaction activity");
        }
    }

    fn record_file_activity(&self, envelope: &TypedDataEnvelope) {
        let Some(domain) = envelope.domain.as_ref() else {
            return;
        };
        if domain.name.as_deref() != Some(self.forwarder_name.as_str()) {
            return;
        }
        let Some(chain_id) = self.context.selected_chain_id() else {
            return;
        };
        if let Err(err) = self.activity.record_file_activity(
            chain_id,
            &envelope.message,
            domain.verifying_contract.as_deref(),
        ) {
            error!(error = %err, "failed to record file activity");
        }
    }

    /// Sends the current pending count to the host and returns it.
    pub fn report_pending_count(&self) -> usize {
        let count = self.queue.pending_count();
        if let Err(err) = self.host.send_pending_request_count(count) {
            warn!(count, error = %err, "failed to report pending request count");
        }
        count
    }

    pub fn state_of(&self, id: &RequestId) -> Option<DispatchState> {
        self.lock_states().get(id).copied()
    }

    pub fn in_flight(&self) -> usize {
        self.lock_states().len()
    }

    fn lock_states(&self) -> MutexGuard<'_, HashMap<RequestId, DispatchState>> {
        self.states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self, id: &RequestId) -> bool {
        let mut states = self.lock_states();
        if states.contains_key(id) {
            return false;
        }
        states.insert(id.clone(), DispatchState::Received);
        true
    }

    fn forget(&self, id: &RequestId) {
        self.lock_states().remove(id);
    }

    fn advance(
        &self,
        id: &RequestId,
        action: DispatchAction,
    ) -> Result<DispatchState, DispatchError> {
        let mut states = self.lock_states();
        let current = *states
            .get(id)
            .ok_or_else(|| DispatchError::Internal(format!("request {id} is not in flight")))?;
        let (next, transition) = dispatch_transition(current, action)?;
        debug!(
            %id,
            from = ?transition.from,
            to = ?transition.to,
            reason = transition.reason,
            "dispatch transition"
        );
        states.insert(id.clone(), next);
        Ok(next)
    }

    fn finish(&self, id: &RequestId, method: &str, result: Result<Value, DispatchError>) {
        let reply = match result {
            Ok(value) => RpcReply::success(id.clone(), value),
            Err(err) => {
                warn!(%id, method, error = %err, "request failed");
                RpcReply::failure(id.clone(), err.into_reply_error())
            }
        };
        if self.state_of(id).is_some() {
            if let Err(err) = self.advance(id, DispatchAction::Reply) {
                error!(%id, method, error = %err, "replying from unexpected state");
            }
        }
        self.forget(id);
        self.deliver(method, reply);
    }

    fn deliver(&self, method: &str, reply: RpcReply) {
        let id = reply.id.clone();
        if let Err(err) = self.transport.reply(method, reply) {
            error!(%id, method, error = %err, "failed to deliver reply");
        }
    }
}
