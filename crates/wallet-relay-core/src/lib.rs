pub mod assets;
pub mod chain_registry;
pub mod context;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod params;
pub mod permission;
pub mod ports;
pub mod queue;
pub mod reply;
pub mod state_machine;
pub mod validation;

pub use chain_registry::ChainRegistry;
pub use context::RuntimeContext;
pub use dispatcher::{Dispatcher, DEFAULT_FORWARDER_NAME};
pub use domain::{
    AppMode, AssetContract, ChainConfig, NativeCurrency, Nft, NftType, PendingEntry, Request,
    RequestId, RequestOrigin, TimestampMs,
};
pub use error::DispatchError;
pub use params::{RequestParams, TransactionParams, WatchAssetOptions};
pub use permission::PermissionGate;
pub use ports::{
    ActivityPort, AssetIntrospectionPort, ClockPort, HostPort, PortError, ReplyPort,
    SigningPort, StoragePort, WatchContext,
};
pub use queue::{Decision, ReadyEntry, RequestQueue};
pub use reply::{ReplyError, RpcErrorObject, RpcReply};
pub use state_machine::{dispatch_transition, replay, DispatchAction, DispatchState};
