pub mod activity;
pub mod assets;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod endpoint;
pub mod host;
pub mod signer;
pub mod storage;
pub mod tx;

pub use activity::{ActivityEntry, MemoryActivityLog};
pub use assets::ContractIntrospector;
pub use clock::SystemClock;
pub use config::WalletConfig;
pub use endpoint::{EndpointFactory, EndpointHandle, HttpEndpointFactory, RpcEndpoint};
pub use host::{ChannelHost, HostMessage};
pub use signer::{KeyMaterial, SigningEngine};
pub use storage::MemoryStorage;
