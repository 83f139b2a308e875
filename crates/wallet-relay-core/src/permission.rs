use crate::domain::AppMode;
use crate::params::methods;

/// Methods that touch the key or persisted configuration.
pub const APPROVAL_REQUIRED_METHODS: [&str; 10] = [
    methods::ETH_SIGN,
    methods::PERSONAL_SIGN,
    methods::ETH_DECRYPT,
    methods::ETH_GET_ENCRYPTION_PUBLIC_KEY,
    methods::ETH_SIGN_TYPED_DATA_V4,
    methods::ETH_SEND_TRANSACTION,
    methods::ETH_SIGN_TRANSACTION,
    methods::WALLET_ADD_ETHEREUM_CHAIN,
    methods::WALLET_SWITCH_ETHEREUM_CHAIN,
    methods::WALLET_WATCH_ASSET,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissionGate {
    mode: AppMode,
}

impl PermissionGate {
    pub fn new(mode: AppMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> AppMode {
        self.mode
    }

    pub fn requires_approval(&self, method: &str) -> bool {
        requires_approval(method, self.mode)
    }
}

pub fn requires_approval(method: &str, mode: AppMode) -> bool {
    mode != AppMode::NoUi && APPROVAL_REQUIRED_METHODS.contains(&method)
}
