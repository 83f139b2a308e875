use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::RequestId;

pub const JSONRPC_VERSION: &str = "2.0";
pub const USER_DENY: &str = "user_deny";

pub mod codes {
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Error payload of a reply. Plain strings are kept for the errors the
/// embedding SDK matches on literally (`user_deny`, chain mismatch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyError {
    Rpc(RpcErrorObject),
    Message(String),
}

impl ReplyError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        Self::Rpc(RpcErrorObject {
            code,
            message: message.into(),
            data: None,
        })
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::rpc(codes::INVALID_PARAMS, message)
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Rpc(obj) => Some(obj.code),
            Self::Message(_) => None,
        }
    }
}

impl fmt::Display for ReplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rpc(obj) => write!(f, "{} (code {})", obj.message, obj.code),
            Self::Message(m) => f.write_str(m),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcReply {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ReplyError>,
}

impl RpcReply {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: RequestId, error: ReplyError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
