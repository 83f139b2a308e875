use thiserror::Error;

use crate::ports::PortError;
use crate::reply::{codes, ReplyError, USER_DENY};

/// Failure of a single request. Every variant ends up in that request's
/// reply; none of them stop the dispatcher.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("validation failed: {0}")]
    Validation(ReplyError),
    #[error("{0}")]
    Access(String),
    #[error("user_deny")]
    UserDenied,
    #[error("remote endpoint error: {0}")]
    Remote(ReplyError),
    #[error("{0}")]
    Protocol(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::Validation(ReplyError::invalid_params(message))
    }

    pub fn into_reply_error(self) -> ReplyError {
        match self {
            Self::Validation(err) | Self::Remote(err) => err,
            Self::Access(message) | Self::Protocol(message) => ReplyError::Message(message),
            Self::UserDenied => ReplyError::message(USER_DENY),
            Self::Internal(message) => ReplyError::rpc(codes::INTERNAL_ERROR, message),
        }
    }
}

impl From<ReplyError> for DispatchError {
    fn from(err: ReplyError) -> Self {
        Self::Validation(err)
    }
}

impl From<PortError> for DispatchError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Validation(message) | PortError::NotFound(message) => {
                Self::invalid_params(message)
            }
            PortError::Conflict(message) => {
                Self::Validation(ReplyError::rpc(codes::INVALID_REQUEST, message))
            }
            PortError::Access(message) => Self::Access(message),
            PortError::Rpc {
                code,
                message,
                data,
            } => Self::Remote(ReplyError::Rpc(crate::reply::RpcErrorObject {
                code,
                message,
                data,
            })),
            PortError::Transport(message) => {
                Self::Remote(ReplyError::rpc(codes::INTERNAL_ERROR, message))
            }
            PortError::NotImplemented(what) => Self::Remote(ReplyError::rpc(
                codes::METHOD_NOT_FOUND,
                format!("not implemented: {what}"),
            )),
        }
    }
}
