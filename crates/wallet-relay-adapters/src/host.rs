//! Outbound channel to the embedding page: replies plus popup and
//! pending-count notifications, in the order they were produced.

use serde_json::{json, Value};
use tokio::sync::mpsc;

use wallet_relay_core::reply::JSONRPC_VERSION;
use wallet_relay_core::{HostPort, PortError, ReplyPort, RpcReply};

pub const PENDING_REQUEST_COUNT: &str = "wallet_pendingRequestCount";
pub const OPEN_POPUP: &str = "wallet_openPopup";
pub const CLOSE_POPUP: &str = "wallet_closePopup";

#[derive(Debug, Clone, PartialEq)]
pub enum HostMessage {
    Reply { method: String, reply: RpcReply },
    PendingRequestCount(usize),
    OpenPopup,
    ClosePopup,
}

impl HostMessage {
    /// One line of the outbound protocol.
    pub fn to_wire(&self) -> Result<Value, PortError> {
        let value = match self {
            Self::Reply { reply, .. } => serde_json::to_value(reply)
                .map_err(|e| PortError::Validation(format!("reply encode failed: {e}")))?,
            Self::PendingRequestCount(count) => notification(PENDING_REQUEST_COUNT, json!([count])),
            Self::OpenPopup => notification(OPEN_POPUP, json!([])),
            Self::ClosePopup => notification(CLOSE_POPUP, json!([])),
        };
        Ok(value)
    }
}

fn notification(method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "method": method,
        "params": params,
    })
}

#[derive(Debug, Clone)]
pub struct ChannelHost {
    tx: mpsc::UnboundedSender<HostMessage>,
}

impl ChannelHost {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, message: HostMessage) -> Result<(), PortError> {
        self.tx
            .send(message)
            .map_err(|_| PortError::Transport("host channel closed".to_owned()))
    }
}

impl ReplyPort for ChannelHost {
    fn reply(&self, method: &str, reply: RpcReply) -> Result<(), PortError> {
        self.send(HostMessage::Reply {
            method: method.to_owned(),
            reply,
        })
    }
}

impl HostPort for ChannelHost {
    fn send_pending_request_count(&self, count: usize) -> Result<(), PortError> {
        self.send(HostMessage::PendingRequestCount(count))
    }

    fn open_popup(&self) -> Result<(), PortError> {
        self.send(HostMessage::OpenPopup)
    }

    fn close_popup(&self) -> Result<(), PortError> {
        self.send(HostMessage::ClosePopup)
    }
}
