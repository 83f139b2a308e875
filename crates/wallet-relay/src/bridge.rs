//! Newline-delimited JSON over stdin/stdout.

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

use wallet_relay_adapters::HostMessage;
use wallet_relay_core::{
    ActivityPort, AssetIntrospectionPort, ClockPort, Dispatcher, HostPort, ReplyPort, Request,
    RequestId, SigningPort, StoragePort,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    Approve,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Inbound {
    Decision {
        decision: DecisionKind,
        id: RequestId,
    },
    Request(Request),
}

pub fn parse_line(line: &str) -> Result<Inbound, serde_json::Error> {
    serde_json::from_str(line)
}

/// Feeds stdin into the dispatcher until EOF, then closes the queue.
pub async fn read_inbound<S, R, H, A, St, Ac, C>(
    dispatcher: &Dispatcher<S, R, H, A, St, Ac, C>,
) -> eyre::Result<()>
where
    S: SigningPort,
    R: ReplyPort,
    H: HostPort,
    A: AssetIntrospectionPort,
    St: StoragePort,
    Ac: ActivityPort,
    C: ClockPort,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let result = loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(e) => break Err(eyre::Report::new(e).wrap_err("failed to read stdin")),
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Ok(Inbound::Request(request)) => dispatcher.ingest(request).await,
            Ok(Inbound::Decision { decision, id }) => {
                let outcome = match decision {
                    DecisionKind::Approve => dispatcher.approve(&id),
                    DecisionKind::Deny => dispatcher.deny(&id),
                };
                if let Err(err) = outcome {
                    tracing::warn!(%id, ?decision, error = %err, "decision ignored");
                }
            }
            Err(e) => tracing::warn!(error = %e, "ignoring malformed inbound line"),
        }
    };
    dispatcher.shutdown();
    result
}

/// Writes replies and host notifications until every sender is gone.
pub async fn write_outbound(mut outbound: UnboundedReceiver<HostMessage>) -> eyre::Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(message) = outbound.recv().await {
        let line = match message.to_wire() {
            Ok(value) => value.to_string(),
            Err(err) => {
                tracing::error!(error = %err, "dropping unencodable outbound message");
                continue;
            }
        };
        stdout.write_all(line.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }
    Ok(())
}
