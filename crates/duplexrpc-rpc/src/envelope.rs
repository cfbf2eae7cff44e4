use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::handler::Call;

/// One RPC message on the wire.
///
/// Encoded as an object tagged by a `"type"` field:
///
/// ```json
/// {"type":"sync_request","name":"echo","args":["x"]}
/// {"type":"response","value":"x"}
/// {"type":"error","kind":"unknown_function","payload":"echo"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// A call whose caller blocks until it gets a `Response` or `Error`.
    SyncRequest(Call),
    /// A call that is never answered.
    AsyncRequest(Call),
    /// Successful result of the most recent sync request.
    Response { value: Value },
    /// Failed result of the most recent sync request.
    Error { kind: ErrorKind, payload: Value },
}

/// Why a sync request failed on the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No handler is registered under the requested name.
    UnknownFunction,
    /// The handler ran and returned an error.
    Remote,
}

impl Envelope {
    pub(crate) fn request(call: Call, sync: bool) -> Self {
        if sync {
            Envelope::SyncRequest(call)
        } else {
            Envelope::AsyncRequest(call)
        }
    }

    pub(crate) fn unknown_function(name: &str) -> Self {
        Envelope::Error {
            kind: ErrorKind::UnknownFunction,
            payload: Value::String(name.to_string()),
        }
    }

    /// Short label used in logs and [`RpcError::UnexpectedEnvelope`](crate::RpcError::UnexpectedEnvelope).
    pub fn label(&self) -> &'static str {
        match self {
            Envelope::SyncRequest(_) => "sync_request",
            Envelope::AsyncRequest(_) => "async_request",
            Envelope::Response { .. } => "response",
            Envelope::Error { .. } => "error",
        }
    }
}
