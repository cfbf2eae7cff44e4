use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dispatcher::Rpc;
use crate::error::RpcError;

/// A locally registered RPC function.
///
/// Handlers receive the dispatcher that is servicing the call, so they can
/// issue nested calls back to the peer (or recurse) before returning.
pub type Handler<Ch> = Arc<dyn Fn(&mut Rpc<Ch>, Call) -> HandlerResult + Send + Sync>;

/// What a handler returns: a result value, or an error payload for the caller.
pub type HandlerResult = std::result::Result<Value, HandlerError>;

/// A named invocation with positional and keyword arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub kwargs: Map<String, Value>,
}

impl Call {
    /// A call with no arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            kwargs: Map::new(),
        }
    }

    /// Replace the positional arguments.
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    /// Replace the keyword arguments.
    pub fn with_kwargs(mut self, kwargs: Map<String, Value>) -> Self {
        self.kwargs = kwargs;
        self
    }

    /// Decode positional argument `idx`.
    pub fn arg<T: DeserializeOwned>(&self, idx: usize) -> Result<T, HandlerError> {
        let raw = self.args.get(idx).ok_or_else(|| {
            HandlerError::new(format!("{}: missing argument {idx}", self.name))
        })?;
        T::deserialize(raw).map_err(|err| {
            HandlerError::new(format!("{}: argument {idx}: {err}", self.name))
        })
    }

    /// Decode keyword argument `key`, if it was passed.
    pub fn kwarg<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, HandlerError> {
        self.kwargs
            .get(key)
            .map(|raw| {
                T::deserialize(raw).map_err(|err| {
                    HandlerError::new(format!("{}: keyword {key:?}: {err}", self.name))
                })
            })
            .transpose()
    }
}

/// Failure reported by a handler.
///
/// The payload travels back to a synchronous caller unchanged and surfaces
/// there as [`RpcError::Remote`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{payload}")]
pub struct HandlerError {
    payload: Value,
}

impl HandlerError {
    pub fn new(payload: impl Into<Value>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }
}

impl From<RpcError> for HandlerError {
    /// Remote failures of a nested call keep their payload; anything else is
    /// reported by its message.
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Remote(payload) => Self { payload },
            other => Self::new(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}
