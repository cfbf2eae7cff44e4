use duplexrpc_channel::MessageChannel;
use serde::Serialize;
use serde_json::Value;

use crate::dispatcher::Rpc;
use crate::error::{Result, RpcError};
use crate::handler::Call;

/// Builds one outgoing call; finish with [`sync`](Self::sync) or
/// [`notify`](Self::notify).
///
/// ```no_run
/// # fn demo(rpc: &mut duplexrpc_rpc::RpcSocket) -> duplexrpc_rpc::Result<()> {
/// let total = rpc.call("add").arg(2).arg(3).kwarg("round", true).sync()?;
/// rpc.call("log").arg("done").notify()?;
/// # let _ = total;
/// # Ok(())
/// # }
/// ```
#[must_use = "a call is only sent by sync() or notify()"]
pub struct CallBuilder<'a, Ch> {
    rpc: &'a mut Rpc<Ch>,
    call: Call,
    error: Option<serde_json::Error>,
}

impl<'a, Ch: MessageChannel> CallBuilder<'a, Ch> {
    pub(crate) fn new(rpc: &'a mut Rpc<Ch>, name: String) -> Self {
        Self {
            rpc,
            call: Call::new(name),
            error: None,
        }
    }

    /// Append a positional argument.
    pub fn arg<T: Serialize>(mut self, value: T) -> Self {
        if let Some(value) = self.convert(value) {
            self.call.args.push(value);
        }
        self
    }

    /// Set a keyword argument.
    pub fn kwarg<T: Serialize>(mut self, key: impl Into<String>, value: T) -> Self {
        if let Some(value) = self.convert(value) {
            self.call.kwargs.insert(key.into(), value);
        }
        self
    }

    /// Send as a synchronous call and wait for the result.
    pub fn sync(self) -> Result<Value> {
        let (rpc, call) = self.finish()?;
        rpc.invoke(call)
    }

    /// Send as an asynchronous call; returns once it is written.
    pub fn notify(self) -> Result<()> {
        let (rpc, call) = self.finish()?;
        rpc.notify(call)
    }

    fn convert<T: Serialize>(&mut self, value: T) -> Option<Value> {
        if self.error.is_some() {
            return None;
        }
        match serde_json::to_value(value) {
            Ok(value) => Some(value),
            Err(err) => {
                self.error = Some(err);
                None
            }
        }
    }

    fn finish(self) -> Result<(&'a mut Rpc<Ch>, Call)> {
        match self.error {
            Some(err) => Err(RpcError::InvalidArgument(err)),
            None => Ok((self.rpc, self.call)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::thread;
    use std::time::Duration;

    use duplexrpc_channel::{select, Pipe, StreamChannel};
    use serde::ser::Error as _;
    use serde::Serializer;
    use serde_json::json;

    use super::*;

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> std::result::Result<S::Ok, S::Error> {
            Err(S::Error::custom("not representable"))
        }
    }

    fn pipe_pair() -> (Rpc<Pipe>, Rpc<Pipe>) {
        let mut near = Pipe::new().unwrap();
        let mut far = near.try_clone().unwrap();
        near.claim_left().unwrap();
        far.claim_right().unwrap();
        (Rpc::new(near), Rpc::new(far))
    }

    #[test]
    fn builder_sends_args_and_kwargs() {
        let (mut caller, server) = pipe_pair();
        let server = thread::spawn(move || {
            let mut server = server.with_handler("describe", |_rpc, call| {
                Ok(json!({
                    "args": call.args,
                    "kwargs": call.kwargs,
                }))
            });
            server.execute().unwrap();
        });

        let mut tags = HashMap::new();
        tags.insert("k", "v");
        let value = caller
            .call("describe")
            .arg(1)
            .arg("two")
            .kwarg("tags", &tags)
            .sync()
            .unwrap();
        assert_eq!(
            value,
            json!({"args": [1, "two"], "kwargs": {"tags": {"k": "v"}}})
        );
        server.join().unwrap();
    }

    #[test]
    fn notify_is_not_answered() {
        let (mut caller, mut server) = pipe_pair();
        server.add_handler("noop", |_rpc, _call| Ok(Value::Null));

        caller.call("noop").arg(true).notify().unwrap();
        server.execute().unwrap();
        let ready = select(&[&caller], Some(Duration::ZERO)).unwrap();
        assert!(ready.is_empty());
    }

    #[test]
    fn unencodable_argument_is_reported_before_sending() {
        let (left, mut right) = StreamChannel::pair().unwrap();
        let mut caller = Rpc::new(left);

        let err = caller
            .call("anything")
            .arg(Unencodable)
            .arg(2)
            .sync()
            .unwrap_err();
        assert!(matches!(err, RpcError::InvalidArgument(_)));

        // Nothing reached the wire.
        caller.close();
        assert!(right.read::<Value>().unwrap().is_none());
    }
}
