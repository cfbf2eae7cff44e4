use std::collections::HashMap;
use std::fmt;
use std::os::fd::BorrowedFd;
use std::sync::Arc;

use duplexrpc_channel::{MessageChannel, Selectable};
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::call::CallBuilder;
use crate::envelope::{Envelope, ErrorKind};
use crate::error::{Result, RpcError};
use crate::handler::{Call, Handler, HandlerResult};

/// An RPC endpoint: one channel plus the table of functions the peer may call.
///
/// The same endpoint both issues calls and services the peer's calls. While
/// [`sync_call`](Self::sync_call) waits for its reply it keeps dispatching
/// incoming requests, so two endpoints can call into each other to any depth.
///
/// Every call takes `&mut self`, so at most one synchronous call per
/// direction is ever outstanding; nested calls made from inside a handler
/// are the only way to stack a second one.
pub struct Rpc<Ch> {
    channel: Ch,
    handlers: HashMap<String, Handler<Ch>>,
    depth: usize,
}

impl<Ch: MessageChannel> Rpc<Ch> {
    /// Wrap a claimed (or connected) channel with an empty dispatch table.
    pub fn new(channel: Ch) -> Self {
        Self::from_parts(channel, HashMap::new())
    }

    pub(crate) fn from_parts(channel: Ch, handlers: HashMap<String, Handler<Ch>>) -> Self {
        Self {
            channel,
            handlers,
            depth: 0,
        }
    }

    /// Register `handler` under `name`, replacing any previous entry.
    pub fn add_handler<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&mut Rpc<Ch>, Call) -> HandlerResult + Send + Sync + 'static,
    {
        let name = name.into();
        debug!(name = %name, "registered handler");
        self.handlers.insert(name, Arc::new(handler));
    }

    /// Builder form of [`add_handler`](Self::add_handler).
    pub fn with_handler<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Rpc<Ch>, Call) -> HandlerResult + Send + Sync + 'static,
    {
        self.add_handler(name, handler);
        self
    }

    /// Remove the handler registered under `name`; returns whether one existed.
    pub fn remove_handler(&mut self, name: &str) -> bool {
        self.handlers.remove(name).is_some()
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Start building a call to `name`.
    pub fn call(&mut self, name: impl Into<String>) -> CallBuilder<'_, Ch> {
        CallBuilder::new(self, name.into())
    }

    /// Call `name` on the peer and wait for its result.
    pub fn sync_call(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        self.sync_call_with(name, args, Map::new())
    }

    /// [`sync_call`](Self::sync_call) with keyword arguments.
    pub fn sync_call_with(
        &mut self,
        name: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value> {
        let call = Call::new(name).with_args(args).with_kwargs(kwargs);
        self.invoke(call)
    }

    /// Call `name` on the peer without waiting; no reply will ever come.
    pub fn async_call(&mut self, name: &str, args: Vec<Value>) -> Result<()> {
        self.async_call_with(name, args, Map::new())
    }

    /// [`async_call`](Self::async_call) with keyword arguments.
    pub fn async_call_with(
        &mut self,
        name: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<()> {
        let call = Call::new(name).with_args(args).with_kwargs(kwargs);
        self.notify(call)
    }

    pub(crate) fn invoke(&mut self, call: Call) -> Result<Value> {
        let name = call.name.clone();
        trace!(name = %name, depth = self.depth, "sync call");
        self.send(&Envelope::request(call, true))?;

        loop {
            match self.next_envelope()? {
                Envelope::SyncRequest(incoming) => self.dispatch(incoming, true)?,
                Envelope::AsyncRequest(incoming) => self.dispatch(incoming, false)?,
                Envelope::Response { value } => return Ok(value),
                Envelope::Error {
                    kind: ErrorKind::UnknownFunction,
                    ..
                } => return Err(RpcError::UnknownRemoteFunction(name)),
                Envelope::Error {
                    kind: ErrorKind::Remote,
                    payload,
                } => return Err(RpcError::Remote(payload)),
            }
        }
    }

    pub(crate) fn notify(&mut self, call: Call) -> Result<()> {
        trace!(name = %call.name, depth = self.depth, "async call");
        self.send(&Envelope::request(call, false))
    }

    /// Read exactly one incoming request and dispatch it.
    ///
    /// A sync request is answered before this returns; an async request is
    /// not. A `Response` or `Error` here has no call to belong to and is
    /// reported as [`RpcError::UnexpectedEnvelope`].
    pub fn execute(&mut self) -> Result<()> {
        match self.next_envelope()? {
            Envelope::SyncRequest(call) => self.dispatch(call, true),
            Envelope::AsyncRequest(call) => self.dispatch(call, false),
            other => Err(RpcError::UnexpectedEnvelope(other.label())),
        }
    }

    /// Service incoming requests until the peer goes away.
    ///
    /// Returns the number of requests serviced.
    pub fn serve(&mut self) -> Result<u64> {
        let mut served = 0u64;
        loop {
            match self.execute() {
                Ok(()) => served += 1,
                Err(RpcError::PeerGone) => {
                    debug!(served, "peer gone; stopped serving");
                    return Ok(served);
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn dispatch(&mut self, call: Call, reply: bool) -> Result<()> {
        let Some(handler) = self.handlers.get(&call.name).cloned() else {
            if reply {
                debug!(name = %call.name, "sync request for unknown function");
                return self.send(&Envelope::unknown_function(&call.name));
            }
            warn!(name = %call.name, "async request for unknown function ignored");
            return Ok(());
        };

        let name = call.name.clone();
        self.depth += 1;
        debug!(name = %name, depth = self.depth, sync = reply, "dispatching");
        let outcome = handler(self, call);
        self.depth -= 1;

        match (outcome, reply) {
            (Ok(value), true) => self.send(&Envelope::Response { value }),
            (Ok(_), false) => Ok(()),
            (Err(err), true) => self.send(&Envelope::Error {
                kind: ErrorKind::Remote,
                payload: err.into_payload(),
            }),
            (Err(err), false) => {
                warn!(name = %name, error = %err, "async handler failed");
                Ok(())
            }
        }
    }

    fn send(&mut self, envelope: &Envelope) -> Result<()> {
        self.channel.write(envelope).map_err(RpcError::from_channel)
    }

    fn next_envelope(&mut self) -> Result<Envelope> {
        match self.channel.read::<Envelope>() {
            Ok(Some(envelope)) => {
                trace!(kind = envelope.label(), depth = self.depth, "received envelope");
                Ok(envelope)
            }
            Ok(None) => Err(RpcError::PeerGone),
            Err(err) => Err(RpcError::from_channel(err)),
        }
    }

    /// Nesting depth of handlers currently running on this endpoint.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Close the underlying channel; the peer sees end-of-stream.
    pub fn close(&mut self) {
        self.channel.close();
    }

    pub fn channel(&self) -> &Ch {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut Ch {
        &mut self.channel
    }

    pub fn into_inner(self) -> Ch {
        self.channel
    }
}

impl<Ch: Selectable> Selectable for Rpc<Ch> {
    fn poll_handle(&self) -> duplexrpc_channel::Result<BorrowedFd<'_>> {
        self.channel.poll_handle()
    }

    fn has_buffered_message(&self) -> bool {
        self.channel.has_buffered_message()
    }
}

impl<Ch> fmt::Debug for Rpc<Ch> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Rpc")
            .field("handlers", &names)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::thread;

    use duplexrpc_channel::{ChannelError, Pipe, StreamChannel};
    use serde_json::json;

    use super::*;
    use crate::handler::HandlerError;

    fn pipe_pair() -> (Rpc<Pipe>, Rpc<Pipe>) {
        let mut near = Pipe::new().unwrap();
        let mut far = near.try_clone().unwrap();
        near.claim_left().unwrap();
        far.claim_right().unwrap();
        (Rpc::new(near), Rpc::new(far))
    }

    fn echo(_rpc: &mut Rpc<Pipe>, call: Call) -> HandlerResult {
        Ok(call.args.into_iter().next().unwrap_or(Value::Null))
    }

    #[test]
    fn sync_call_returns_handler_value() {
        let (mut caller, server) = pipe_pair();
        let server = thread::spawn(move || {
            let mut server = server.with_handler("echo", echo);
            server.execute().unwrap();
        });

        let value = caller.sync_call("echo", vec![json!("x")]).unwrap();
        assert_eq!(value, json!("x"));
        server.join().unwrap();
    }

    #[test]
    fn async_call_is_serviced_by_execute() {
        let (mut caller, mut server) = pipe_pair();
        let seen = Arc::new(AtomicI64::new(0));
        let sink = Arc::clone(&seen);
        server.add_handler("notify", move |_rpc, call| {
            sink.store(call.arg(0)?, Ordering::SeqCst);
            Ok(Value::Null)
        });

        caller.async_call("notify", vec![json!(42)]).unwrap();
        server.execute().unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 42);

        // Nothing was sent back for the async call.
        caller.close();
        assert!(matches!(server.execute(), Err(RpcError::PeerGone)));
    }

    #[test]
    fn unknown_function_is_reported_to_caller() {
        let (mut caller, mut server) = pipe_pair();
        let server = thread::spawn(move || {
            server.execute().unwrap();
            server
        });

        let err = caller.sync_call("missing", vec![]).unwrap_err();
        assert!(matches!(err, RpcError::UnknownRemoteFunction(ref name) if name == "missing"));

        // The servicing side is still usable.
        let mut server = server.join().unwrap();
        server.add_handler("echo", echo);
        let server = thread::spawn(move || server.execute().unwrap());
        assert_eq!(caller.sync_call("echo", vec![json!(1)]).unwrap(), json!(1));
        server.join().unwrap();
    }

    #[test]
    fn handler_error_surfaces_as_remote() {
        let (mut caller, server) = pipe_pair();
        let server = thread::spawn(move || {
            let mut server = server.with_handler("fail", |_rpc, _call| {
                Err(HandlerError::new(json!({"reason": "boom"})))
            });
            server.execute().unwrap();
        });

        let err = caller.sync_call("fail", vec![]).unwrap_err();
        assert!(matches!(err, RpcError::Remote(ref payload) if payload == &json!({"reason": "boom"})));
        server.join().unwrap();
    }

    #[test]
    fn async_unknown_is_not_answered() {
        let (mut caller, server) = pipe_pair();
        let server = thread::spawn(move || {
            let mut server = server.with_handler("echo", echo);
            server.serve().unwrap()
        });

        caller.async_call("nobody_home", vec![json!(1)]).unwrap();
        let value = caller.sync_call("echo", vec![json!("mine")]).unwrap();
        assert_eq!(value, json!("mine"));

        caller.close();
        assert_eq!(server.join().unwrap(), 2);
    }

    #[test]
    fn failing_async_handler_is_not_answered() {
        let (mut caller, server) = pipe_pair();
        let server = thread::spawn(move || {
            let mut server = server
                .with_handler("echo", echo)
                .with_handler("fail", |_rpc, _call| Err(HandlerError::new("nope")));
            server.serve().unwrap()
        });

        caller.async_call("fail", vec![]).unwrap();
        assert_eq!(caller.sync_call("echo", vec![json!(7)]).unwrap(), json!(7));
        caller.close();
        assert_eq!(server.join().unwrap(), 2);
    }

    #[test]
    fn nested_callback_resolves_before_outer_reply() {
        let (caller, server) = pipe_pair();

        let server = thread::spawn(move || {
            let mut server = server.with_handler("outer", |rpc, call| {
                let n: i64 = call.arg(0)?;
                let inner = rpc.sync_call("inner", vec![json!(n + 1)])?;
                let inner: i64 = serde_json::from_value(inner)?;
                Ok(json!(inner * 10))
            });
            server.execute().unwrap();
        });

        let mut caller = caller.with_handler("inner", |rpc, call| {
            assert_eq!(rpc.depth(), 1);
            let n: i64 = call.arg(0)?;
            Ok(json!(n * 2))
        });
        let value = caller.sync_call("outer", vec![json!(1)]).unwrap();
        assert_eq!(value, json!(40));
        assert_eq!(caller.depth(), 0);
        server.join().unwrap();
    }

    #[test]
    fn mutual_recursion_across_peers() {
        // countdown(n) calls the peer's countdown(n - 1) until zero.
        fn countdown(rpc: &mut Rpc<Pipe>, call: Call) -> HandlerResult {
            let n: i64 = call.arg(0)?;
            if n == 0 {
                return Ok(json!(0));
            }
            let rest: i64 = serde_json::from_value(rpc.sync_call("countdown", vec![json!(n - 1)])?)?;
            Ok(json!(rest + n))
        }

        let (caller, server) = pipe_pair();
        let server = thread::spawn(move || {
            let mut server = server.with_handler("countdown", countdown);
            server.serve().unwrap()
        });

        let mut caller = caller.with_handler("countdown", countdown);
        assert_eq!(caller.sync_call("countdown", vec![json!(6)]).unwrap(), json!(21));
        caller.close();
        assert_eq!(server.join().unwrap(), 1);
    }

    #[test]
    fn peer_exit_during_sync_call_is_peer_gone() {
        let (mut caller, mut server) = pipe_pair();
        let server = thread::spawn(move || {
            // Read the request, then leave without answering.
            let _ = server.channel_mut().read::<Envelope>().unwrap();
            drop(server);
        });

        let err = caller.sync_call("anything", vec![]).unwrap_err();
        assert!(err.is_peer_gone());
        server.join().unwrap();

        // The channel stays finished.
        assert!(matches!(caller.execute(), Err(RpcError::PeerGone)));
    }

    #[test]
    fn stray_response_is_unexpected() {
        let (mut caller, mut server) = pipe_pair();
        server
            .channel_mut()
            .write(&Envelope::Response { value: json!(1) })
            .unwrap();
        assert!(matches!(
            caller.execute(),
            Err(RpcError::UnexpectedEnvelope("response"))
        ));
    }

    #[test]
    fn garbage_on_the_wire_is_a_codec_error() {
        let (mut caller, mut server) = pipe_pair();
        server.channel_mut().send_message(b"[1, 2").unwrap();
        assert!(matches!(
            caller.execute(),
            Err(RpcError::Channel(ChannelError::Codec(_)))
        ));
    }

    #[test]
    fn handler_table_management() {
        let (mut rpc, _peer) = pipe_pair();
        assert!(!rpc.has_handler("echo"));
        rpc.add_handler("echo", echo);
        assert!(rpc.has_handler("echo"));
        assert!(rpc.remove_handler("echo"));
        assert!(!rpc.remove_handler("echo"));
        assert!(format!("{rpc:?}").contains("handlers: []"));
    }

    #[test]
    fn works_over_a_socket_pair() {
        let (left, right) = StreamChannel::pair().unwrap();
        let mut client = Rpc::new(left);
        let server = thread::spawn(move || {
            let mut server = Rpc::new(right).with_handler("len", |_rpc, call| {
                let s: String = call.arg(0)?;
                Ok(json!(s.len()))
            });
            server.serve().unwrap()
        });

        assert_eq!(client.sync_call("len", vec![json!("four")]).unwrap(), json!(4));
        client.close();
        assert_eq!(server.join().unwrap(), 1);
    }
}
