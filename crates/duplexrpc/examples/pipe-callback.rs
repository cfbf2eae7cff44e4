//! Two threads call each other over a duplex pipe.
//!
//! The main thread asks the worker to `greet`; while handling that call the
//! worker calls back into the main thread's `name` before it answers.
//!
//! Run with:
//!   cargo run --example pipe-callback

use std::thread;

use duplexrpc::channel::Pipe;
use duplexrpc::rpc::{Rpc, RpcPipe};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut parent_end = Pipe::new()?;
    let mut worker_end = parent_end.try_clone()?;
    parent_end.claim_left()?;

    let worker = thread::spawn(move || -> Result<u64, duplexrpc::rpc::RpcError> {
        worker_end.claim_right()?;
        let mut rpc: RpcPipe = Rpc::new(worker_end).with_handler("greet", |rpc, call| {
            let greeting: String = call.arg(0)?;
            let name = rpc.call("name").sync()?;
            Ok(json!(format!("{greeting}, {}!", name.as_str().unwrap_or("stranger"))))
        });
        rpc.serve()
    });

    let mut rpc = Rpc::new(parent_end).with_handler("name", |_rpc, _call| Ok(json!("pipe")));
    let reply = rpc.call("greet").arg("Hello").sync()?;
    println!("{reply}");

    rpc.close();
    let served = worker.join().map_err(|_| "worker panicked")??;
    eprintln!("worker served {served} call(s)");
    Ok(())
}
