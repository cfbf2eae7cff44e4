//! Serve one RPC client on a Unix socket until it disconnects.
//!
//! Run with:
//!   cargo run --example socket-server
//!
//! In another terminal:
//!   cargo run --features cli -- call /tmp/duplexrpc-example-<pid>/rpc.sock add 1 2

use std::fs;

use duplexrpc::rpc::RpcListener;
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sock_dir = std::env::temp_dir().join(format!("duplexrpc-example-{}", std::process::id()));
    fs::create_dir_all(&sock_dir)?;
    let sock_path = sock_dir.join("rpc.sock");

    let listener = RpcListener::bind(&sock_path)?.with_handler("add", |_rpc, call| {
        let mut total = 0i64;
        for idx in 0..call.args.len() {
            total += call.arg::<i64>(idx)?;
        }
        Ok(json!(total))
    });
    eprintln!("Listening on {}", sock_path.display());

    let mut peer = listener.accept()?;
    eprintln!("Peer connected");

    let served = peer.serve()?;
    eprintln!("Peer left after {served} call(s)");

    drop(listener);
    let _ = fs::remove_dir_all(&sock_dir);
    Ok(())
}
