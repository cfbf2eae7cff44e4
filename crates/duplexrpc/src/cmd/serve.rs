use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use duplexrpc_channel::select;
use duplexrpc_rpc::{Call, HandlerError, HandlerResult, RpcError, RpcListener, RpcSocket};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::cmd::ServeArgs;
use crate::exit::{rpc_error, CliError, CliResult, INTERNAL, SUCCESS};

/// How often an idle peer session re-checks the shutdown flag.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let listener = match args.mode {
        Some(mode) => RpcListener::bind_with_mode(&args.path, mode),
        None => RpcListener::bind(&args.path),
    }
    .map_err(|err| rpc_error("bind failed", err))?
    .with_handler("echo", echo)
    .with_handler("ping", ping)
    .with_handler("add", add);
    info!(path = ?listener.path(), "serving echo, ping, add");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone(), listener.path().to_path_buf())?;

    let mut peers = 0u64;
    while running.load(Ordering::SeqCst) {
        if args.count.is_some_and(|count| peers >= count) {
            break;
        }
        let mut peer = listener
            .accept()
            .map_err(|err| rpc_error("accept failed", err))?;
        if !running.load(Ordering::SeqCst) {
            break;
        }
        peers += 1;

        match serve_peer(&mut peer, &running) {
            Ok(served) => info!(peer = peers, served, "peer finished"),
            Err(err) => warn!(peer = peers, error = %err, "peer session failed"),
        }
    }

    info!(peers, "shutting down");
    Ok(SUCCESS)
}

/// Service one peer until it leaves or shutdown is requested.
fn serve_peer(peer: &mut RpcSocket, running: &AtomicBool) -> Result<u64, RpcError> {
    let mut served = 0u64;
    while running.load(Ordering::SeqCst) {
        if select(&[&*peer], Some(POLL_INTERVAL))?.is_empty() {
            continue;
        }
        match peer.execute() {
            Ok(()) => served += 1,
            Err(RpcError::PeerGone) => break,
            Err(err) => return Err(err),
        }
    }
    Ok(served)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>, path: PathBuf) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
        // Unblock a pending accept.
        let _ = UnixStream::connect(&path);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

fn echo(_rpc: &mut RpcSocket, call: Call) -> HandlerResult {
    Ok(echo_value(call.args))
}

fn ping(_rpc: &mut RpcSocket, _call: Call) -> HandlerResult {
    Ok(json!("pong"))
}

fn add(_rpc: &mut RpcSocket, call: Call) -> HandlerResult {
    sum(&call.args)
}

/// A single argument comes back as itself; anything else as an array.
fn echo_value(mut args: Vec<Value>) -> Value {
    if args.len() == 1 {
        args.remove(0)
    } else {
        Value::Array(args)
    }
}

/// Integer sum while every argument is an integer and nothing overflows,
/// floating-point sum otherwise.
fn sum(args: &[Value]) -> HandlerResult {
    let mut int_total = Some(0i64);
    let mut float_total = 0f64;
    for (idx, arg) in args.iter().enumerate() {
        let Value::Number(n) = arg else {
            return Err(HandlerError::new(format!(
                "add: argument {idx} is not a number: {arg}"
            )));
        };
        int_total = int_total.and_then(|total| n.as_i64().and_then(|v| total.checked_add(v)));
        float_total += n.as_f64().unwrap_or(0.0);
    }
    Ok(match int_total {
        Some(total) => json!(total),
        None => json!(float_total),
    })
}
