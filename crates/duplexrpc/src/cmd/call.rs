use duplexrpc_rpc::connect;
use serde_json::Value;
use tracing::debug;

use crate::cmd::CallArgs;
use crate::exit::{rpc_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_result, OutputFormat};

pub fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let kwargs = args
        .kwargs
        .iter()
        .map(|pair| parse_kwarg(pair))
        .collect::<CliResult<Vec<_>>>()?;

    let mut rpc = connect(&args.path).map_err(|err| rpc_error("connect failed", err))?;
    debug!(path = ?args.path, name = %args.name, "connected");

    let mut call = rpc.call(args.name.as_str());
    for raw in &args.args {
        call = call.arg(parse_value(raw));
    }
    for (key, value) in kwargs {
        call = call.kwarg(key, value);
    }

    if args.notify {
        call.notify().map_err(|err| rpc_error("call failed", err))?;
        print_result(&args.name, None, format);
    } else {
        let value = call.sync().map_err(|err| rpc_error("call failed", err))?;
        print_result(&args.name, Some(&value), format);
    }

    rpc.close();
    Ok(SUCCESS)
}

/// JSON if it parses, otherwise the literal string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_kwarg(pair: &str) -> CliResult<(String, Value)> {
    let (key, value) = pair
        .split_once('=')
        .ok_or_else(|| CliError::new(USAGE, format!("--kwarg expects KEY=VALUE, got {pair:?}")))?;
    if key.is_empty() {
        return Err(CliError::new(USAGE, format!("--kwarg has an empty key: {pair:?}")));
    }
    Ok((key.to_string(), parse_value(value)))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn values_are_json_with_string_fallback() {
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value("[1,\"a\"]"), json!([1, "a"]));
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("hello"), json!("hello"));
        assert_eq!(parse_value("\"quoted\""), json!("quoted"));
    }

    #[test]
    fn kwargs_split_on_first_equals() {
        assert_eq!(parse_kwarg("k=v=w").unwrap(), ("k".to_string(), json!("v=w")));
        assert_eq!(parse_kwarg("n=3").unwrap(), ("n".to_string(), json!(3)));
    }

    #[test]
    fn malformed_kwargs_are_usage_errors() {
        assert_eq!(parse_kwarg("novalue").unwrap_err().code, USAGE);
        assert_eq!(parse_kwarg("=3").unwrap_err().code, USAGE);
    }
}
