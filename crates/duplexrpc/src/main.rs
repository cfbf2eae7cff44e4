mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "duplexrpc", version, about = "Point-to-point RPC over Unix sockets")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_call_with_args_and_kwargs() {
        let cli = Cli::try_parse_from([
            "duplexrpc",
            "call",
            "/tmp/test.sock",
            "add",
            "1",
            "2",
            "--kwarg",
            "round=true",
        ])
        .expect("call args should parse");

        let Command::Call(args) = cli.command else {
            panic!("expected call subcommand");
        };
        assert_eq!(args.name, "add");
        assert_eq!(args.args, vec!["1", "2"]);
        assert_eq!(args.kwargs, vec!["round=true"]);
        assert!(!args.notify);
    }

    #[test]
    fn parses_async_flag() {
        let cli = Cli::try_parse_from(["duplexrpc", "call", "/tmp/test.sock", "log", "--async"])
            .expect("async call should parse");
        assert!(matches!(cli.command, Command::Call(args) if args.notify));
    }

    #[test]
    fn parses_serve_with_count() {
        let cli = Cli::try_parse_from(["duplexrpc", "serve", "/tmp/test.sock", "--count", "2"])
            .expect("serve args should parse");
        assert!(matches!(cli.command, Command::Serve(args) if args.count == Some(2)));
    }

    #[test]
    fn call_requires_a_name() {
        let err = Cli::try_parse_from(["duplexrpc", "call", "/tmp/test.sock"])
            .expect_err("missing name should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
