use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod call;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the built-in functions (echo, ping, add) on a socket.
    Serve(ServeArgs),
    /// Call a function on a serving peer and print the result.
    Call(CallArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Call(args) => call::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Exit after serving N peers.
    #[arg(long)]
    pub count: Option<u64>,
    /// Socket file permissions (octal).
    #[arg(long, value_name = "MODE", value_parser = parse_mode)]
    pub mode: Option<u32>,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// Function name.
    pub name: String,
    /// Positional arguments; parsed as JSON, otherwise taken as strings.
    #[arg(allow_negative_numbers = true)]
    pub args: Vec<String>,
    /// Keyword argument as KEY=VALUE (repeatable).
    #[arg(long = "kwarg", value_name = "KEY=VALUE")]
    pub kwargs: Vec<String>,
    /// Send without waiting for a result.
    #[arg(long = "async")]
    pub notify: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_mode(input: &str) -> Result<u32, String> {
    let digits = input.strip_prefix("0o").unwrap_or(input);
    u32::from_str_radix(digits, 8).map_err(|err| format!("invalid octal mode {input:?}: {err}"))
}
