use crate::config::ClientConfig;
use crate::errors::{ClientError, ClientResult};

use clap::Parser;
use std::io::{BufRead, Write};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "moonlink")]
#[command(version)]
#[command(about = "Interactive telnet client", long_about = None)]
pub struct CliArgs {
    /// Remote host; prompted for when omitted
    pub host: Option<String>,

    /// Remote port
    pub port: Option<u16>,

    /// Path to the config file
    #[arg(short, long, value_name = "FILE", default_value = "moonlink.conf")]
    pub config: PathBuf,

    /// Pass ANSI escape sequences through to the local terminal untouched
    #[arg(long)]
    pub raw_escapes: bool,

    /// Refuse to let the server echo typed characters
    #[arg(long)]
    pub no_remote_echo: bool,

    /// Log negotiation and stream events at debug level
    #[arg(short, long)]
    pub debug: bool,
}

/// Host and port to connect to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Work out the target, prompting when no host was given
pub fn resolve_target(
    args: &CliArgs,
    config: &ClientConfig,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> ClientResult<Target> {
    if args.host.is_some() {
        return Ok(Target {
            host: config.connection.host.clone(),
            port: config.connection.port,
        });
    }
    prompt_target(
        input,
        output,
        &config.connection.host,
        config.connection.port,
    )
}

/// Ask for host and port; an empty answer takes the default
pub fn prompt_target(
    input: &mut impl BufRead,
    output: &mut impl Write,
    default_host: &str,
    default_port: u16,
) -> ClientResult<Target> {
    let host = prompt_line(
        input,
        output,
        &format!("Target host (defaults to {}): ", default_host),
    )?;
    let host = if host.is_empty() {
        default_host.to_string()
    } else {
        host
    };

    let port = prompt_line(
        input,
        output,
        &format!("Target port (defaults to {}): ", default_port),
    )?;
    let port = if port.is_empty() {
        default_port
    } else {
        port.parse()
            .map_err(|_| ClientError::InvalidInput(format!("'{}' is not a valid port", port)))?
    };

    Ok(Target { host, port })
}

fn prompt_line(
    input: &mut impl BufRead,
    output: &mut impl Write,
    prompt: &str,
) -> ClientResult<String> {
    output.write_all(prompt.as_bytes())?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}
