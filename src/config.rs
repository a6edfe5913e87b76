//! Command-line configuration.
//!
//! Walks the raw argument list and produces a validated [`LaunchConfig`].
//! All validation happens here, before any socket or process exists; a bad
//! flag can never leak a descriptor.
//!
//! Flags:
//! - `-e <command>`: command line to execute, via the shell
//! - `-i <spec>`: input endpoint (`TCPS`/`UDPS`/`UDSSS`/`UDSSD`)
//! - `-o <spec>`: output endpoint (`TCPC`/`UDPC`/`UDSCS`/`UDSCD`)
//! - `-b TCPS<port>`: one TCP server connection for both directions
//! - `-t <seconds>`: wall-clock timeout; non-positive disables the guard
//!
//! With no flags at all the launcher runs as a plain stdin→stdout
//! pass-through.

use std::time::Duration;

use crate::constants::MAX_COMMAND_LEN;
use crate::error::{Error, Result};
use crate::launch::{LaunchConfig, SpawnMode};
use crate::spec::{EndpointSpec, IoConfig};

/// Usage text printed alongside configuration errors.
pub const USAGE: &str = "\
usage: sockrun [-e <command>] [-i <spec>] [-o <spec>] [-b TCPS<port>] [-t <seconds>]
  -e <command>   command line to execute (shell-interpreted); omit to proxy bytes
  -i <spec>      input endpoint: TCPS<port> | UDPS<port> | UDSSS<path> | UDSSD<path>
  -o <spec>      output endpoint: TCPC<host>,<port> | UDPC<host>,<port> | UDSCS<path> | UDSCD<path>
  -b TCPS<port>  bidirectional: one accepted TCP connection for input and output
  -t <seconds>   kill the command after this many seconds (<= 0 disables)";

/// Parses the argument list (without the program name).
pub fn parse_args(args: &[String]) -> Result<LaunchConfig> {
    let mut command: Option<String> = None;
    let mut input: Option<EndpointSpec> = None;
    let mut output: Option<EndpointSpec> = None;
    let mut bidirectional: Option<EndpointSpec> = None;
    let mut timeout: Option<Duration> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-e" => {
                let value = flag_value(args, i, "-e")?;
                if value.len() > MAX_COMMAND_LEN {
                    return Err(Error::InvalidArgument(
                        "command exceeds maximum length".to_string(),
                    ));
                }
                command = Some(value.to_string());
                i += 2;
            }
            "-i" => {
                input = Some(EndpointSpec::parse_input(flag_value(args, i, "-i")?)?);
                i += 2;
            }
            "-o" => {
                output = Some(EndpointSpec::parse_output(flag_value(args, i, "-o")?)?);
                i += 2;
            }
            "-b" => {
                bidirectional = Some(EndpointSpec::parse_bidirectional(flag_value(
                    args, i, "-b",
                )?)?);
                i += 2;
            }
            "-t" => {
                timeout = parse_timeout(flag_value(args, i, "-t")?)?;
                i += 2;
            }
            other => {
                return Err(Error::InvalidArgument(other.to_string()));
            }
        }
    }

    let io = match (input, output, bidirectional) {
        (None, None, None) => IoConfig::Inherit,
        (Some(input), None, None) => IoConfig::Input { input },
        (None, Some(output), None) => IoConfig::Output { output },
        (Some(input), Some(output), None) => IoConfig::Both { input, output },
        (None, None, Some(endpoint)) => IoConfig::Bidirectional { endpoint },
        (_, _, Some(_)) => {
            return Err(Error::InvalidArgument(
                "-b cannot be combined with -i or -o".to_string(),
            ));
        }
    };

    let command = command.map(SpawnMode::shell).transpose()?;

    Ok(LaunchConfig {
        command,
        io,
        timeout,
    })
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &'static str) -> Result<&'a str> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or(Error::MissingValue { flag })
}

/// A non-positive value disables the guard rather than erroring, so
/// `-t 0` can be used to override an earlier `-t`.
fn parse_timeout(value: &str) -> Result<Option<Duration>> {
    let seconds: i64 = value
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("-t expects a number of seconds: '{value}'")))?;
    if seconds <= 0 {
        return Ok(None);
    }
    Ok(Some(Duration::from_secs(seconds as u64)))
}
