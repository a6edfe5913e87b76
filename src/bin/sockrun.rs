//! sockrun - socket-wired process launcher CLI.
//!
//! ## Usage
//!
//! ```sh
//! sockrun -e <command> [-i <spec>] [-o <spec>] [-t <seconds>]
//! sockrun -e <command> -b TCPS<port> [-t <seconds>]
//! sockrun -i <spec> | -o <spec>          # proxy bytes, no subprocess
//! ```
//!
//! Exit code is the command's own exit code, or 1 on any configuration,
//! resource, or process error, or on timeout. Diagnostics go to stderr;
//! the proxied byte streams are never polluted.

use std::process::ExitCode;

use tracing::debug;
use tracing_subscriber::EnvFilter;

use sockrun::config;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs to stderr only: stdout may be a proxied stream.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match config::parse_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("{}", config::USAGE);
            return ExitCode::FAILURE;
        }
    };

    debug!(?config, "configuration parsed");

    match sockrun::run(config).await {
        Ok(code) => u8::try_from(code).map(ExitCode::from).unwrap_or(ExitCode::FAILURE),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
