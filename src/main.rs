//! sysmend - poll, detect and repair Windows machine state
//!
//! Two loops share one engine:
//! - `channel`: verify the domain secure channel, repair it with a domain
//!   credential when broken, retrying within a bounded budget
//! - `network`: classify the active connection profiles as home or away and
//!   write the matching value to the registry when the location changes
//!
//! # Usage
//!
//! ```bash
//! # Repair once, prompting for a credential only if needed
//! sysmend channel --target dc01.corp.example --credentialSource interactive
//!
//! # Track the network location every 30 seconds
//! sysmend --logFile C:\ProgramData\sysmend\network.log network --intervalSeconds 30
//!
//! # Show both probes
//! sysmend status --format json
//! ```
//!
//! Exit codes: 0 success or nothing to do, 1 retries exhausted or probe
//! unavailable, 2 invalid arguments or credential.

use clap::Parser;
use std::process::ExitCode;
use sysmend::cli::{self, Cli, Commands};
use sysmend::error::{EXIT_INVALID, EXIT_OK};
use sysmend::{config, logging};
use tracing::{error, info, Level};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("sysmend: {:#}", e);
            return ExitCode::from(EXIT_INVALID);
        },
    };

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        logging::parse_level(&config.logging.level)
    };
    let log_file = cli.log_file.as_deref().or(config.logging.file.as_deref());
    let transcript = match logging::init(level, log_file) {
        Ok(transcript) => transcript,
        Err(e) => {
            eprintln!("sysmend: {:#}", e);
            return ExitCode::from(EXIT_INVALID);
        },
    };

    info!("sysmend v{} starting", sysmend::VERSION);

    let result = match &cli.command {
        Commands::Channel(args) => cli::run_channel(&config, args, cli.dry_run).await,
        Commands::Network(args) => cli::run_network(&config, args, cli.dry_run).await,
        Commands::Status(args) => cli::run_status(&config, args).await,
    };

    let code = match result {
        Ok(()) => EXIT_OK,
        Err(e) => {
            error!("{}", e);
            e.exit_code()
        },
    };

    drop(transcript);
    ExitCode::from(code)
}
