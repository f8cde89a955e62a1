//! topoforge CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Topology validation failure
//! - 4: Resource resolution failure
//! - 5: No project copy could be scaffolded
//! - 6: Apply failed without an exit code (otherwise the tool's own code)
//! - 130: Interrupted

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use topoforge_iac::IacError;
use topoforge_topology::TopologyError;

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const RESOLUTION_FAILURE: u8 = 4;
    pub const SCAFFOLD_FAILURE: u8 = 5;
    pub const APPLY_FAILURE: u8 = 6;
    pub const INTERRUPTED: u8 = 130;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = cli.config.clone();
    let run = async move {
        match cli.command {
            Commands::Generate(args) => commands::generate::execute(args, config.as_deref()).await,
            Commands::Validate(args) => commands::validate::execute(args, config.as_deref()).await,
        }
    };

    let result = tokio::select! {
        result = run => result,
        Ok(()) = tokio::signal::ctrl_c() => {
            eprintln!("generation interrupted");
            // Blocking scaffold tasks still in flight must not hold the process open.
            std::process::exit(i32::from(ExitCodes::INTERRUPTED));
        }
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            for detail in error_details(&e) {
                eprintln!("   - {}", detail);
            }
            ExitCode::from(categorize_error(&e))
        }
    }
}

fn init_logging(cli: &Cli) {
    let default_directive = if cli.verbose {
        "topoforge=debug,info"
    } else if cli.quiet {
        "warn"
    } else {
        "topoforge=info,warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

/// Every violation or resolver message behind a failure.
fn error_details(e: &anyhow::Error) -> Vec<String> {
    if let Some(err) = e.downcast_ref::<TopologyError>() {
        return err.violations().to_vec();
    }
    match e.downcast_ref::<IacError>() {
        Some(IacError::Topology(err)) => err.violations().to_vec(),
        Some(IacError::ResolutionFailed(messages)) => messages.clone(),
        _ => Vec::new(),
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if e.downcast_ref::<TopologyError>().is_some() {
        return ExitCodes::VALIDATION_FAILURE;
    }

    match e.downcast_ref::<IacError>() {
        Some(IacError::InvalidProvider(_)) => ExitCodes::INVALID_ARGS,
        Some(IacError::Topology(_)) => ExitCodes::VALIDATION_FAILURE,
        Some(IacError::ResolutionFailed(_)) => ExitCodes::RESOLUTION_FAILURE,
        Some(IacError::NoCopiesScaffolded(_)) | Some(IacError::TemplateNotFound(_)) => {
            ExitCodes::SCAFFOLD_FAILURE
        }
        Some(IacError::ApplyFailed { exit_code, .. }) => apply_exit_code(*exit_code),
        _ => ExitCodes::GENERAL_ERROR,
    }
}

/// The provisioning tool's own exit status, when it fits a process exit code.
fn apply_exit_code(code: Option<i32>) -> u8 {
    code.and_then(|c| u8::try_from(c).ok())
        .filter(|c| *c != 0)
        .unwrap_or(ExitCodes::APPLY_FAILURE)
}
