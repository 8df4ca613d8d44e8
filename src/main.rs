//! sinodump - SinoWealth 8051 flash dumper
//!
//! Dumps the flash of SinoWealth 8051 microcontrollers through an Arduino
//! running the dumper firmware, which speaks simpleRPC over a serial port.
//!
//! # Architecture
//!
//! - `sinodump-core` holds the acquisition engine: read method resolution,
//!   16-byte aligned block reads, trimming and partial-read handling. It only
//!   sees the `DeviceSession` trait.
//! - `sinodump-rpc` implements `DeviceSession` on top of the firmware's
//!   simpleRPC interface (serial or TCP).
//! - `sinodump-dummy` implements it in memory for testing.

mod cli;
mod commands;
mod targets;

use clap::Parser;
use cli::{Cli, Commands};
use sinodump_core::flash::ReadRequest;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logger; RUST_LOG still wins over -v
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .init();

    let (target, action) = match cli.command {
        Commands::ListTargets => {
            targets::list_targets();
            return Ok(());
        }
        Commands::Info { target } => (target, Action::Info),
        Commands::Read {
            target,
            output,
            method,
            start,
            length,
            custom_block,
            quiet,
        } => {
            let mut request = ReadRequest::new(start)
                .method(method.into())
                .custom_block(custom_block);
            request.length = length;
            (target, Action::Read { output, request, quiet })
        }
    };

    let mut session = targets::open_target(&target)?;

    let result = run(session.as_mut(), action);

    // Leave the target alone whatever happened
    if let Err(e) = session.disconnect() {
        log::warn!("Failed to disconnect: {}", e);
    }
    drop(session);

    match result {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => Err(e),
    }
}

enum Action {
    Info,
    Read {
        output: std::path::PathBuf,
        request: ReadRequest,
        quiet: bool,
    },
}

/// Connect and run the action; `Ok(false)` means an incomplete dump
fn run(
    session: &mut dyn sinodump_core::session::DeviceSession,
    action: Action,
) -> Result<bool, Box<dyn std::error::Error>> {
    commands::connect(session)?;

    match action {
        Action::Info => {
            commands::info::run_info(session)?;
            Ok(true)
        }
        Action::Read {
            output,
            request,
            quiet,
        } => {
            commands::info::print_device_info(session)?;
            let outcome = commands::read::run_read(session, &output, request, quiet)?;
            Ok(outcome.is_complete())
        }
    }
}
