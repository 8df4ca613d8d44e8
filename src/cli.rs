//! CLI argument parsing

use crate::targets;
use clap::{Parser, Subcommand, ValueEnum};
use sinodump_core::method::ReadMethod;
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
pub fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Generate dynamic help text for the target argument
fn target_help() -> String {
    format!(
        "Dumper to use [{}]",
        targets::target_names_short()
    )
}

#[derive(Parser)]
#[command(name = "sinodump")]
#[command(author, version, about = "SinoWealth 8051 flash dumper", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log filter for the verbosity level
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Read method selection on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MethodArg {
    /// Detect the method that returns data
    #[default]
    Auto,
    /// In-circuit programming
    Icp,
    /// JTAG
    Jtag,
}

impl From<MethodArg> for ReadMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Auto => ReadMethod::Auto,
            MethodArg::Icp => ReadMethod::Icp,
            MethodArg::Jtag => ReadMethod::Jtag,
        }
    }
}

/// Connection options shared across commands
#[derive(clap::Args, Debug, Clone)]
pub struct TargetArgs {
    /// Dumper to use
    #[arg(short, long, help = target_help())]
    pub port: String,

    /// Serial baud rate (when the port does not name one)
    #[arg(short, long, default_value_t = 115200)]
    pub baudrate: u32,

    /// Print all RPC calls and responses
    #[arg(long)]
    pub debug_rpc: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show device information
    Info {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Dump flash contents to file
    Read {
        #[command(flatten)]
        target: TargetArgs,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Flash read method
        #[arg(long, value_enum, default_value_t = MethodArg::Auto)]
        method: MethodArg,

        /// Start address (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,

        /// Number of bytes to read (hex or decimal, default: to the end of flash)
        #[arg(long, value_parser = parse_hex_u32)]
        length: Option<u32>,

        /// Read from the custom block area instead of main flash
        #[arg(long)]
        custom_block: bool,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// List supported dumper connections
    ListTargets,
}
