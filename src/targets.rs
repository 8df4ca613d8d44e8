//! Dumper registration and dispatch
//!
//! A target string selects the dumper connection. Serial and TCP strings go
//! to the simpleRPC client; `dummy[:key=value,...]` opens an emulated target
//! for trying the tool without hardware.

use std::collections::HashMap;
use std::error::Error;

use sinodump_core::session::DeviceSession;
use sinodump_rpc::{open_rpc, OpenOptions, RpcConnection};

use crate::cli::TargetArgs;

/// Information about a target kind
pub struct TargetInfo {
    /// Name or connection string form
    pub name: &'static str,
    /// Short description
    pub description: &'static str,
}

/// Get information about all available targets (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_targets() -> Vec<TargetInfo> {
    let mut targets = Vec::new();

    targets.push(TargetInfo {
        name: "dev=<port>[:baud]",
        description: "Dumper firmware on a serial port (a bare port path works too)",
    });

    targets.push(TargetInfo {
        name: "ip=<host>:<port>",
        description: "Dumper firmware behind a serial-to-TCP bridge",
    });

    #[cfg(feature = "dummy")]
    targets.push(TargetInfo {
        name: "dummy",
        description: "Emulated target (chip_type=,flash_size=,custom_block=,product_block=,\
                      icp=,jtag=,id=,fill=,image=<file>,fail_at=<addr>,detect=<method>)",
    });

    targets
}

/// Generate a short list of target forms for CLI help
pub fn target_names_short() -> String {
    let targets = available_targets();
    let names: Vec<&str> = targets.iter().map(|t| t.name).collect();
    names.join(", ")
}

/// Print the supported targets
pub fn list_targets() {
    println!("Supported targets:");
    println!();
    for t in available_targets() {
        println!("  {:20} - {}", t.name, t.description);
    }
}

/// Parsed target parameters
pub struct TargetParams {
    /// Target name
    pub name: String,
    /// Key-value parameters
    pub params: HashMap<String, String>,
}

/// Parse a target string into name and parameters
///
/// Format: "name" or "name:key1=value1,key2=value2"
pub fn parse_target_params(s: &str) -> Result<TargetParams, Box<dyn Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(
                    format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                );
            }
        }
    }

    Ok(TargetParams {
        name: name.to_string(),
        params,
    })
}

/// Whether the target string names the emulated target
fn is_dummy(target: &str) -> bool {
    target.split_once(':').map_or(target, |(name, _)| name) == "dummy"
}

/// Open a dumper session
///
/// # Arguments
/// * `args` - Target string, baud rate and tracing switch from the command line
///
/// # Returns
/// A type-erased session; it is not connected yet
pub fn open_target(args: &TargetArgs) -> Result<Box<dyn DeviceSession>, Box<dyn Error>> {
    if is_dummy(&args.port) {
        let params = parse_target_params(&args.port)?;
        return open_dummy(&params);
    }

    let connection = RpcConnection::parse(&args.port)?.with_default_baud(Some(args.baudrate));
    let options = OpenOptions {
        trace: args.debug_rpc,
        ..OpenOptions::default()
    };

    match &connection {
        RpcConnection::Serial { device, .. } => println!("Opening serial port {}...", device),
        RpcConnection::Tcp { host, port } => println!("Connecting to {}:{}...", host, port),
    }

    open_rpc(&connection, &options).map_err(|e| format!("Failed to open dumper: {}", e).into())
}

#[cfg(feature = "dummy")]
fn open_dummy(params: &TargetParams) -> Result<Box<dyn DeviceSession>, Box<dyn Error>> {
    use crate::cli::parse_hex_u32;
    use sinodump_core::method::ReadMethod;
    use sinodump_dummy::{DummyConfig, DummyTarget};

    fn parse_bool(key: &str, value: &str) -> Result<bool, Box<dyn Error>> {
        match value {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(format!("Invalid value for {}: {}", key, value).into()),
        }
    }

    fn parse_num<T: TryFrom<u32>>(key: &str, value: &str) -> Result<T, Box<dyn Error>> {
        let n = parse_hex_u32(value)?;
        T::try_from(n).map_err(|_| format!("Value out of range for {}: {}", key, value).into())
    }

    let mut config = DummyConfig::default();
    let mut image = None;
    let mut fail_at = None;
    let mut detect = None;

    for (key, value) in &params.params {
        match key.as_str() {
            "chip_type" => config.chip_type = parse_num(key, value)?,
            "flash_size" => config.flash_size = parse_num(key, value)?,
            "custom_block" => config.custom_block = parse_num(key, value)?,
            "product_block" => config.product_block = parse_bool(key, value)?,
            "icp" => config.icp = parse_bool(key, value)?,
            "jtag" => config.jtag = parse_bool(key, value)?,
            "id" => config.jtag_id = parse_num(key, value)?,
            "fill" => config.fill = parse_num(key, value)?,
            "image" => image = Some(std::fs::read(value)?),
            "fail_at" => fail_at = Some(parse_hex_u32(value)?),
            "detect" => {
                detect = Some(match value.as_str() {
                    "icp" => ReadMethod::Icp,
                    "jtag" => ReadMethod::Jtag,
                    "failed" => ReadMethod::Failed,
                    _ => return Err(format!("Invalid detect method: {}", value).into()),
                })
            }
            _ => return Err(format!("Unknown dummy parameter: {}", key).into()),
        }
    }

    log::info!(
        "Using emulated target: chip type {}, {} bytes of flash",
        config.chip_type,
        config.flash_size
    );

    let mut target = match image {
        Some(data) => DummyTarget::with_data(config, &data),
        None => DummyTarget::new(config),
    };
    if let Some(address) = fail_at {
        target.fail_block_at(address & !0xF);
    }
    if let Some(method) = detect {
        target.set_detected_method(method);
    }
    Ok(Box::new(target))
}

#[cfg(not(feature = "dummy"))]
fn open_dummy(_params: &TargetParams) -> Result<Box<dyn DeviceSession>, Box<dyn Error>> {
    Err("Emulated target not available (recompile with the dummy feature)".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(port: &str) -> TargetArgs {
        TargetArgs {
            port: port.to_string(),
            baudrate: 115200,
            debug_rpc: false,
        }
    }

    #[test]
    fn test_parse_target_params() {
        let params = parse_target_params("dummy:chip_type=4,flash_size=0x20000").unwrap();
        assert_eq!(params.name, "dummy");
        assert_eq!(params.params.get("chip_type").map(String::as_str), Some("4"));
        assert_eq!(params.params.get("flash_size").map(String::as_str), Some("0x20000"));
        assert!(parse_target_params("dummy:chip_type").is_err());
    }

    #[test]
    fn test_serial_paths_are_not_dummy() {
        assert!(is_dummy("dummy"));
        assert!(is_dummy("dummy:fill=0"));
        assert!(!is_dummy("dev=/dev/ttyUSB0:115200"));
        assert!(!is_dummy("/dev/dummy0"));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy_with_params() {
        let mut session = open_target(&args("dummy:chip_type=7,flash_size=0x20000,custom_block=3")).unwrap();
        assert!(session.connect().unwrap());
        let profile = session.chip_profile().unwrap();
        assert_eq!(profile.chip_type, 7);
        assert_eq!(profile.flash_size, 0x20000);
        assert_eq!(profile.code_options_size, 512);
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy_rejects_unknown_keys() {
        assert!(open_target(&args("dummy:speed=fast")).is_err());
        assert!(open_target(&args("dummy:chip_type=300")).is_err());
        assert!(open_target(&args("dummy:detect=auto")).is_err());
    }

    #[test]
    fn test_rejects_bad_connection_string() {
        assert!(open_target(&args("spi=/dev/spidev0.0")).is_err());
    }
}
