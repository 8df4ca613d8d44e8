//! sinodump-rpc - simpleRPC link to the dumper firmware
//!
//! The dumper is an Arduino running firmware that exports its primitives
//! through the [simpleRPC] protocol. This crate implements the host side of
//! that protocol and a [`DeviceSession`] on top of it.
//!
//! # Supported Transports
//!
//! - Serial port: `/dev/ttyUSB0`, `/dev/ttyACM0`, `COM1`, etc.
//! - TCP socket to a serial bridge: `host:port`
//!
//! # Example
//!
//! ```no_run
//! use sinodump_core::session::DeviceSession;
//! use sinodump_rpc::{open_serial, OpenOptions};
//!
//! let mut session = open_serial("/dev/ttyUSB0", None, &OpenOptions::default())?;
//! if session.connect()? {
//!     println!("JTAG ID: {:04X}", session.id()?);
//! }
//! session.disconnect()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! [simpleRPC]: https://simplerpc.readthedocs.io/

use std::time::Duration;

use sinodump_core::session::DeviceSession;

pub mod client;
pub mod device;
pub mod error;
pub mod protocol;
pub mod transport;

// Re-exports
pub use client::RpcClient;
pub use device::RpcSession;
pub use error::{Result, RpcError};
pub use protocol::{MethodSignature, TypeCode, Value};
pub use transport::serial::SerialTransport;
pub use transport::tcp::TcpTransport;
pub use transport::Transport;

/// Connection options for the dumper
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcConnection {
    /// Serial port connection
    Serial {
        /// Device path (e.g., "/dev/ttyUSB0" or "COM1")
        device: String,
        /// Baud rate (None for the firmware default)
        baud: Option<u32>,
    },
    /// TCP socket connection
    Tcp {
        /// Hostname or IP address
        host: String,
        /// Port number
        port: u16,
    },
}

impl RpcConnection {
    /// Parse a connection string
    ///
    /// Formats:
    /// - `dev=/dev/ttyUSB0` - Serial with default baud
    /// - `dev=/dev/ttyUSB0:115200` - Serial with specified baud (a trailing
    ///   `:<number>`; other colons belong to the device path)
    /// - `/dev/ttyUSB0` - Serial with default baud
    /// - `ip=host:port` - TCP connection
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        if let Some(dev) = s.strip_prefix("dev=") {
            // by-path device names contain colons; only a numeric suffix is a baud rate
            let split = dev
                .rsplit_once(':')
                .and_then(|(device, baud_str)| Some((device, baud_str.parse::<u32>().ok()?)));
            match split {
                Some((device, baud)) => Ok(RpcConnection::Serial {
                    device: device.to_string(),
                    baud: Some(baud),
                }),
                None if dev.is_empty() => Err("Missing device in dev= parameter".to_string()),
                None => Ok(RpcConnection::Serial {
                    device: dev.to_string(),
                    baud: None,
                }),
            }
        } else if let Some(ip) = s.strip_prefix("ip=") {
            let (host, port_str) = ip
                .rsplit_once(':')
                .ok_or_else(|| "Missing port in ip= parameter".to_string())?;
            let port = port_str
                .parse()
                .map_err(|_| format!("Invalid port: {}", port_str))?;
            Ok(RpcConnection::Tcp {
                host: host.to_string(),
                port,
            })
        } else if !s.is_empty() && !s.contains('=') {
            Ok(RpcConnection::Serial {
                device: s.to_string(),
                baud: None,
            })
        } else {
            Err(format!(
                "Invalid connection string: {}. Use dev=..., ip=... or a serial port path",
                s
            ))
        }
    }

    /// Use `baud` unless the connection string named one
    pub fn with_default_baud(self, baud: Option<u32>) -> Self {
        match self {
            RpcConnection::Serial { device, baud: None } => RpcConnection::Serial { device, baud },
            other => other,
        }
    }
}

/// Settings applied when opening a session
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Delay after opening the port (the Arduino resets on open)
    pub settle: Duration,
    /// Log every RPC call
    pub trace: bool,
    /// Timeout for the target handshake
    pub connect_timeout: Duration,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(2),
            trace: false,
            connect_timeout: device::CONNECT_TIMEOUT,
        }
    }
}

fn open_session<T: Transport>(transport: T, options: &OpenOptions) -> Result<RpcSession<T>> {
    let client = RpcClient::open(transport, options.settle)?;
    let mut session = RpcSession::new(client);
    session.set_trace(options.trace);
    session.set_connect_timeout(options.connect_timeout);
    Ok(session)
}

/// Open a dumper session and return it type-erased
///
/// This is a convenience function that handles both serial and TCP connections.
pub fn open_rpc(
    connection: &RpcConnection,
    options: &OpenOptions,
) -> std::result::Result<Box<dyn DeviceSession>, Box<dyn std::error::Error>> {
    match connection {
        RpcConnection::Serial { device, baud } => {
            Ok(Box::new(open_serial(device, *baud, options)?))
        }
        RpcConnection::Tcp { host, port } => Ok(Box::new(open_tcp(host, *port, options)?)),
    }
}

/// Open a dumper session via serial port
pub fn open_serial(
    device: &str,
    baud: Option<u32>,
    options: &OpenOptions,
) -> Result<RpcSession<SerialTransport>> {
    let transport = SerialTransport::open(device, baud)?;
    open_session(transport, options)
}

/// Open a dumper session via TCP
pub fn open_tcp(host: &str, port: u16, options: &OpenOptions) -> Result<RpcSession<TcpTransport>> {
    let transport = TcpTransport::connect(host, port)?;
    open_session(transport, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serial() {
        assert_eq!(
            RpcConnection::parse("dev=/dev/ttyUSB0:57600").unwrap(),
            RpcConnection::Serial {
                device: "/dev/ttyUSB0".into(),
                baud: Some(57600)
            }
        );
        assert_eq!(
            RpcConnection::parse("/dev/ttyACM0").unwrap(),
            RpcConnection::Serial {
                device: "/dev/ttyACM0".into(),
                baud: None
            }
        );
    }

    #[test]
    fn test_parse_tcp() {
        assert_eq!(
            RpcConnection::parse("ip=localhost:2000").unwrap(),
            RpcConnection::Tcp {
                host: "localhost".into(),
                port: 2000
            }
        );
        assert!(RpcConnection::parse("ip=localhost").is_err());
        assert!(RpcConnection::parse("ip=localhost:http").is_err());
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(RpcConnection::parse("spi=/dev/spidev0.0").is_err());
        assert!(RpcConnection::parse("").is_err());
        assert!(RpcConnection::parse("dev=").is_err());
    }

    #[test]
    fn test_parse_device_path_with_colons() {
        let path = "/dev/serial/by-path/pci-0000:00:14.0-usb-0:1:1.0-port0";
        assert_eq!(
            RpcConnection::parse(&format!("dev={}", path)).unwrap(),
            RpcConnection::Serial {
                device: path.into(),
                baud: None
            }
        );
        assert_eq!(
            RpcConnection::parse(&format!("dev={}:57600", path)).unwrap(),
            RpcConnection::Serial {
                device: path.into(),
                baud: Some(57600)
            }
        );
    }

    #[test]
    fn test_default_baud() {
        let conn = RpcConnection::parse("COM3").unwrap().with_default_baud(Some(9600));
        assert_eq!(
            conn,
            RpcConnection::Serial {
                device: "COM3".into(),
                baud: Some(9600)
            }
        );
        let conn = RpcConnection::parse("dev=COM3:57600")
            .unwrap()
            .with_default_baud(Some(9600));
        assert!(matches!(conn, RpcConnection::Serial { baud: Some(57600), .. }));
    }
}
