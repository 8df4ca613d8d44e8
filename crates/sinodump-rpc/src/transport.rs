//! Transport layer abstraction for RPC communication
//!
//! This module provides a unified interface for serial and TCP transports.
//! TCP is meant for serial-to-network bridges (ser2net and the like).

use std::time::Duration;

use crate::error::{Result, RpcError};

/// Default reply timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport trait for reading and writing bytes
pub trait Transport {
    /// Write bytes to the transport
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read bytes from the transport
    ///
    /// Reads exactly `buf.len()` bytes into the buffer.
    /// Returns an error if not enough bytes arrive before the timeout.
    fn read(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Read with timeout (non-blocking)
    ///
    /// Reads up to `buf.len()` bytes, waiting up to `timeout_ms` milliseconds.
    /// Returns the number of bytes read, or 0 if timeout.
    fn read_nonblock(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize>;

    /// Flush any buffered data
    fn flush(&mut self) -> Result<()>;

    /// Current read timeout
    fn timeout(&self) -> Duration;

    /// Set the read timeout
    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read(buf)
    }

    fn read_nonblock(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize> {
        (**self).read_nonblock(buf, timeout_ms)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn timeout(&self) -> Duration {
        (**self).timeout()
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        (**self).set_timeout(timeout)
    }
}

pub mod serial {
    //! Serial port transport implementation

    use super::*;
    use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
    use std::io::{Read, Write};

    /// Baud rate of the dumper firmware
    pub const DEFAULT_BAUD: u32 = 115200;

    /// Serial port transport
    pub struct SerialTransport {
        port: Box<dyn SerialPort>,
    }

    impl SerialTransport {
        /// Open a serial port with the specified baud rate
        ///
        /// Uses 115200 baud (the firmware default) when `baud` is `None`.
        pub fn open(device: &str, baud: Option<u32>) -> Result<Self> {
            let baud_rate = baud.unwrap_or(DEFAULT_BAUD);

            let port = serialport::new(device, baud_rate)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .timeout(DEFAULT_TIMEOUT)
                .open()?;

            log::info!("Opened serial port {} at {} baud", device, baud_rate);

            Ok(Self { port })
        }
    }

    impl Transport for SerialTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.port.write_all(data)?;
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<()> {
            self.port.read_exact(buf)?;
            Ok(())
        }

        fn read_nonblock(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize> {
            // Set temporary timeout
            let old_timeout = self.port.timeout();
            self.port
                .set_timeout(Duration::from_millis(timeout_ms as u64))?;

            let result = match self.port.read(buf) {
                Ok(n) => Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
                Err(e) => Err(RpcError::from(e)),
            };

            // Restore timeout
            self.port.set_timeout(old_timeout)?;
            result
        }

        fn flush(&mut self) -> Result<()> {
            self.port.flush()?;
            Ok(())
        }

        fn timeout(&self) -> Duration {
            self.port.timeout()
        }

        fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
            self.port.set_timeout(timeout)?;
            Ok(())
        }
    }
}

pub mod tcp {
    //! TCP socket transport implementation

    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;

    /// TCP socket transport
    pub struct TcpTransport {
        stream: TcpStream,
        timeout: Duration,
    }

    impl TcpTransport {
        /// Connect to a serial bridge at the specified host and port
        pub fn connect(host: &str, port: u16) -> Result<Self> {
            let addr = format!("{}:{}", host, port);
            log::info!("Connecting to serial bridge at {}", addr);

            let stream = TcpStream::connect(&addr)
                .map_err(|e| RpcError::ConnectionFailed(e.to_string()))?;

            // Set TCP_NODELAY to reduce latency
            stream.set_nodelay(true).map_err(|e| {
                RpcError::ConnectionFailed(format!("Failed to set TCP_NODELAY: {}", e))
            })?;

            let mut transport = Self {
                stream,
                timeout: DEFAULT_TIMEOUT,
            };
            transport
                .set_timeout(DEFAULT_TIMEOUT)
                .map_err(|e| RpcError::ConnectionFailed(format!("Failed to set timeout: {}", e)))?;

            log::info!("Connected to serial bridge at {}", addr);

            Ok(transport)
        }
    }

    impl Transport for TcpTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.stream.write_all(data)?;
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<()> {
            self.stream.read_exact(buf)?;
            Ok(())
        }

        fn read_nonblock(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize> {
            // Set temporary timeout (zero would mean blocking forever)
            let timeout = Duration::from_millis(timeout_ms.max(1) as u64);
            self.stream.set_read_timeout(Some(timeout))?;

            let result = match self.stream.read(buf) {
                Ok(n) => Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
                Err(e) => Err(RpcError::from(e)),
            };

            // Restore timeout
            self.stream.set_read_timeout(Some(self.timeout))?;
            result
        }

        fn flush(&mut self) -> Result<()> {
            self.stream.flush()?;
            Ok(())
        }

        fn timeout(&self) -> Duration {
            self.timeout
        }

        fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
            self.stream.set_read_timeout(Some(timeout))?;
            self.stream.set_write_timeout(Some(timeout))?;
            self.timeout = timeout;
            Ok(())
        }
    }
}
