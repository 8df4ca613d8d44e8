//! Error types for RPC operations

use sinodump_core::Error as CoreError;
use thiserror::Error;

/// RPC-specific errors
#[derive(Debug, Error)]
pub enum RpcError {
    /// Failed to connect to the dumper
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The interface listing did not start with the protocol name
    #[error("Missing simpleRPC protocol header")]
    MissingHeader,

    /// Unsupported protocol version
    #[error("Unsupported protocol version: {0}.{1}.{2}")]
    UnsupportedVersion(u8, u8, u8),

    /// The hardware description could not be parsed
    #[error("Invalid hardware description: {0:?}")]
    InvalidHardware(String),

    /// A method descriptor could not be parsed
    #[error("Malformed method descriptor: {0:?}")]
    MalformedSignature(String),

    /// Type code not supported by this client
    #[error("Unsupported type code '{0}'")]
    UnsupportedType(char),

    /// The firmware does not export the method
    #[error("Method '{0}' not provided by the firmware")]
    UnknownMethod(String),

    /// Wrong number of arguments for a call
    #[error("Method '{method}' takes {expected} arguments, {given} given")]
    ArgumentCount {
        method: String,
        expected: usize,
        given: usize,
    },

    /// An argument does not fit its parameter type
    #[error("Argument {value:?} does not fit type '{code}'")]
    ArgumentRange { value: String, code: char },

    /// The method returned nothing or a value of the wrong kind
    #[error("Unexpected return value from '{0}'")]
    UnexpectedReturn(String),

    /// A string in the listing exceeded the length limit
    #[error("String in interface listing too long")]
    StringTooLong,

    /// I/O error during communication
    #[error("I/O error: {0}")]
    IoError(String),

    /// Timeout during communication
    #[error("Communication timeout")]
    Timeout,

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Serial port error
    #[error("Serial port error: {0}")]
    SerialError(#[from] serialport::Error),
}

/// Result type for RPC operations
pub type Result<T> = core::result::Result<T, RpcError>;

impl From<std::io::Error> for RpcError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => RpcError::Timeout,
            _ => RpcError::IoError(e.to_string()),
        }
    }
}

impl From<RpcError> for CoreError {
    fn from(e: RpcError) -> Self {
        log::debug!("rpc: {}", e);
        match e {
            RpcError::Timeout => CoreError::Timeout,
            RpcError::UnknownMethod(_) => CoreError::UnsupportedPrimitive,
            RpcError::IoError(_) | RpcError::SerialError(_) | RpcError::ConnectionFailed(_) => {
                CoreError::TransportError
            }
            _ => CoreError::ProtocolError,
        }
    }
}
