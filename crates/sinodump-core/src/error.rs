//! Error types for sinodump-core
//!
//! Disconnected-state sentinels are not errors (see
//! [`DeviceSession`](crate::session::DeviceSession)); this type only carries
//! faults of the transport underneath a session.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The transport failed to deliver a request or a reply
    TransportError,
    /// The transport timed out waiting for a reply
    Timeout,
    /// The remote end answered with something we could not decode
    ProtocolError,
    /// The remote end does not provide the requested primitive
    UnsupportedPrimitive,
    /// A read method code outside `0..=3` was received
    InvalidMethodCode(u8),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportError => write!(f, "transport error"),
            Self::Timeout => write!(f, "transport timed out"),
            Self::ProtocolError => write!(f, "malformed reply from target"),
            Self::UnsupportedPrimitive => write!(f, "primitive not provided by the dumper firmware"),
            Self::InvalidMethodCode(code) => write!(f, "invalid read method code {}", code),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
