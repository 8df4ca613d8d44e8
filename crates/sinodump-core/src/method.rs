//! Read method selection
//!
//! The dumper firmware can read target flash through two unrelated
//! protocols, ICP and JTAG. A caller asks for one of them or for `Auto`;
//! `Auto` is resolved against the target before the first block read and
//! never reaches the acquisition loop.

use core::fmt;

use crate::error::Error;

/// Read method as exchanged with the dumper firmware
///
/// The discriminants are the wire codes returned by `detectReadMethod`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ReadMethod {
    /// Detection failed (neither method returned non-blank data)
    Failed = 0,
    /// In-circuit programming mode
    Icp = 1,
    /// JTAG debug mode
    Jtag = 2,
    /// Resolve at read time via detection
    #[default]
    Auto = 3,
}

impl ReadMethod {
    /// The transfer method this resolves to, if it is a concrete method
    pub fn transfer(self) -> Option<TransferMethod> {
        match self {
            Self::Icp => Some(TransferMethod::Icp),
            Self::Jtag => Some(TransferMethod::Jtag),
            Self::Failed | Self::Auto => None,
        }
    }

    /// Get the method name as used on the command line
    pub fn name(self) -> &'static str {
        match self {
            Self::Failed => "failed",
            Self::Icp => "icp",
            Self::Jtag => "jtag",
            Self::Auto => "auto",
        }
    }
}

impl TryFrom<u8> for ReadMethod {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Failed),
            1 => Ok(Self::Icp),
            2 => Ok(Self::Jtag),
            3 => Ok(Self::Auto),
            _ => Err(Error::InvalidMethodCode(code)),
        }
    }
}

impl From<TransferMethod> for ReadMethod {
    fn from(method: TransferMethod) -> Self {
        match method {
            TransferMethod::Icp => Self::Icp,
            TransferMethod::Jtag => Self::Jtag,
        }
    }
}

impl fmt::Display for ReadMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A resolved read protocol
///
/// Selected once per read and bound to the acquisition loop for its whole
/// duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferMethod {
    /// In-circuit programming mode
    Icp,
    /// JTAG debug mode
    Jtag,
}

impl TransferMethod {
    /// Upper-case protocol name, also the suffix of the remote procedures
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Icp => "ICP",
            Self::Jtag => "JTAG",
        }
    }
}

impl fmt::Display for TransferMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_codes() {
        assert_eq!(ReadMethod::try_from(0), Ok(ReadMethod::Failed));
        assert_eq!(ReadMethod::try_from(1), Ok(ReadMethod::Icp));
        assert_eq!(ReadMethod::try_from(2), Ok(ReadMethod::Jtag));
        assert_eq!(ReadMethod::try_from(3), Ok(ReadMethod::Auto));
        assert_eq!(ReadMethod::try_from(7), Err(Error::InvalidMethodCode(7)));
        assert_eq!(ReadMethod::Jtag as u8, 2);
    }

    #[test]
    fn test_only_concrete_methods_transfer() {
        assert_eq!(ReadMethod::Icp.transfer(), Some(TransferMethod::Icp));
        assert_eq!(ReadMethod::Jtag.transfer(), Some(TransferMethod::Jtag));
        assert_eq!(ReadMethod::Auto.transfer(), None);
        assert_eq!(ReadMethod::Failed.transfer(), None);
        assert_eq!(ReadMethod::from(TransferMethod::Jtag), ReadMethod::Jtag);
    }
}
