//! simpleRPC protocol constants and types
//!
//! Based on version 3 of the simpleRPC protocol as spoken by the Arduino
//! `simpleRPC` library.
//!
//! # Interface listing
//!
//! The host sends [`LIST_REQUEST`]. The device answers with a series of
//! NUL-terminated strings:
//!
//! 1. the protocol name `simpleRPC`, followed by three version bytes
//! 2. the hardware description: endianness (`<` or `>`) and the type code
//!    of `size_t`
//! 3. one descriptor per method, in index order
//! 4. an empty string
//!
//! A descriptor looks like `B: L ?;readByteICP: Read byte via ICP. @address: ...`:
//! return type, parameter types, then the documentation, which starts with
//! the method name.
//!
//! # Calls
//!
//! A call is the method index byte followed by the packed arguments; the
//! reply is the packed return value (nothing for `void`).

use crate::error::{Result, RpcError};

/// Byte requesting the interface listing
pub const LIST_REQUEST: u8 = 0xFF;

/// Protocol name at the start of the listing
pub const PROTOCOL_NAME: &[u8] = b"simpleRPC";

/// Protocol version we support (major must match)
pub const PROTOCOL_VERSION: (u8, u8, u8) = (3, 0, 0);

/// Upper bound for a single string in the listing
pub const MAX_STRING_LEN: usize = 1024;

/// Byte order of packed values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// `<`
    Little,
    /// `>`
    Big,
}

impl Endianness {
    /// Parse the endianness character of the hardware description
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            b'<' => Some(Self::Little),
            b'>' => Some(Self::Big),
            _ => None,
        }
    }
}

/// Scalar type codes (Python `struct` notation)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCode {
    /// `?`
    Bool,
    /// `c`
    Char,
    /// `b`
    I8,
    /// `B`
    U8,
    /// `h`
    I16,
    /// `H`
    U16,
    /// `i`, `l`
    I32,
    /// `I`, `L`
    U32,
    /// `q`
    I64,
    /// `Q`
    U64,
}

impl TypeCode {
    /// Parse a type code character
    pub fn from_char(c: char) -> Result<Self> {
        Ok(match c {
            '?' => Self::Bool,
            'c' => Self::Char,
            'b' => Self::I8,
            'B' => Self::U8,
            'h' => Self::I16,
            'H' => Self::U16,
            'i' | 'l' => Self::I32,
            'I' | 'L' => Self::U32,
            'q' => Self::I64,
            'Q' => Self::U64,
            _ => return Err(RpcError::UnsupportedType(c)),
        })
    }

    /// Canonical type code character
    pub fn as_char(self) -> char {
        match self {
            Self::Bool => '?',
            Self::Char => 'c',
            Self::I8 => 'b',
            Self::U8 => 'B',
            Self::I16 => 'h',
            Self::U16 => 'H',
            Self::I32 => 'i',
            Self::U32 => 'I',
            Self::I64 => 'q',
            Self::U64 => 'Q',
        }
    }

    /// Packed size in bytes
    pub fn size(self) -> usize {
        match self {
            Self::Bool | Self::Char | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 => 4,
            Self::I64 | Self::U64 => 8,
        }
    }

    fn is_signed(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }
}

/// A scalar argument or return value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Unsigned integer (also `char`)
    Unsigned(u64),
    /// Signed integer
    Signed(i64),
}

impl Value {
    /// Interpret as a boolean (integers are true when non-zero)
    pub fn as_bool(self) -> bool {
        match self {
            Self::Bool(b) => b,
            Self::Unsigned(v) => v != 0,
            Self::Signed(v) => v != 0,
        }
    }

    /// Interpret as an unsigned integer
    pub fn as_u64(self) -> Option<u64> {
        match self {
            Self::Bool(b) => Some(b as u64),
            Self::Unsigned(v) => Some(v),
            Self::Signed(v) => u64::try_from(v).ok(),
        }
    }

    /// Pack the value as `code` into `out`
    pub fn encode(self, code: TypeCode, endianness: Endianness, out: &mut Vec<u8>) -> Result<()> {
        let out_of_range = || RpcError::ArgumentRange {
            value: format!("{:?}", self),
            code: code.as_char(),
        };

        let raw: u64 = match (code, self) {
            (TypeCode::Bool, v) => v.as_bool() as u64,
            (_, Value::Bool(b)) => b as u64,
            (code, Value::Unsigned(v)) => {
                let bits = code.size() * 8 - code.is_signed() as usize;
                if bits < 64 && v >> bits != 0 {
                    return Err(out_of_range());
                }
                v
            }
            (code, Value::Signed(v)) => {
                let bits = code.size() * 8;
                if !code.is_signed() {
                    if v < 0 || (bits < 64 && (v as u64) >> bits != 0) {
                        return Err(out_of_range());
                    }
                } else if bits < 64 {
                    let min = -(1i64 << (bits - 1));
                    let max = (1i64 << (bits - 1)) - 1;
                    if v < min || v > max {
                        return Err(out_of_range());
                    }
                }
                v as u64
            }
        };

        let bytes = raw.to_le_bytes();
        let packed = &bytes[..code.size()];
        match endianness {
            Endianness::Little => out.extend_from_slice(packed),
            Endianness::Big => out.extend(packed.iter().rev()),
        }
        Ok(())
    }

    /// Unpack a value of type `code` from `bytes` (`code.size()` bytes)
    pub fn decode(code: TypeCode, bytes: &[u8], endianness: Endianness) -> Self {
        let mut raw = [0u8; 8];
        let size = code.size();
        match endianness {
            Endianness::Little => raw[..size].copy_from_slice(&bytes[..size]),
            Endianness::Big => {
                for (dst, src) in raw[..size].iter_mut().zip(bytes[..size].iter().rev()) {
                    *dst = *src;
                }
            }
        }
        let value = u64::from_le_bytes(raw);

        match code {
            TypeCode::Bool => Self::Bool(value != 0),
            code if code.is_signed() => {
                let shift = 64 - size * 8;
                Self::Signed(((value << shift) as i64) >> shift)
            }
            _ => Self::Unsigned(value),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Self::Unsigned(v as u64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Unsigned(v as u64)
    }
}

/// Hardware description from the listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareInfo {
    /// Byte order of packed values
    pub endianness: Endianness,
    /// Type of `size_t` on the device
    pub size_t: TypeCode,
}

impl HardwareInfo {
    /// Parse the two-character hardware description (e.g. `<H`)
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let invalid = || RpcError::InvalidHardware(String::from_utf8_lossy(raw).into_owned());
        match raw {
            [e, s] => Ok(Self {
                endianness: Endianness::from_code(*e).ok_or_else(invalid)?,
                size_t: TypeCode::from_char(*s as char).map_err(|_| invalid())?,
            }),
            _ => Err(invalid()),
        }
    }
}

/// A remote method from the interface listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    /// Index used to call the method
    pub index: u8,
    /// Method name
    pub name: String,
    /// Return type (`None` for `void`)
    pub returns: Option<TypeCode>,
    /// Parameter types
    pub params: Vec<TypeCode>,
    /// Documentation string (without the name)
    pub doc: String,
}

impl MethodSignature {
    /// Parse a method descriptor
    pub fn parse(index: u8, line: &[u8]) -> Result<Self> {
        let line = String::from_utf8_lossy(line);
        let malformed = || RpcError::MalformedSignature(line.to_string());

        let (signature, description) = line.split_once(';').ok_or_else(malformed)?;
        let (returns, params) = signature.split_once(':').ok_or_else(malformed)?;

        let returns = match returns.trim() {
            "" => None,
            code => Some(single_type(code)?),
        };
        let params = params
            .split_whitespace()
            .map(single_type)
            .collect::<Result<Vec<_>>>()?;

        let (name, doc) = description.split_once(':').unwrap_or((description, ""));
        let name = name.trim();
        if name.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            index,
            name: name.to_string(),
            returns,
            params,
            doc: doc.trim().to_string(),
        })
    }
}

/// Parse a type field that must hold exactly one scalar type code
fn single_type(field: &str) -> Result<TypeCode> {
    let mut chars = field.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => TypeCode::from_char(c),
        (Some(c), Some(_)) => Err(RpcError::UnsupportedType(c)),
        (None, _) => Err(RpcError::MalformedSignature(field.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method_with_params() {
        let sig = MethodSignature::parse(
            6,
            b"B: L ?;readByteICP: Read byte via ICP. @address: Addr. @customBlock: Flag. @return: Byte.",
        )
        .unwrap();
        assert_eq!(sig.index, 6);
        assert_eq!(sig.name, "readByteICP");
        assert_eq!(sig.returns, Some(TypeCode::U8));
        assert_eq!(sig.params, [TypeCode::U32, TypeCode::Bool]);
        assert!(sig.doc.starts_with("Read byte via ICP."));
    }

    #[test]
    fn test_parse_void_method() {
        let sig = MethodSignature::parse(1, b":;disconnect: Disconnect from target device.").unwrap();
        assert_eq!(sig.name, "disconnect");
        assert_eq!(sig.returns, None);
        assert!(sig.params.is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(MethodSignature::parse(0, b"no separators here").is_err());
        assert!(MethodSignature::parse(0, b"B: f;scale: Scale.").is_err());
        assert!(MethodSignature::parse(0, b"B: [B];sum: Sum.").is_err());
    }

    #[test]
    fn test_hardware_info() {
        let hw = HardwareInfo::parse(b"<H").unwrap();
        assert_eq!(hw.endianness, Endianness::Little);
        assert_eq!(hw.size_t, TypeCode::U16);
        assert!(HardwareInfo::parse(b"?H").is_err());
        assert!(HardwareInfo::parse(b"<").is_err());
    }

    #[test]
    fn test_encode_little_endian() {
        let mut out = Vec::new();
        Value::from(0x12345u32).encode(TypeCode::U32, Endianness::Little, &mut out).unwrap();
        Value::from(true).encode(TypeCode::Bool, Endianness::Little, &mut out).unwrap();
        assert_eq!(out, [0x45, 0x23, 0x01, 0x00, 0x01]);
    }

    #[test]
    fn test_encode_big_endian() {
        let mut out = Vec::new();
        Value::Unsigned(0x1234).encode(TypeCode::U16, Endianness::Big, &mut out).unwrap();
        assert_eq!(out, [0x12, 0x34]);
    }

    #[test]
    fn test_encode_range_checks() {
        let mut out = Vec::new();
        assert!(Value::Unsigned(256).encode(TypeCode::U8, Endianness::Little, &mut out).is_err());
        assert!(Value::Unsigned(128).encode(TypeCode::I8, Endianness::Little, &mut out).is_err());
        assert!(Value::Signed(-1).encode(TypeCode::U16, Endianness::Little, &mut out).is_err());
        assert!(Value::Signed(-129).encode(TypeCode::I8, Endianness::Little, &mut out).is_err());
        assert!(out.is_empty());
        Value::Signed(-2).encode(TypeCode::I16, Endianness::Little, &mut out).unwrap();
        assert_eq!(out, [0xFE, 0xFF]);
    }

    #[test]
    fn test_decode() {
        assert_eq!(
            Value::decode(TypeCode::U16, &[0x34, 0x12], Endianness::Little),
            Value::Unsigned(0x1234)
        );
        assert_eq!(
            Value::decode(TypeCode::I16, &[0xFF, 0xFE], Endianness::Big),
            Value::Signed(-2)
        );
        assert_eq!(
            Value::decode(TypeCode::Bool, &[0x01], Endianness::Little),
            Value::Bool(true)
        );
        assert_eq!(
            Value::decode(TypeCode::U32, &[0x00, 0x80, 0x00, 0x00], Endianness::Little).as_u64(),
            Some(0x8000)
        );
    }
}
