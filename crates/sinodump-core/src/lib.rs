//! sinodump-core - Flash acquisition engine
//!
//! This crate turns an arbitrary `[start, start + length)` byte range into a
//! sequence of 16-byte block reads against a SinoWealth 8051 target, and
//! reassembles the blocks into a byte-exact image. It is `no_std` compatible
//! (it needs `alloc` for the accumulation buffer).
//!
//! The target itself is reached through the [`session::DeviceSession`]
//! trait, which is implemented by the RPC client (`sinodump-rpc`) and by the
//! in-memory emulator (`sinodump-dummy`).
//!
//! # Example
//!
//! ```ignore
//! use sinodump_core::flash::{read_flash, NoProgress, ReadRequest};
//! use sinodump_core::method::ReadMethod;
//!
//! let request = ReadRequest::new(0x1005).length(20).method(ReadMethod::Auto);
//! let outcome = read_flash(&mut session, &request, &mut NoProgress)?;
//! if !outcome.is_complete() {
//!     println!("only read {} of {} bytes", outcome.data.len(), outcome.requested);
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod chip;
pub mod error;
pub mod flash;
pub mod method;
pub mod session;

pub use error::{Error, Result};
