//! Device session trait
//!
//! A `DeviceSession` is a thin pass-through to the primitives implemented by
//! the dumper firmware. It performs no retries and no alignment; that is the
//! job of [`crate::flash`].
//!
//! ## Disconnected state
//!
//! A session is live once its transport is open. A failed
//! [`connect`](DeviceSession::connect) or a call to
//! [`disconnect`](DeviceSession::disconnect) ends that; from then on every
//! primitive returns a sentinel instead of failing: `false` for probes and block reads,
//! `0` for identifiers and configuration queries, `0xFF` for byte reads and
//! [`ReadMethod::Failed`] for detection. Sentinels are indistinguishable from
//! real data (flash legitimately contains `0xFF`), so callers that care must
//! check [`is_connected`](DeviceSession::is_connected).
//!
//! `Err` is reserved for transport faults.
//!
//! ## Staging buffer
//!
//! [`read_block`](DeviceSession::read_block) fills a 16-byte staging buffer
//! on the target. Its contents are only valid between a successful block read
//! and the next one; read them out with [`buffer`](DeviceSession::buffer)
//! immediately.

use crate::chip::ChipProfile;
use crate::error::Result;
use crate::method::{ReadMethod, TransferMethod};

/// Size of one block read in bytes
pub const BLOCK_SIZE: usize = 16;

/// Contents of the staging buffer after a block read
pub type Block = [u8; BLOCK_SIZE];

/// Sentinel returned by byte reads without a live connection
pub const SENTINEL_BYTE: u8 = 0xFF;

/// Primitive operations against a dumper and its target
///
/// Sessions are single-owner: the transport is half-duplex and the staging
/// buffer is shared, so at most one operation may be in flight.
pub trait DeviceSession {
    /// Perform the target handshake
    ///
    /// The user must power-cycle the target around this call; it is not
    /// automated. On failure the session leaves the connected state; a later
    /// successful call re-enters it.
    fn connect(&mut self) -> Result<bool>;

    /// Leave the connected state (idempotent)
    fn disconnect(&mut self) -> Result<()>;

    /// Whether the session is live: open, `connect` has not failed and
    /// `disconnect` has not been called since
    fn is_connected(&self) -> bool;

    /// Probe ICP communication
    fn check_icp(&mut self) -> Result<bool>;

    /// Probe JTAG communication
    fn check_jtag(&mut self) -> Result<bool>;

    /// Keep the target in ICP mode
    fn ping_icp(&mut self) -> Result<()>;

    /// JTAG ID code of the target
    fn id(&mut self) -> Result<u16>;

    /// Ask the firmware which method returns non-blank data
    ///
    /// Returns `Failed`, `Icp` or `Jtag`, never `Auto`. Repeatable without
    /// side effects.
    fn detect_read_method(&mut self) -> Result<ReadMethod>;

    /// Configured chip type
    fn chip_type(&mut self) -> Result<u8>;

    /// Configured flash size in bytes
    fn flash_size(&mut self) -> Result<u32>;

    /// Product block flag
    fn product_block(&mut self) -> Result<bool>;

    /// Custom block type
    fn custom_block(&mut self) -> Result<u8>;

    /// Product block address
    fn product_block_address(&mut self) -> Result<u32>;

    /// Code options address
    fn code_options_address(&mut self) -> Result<u32>;

    /// Code options size in bytes
    fn code_options_size(&mut self) -> Result<u32>;

    /// Whether the code options are in main flash
    fn code_options_in_flash(&mut self) -> Result<bool>;

    /// Read a single byte
    fn read_byte(&mut self, method: TransferMethod, address: u32, custom_block: bool) -> Result<u8>;

    /// Read 16 bytes at `address` into the staging buffer
    ///
    /// `address` should be 16-byte aligned; this is not checked.
    fn read_block(&mut self, method: TransferMethod, address: u32, custom_block: bool)
        -> Result<bool>;

    /// One byte of the staging buffer (`0xFF` for an index past 15)
    fn buffer_byte(&mut self, index: usize) -> Result<u8>;

    /// The whole staging buffer
    fn buffer(&mut self) -> Result<Block> {
        let mut block = [SENTINEL_BYTE; BLOCK_SIZE];
        for (index, byte) in block.iter_mut().enumerate() {
            *byte = self.buffer_byte(index)?;
        }
        Ok(block)
    }

    /// Read every configuration query into a profile
    fn chip_profile(&mut self) -> Result<ChipProfile> {
        Ok(ChipProfile {
            chip_type: self.chip_type()?,
            flash_size: self.flash_size()?,
            product_block_enabled: self.product_block()?,
            product_block_address: self.product_block_address()?,
            custom_block_type: self.custom_block()?,
            code_options_address: self.code_options_address()?,
            code_options_size: self.code_options_size()?,
            code_options_in_flash: self.code_options_in_flash()?,
        })
    }
}
