//! sinodump-dummy - Emulated dumper and target for testing
//!
//! This crate provides a [`DeviceSession`] that answers like the dumper
//! firmware attached to a SinoWealth 8051 part, with flash and custom block
//! contents kept in memory. Faults can be injected per address and per read
//! method, which makes it useful for exercising the partial-read paths of the
//! flash reader without real hardware.

use std::collections::BTreeSet;

use sinodump_core::chip::ChipProfile;
use sinodump_core::error::Result;
use sinodump_core::method::{ReadMethod, TransferMethod};
use sinodump_core::session::{DeviceSession, BLOCK_SIZE, SENTINEL_BYTE};

/// Size of the emulated custom block area
pub const CUSTOM_BLOCK_SIZE: usize = 0x4000;

/// Configuration for the emulated target
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Chip type (1-7)
    pub chip_type: u8,
    /// Flash size in bytes
    pub flash_size: u32,
    /// Product block present
    pub product_block: bool,
    /// Custom block type
    pub custom_block: u8,
    /// JTAG ID code
    pub jtag_id: u16,
    /// Whether ICP reads work
    pub icp: bool,
    /// Whether JTAG reads work
    pub jtag: bool,
    /// Value of never-written flash bytes
    pub fill: u8,
}

impl Default for DummyConfig {
    fn default() -> Self {
        // the stock firmware configuration
        Self {
            chip_type: 2,
            flash_size: 32 * 1024,
            product_block: true,
            custom_block: 3,
            jtag_id: 0xF0E2,
            icp: true,
            jtag: true,
            fill: 0xFF,
        }
    }
}

/// Emulated dumper session
pub struct DummyTarget {
    config: DummyConfig,
    profile: ChipProfile,
    flash: Vec<u8>,
    custom: Vec<u8>,
    staging: [u8; BLOCK_SIZE],
    connected: bool,
    fail_at: BTreeSet<u32>,
    detect_override: Option<ReadMethod>,
    block_reads: Vec<(TransferMethod, u32, bool)>,
}

impl DummyTarget {
    /// Create a new target with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let profile = ChipProfile::from_config(
            config.chip_type,
            config.flash_size,
            config.product_block,
            config.custom_block,
        );
        Self {
            flash: vec![config.fill; config.flash_size as usize],
            custom: vec![config.fill; CUSTOM_BLOCK_SIZE],
            staging: [SENTINEL_BYTE; BLOCK_SIZE],
            connected: true,
            fail_at: BTreeSet::new(),
            detect_override: None,
            block_reads: Vec::new(),
            profile,
            config,
        }
    }

    /// Create a new target with the stock firmware configuration
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a target with pre-filled flash
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut target = Self::new(config);
        let len = std::cmp::min(initial_data.len(), target.flash.len());
        target.flash[..len].copy_from_slice(&initial_data[..len]);
        target
    }

    /// Get a reference to the flash contents
    pub fn flash(&self) -> &[u8] {
        &self.flash
    }

    /// Get a mutable reference to the flash contents
    pub fn flash_mut(&mut self) -> &mut [u8] {
        &mut self.flash
    }

    /// Get a mutable reference to the custom block contents
    pub fn custom_block_mut(&mut self) -> &mut [u8] {
        &mut self.custom
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Make block reads at `address` fail
    pub fn fail_block_at(&mut self, address: u32) {
        self.fail_at.insert(address);
    }

    /// Force the result of read method detection
    pub fn set_detected_method(&mut self, method: ReadMethod) {
        self.detect_override = Some(method);
    }

    /// Record of all block reads: (method, address, custom block)
    pub fn block_reads(&self) -> &[(TransferMethod, u32, bool)] {
        &self.block_reads
    }

    fn method_enabled(&self, method: TransferMethod) -> bool {
        match method {
            TransferMethod::Icp => self.config.icp,
            TransferMethod::Jtag => self.config.jtag,
        }
    }

    /// Copy target memory into `buf`, as the firmware's flash read does
    fn read_into(&self, method: TransferMethod, address: u32, custom: bool, buf: &mut [u8]) -> bool {
        if !self.method_enabled(method) {
            return false;
        }
        // JTAG cannot reach the custom block
        if custom && method == TransferMethod::Jtag {
            return false;
        }
        let memory = if custom { &self.custom } else { &self.flash };
        let start = address as usize;
        match memory.get(start..start + buf.len()) {
            Some(src) => {
                buf.copy_from_slice(src);
                true
            }
            None => false,
        }
    }

    fn probe_method(&self, method: TransferMethod) -> bool {
        let mut head = [0u8; 4];
        self.read_into(method, 0, false, &mut head) && u32::from_le_bytes(head) != 0
    }
}

impl DeviceSession for DummyTarget {
    fn connect(&mut self) -> Result<bool> {
        self.connected = self.config.icp || self.config.jtag;
        log::debug!("dummy: connect -> {}", self.connected);
        Ok(self.connected)
    }

    fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn check_icp(&mut self) -> Result<bool> {
        Ok(self.connected && self.config.icp)
    }

    fn check_jtag(&mut self) -> Result<bool> {
        Ok(self.connected && self.config.jtag)
    }

    fn ping_icp(&mut self) -> Result<()> {
        Ok(())
    }

    fn id(&mut self) -> Result<u16> {
        Ok(if self.connected { self.config.jtag_id } else { 0 })
    }

    fn detect_read_method(&mut self) -> Result<ReadMethod> {
        if !self.connected {
            return Ok(ReadMethod::Failed);
        }
        if let Some(method) = self.detect_override {
            return Ok(method);
        }
        Ok(if self.probe_method(TransferMethod::Icp) {
            ReadMethod::Icp
        } else if self.probe_method(TransferMethod::Jtag) {
            ReadMethod::Jtag
        } else {
            ReadMethod::Failed
        })
    }

    fn chip_type(&mut self) -> Result<u8> {
        Ok(if self.connected { self.profile.chip_type } else { 0 })
    }

    fn flash_size(&mut self) -> Result<u32> {
        Ok(if self.connected { self.profile.flash_size } else { 0 })
    }

    fn product_block(&mut self) -> Result<bool> {
        Ok(self.connected && self.profile.product_block_enabled)
    }

    fn custom_block(&mut self) -> Result<u8> {
        Ok(if self.connected { self.profile.custom_block_type } else { 0 })
    }

    fn product_block_address(&mut self) -> Result<u32> {
        Ok(if self.connected { self.profile.product_block_address } else { 0 })
    }

    fn code_options_address(&mut self) -> Result<u32> {
        Ok(if self.connected { self.profile.code_options_address } else { 0 })
    }

    fn code_options_size(&mut self) -> Result<u32> {
        Ok(if self.connected { self.profile.code_options_size } else { 0 })
    }

    fn code_options_in_flash(&mut self) -> Result<bool> {
        Ok(self.connected && self.profile.code_options_in_flash)
    }

    fn read_byte(&mut self, method: TransferMethod, address: u32, custom_block: bool) -> Result<u8> {
        let mut byte = [SENTINEL_BYTE];
        if self.connected && self.read_into(method, address, custom_block, &mut byte) {
            Ok(byte[0])
        } else {
            Ok(SENTINEL_BYTE)
        }
    }

    fn read_block(&mut self, method: TransferMethod, address: u32, custom_block: bool) -> Result<bool> {
        if !self.connected {
            return Ok(false);
        }
        self.block_reads.push((method, address, custom_block));
        if self.fail_at.contains(&address) {
            log::debug!("dummy: injected failure at 0x{:06X}", address);
            return Ok(false);
        }
        let mut block = [0u8; BLOCK_SIZE];
        if !self.read_into(method, address, custom_block, &mut block) {
            return Ok(false);
        }
        self.staging = block;
        Ok(true)
    }

    fn buffer_byte(&mut self, index: usize) -> Result<u8> {
        if !self.connected {
            return Ok(SENTINEL_BYTE);
        }
        Ok(self.staging.get(index).copied().unwrap_or(SENTINEL_BYTE))
    }
}
