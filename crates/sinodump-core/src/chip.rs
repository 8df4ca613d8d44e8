//! Target chip configuration
//!
//! The dumper firmware is built for one SinoWealth part at a time; its
//! configuration queries describe that part. The values are read once per
//! session and treated as opaque by the flash reader, apart from
//! `flash_size`, which defaults the read length.

/// Chip configuration as reported by the dumper firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChipProfile {
    /// Chip type (1-7, 0 if unknown)
    pub chip_type: u8,
    /// Flash size in bytes
    pub flash_size: u32,
    /// Whether the chip has a product block
    pub product_block_enabled: bool,
    /// Address of the product block in the custom block area
    pub product_block_address: u32,
    /// Custom block type
    pub custom_block_type: u8,
    /// Address of the code options
    pub code_options_address: u32,
    /// Size of the code options in bytes
    pub code_options_size: u32,
    /// Whether the code options live in main flash (else in the custom block)
    pub code_options_in_flash: bool,
}

impl ChipProfile {
    /// Build a profile from the firmware configuration constants
    ///
    /// Derives the product block and code option locations the same way the
    /// firmware does, so an emulated target answers like a real one.
    pub fn from_config(
        chip_type: u8,
        flash_size: u32,
        product_block_enabled: bool,
        custom_block_type: u8,
    ) -> Self {
        let options = CodeOptions::derive(chip_type, custom_block_type, flash_size);
        Self {
            chip_type,
            flash_size,
            product_block_enabled,
            product_block_address: product_block_address(custom_block_type),
            custom_block_type,
            code_options_address: options.address,
            code_options_size: options.size,
            code_options_in_flash: options.in_flash,
        }
    }

    /// Description of the chip type
    pub fn chip_type_description(&self) -> Option<&'static str> {
        chip_type_description(self.chip_type)
    }
}

/// Human-readable description of a chip type
pub fn chip_type_description(chip_type: u8) -> Option<&'static str> {
    match chip_type {
        0 => Some("Unknown"),
        1 => Some("Type 1 (64KB max)"),
        2 => Some("Type 2 (64KB max)"),
        3 => Some("Type 3 (64KB max)"),
        4 => Some("Type 4 (1MB max)"),
        5 => Some("Type 5 (64KB max)"),
        6 => Some("Type 6 (64KB max)"),
        7 => Some("Type 7 (128KB max)"),
        _ => None,
    }
}

/// Largest flash a chip of the given type can carry
pub fn max_flash_size(chip_type: u8) -> u32 {
    match chip_type {
        4 => 1024 * 1024,
        7 => 128 * 1024,
        _ => 64 * 1024,
    }
}

/// Product block address for a custom block type (0 if there is none)
pub fn product_block_address(custom_block_type: u8) -> u32 {
    match custom_block_type {
        2 => 0x0A00,
        3 => 0x1200,
        4 => 0x2200,
        _ => 0,
    }
}

/// Location of the code options area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeOptions {
    /// Start address
    pub address: u32,
    /// Size in bytes
    pub size: u32,
    /// Stored in main flash (true) or in the custom block (false)
    pub in_flash: bool,
}

impl CodeOptions {
    /// Default code options size
    pub const DEFAULT_SIZE: u32 = 64;

    /// Derive the code options location from the chip configuration
    ///
    /// Most parts keep 64 bytes of options at the very end of flash; a few
    /// custom block layouts move them into the custom block.
    pub fn derive(chip_type: u8, custom_block_type: u8, flash_size: u32) -> Self {
        let tail = |size: u32| Self {
            address: flash_size.wrapping_sub(size),
            size,
            in_flash: true,
        };
        let custom = |address: u32, size: u32| Self {
            address,
            size,
            in_flash: false,
        };

        match (custom_block_type, chip_type) {
            (2, 2) => custom(0x0800, Self::DEFAULT_SIZE),
            (3, 2) => custom(0x1000, Self::DEFAULT_SIZE),
            (3, 7) => custom(0x1000, 512),
            (4, _) => custom(0x2000, Self::DEFAULT_SIZE),
            (6, _) => tail(32),
            _ => tail(Self::DEFAULT_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_options_default_tail() {
        let opts = CodeOptions::derive(1, 1, 32768);
        assert_eq!(opts.address, 32768 - 64);
        assert_eq!(opts.size, 64);
        assert!(opts.in_flash);
    }

    #[test]
    fn test_code_options_in_custom_block() {
        assert_eq!(
            CodeOptions::derive(2, 3, 32768),
            CodeOptions { address: 0x1000, size: 64, in_flash: false }
        );
        assert_eq!(
            CodeOptions::derive(7, 3, 131072),
            CodeOptions { address: 0x1000, size: 512, in_flash: false }
        );
        assert_eq!(
            CodeOptions::derive(1, 4, 65536),
            CodeOptions { address: 0x2000, size: 64, in_flash: false }
        );
        // custom block 3 only moves the options for types 2 and 7
        assert!(CodeOptions::derive(1, 3, 65536).in_flash);
    }

    #[test]
    fn test_code_options_type6_is_short() {
        let opts = CodeOptions::derive(1, 6, 16384);
        assert_eq!(opts.address, 16384 - 32);
        assert_eq!(opts.size, 32);
        assert!(opts.in_flash);
    }

    #[test]
    fn test_profile_from_config() {
        let profile = ChipProfile::from_config(2, 32768, true, 3);
        assert_eq!(profile.product_block_address, 0x1200);
        assert_eq!(profile.code_options_address, 0x1000);
        assert!(!profile.code_options_in_flash);
        assert_eq!(profile.chip_type_description(), Some("Type 2 (64KB max)"));
    }

    #[test]
    fn test_chip_type_limits() {
        assert_eq!(max_flash_size(4), 1048576);
        assert_eq!(max_flash_size(7), 131072);
        assert_eq!(max_flash_size(2), 65536);
        assert_eq!(chip_type_description(9), None);
    }
}
