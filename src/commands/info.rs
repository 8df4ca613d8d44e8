//! Device information

use sinodump_core::chip::ChipProfile;
use sinodump_core::method::ReadMethod;
use sinodump_core::session::DeviceSession;

use super::CmdResult;

fn enabled(flag: bool) -> &'static str {
    if flag {
        "Enabled"
    } else {
        "Disabled"
    }
}

fn status(ok: bool) -> &'static str {
    if ok {
        "OK"
    } else {
        "Failed"
    }
}

/// Print identification and chip configuration
pub fn print_device_info(session: &mut dyn DeviceSession) -> CmdResult<ChipProfile> {
    let id = session.id()?;
    let profile = session.chip_profile()?;

    println!();
    println!("=== Device Information ===");
    println!("JTAG ID:          0x{:04X}", id);
    println!(
        "Chip Type:        {}",
        profile
            .chip_type_description()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Type {} (unknown)", profile.chip_type))
    );
    println!(
        "Flash Size:       {} bytes ({} KB)",
        profile.flash_size,
        profile.flash_size / 1024
    );
    println!("Product Block:    {}", enabled(profile.product_block_enabled));
    if profile.product_block_enabled {
        println!("  Address:        0x{:04X}", profile.product_block_address);
    }
    println!("Custom Block:     Type {}", profile.custom_block_type);
    println!(
        "Code Options:     0x{:04X} ({} bytes)",
        profile.code_options_address, profile.code_options_size
    );
    println!(
        "  Location:       {}",
        if profile.code_options_in_flash {
            "Flash"
        } else {
            "Custom Block"
        }
    );

    Ok(profile)
}

/// Print the ICP/JTAG probe results and the recommended method
pub fn print_communication_status(session: &mut dyn DeviceSession) -> CmdResult<ReadMethod> {
    println!();
    println!("=== Communication Status ===");
    println!("ICP Mode:         {}", status(session.check_icp()?));
    println!("JTAG Mode:        {}", status(session.check_jtag()?));

    let method = session.detect_read_method()?;
    match method {
        ReadMethod::Icp => println!("Recommended:      ICP"),
        ReadMethod::Jtag => println!("Recommended:      JTAG"),
        _ => println!("Recommended:      Detection failed (flash may be blank or protected)"),
    }
    println!();

    Ok(method)
}

/// Run the info command
pub fn run_info(session: &mut dyn DeviceSession) -> CmdResult<()> {
    print_device_info(session)?;
    print_communication_status(session)?;
    Ok(())
}
