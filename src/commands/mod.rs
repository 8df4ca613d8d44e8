//! CLI command implementations
//!
//! Commands work on any `DeviceSession`, whether it talks to the dumper
//! firmware or to the emulated target.

pub mod info;
pub mod read;

use sinodump_core::session::DeviceSession;

type CmdResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Perform the target handshake
///
/// The firmware catches the target while it boots, so the user has to
/// power-cycle it while `connect` is pending.
pub fn connect(session: &mut dyn DeviceSession) -> CmdResult<()> {
    println!("Connecting to target...");
    println!("Power cycle or reset the target now...");
    if !session.connect()? {
        return Err("Failed to connect to target device.\n\
                    Make sure the target is powered and connected correctly."
            .into());
    }
    println!("Connected successfully!");
    Ok(())
}
