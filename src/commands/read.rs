//! Flash dump

use indicatif::{ProgressBar, ProgressStyle};
use sinodump_core::flash::{read_flash, NoProgress, ReadOutcome, ReadProgress, ReadRequest};
use sinodump_core::session::DeviceSession;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use super::CmdResult;

/// Create a standard progress bar style
fn create_progress_bar_style() -> CmdResult<ProgressStyle> {
    Ok(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
        .progress_chars("#>-"))
}

/// Progress reporter using an indicatif progress bar
struct IndicatifProgress {
    pb: ProgressBar,
}

impl IndicatifProgress {
    fn new(total: u64) -> Self {
        let pb = ProgressBar::new(total);
        pb.set_style(create_progress_bar_style().unwrap_or_else(|_| ProgressStyle::default_bar()));
        Self { pb }
    }
}

impl ReadProgress for IndicatifProgress {
    fn read_progress(&mut self, bytes_read: usize, _total: usize) {
        self.pb.set_position(bytes_read as u64);
    }
}

fn write_file(path: &Path, data: &[u8]) -> CmdResult<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    Ok(())
}

/// Dump `request` to `output`
///
/// Fills in the length from the flash size when the request has none.
/// Returns the outcome; an under-read has already been reported and any
/// partial data written.
pub fn run_read(
    session: &mut dyn DeviceSession,
    output: &Path,
    mut request: ReadRequest,
    quiet: bool,
) -> CmdResult<ReadOutcome> {
    let length = match request.length {
        Some(length) => length,
        None => session.flash_size()?.saturating_sub(request.start),
    };
    request = request.length(length);

    println!(
        "Reading {} bytes from {} address 0x{:06X}...",
        length,
        if request.custom_block {
            "custom block"
        } else {
            "flash"
        },
        request.start
    );
    println!("Method: {}", request.method.name().to_uppercase());

    let started = Instant::now();
    let outcome = if quiet {
        read_flash(session, &request, &mut NoProgress)?
    } else {
        let mut progress = IndicatifProgress::new(length as u64);
        let outcome = read_flash(session, &request, &mut progress)?;
        if outcome.is_complete() {
            progress.pb.finish_with_message("Read complete");
        } else {
            progress.pb.abandon();
        }
        outcome
    };
    let elapsed = started.elapsed().as_secs_f64();

    if outcome.is_complete() {
        write_file(output, &outcome.data)?;
        let speed = if elapsed > 0.0 {
            outcome.data.len() as f64 / elapsed
        } else {
            0.0
        };
        println!("Saved {} bytes to {:?}", outcome.data.len(), output);
        println!("Transfer speed: {:.1} bytes/sec", speed);
    } else {
        log::warn!(
            "Only read {} of {} bytes",
            outcome.data.len(),
            outcome.requested
        );
        if !outcome.data.is_empty() {
            write_file(output, &outcome.data)?;
            println!("Partial dump saved to {:?}", output);
        }
    }

    Ok(outcome)
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use sinodump_core::method::ReadMethod;
    use sinodump_dummy::{DummyConfig, DummyTarget};
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("sinodump-{}-{}", std::process::id(), name))
    }

    fn target() -> DummyTarget {
        let data: Vec<u8> = (0..0x8000).map(|i| (i % 251) as u8 + 1).collect();
        let mut target = DummyTarget::with_data(DummyConfig::default(), &data);
        target.connect().unwrap();
        target
    }

    #[test]
    fn test_full_dump_written() {
        let mut target = target();
        let path = temp_path("full.bin");
        let outcome = run_read(&mut target, &path, ReadRequest::new(0x7F00), true).unwrap();
        assert!(outcome.is_complete());
        assert_eq!(std::fs::read(&path).unwrap(), &target.flash()[0x7F00..]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_partial_dump_written() {
        let mut target = target();
        target.fail_block_at(0x20);
        let path = temp_path("partial.bin");
        let request = ReadRequest::new(0x08).length(0x40).method(ReadMethod::Icp);
        let outcome = run_read(&mut target, &path, request, true).unwrap();
        assert_eq!(outcome.shortfall(), 0x40 - 0x18);
        assert_eq!(std::fs::read(&path).unwrap(), &target.flash()[0x08..0x20]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_empty_under_read_writes_nothing() {
        let mut target = target();
        target.fail_block_at(0);
        let path = temp_path("empty.bin");
        let request = ReadRequest::new(0).length(16).method(ReadMethod::Jtag);
        let outcome = run_read(&mut target, &path, request, true).unwrap();
        assert!(outcome.data.is_empty());
        assert!(!path.exists());
    }
}
