//! Flash reader
//!
//! [`read_flash`] resolves the read method, walks the aligned window one
//! block at a time and trims the result to the requested range.
//!
//! A block read failure stops the loop at that address. Nothing is retried;
//! the bytes read so far are returned, so the caller sees an under-read
//! rather than an error. Compare `data.len()` against `requested` (or use
//! [`ReadOutcome::is_complete`]) to tell the two apart.

use alloc::vec::Vec;

use super::window::AlignedWindow;
use crate::error::Result;
use crate::method::{ReadMethod, TransferMethod};
use crate::session::{Block, DeviceSession};

/// A read of `[start, start + length)` from main flash or the custom block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadRequest {
    /// First byte to read
    pub start: u32,
    /// Number of bytes; `None` reads to the end of flash
    pub length: Option<u32>,
    /// Requested read method
    pub method: ReadMethod,
    /// Read the custom block instead of main flash
    pub custom_block: bool,
}

impl ReadRequest {
    /// Read from `start` to the end of flash with auto-detection
    pub fn new(start: u32) -> Self {
        Self {
            start,
            ..Self::default()
        }
    }

    /// Limit the read to `length` bytes
    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Use the given read method
    pub fn method(mut self, method: ReadMethod) -> Self {
        self.method = method;
        self
    }

    /// Select the custom block area
    pub fn custom_block(mut self, custom_block: bool) -> Self {
        self.custom_block = custom_block;
        self
    }
}

/// How the transfer method was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodSelection {
    /// The caller asked for it
    Requested,
    /// Auto-detection picked it
    Detected,
    /// Auto-detection failed and ICP was used
    Fallback,
}

/// Result of a flash read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Bytes read, trimmed to the requested range
    pub data: Vec<u8>,
    /// Requested length
    pub requested: usize,
    /// Method used for the block reads
    pub method: TransferMethod,
    /// How `method` was chosen
    pub selection: MethodSelection,
    /// Address of the block read that failed, if any
    pub failed_at: Option<u32>,
}

impl ReadOutcome {
    /// All requested bytes were read
    pub fn is_complete(&self) -> bool {
        self.data.len() == self.requested
    }

    /// Number of requested bytes that were not read
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.data.len())
    }
}

/// Progress reporting for [`read_flash`]
///
/// Called synchronously after every successful block read, with the number
/// of caller-visible bytes so far and the requested total. The count never
/// decreases and ends at the total on a complete read.
pub trait ReadProgress {
    /// Update read progress
    fn read_progress(&mut self, bytes_read: usize, total: usize);
}

/// A no-op progress reporter
pub struct NoProgress;

impl ReadProgress for NoProgress {
    fn read_progress(&mut self, _bytes_read: usize, _total: usize) {}
}

/// Adapter reporting progress to a closure
pub struct ProgressFn<F>(pub F);

impl<F: FnMut(usize, usize)> ReadProgress for ProgressFn<F> {
    fn read_progress(&mut self, bytes_read: usize, total: usize) {
        (self.0)(bytes_read, total)
    }
}

/// Resolve a requested read method to a transfer method
///
/// `Auto` runs the firmware's detection. If detection fails, or the
/// transport fails during detection, ICP is used and a warning is logged.
///
/// Passing `ReadMethod::Failed` counts as a failed detection: nothing is
/// sent to the target and the read falls back to ICP. It is not treated as
/// a request for JTAG.
pub fn resolve_method<S: DeviceSession + ?Sized>(
    session: &mut S,
    method: ReadMethod,
) -> (TransferMethod, MethodSelection) {
    if let Some(method) = method.transfer() {
        log::info!("Using read method: {}", method);
        return (method, MethodSelection::Requested);
    }

    let detected = match method {
        ReadMethod::Auto => session.detect_read_method().unwrap_or_else(|e| {
            log::debug!("Read method detection failed: {}", e);
            ReadMethod::Failed
        }),
        _ => ReadMethod::Failed,
    };

    match detected.transfer() {
        Some(method) => {
            log::info!("Auto-detected read method: {}", method);
            (method, MethodSelection::Detected)
        }
        None => {
            log::warn!("Auto-detection failed, trying ICP mode");
            (TransferMethod::Icp, MethodSelection::Fallback)
        }
    }
}

/// Read one block and fetch it from the staging buffer
///
/// `Ok(None)` means the firmware reported a failed read.
fn read_block<S: DeviceSession + ?Sized>(
    session: &mut S,
    method: TransferMethod,
    address: u32,
    custom_block: bool,
) -> Result<Option<Block>> {
    if !session.read_block(method, address, custom_block)? {
        return Ok(None);
    }
    session.buffer().map(Some)
}

/// Read a byte range from the target
///
/// # Arguments
/// * `session` - Connected device session
/// * `request` - Range, method and area to read
/// * `progress` - Progress callback (use `NoProgress` if not needed)
///
/// # Errors
/// Only a transport failure while querying the flash size (for a request
/// without a length) is returned as an error. Block read failures end the
/// read early and show up as a short [`ReadOutcome`].
pub fn read_flash<S, P>(
    session: &mut S,
    request: &ReadRequest,
    progress: &mut P,
) -> Result<ReadOutcome>
where
    S: DeviceSession + ?Sized,
    P: ReadProgress + ?Sized,
{
    let length = match request.length {
        Some(length) => length,
        None => session.flash_size()?.saturating_sub(request.start),
    };

    let (method, selection) = resolve_method(session, request.method);

    let window = AlignedWindow::new(request.start, length);
    log::debug!(
        "Reading {} bytes at 0x{:06X} as {} blocks from 0x{:06X}",
        length,
        request.start,
        window.block_count(),
        window.aligned_start
    );

    let mut accumulated = Vec::with_capacity(window.aligned_length as usize);
    let mut failed_at = None;

    for address in window.block_addresses() {
        match read_block(session, method, address, request.custom_block) {
            Ok(Some(block)) => accumulated.extend_from_slice(&block),
            Ok(None) => {
                log::error!("Error reading at address 0x{:06X}", address);
                failed_at = Some(address);
                break;
            }
            Err(e) => {
                log::error!("Error reading at address 0x{:06X}: {}", address, e);
                failed_at = Some(address);
                break;
            }
        }

        progress.read_progress(window.visible(accumulated.len()), window.length);
    }

    let data = window.trim(&accumulated).to_vec();
    if data.len() < window.length {
        log::debug!("Short read: {} of {} bytes", data.len(), window.length);
    }

    Ok(ReadOutcome {
        data,
        requested: window.length,
        method,
        selection,
        failed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::session::{BLOCK_SIZE, SENTINEL_BYTE};
    use alloc::collections::BTreeSet;
    use alloc::vec;

    /// A mock session backed by a byte array
    ///
    /// Records every block read and can fail reads at chosen addresses.
    struct MockSession {
        memory: Vec<u8>,
        staging: Block,
        detected: Result<ReadMethod>,
        fail_at: BTreeSet<u32>,
        transport_fail_at: BTreeSet<u32>,
        /// Record of all block reads: (method, address, custom block)
        reads: Vec<(TransferMethod, u32, bool)>,
        detect_calls: usize,
    }

    impl MockSession {
        fn new(size: usize) -> Self {
            Self {
                memory: (0..size).map(|i| (i * 7 + i / 256) as u8).collect(),
                staging: [SENTINEL_BYTE; BLOCK_SIZE],
                detected: Ok(ReadMethod::Icp),
                fail_at: BTreeSet::new(),
                transport_fail_at: BTreeSet::new(),
                reads: Vec::new(),
                detect_calls: 0,
            }
        }

        fn read_addresses(&self) -> Vec<u32> {
            self.reads.iter().map(|&(_, addr, _)| addr).collect()
        }
    }

    impl DeviceSession for MockSession {
        fn connect(&mut self) -> Result<bool> {
            Ok(true)
        }
        fn disconnect(&mut self) -> Result<()> {
            Ok(())
        }
        fn is_connected(&self) -> bool {
            true
        }
        fn check_icp(&mut self) -> Result<bool> {
            Ok(true)
        }
        fn check_jtag(&mut self) -> Result<bool> {
            Ok(true)
        }
        fn ping_icp(&mut self) -> Result<()> {
            Ok(())
        }
        fn id(&mut self) -> Result<u16> {
            Ok(0xA55A)
        }
        fn detect_read_method(&mut self) -> Result<ReadMethod> {
            self.detect_calls += 1;
            self.detected
        }
        fn chip_type(&mut self) -> Result<u8> {
            Ok(2)
        }
        fn flash_size(&mut self) -> Result<u32> {
            Ok(self.memory.len() as u32)
        }
        fn product_block(&mut self) -> Result<bool> {
            Ok(false)
        }
        fn custom_block(&mut self) -> Result<u8> {
            Ok(1)
        }
        fn product_block_address(&mut self) -> Result<u32> {
            Ok(0)
        }
        fn code_options_address(&mut self) -> Result<u32> {
            Ok(0)
        }
        fn code_options_size(&mut self) -> Result<u32> {
            Ok(64)
        }
        fn code_options_in_flash(&mut self) -> Result<bool> {
            Ok(true)
        }
        fn read_byte(&mut self, _method: TransferMethod, address: u32, _custom: bool) -> Result<u8> {
            Ok(self.memory.get(address as usize).copied().unwrap_or(SENTINEL_BYTE))
        }
        fn read_block(&mut self, method: TransferMethod, address: u32, custom: bool) -> Result<bool> {
            self.reads.push((method, address, custom));
            if self.transport_fail_at.contains(&address) {
                return Err(Error::Timeout);
            }
            if self.fail_at.contains(&address) {
                return Ok(false);
            }
            let start = address as usize;
            if start + BLOCK_SIZE > self.memory.len() {
                return Ok(false);
            }
            self.staging.copy_from_slice(&self.memory[start..start + BLOCK_SIZE]);
            Ok(true)
        }
        fn buffer_byte(&mut self, index: usize) -> Result<u8> {
            Ok(self.staging.get(index).copied().unwrap_or(SENTINEL_BYTE))
        }
    }

    /// Progress recorder
    #[derive(Default)]
    struct Recorder(Vec<(usize, usize)>);

    impl ReadProgress for Recorder {
        fn read_progress(&mut self, bytes_read: usize, total: usize) {
            self.0.push((bytes_read, total));
        }
    }

    #[test]
    fn test_unaligned_read() {
        let mut session = MockSession::new(0x2000);
        let request = ReadRequest::new(0x1005).length(20).method(ReadMethod::Icp);

        let outcome = read_flash(&mut session, &request, &mut NoProgress).unwrap();

        assert_eq!(session.read_addresses(), [0x1000, 0x1010]);
        assert_eq!(outcome.data, &session.memory[0x1005..0x1005 + 20]);
        assert!(outcome.is_complete());
        assert_eq!(outcome.failed_at, None);
        assert_eq!(outcome.selection, MethodSelection::Requested);
        assert_eq!(session.detect_calls, 0);
    }

    #[test]
    fn test_failure_on_second_block() {
        let mut session = MockSession::new(0x2000);
        session.fail_at.insert(0x1010);
        let request = ReadRequest::new(0x1005).length(20).method(ReadMethod::Icp);
        let mut progress = Recorder::default();

        let outcome = read_flash(&mut session, &request, &mut progress).unwrap();

        assert_eq!(outcome.data, &session.memory[0x1005..0x1010]);
        assert_eq!(outcome.data.len(), 11);
        assert!(!outcome.is_complete());
        assert_eq!(outcome.shortfall(), 9);
        assert_eq!(outcome.failed_at, Some(0x1010));
        // no retry, no advance past the failure
        assert_eq!(session.read_addresses(), [0x1000, 0x1010]);
        assert_eq!(progress.0, [(11, 20)]);
    }

    #[test]
    fn test_failure_on_first_block() {
        let mut session = MockSession::new(0x2000);
        session.fail_at.insert(0x0);
        let request = ReadRequest::new(0).length(0x100).method(ReadMethod::Jtag);
        let mut progress = Recorder::default();

        let outcome = read_flash(&mut session, &request, &mut progress).unwrap();

        assert!(outcome.data.is_empty());
        assert_eq!(outcome.failed_at, Some(0));
        assert!(progress.0.is_empty());
    }

    #[test]
    fn test_transport_error_is_partial_result() {
        let mut session = MockSession::new(0x2000);
        session.transport_fail_at.insert(0x40);
        let request = ReadRequest::new(0).length(0x100).method(ReadMethod::Icp);

        let outcome = read_flash(&mut session, &request, &mut NoProgress).unwrap();

        assert_eq!(outcome.data, &session.memory[..0x40]);
        assert_eq!(outcome.failed_at, Some(0x40));
    }

    #[test]
    fn test_partial_failure_length() {
        for skip in [0u32, 1, 8, 15] {
            for k in 0u32..5 {
                let mut session = MockSession::new(0x1000);
                let start = 0x200 + skip;
                let length = 50;
                session.fail_at.insert(0x200 + 16 * k);
                let request = ReadRequest::new(start).length(length).method(ReadMethod::Icp);
                let mut progress = Recorder::default();

                let outcome = read_flash(&mut session, &request, &mut progress).unwrap();

                let expected = (16 * k).saturating_sub(skip).min(length) as usize;
                assert_eq!(outcome.data.len(), expected, "skip={} k={}", skip, k);
                assert_eq!(
                    outcome.data,
                    &session.memory[start as usize..start as usize + expected]
                );
                assert!(progress.0.windows(2).all(|w| w[0].0 <= w[1].0));
                assert_eq!(progress.0.last().map_or(0, |p| p.0), expected);
            }
        }
    }

    #[test]
    fn test_progress_ends_at_total() {
        let mut session = MockSession::new(0x2000);
        let request = ReadRequest::new(0x1005).length(20).method(ReadMethod::Icp);
        let mut progress = Recorder::default();

        read_flash(&mut session, &request, &mut progress).unwrap();

        assert_eq!(progress.0, [(11, 20), (20, 20)]);
    }

    #[test]
    fn test_closure_progress() {
        let mut session = MockSession::new(0x100);
        let mut calls = 0;
        let mut progress = ProgressFn(|_: usize, _: usize| calls += 1);

        read_flash(&mut session, &ReadRequest::new(0).length(64), &mut progress).unwrap();

        assert_eq!(calls, 4);
    }

    #[test]
    fn test_auto_uses_detected_method() {
        let mut session = MockSession::new(0x100);
        session.detected = Ok(ReadMethod::Jtag);

        let outcome = read_flash(&mut session, &ReadRequest::new(0).length(32), &mut NoProgress)
            .unwrap();

        assert_eq!(outcome.method, TransferMethod::Jtag);
        assert_eq!(outcome.selection, MethodSelection::Detected);
        assert!(session.reads.iter().all(|r| r.0 == TransferMethod::Jtag));
        assert_eq!(session.detect_calls, 1);
    }

    #[test]
    fn test_auto_falls_back_to_icp() {
        let mut session = MockSession::new(0x100);
        session.detected = Ok(ReadMethod::Failed);

        let outcome = read_flash(&mut session, &ReadRequest::new(0).length(32), &mut NoProgress)
            .unwrap();

        assert_eq!(outcome.method, TransferMethod::Icp);
        assert_eq!(outcome.selection, MethodSelection::Fallback);
        assert!(outcome.is_complete());
        assert!(session.reads.iter().all(|r| r.0 == TransferMethod::Icp));
    }

    #[test]
    fn test_explicit_failed_method_falls_back_to_icp() {
        let mut session = MockSession::new(0x100);
        session.detected = Ok(ReadMethod::Jtag);

        let (method, selection) = resolve_method(&mut session, ReadMethod::Failed);

        assert_eq!(method, TransferMethod::Icp);
        assert_eq!(selection, MethodSelection::Fallback);
        assert_eq!(session.detect_calls, 0);
    }

    #[test]
    fn test_detection_transport_error_falls_back() {
        let mut session = MockSession::new(0x100);
        session.detected = Err(Error::TransportError);

        let (method, selection) = resolve_method(&mut session, ReadMethod::Auto);

        assert_eq!(method, TransferMethod::Icp);
        assert_eq!(selection, MethodSelection::Fallback);
    }

    #[test]
    fn test_default_length_reads_to_end() {
        let mut session = MockSession::new(0x100);
        let request = ReadRequest::new(0x80).method(ReadMethod::Icp);

        let outcome = read_flash(&mut session, &request, &mut NoProgress).unwrap();

        assert_eq!(outcome.requested, 0x80);
        assert_eq!(outcome.data, &session.memory[0x80..]);
    }

    #[test]
    fn test_start_past_flash_is_empty() {
        let mut session = MockSession::new(0x100);
        let request = ReadRequest::new(0x200).method(ReadMethod::Icp);

        let outcome = read_flash(&mut session, &request, &mut NoProgress).unwrap();

        assert_eq!(outcome.requested, 0);
        assert!(outcome.data.is_empty());
        assert!(outcome.is_complete());
        assert!(session.reads.is_empty());
    }

    #[test]
    fn test_custom_block_is_forwarded() {
        let mut session = MockSession::new(0x100);
        let request = ReadRequest::new(0)
            .length(16)
            .method(ReadMethod::Icp)
            .custom_block(true);

        read_flash(&mut session, &request, &mut NoProgress).unwrap();

        assert_eq!(session.reads, vec![(TransferMethod::Icp, 0, true)]);
    }

    #[test]
    fn test_over_read_is_degraded_not_rejected() {
        let mut session = MockSession::new(0x100);
        let request = ReadRequest::new(0xF0).length(0x40).method(ReadMethod::Icp);

        let outcome = read_flash(&mut session, &request, &mut NoProgress).unwrap();

        assert_eq!(outcome.data, &session.memory[0xF0..]);
        assert_eq!(outcome.failed_at, Some(0x100));
    }
}
