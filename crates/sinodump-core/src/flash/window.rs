//! Block-aligned read windows
//!
//! The firmware only reads whole 16-byte blocks at 16-byte aligned
//! addresses. A request for `[start, start + length)` is widened to the
//! covering aligned window, read block by block, then trimmed back.

use crate::session::BLOCK_SIZE;

const BLOCK_MASK: u32 = BLOCK_SIZE as u32 - 1;

/// The aligned window covering a requested byte range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedWindow {
    /// `start` rounded down to a block boundary
    pub aligned_start: u32,
    /// Bytes between `aligned_start` and the requested start (0-15)
    pub skip: usize,
    /// Smallest multiple of the block size covering `skip + length`
    pub aligned_length: u64,
    /// Requested length
    pub length: usize,
}

impl AlignedWindow {
    /// Compute the window for `length` bytes starting at `start`
    pub fn new(start: u32, length: u32) -> Self {
        let aligned_start = start & !BLOCK_MASK;
        let skip = (start - aligned_start) as usize;
        let total = length as u64 + skip as u64;
        let aligned_length = (total + BLOCK_MASK as u64) & !(BLOCK_MASK as u64);

        Self {
            aligned_start,
            skip,
            aligned_length,
            length: length as usize,
        }
    }

    /// First address past the window
    pub fn end(&self) -> u64 {
        self.aligned_start as u64 + self.aligned_length
    }

    /// Number of block reads needed to cover the window
    pub fn block_count(&self) -> u64 {
        self.aligned_length / BLOCK_SIZE as u64
    }

    /// Addresses of the block reads, in order
    ///
    /// Stops early if the window runs past the 32-bit address space.
    pub fn block_addresses(&self) -> impl Iterator<Item = u32> {
        (self.aligned_start as u64..self.end())
            .step_by(BLOCK_SIZE)
            .map_while(|addr| u32::try_from(addr).ok())
    }

    /// Caller-visible byte count once `accumulated` window bytes are read
    pub fn visible(&self, accumulated: usize) -> usize {
        accumulated.saturating_sub(self.skip).min(self.length)
    }

    /// Slice the requested range out of the accumulated window bytes
    ///
    /// Yields whatever is available when `accumulated` is short.
    pub fn trim<'a>(&self, accumulated: &'a [u8]) -> &'a [u8] {
        if self.skip >= accumulated.len() {
            return &[];
        }
        let end = core::cmp::min(self.skip + self.length, accumulated.len());
        &accumulated[self.skip..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn test_unaligned_request() {
        let window = AlignedWindow::new(0x1005, 20);
        assert_eq!(window.aligned_start, 0x1000);
        assert_eq!(window.skip, 5);
        assert_eq!(window.aligned_length, 32);
        assert_eq!(window.block_addresses().collect::<Vec<_>>(), [0x1000, 0x1010]);
    }

    #[test]
    fn test_aligned_request_needs_no_padding() {
        let window = AlignedWindow::new(0x2000, 0x100);
        assert_eq!(window.aligned_start, 0x2000);
        assert_eq!(window.skip, 0);
        assert_eq!(window.aligned_length, 0x100);
        assert_eq!(window.block_count(), 16);
    }

    #[test]
    fn test_alignment_invariants() {
        let starts = [0u32, 1, 15, 16, 17, 0x1005, 0xFFFF, 0x12345, 0xFF_FFFF];
        let lengths = [1u32, 2, 15, 16, 17, 31, 32, 100, 4096, 0xF_FFFF];

        for &start in &starts {
            for &length in &lengths {
                let w = AlignedWindow::new(start, length);
                assert_eq!(w.aligned_start % 16, 0);
                assert!(w.aligned_start <= start);
                assert!(start - w.aligned_start < 16);
                assert_eq!(w.skip as u32, start - w.aligned_start);
                assert_eq!(w.aligned_length % 16, 0);
                let needed = length as u64 + w.skip as u64;
                assert!(w.aligned_length >= needed);
                assert!(w.aligned_length - needed < 16);
            }
        }
    }

    #[test]
    fn test_trim_full_window() {
        let window = AlignedWindow::new(0x1005, 20);
        let stream: Vec<u8> = (0..32).collect();
        assert_eq!(window.trim(&stream), &stream[5..25]);
    }

    #[test]
    fn test_trim_short_window() {
        let window = AlignedWindow::new(0x1005, 20);
        let stream: Vec<u8> = (0..16).collect();
        assert_eq!(window.trim(&stream), &stream[5..16]);
        assert!(window.trim(&[]).is_empty());
        assert!(window.trim(&stream[..5]).is_empty());
    }

    #[test]
    fn test_visible_is_clamped() {
        let window = AlignedWindow::new(0x1005, 20);
        assert_eq!(window.visible(0), 0);
        assert_eq!(window.visible(16), 11);
        assert_eq!(window.visible(32), 20);
    }

    #[test]
    fn test_zero_length() {
        let window = AlignedWindow::new(0x40, 0);
        assert_eq!(window.block_count(), 0);

        // an unaligned empty request still touches its block
        let window = AlignedWindow::new(0x43, 0);
        assert_eq!(window.block_count(), 1);
        assert!(window.trim(&[0u8; 16]).is_empty());
    }

    #[test]
    fn test_window_at_top_of_address_space() {
        let window = AlignedWindow::new(u32::MAX - 3, 64);
        assert_eq!(window.aligned_start, 0xFFFF_FFF0);
        assert_eq!(window.block_addresses().collect::<Vec<_>>(), [0xFFFF_FFF0]);
    }
}
