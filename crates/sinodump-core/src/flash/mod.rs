//! Flash acquisition
//!
//! - [`window`] - widening an arbitrary byte range to whole 16-byte blocks
//! - [`reader`] - method resolution and the block-read loop

pub mod reader;
pub mod window;

pub use reader::{
    read_flash, resolve_method, MethodSelection, NoProgress, ProgressFn, ReadOutcome,
    ReadProgress, ReadRequest,
};
pub use window::AlignedWindow;
