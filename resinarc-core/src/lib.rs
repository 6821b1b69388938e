//! # ResinArc Core
//!
//! Core components for the ResinArc MSLA layer-codec library.
//!
//! This crate provides the fundamental building blocks shared by every
//! vendor codec and by the batched encode/decode pipeline:
//!
//! - [`bitstream`]: positional bit packing for non-byte-aligned RLE schemes
//! - [`layer`]: the in-memory layer raster and its derived geometry
//! - [`progress`]: progress reporting and cooperative cancellation/pause
//! - [`error`]: error types
//!
//! ## Architecture
//!
//! ResinArc is designed as a layered stack:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Format session                                      │
//! │     header I/O, batch pipeline, lifecycle state         │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Layer codecs                                        │
//! │     bit-run, nibble-run, byte-run, span-list schemes    │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Primitives (this crate)                             │
//! │     BitBuffer, LayerImage, Progress                     │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use resinarc_core::bitstream::BitBuffer;
//! use resinarc_core::layer::LayerImage;
//!
//! let mut buf = BitBuffer::new();
//! buf.write_bits(0, 0xAB, 8);
//! assert_eq!(buf.read_bits(0, 8).unwrap(), 0xAB);
//!
//! let layer = LayerImage::new(1440, 2560);
//! assert!(layer.bounding_rectangle(127).is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod bitstream;
pub mod error;
pub mod layer;
pub mod progress;

// Re-exports for convenience
pub use bitstream::BitBuffer;
pub use error::{CodecStage, ResinError, Result};
pub use layer::{LayerImage, Rectangle};
pub use progress::Progress;

/// Default binarization threshold: a pixel strictly above it is white.
pub const DEFAULT_THRESHOLD: u8 = 127;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::DEFAULT_THRESHOLD;
    pub use crate::bitstream::BitBuffer;
    pub use crate::error::{CodecStage, ResinError, Result};
    pub use crate::layer::{LayerImage, Rectangle};
    pub use crate::progress::Progress;
}
