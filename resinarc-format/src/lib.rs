//! # ResinArc Format
//!
//! Container orchestration for MSLA print jobs: a fixed-layout binary
//! container, a batched parallel encode/decode pipeline, and a session
//! state machine tying them together.
//!
//! The container holds a 20-byte base header, a 28-byte print parameter
//! block at a fixed offset, then one record + payload per layer in index
//! order. All layers share one codec variant, named by a tag byte in the
//! header.
//!
//! ## Example
//!
//! ```rust
//! use resinarc_core::{LayerImage, Progress};
//! use resinarc_format::{DecodeDepth, FormatSession, Resolution};
//! use resinarc_rle::CodecVariant;
//! use std::io::Cursor;
//!
//! let mut layer = LayerImage::new(32, 32);
//! layer.pixels_mut()[40..200].fill(255);
//!
//! let mut session = FormatSession::new(CodecVariant::ByteRun, Resolution::new(32, 32));
//! let mut file = Cursor::new(Vec::new());
//! let progress = Progress::new();
//! session.encode(&mut file, &[layer.clone()], &progress).unwrap();
//!
//! session.decode(&mut file, DecodeDepth::Full, &progress).unwrap();
//! assert_eq!(session.layers()[0].non_zero_pixel_count(), 160);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

mod header;
mod session;

pub mod pipeline;

pub use header::{
    FORMAT_MAGIC, FORMAT_VERSION, FileHeader, HeaderPatch, LAYER_RECORD_LEN, LAYER_TABLE_OFFSET,
    LayerRecord, PARAMETER_OFFSET, PrintParameters, Resolution,
};
pub use session::{DecodeDepth, FormatSession, SessionState};
