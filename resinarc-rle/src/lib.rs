//! # ResinArc RLE
//!
//! Vendor run-length codecs for MSLA resin-printer layer images.
//!
//! Every masked-stereolithography file format packs its layer stack with a
//! vendor-specific run-length scheme. The schemes differ wildly at the bit
//! level but share one shape: `encode` turns a grayscale raster into a
//! small header plus an opaque payload, `decode` reverses it with exact
//! pixel fidelity. This crate implements the four scheme families behind
//! one strategy trait:
//!
//! - [`BitRunCodec`]: self-describing bit-runs with in-stream dimensions
//!   and variable-width run lengths
//! - [`NibbleRunCodec`]: 16-gray-level nibble runs with greedy chunk
//!   extension across bytes
//! - [`ByteRunCodec`]: one byte per run, 7-bit bit-reversed length plus a
//!   color bit
//! - [`SpanListCodec`]: column-major vertical span triples, coordinate
//!   based rather than true RLE
//!
//! ## Example
//!
//! ```rust
//! use resinarc_core::{DEFAULT_THRESHOLD, LayerImage, Progress};
//! use resinarc_rle::{CodecVariant, LayerCodec};
//!
//! let mut layer = LayerImage::new(32, 32);
//! layer.pixels_mut()[100..200].fill(255);
//!
//! let codec = CodecVariant::BitRun.codec();
//! let progress = Progress::new();
//! let encoded = codec.encode(&layer, DEFAULT_THRESHOLD, &progress).unwrap();
//! let decoded = codec.decode(&encoded, 32, 32, &progress).unwrap();
//! assert_eq!(decoded.pixels(), layer.pixels());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

mod bitrun;
mod byterun;
mod nibble;
mod spans;

pub use bitrun::BitRunCodec;
pub use byterun::ByteRunCodec;
pub use nibble::NibbleRunCodec;
pub use spans::SpanListCodec;

use resinarc_core::{LayerImage, Progress, Rectangle, ResinError, Result};

/// One encoded layer: the codec's small header fields plus its payload.
///
/// Invariant: `bit_len.div_ceil(8) == data.len()`. Encoders assert it on
/// production; decoders fail fast with `CorruptRun` when a stored header
/// disagrees with the payload it arrived with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedLayer {
    /// Width the payload was encoded for.
    pub width: u32,
    /// Height the payload was encoded for.
    pub height: u32,
    /// Tightest rectangle around the layer's lit pixels.
    pub bounding_rectangle: Rectangle,
    /// Number of pixels above the binarization threshold.
    pub white_pixel_count: u32,
    /// Declared payload length in bits. Byte-aligned schemes declare
    /// `data.len() * 8`; the bit-run scheme usually ends mid-byte.
    pub bit_len: usize,
    /// The opaque encoded payload.
    pub data: Vec<u8>,
}

impl EncodedLayer {
    /// Check the declared-length invariant against the actual payload.
    pub fn validate(&self) -> Result<()> {
        if self.bit_len.div_ceil(8) != self.data.len() {
            return Err(ResinError::corrupt_run(self.data.len() * 8, self.bit_len));
        }
        Ok(())
    }

    /// Check the declared dimensions against a requested resolution.
    pub fn check_resolution(&self, width: u32, height: u32) -> Result<()> {
        if self.width != width || self.height != height {
            return Err(ResinError::resolution_mismatch(
                (width, height),
                (self.width, self.height),
            ));
        }
        Ok(())
    }
}

/// A run-length codec strategy.
///
/// Implementations are stateless unit structs; one static instance per
/// variant is shared by every worker thread. The [`Progress`] context is
/// polled between runs/scanlines so a paused or cancelled job stops
/// inside a layer, not just between layers.
pub trait LayerCodec: Send + Sync {
    /// Which scheme this codec implements.
    fn variant(&self) -> CodecVariant;

    /// Encode one layer raster.
    ///
    /// Binarizing schemes treat a pixel strictly above `threshold` as
    /// white; the nibble scheme quantizes to 16 gray levels instead and
    /// uses `threshold` only for the derived header fields.
    fn encode(
        &self,
        image: &LayerImage,
        threshold: u8,
        progress: &Progress,
    ) -> Result<EncodedLayer>;

    /// Decode one layer back into a raster of exactly `width * height`
    /// pixels, validating the declared dimensions first.
    fn decode(
        &self,
        layer: &EncodedLayer,
        width: u32,
        height: u32,
        progress: &Progress,
    ) -> Result<LayerImage>;
}

/// The closed set of supported run-length schemes.
///
/// New vendors land here as new variants behind the same [`LayerCodec`]
/// contract rather than as format subclasses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecVariant {
    /// Self-describing bit-run scheme (in-stream dimensions, 5-bit length
    /// prefix, alternating colors).
    BitRun,
    /// Nibble-run scheme (16 gray levels, greedy chunk extension).
    NibbleRun,
    /// Byte-run scheme (7-bit bit-reversed run length plus color bit).
    ByteRun,
    /// Column-major vertical span list.
    SpanList,
}

impl CodecVariant {
    /// All supported variants, in tag order.
    pub const ALL: [CodecVariant; 4] = [
        CodecVariant::BitRun,
        CodecVariant::NibbleRun,
        CodecVariant::ByteRun,
        CodecVariant::SpanList,
    ];

    /// The shared static codec instance for this variant.
    pub fn codec(self) -> &'static dyn LayerCodec {
        match self {
            CodecVariant::BitRun => &BitRunCodec,
            CodecVariant::NibbleRun => &NibbleRunCodec,
            CodecVariant::ByteRun => &ByteRunCodec,
            CodecVariant::SpanList => &SpanListCodec,
        }
    }

    /// The on-disk tag byte for this variant.
    pub fn tag(self) -> u8 {
        match self {
            CodecVariant::BitRun => 0,
            CodecVariant::NibbleRun => 1,
            CodecVariant::ByteRun => 2,
            CodecVariant::SpanList => 3,
        }
    }

    /// Look a variant up by its on-disk tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.tag() == tag)
    }
}

impl std::fmt::Display for CodecVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CodecVariant::BitRun => "bit-run",
            CodecVariant::NibbleRun => "nibble-run",
            CodecVariant::ByteRun => "byte-run",
            CodecVariant::SpanList => "span-list",
        };
        f.write_str(name)
    }
}
