//! Error types for ResinArc operations.
//!
//! This module provides the error type shared by every layer of the stack,
//! from bit-level reads up to full-file encode/decode sessions. Codec
//! failures are wrapped with the offending layer index and codec stage
//! before they reach the caller, so diagnostics always point at a concrete
//! layer of the print job.

use std::io;
use thiserror::Error;

/// The codec stage at which a per-layer failure was detected.
///
/// Attached to [`ResinError::Layer`] so callers can tell a corrupt bit
/// stream apart from a run that reconstructed the wrong pixel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecStage {
    /// Reading bits or bytes from the encoded payload.
    BitRead,
    /// Expanding runs/spans back into pixels.
    RunReconstruction,
    /// Final decoded-pixel-count validation.
    PixelCount,
    /// Reading or writing the layer's small fixed header.
    HeaderIo,
}

impl std::fmt::Display for CodecStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CodecStage::BitRead => "bit read",
            CodecStage::RunReconstruction => "run reconstruction",
            CodecStage::PixelCount => "pixel count check",
            CodecStage::HeaderIo => "header I/O",
        };
        f.write_str(name)
    }
}

/// The main error type for ResinArc operations.
#[derive(Debug, Error)]
pub enum ResinError {
    /// I/O error from the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Header magic or version does not match the expected value.
    #[error("Invalid format tag: expected {expected:02x?}, found {found:02x?}")]
    InvalidFormatTag {
        /// Expected tag bytes.
        expected: Vec<u8>,
        /// Actual tag bytes found.
        found: Vec<u8>,
    },

    /// Declared layer dimensions disagree with the session resolution.
    #[error(
        "Resolution mismatch: expected {expected_width}x{expected_height}, \
         found {found_width}x{found_height}"
    )]
    ResolutionMismatch {
        /// Width the session expects.
        expected_width: u32,
        /// Height the session expects.
        expected_height: u32,
        /// Width declared by the payload.
        found_width: u32,
        /// Height declared by the payload.
        found_height: u32,
    },

    /// Run-length data reconstructed the wrong number of pixels, or a
    /// payload's declared length disagrees with its actual byte count.
    #[error("Corrupt run data: reconstructed {decoded}, expected {expected}")]
    CorruptRun {
        /// Count the runs produced (or would have produced).
        decoded: usize,
        /// Count the payload requires.
        expected: usize,
    },

    /// A span-list triple is out of order or outside the layer.
    #[error("Corrupt span list at triple {index}: {message}")]
    CorruptSpanList {
        /// Index of the offending triple.
        index: u32,
        /// Description of the violation.
        message: String,
    },

    /// A bit read past the declared payload length.
    #[error(
        "Bit read out of range: {bit_count} bits at offset {bit_offset}, \
         stream holds {bit_len} bits"
    )]
    OutOfRange {
        /// Offset of the first requested bit.
        bit_offset: usize,
        /// Number of bits requested.
        bit_count: usize,
        /// Total valid bits in the stream.
        bit_len: usize,
    },

    /// A pixel buffer does not match its declared dimensions.
    #[error("Pixel buffer holds {found} bytes, {width}x{height} requires {expected}")]
    PixelBufferSize {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// Required buffer length.
        expected: usize,
        /// Actual buffer length.
        found: usize,
    },

    /// The image cannot be represented by the selected codec.
    #[error("Unsupported image: {message}")]
    Unsupported {
        /// Description of the limitation that was hit.
        message: String,
    },

    /// Cooperative cancellation was observed.
    #[error("Operation cancelled")]
    Cancelled,

    /// An operation was attempted in a session state that forbids it.
    #[error("Invalid session state: {message}")]
    InvalidState {
        /// Description of the state violation.
        message: String,
    },

    /// A per-layer failure, wrapped with the layer index and codec stage.
    #[error("Layer {index} failed during {stage}: {source}")]
    Layer {
        /// Index of the layer that failed.
        index: u32,
        /// Codec stage that detected the failure.
        stage: CodecStage,
        /// The underlying error.
        #[source]
        source: Box<ResinError>,
    },
}

/// Result type alias for ResinArc operations.
pub type Result<T> = std::result::Result<T, ResinError>;

impl ResinError {
    /// Create an invalid format tag error.
    pub fn invalid_format_tag(expected: impl Into<Vec<u8>>, found: impl Into<Vec<u8>>) -> Self {
        Self::InvalidFormatTag {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a resolution mismatch error.
    pub fn resolution_mismatch(expected: (u32, u32), found: (u32, u32)) -> Self {
        Self::ResolutionMismatch {
            expected_width: expected.0,
            expected_height: expected.1,
            found_width: found.0,
            found_height: found.1,
        }
    }

    /// Create a corrupt run error.
    pub fn corrupt_run(decoded: usize, expected: usize) -> Self {
        Self::CorruptRun { decoded, expected }
    }

    /// Create a corrupt span list error.
    pub fn corrupt_span_list(index: u32, message: impl Into<String>) -> Self {
        Self::CorruptSpanList {
            index,
            message: message.into(),
        }
    }

    /// Create an out-of-range bit read error.
    pub fn out_of_range(bit_offset: usize, bit_count: usize, bit_len: usize) -> Self {
        Self::OutOfRange {
            bit_offset,
            bit_count,
            bit_len,
        }
    }

    /// Create a pixel buffer size error.
    pub fn pixel_buffer_size(width: u32, height: u32, found: usize) -> Self {
        Self::PixelBufferSize {
            width,
            height,
            expected: width as usize * height as usize,
            found,
        }
    }

    /// Create an unsupported image error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Wrap an error with the layer index and codec stage it belongs to.
    ///
    /// Errors that already carry a layer index are passed through unchanged
    /// so nested pipeline stages do not double-wrap.
    pub fn at_layer(self, index: u32, stage: CodecStage) -> Self {
        match self {
            already @ Self::Layer { .. } => already,
            other => Self::Layer {
                index,
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The codec stage this error most likely originated from.
    ///
    /// An `OutOfRange` comes from a bit read; a `CorruptRun` that came up
    /// short is the final pixel-count check, while one that overshot was
    /// caught mid-reconstruction.
    pub fn stage(&self) -> CodecStage {
        match self {
            Self::OutOfRange { .. } => CodecStage::BitRead,
            Self::CorruptRun { decoded, expected } if decoded < expected => CodecStage::PixelCount,
            Self::CorruptRun { .. } | Self::CorruptSpanList { .. } => {
                CodecStage::RunReconstruction
            }
            Self::PixelBufferSize { .. } => CodecStage::PixelCount,
            Self::Layer { stage, .. } => *stage,
            _ => CodecStage::HeaderIo,
        }
    }

    /// Wrap an error with a layer index, deriving the stage from the error.
    ///
    /// `Cancelled` passes through unwrapped; cancellation is a pipeline
    /// signal, not a per-layer diagnostic.
    pub fn for_layer(self, index: u32) -> Self {
        if self.is_cancelled() {
            return self;
        }
        let stage = self.stage();
        self.at_layer(index, stage)
    }

    /// The layer index attached to this error, if any.
    pub fn layer_index(&self) -> Option<u32> {
        match self {
            Self::Layer { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Whether this error is the cooperative-cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Layer { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ResinError::invalid_format_tag(vec![0x52, 0x41], vec![0x00, 0x00]);
        assert!(err.to_string().contains("Invalid format tag"));

        let err = ResinError::resolution_mismatch((1440, 2560), (1080, 1920));
        assert!(err.to_string().contains("1440x2560"));
        assert!(err.to_string().contains("1080x1920"));

        let err = ResinError::corrupt_run(100, 128);
        assert!(err.to_string().contains("100"));
    }

    #[test]
    fn test_at_layer_attaches_index_and_stage() {
        let err = ResinError::corrupt_run(5, 16).at_layer(42, CodecStage::PixelCount);
        assert_eq!(err.layer_index(), Some(42));
        assert!(err.to_string().contains("Layer 42"));
        assert!(err.to_string().contains("pixel count check"));
    }

    #[test]
    fn test_at_layer_does_not_double_wrap() {
        let err = ResinError::corrupt_run(5, 16)
            .at_layer(42, CodecStage::PixelCount)
            .at_layer(7, CodecStage::BitRead);
        assert_eq!(err.layer_index(), Some(42));
    }

    #[test]
    fn test_cancelled_detection_through_wrapper() {
        let err = ResinError::Cancelled.at_layer(3, CodecStage::RunReconstruction);
        assert!(err.is_cancelled());
        assert!(!ResinError::corrupt_run(1, 2).is_cancelled());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: ResinError = io_err.into();
        assert!(matches!(err, ResinError::Io(_)));
    }
}
