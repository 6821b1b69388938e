//! Byte-run codec: 7-bit bit-reversed run length plus a color bit.
//!
//! Pixels are binarized and every output byte describes one run: the low
//! bit holds the color, the remaining seven bits hold `run - 1` stored in
//! reverse bit order (bit 7 is the least significant bit of the run
//! value). Run lengths span 1..=128; longer runs split into several bytes
//! of the same color.
//!
//! The decoder is lenient about a missing final all-black run: some
//! slicers stop emitting once the last lit pixel is out, leaving up to
//! one run's worth (128 pixels) of implicit black. Anything shorter than
//! that is genuine corruption and is rejected, as is any run that crosses
//! the end of the image.

use crate::{CodecVariant, EncodedLayer, LayerCodec};
use resinarc_core::{LayerImage, Progress, ResinError, Result};

/// Longest run one byte can describe.
const RUN_LIMIT: usize = 128;

/// Pack one run into its byte: color bit plus bit-reversed `run - 1`.
fn run_byte(white: bool, run: usize) -> u8 {
    debug_assert!((1..=RUN_LIMIT).contains(&run));
    let n = (run - 1) as u8;
    u8::from(white)
        | ((n & 0x01) << 7)
        | ((n & 0x02) << 5)
        | ((n & 0x04) << 3)
        | ((n & 0x08) << 1)
        | ((n & 0x10) >> 1)
        | ((n & 0x20) >> 3)
        | ((n & 0x40) >> 5)
}

/// Recover the run length from a byte, undoing the bit reversal.
fn run_length(b: u8) -> usize {
    (usize::from(b & 0x80 != 0)
        | (usize::from(b & 0x40 != 0) << 1)
        | (usize::from(b & 0x20 != 0) << 2)
        | (usize::from(b & 0x10 != 0) << 3)
        | (usize::from(b & 0x08 != 0) << 4)
        | (usize::from(b & 0x04 != 0) << 5)
        | (usize::from(b & 0x02 != 0) << 6))
        + 1
}

/// The byte-run scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteRunCodec;

impl LayerCodec for ByteRunCodec {
    fn variant(&self) -> CodecVariant {
        CodecVariant::ByteRun
    }

    fn encode(
        &self,
        image: &LayerImage,
        threshold: u8,
        progress: &Progress,
    ) -> Result<EncodedLayer> {
        let pixels = image.pixels();
        let mut data = Vec::new();
        let mut white_pixel_count = 0u32;
        let mut is_white_prev = false;
        let mut run = 0usize;

        let mut flush = |data: &mut Vec<u8>, white: bool, mut run: usize| {
            while run > 0 {
                let chunk = run.min(RUN_LIMIT);
                data.push(run_byte(white, chunk));
                run -= chunk;
            }
        };

        for &p in pixels {
            let is_white = p > threshold;
            if is_white {
                white_pixel_count += 1;
            }
            if is_white == is_white_prev {
                run += 1;
            } else {
                progress.checkpoint()?;
                flush(&mut data, is_white_prev, run);
                is_white_prev = is_white;
                run = 1;
            }
        }
        flush(&mut data, is_white_prev, run);

        Ok(EncodedLayer {
            width: image.width(),
            height: image.height(),
            bounding_rectangle: image.bounding_rectangle(threshold),
            white_pixel_count,
            bit_len: data.len() * 8,
            data,
        })
    }

    fn decode(
        &self,
        layer: &EncodedLayer,
        width: u32,
        height: u32,
        progress: &Progress,
    ) -> Result<LayerImage> {
        layer.validate()?;
        layer.check_resolution(width, height)?;

        let total = width as usize * height as usize;
        let mut image = LayerImage::new(width, height);
        let mut pixel = 0usize;

        for &b in &layer.data {
            progress.checkpoint()?;
            let white = b & 0x01 != 0;
            let run = run_length(b);
            if pixel + run > total {
                return Err(ResinError::corrupt_run(pixel + run, total));
            }
            if white {
                image.fill_span(pixel, run, 0xFF);
            }
            pixel += run;
        }

        // Accept exactly one omitted trailing all-black run, nothing more.
        if pixel != total && total - pixel > RUN_LIMIT {
            return Err(ResinError::corrupt_run(pixel, total));
        }
        Ok(image)
    }
}
