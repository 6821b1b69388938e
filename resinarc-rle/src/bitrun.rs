//! Self-describing bit-run codec.
//!
//! The encoded stream opens with its own geometry: 16 bits of width, 16
//! bits of height, then 1 bit for the starting color. After that it is a
//! sequence of runs in alternating colors: a 5-bit field holds
//! `k = ceil(log2(run_len))` and the next `k + 1` bits hold the run length
//! itself. A run of a single pixel therefore costs 6 bits (`k = 0`, one
//! length bit), while a full 12K-pixel scanline costs 5 + 15.
//!
//! Colors alternate with every run, so no color bits appear after the
//! header. Every pixel belongs to exactly one run; a zero-length run
//! cannot occur in a well-formed stream and is rejected as corrupt.

use crate::{CodecVariant, EncodedLayer, LayerCodec};
use resinarc_core::{BitBuffer, LayerImage, Progress, ResinError, Result};

/// Bits needed to hold a run length, biased so length 1 needs zero.
fn run_length_bits(run: u32) -> usize {
    if run <= 1 {
        0
    } else {
        (32 - (run - 1).leading_zeros()) as usize
    }
}

fn emit_run(buf: &mut BitBuffer, bit_pos: &mut usize, run: u32) {
    let k = run_length_bits(run);
    buf.write_bits(*bit_pos, k as u32, 5);
    buf.write_bits(*bit_pos + 5, run, k + 1);
    *bit_pos += 6 + k;
}

/// The self-describing bit-run scheme.
///
/// This is an exact variant: decode must reconstruct `width * height`
/// pixels precisely, with no trailing-run leniency.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitRunCodec;

impl LayerCodec for BitRunCodec {
    fn variant(&self) -> CodecVariant {
        CodecVariant::BitRun
    }

    fn encode(
        &self,
        image: &LayerImage,
        threshold: u8,
        progress: &Progress,
    ) -> Result<EncodedLayer> {
        let (width, height) = (image.width(), image.height());
        if width > u16::MAX as u32 || height > u16::MAX as u32 {
            return Err(ResinError::unsupported(format!(
                "bit-run dimensions are 16-bit fields, got {width}x{height}"
            )));
        }
        let pixels = image.pixels();
        if pixels.is_empty() {
            return Err(ResinError::unsupported("bit-run cannot encode a zero-area layer"));
        }

        let mut buf = BitBuffer::new();
        let mut is_white_prev = pixels[0] > threshold;
        buf.write_bits(0, width, 16);
        buf.write_bits(16, height, 16);
        buf.write_bits(32, u32::from(is_white_prev), 1);

        let mut bit_pos = 33usize;
        let mut run = 0u32;
        let mut white_pixel_count = 0u32;

        for &p in pixels {
            let is_white = p > threshold;
            if is_white {
                white_pixel_count += 1;
            }
            if is_white == is_white_prev {
                run += 1;
            } else {
                progress.checkpoint()?;
                emit_run(&mut buf, &mut bit_pos, run);
                is_white_prev = is_white;
                run = 1;
            }
        }
        // The last run always reaches the final pixel, whether or not the
        // color changed at the boundary.
        emit_run(&mut buf, &mut bit_pos, run);

        debug_assert_eq!(buf.bit_len(), bit_pos);
        Ok(EncodedLayer {
            width,
            height,
            bounding_rectangle: image.bounding_rectangle(threshold),
            white_pixel_count,
            bit_len: bit_pos,
            data: buf.into_bytes(),
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

        let buf = BitBuffer::from_bytes(layer.data.clone(), layer.bit_len)?;
        let declared_width = buf.read_bits(0, 16)?;
        let declared_height = buf.read_bits(16, 16)?;
        if declared_width != width || declared_height != height {
            return Err(ResinError::resolution_mismatch(
                (width, height),
                (declared_width, declared_height),
            ));
        }

        let mut is_white = buf.read_bits(32, 1)? == 1;
        let total = width as usize * height as usize;
        let mut image = LayerImage::new(width, height);
        let mut pixel = 0usize;
        let mut bit_pos = 33usize;

        while pixel < total {
            progress.checkpoint()?;
            let k = buf.read_bits(bit_pos, 5)? as usize;
            let run = buf.read_bits(bit_pos + 5, k + 1)? as usize;
            bit_pos += 6 + k;

            if run == 0 {
                return Err(ResinError::corrupt_run(pixel, total));
            }
            if pixel + run > total {
                return Err(ResinError::corrupt_run(pixel + run, total));
            }
            if is_white {
                image.fill_span(pixel, run, 0xFF);
            }
            pixel += run;
            is_white = !is_white;
        }

        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resinarc_core::DEFAULT_THRESHOLD;

    fn roundtrip(image: &LayerImage) -> LayerImage {
        let progress = Progress::new();
        let encoded = BitRunCodec
            .encode(image, DEFAULT_THRESHOLD, &progress)
            .unwrap();
        BitRunCodec
            .decode(&encoded, image.width(), image.height(), &progress)
            .unwrap()
    }

    #[test]
    fn test_all_white_4x4_exact_bits() {
        let mut image = LayerImage::new(4, 4);
        image.pixels_mut().fill(255);
        let encoded = BitRunCodec
            .encode(&image, DEFAULT_THRESHOLD, &Progress::new())
            .unwrap();

        // Header: width=4, height=4, start color white, then a single run
        // of 16 pixels: k = ceil(log2(16)) = 4 in 5 bits, 16 in 5 bits.
        let buf = BitBuffer::from_bytes(encoded.data.clone(), encoded.bit_len).unwrap();
        assert_eq!(buf.read_bits(0, 16).unwrap(), 4);
        assert_eq!(buf.read_bits(16, 16).unwrap(), 4);
        assert_eq!(buf.read_bits(32, 1).unwrap(), 1);
        assert_eq!(buf.read_bits(33, 5).unwrap(), 4);
        assert_eq!(buf.read_bits(38, 5).unwrap(), 16);
        assert_eq!(encoded.bit_len, 43);
        assert_eq!(encoded.white_pixel_count, 16);

        let decoded = BitRunCodec
            .decode(&encoded, 4, 4, &Progress::new())
            .unwrap();
        assert_eq!(decoded.pixels(), &[255u8; 16]);
    }

    #[test]
    fn test_roundtrip_all_black() {
        let image = LayerImage::new(16, 16);
        assert_eq!(roundtrip(&image).pixels(), image.pixels());
    }

    #[test]
    fn test_roundtrip_single_pixel() {
        let mut image = LayerImage::new(9, 7);
        image.pixels_mut()[40] = 255;
        assert_eq!(roundtrip(&image).pixels(), image.pixels());
    }

    #[test]
    fn test_roundtrip_checkerboard() {
        // Every run has length 1, including the final pixel, which starts
        // a new run exactly at the image boundary.
        let mut image = LayerImage::new(5, 5);
        for (i, p) in image.pixels_mut().iter_mut().enumerate() {
            *p = if i % 2 == 0 { 255 } else { 0 };
        }
        assert_eq!(roundtrip(&image).pixels(), image.pixels());
    }

    #[test]
    fn test_roundtrip_trailing_color_change() {
        let mut image = LayerImage::new(4, 1);
        image.pixels_mut().copy_from_slice(&[0, 0, 0, 255]);
        assert_eq!(roundtrip(&image).pixels(), image.pixels());
    }

    #[test]
    fn test_binarization_threshold() {
        let mut image = LayerImage::new(4, 1);
        image.pixels_mut().copy_from_slice(&[0, 127, 128, 255]);
        let decoded = roundtrip(&image);
        // 127 is not strictly above the threshold; 128 is.
        assert_eq!(decoded.pixels(), &[0, 0, 255, 255]);
    }

    #[test]
    fn test_resolution_mismatch() {
        let mut image = LayerImage::new(8, 8);
        image.pixels_mut().fill(255);
        let encoded = BitRunCodec
            .encode(&image, DEFAULT_THRESHOLD, &Progress::new())
            .unwrap();
        let err = BitRunCodec
            .decode(&encoded, 8, 16, &Progress::new())
            .unwrap_err();
        assert!(matches!(err, ResinError::ResolutionMismatch { .. }));
    }

    #[test]
    fn test_truncated_payload_fails() {
        let mut image = LayerImage::new(8, 8);
        image.pixels_mut()[10..30].fill(255);
        let mut encoded = BitRunCodec
            .encode(&image, DEFAULT_THRESHOLD, &Progress::new())
            .unwrap();
        encoded.data.pop();
        encoded.bit_len = encoded.data.len() * 8;
        let err = BitRunCodec
            .decode(&encoded, 8, 8, &Progress::new())
            .unwrap_err();
        assert!(matches!(
            err,
            ResinError::OutOfRange { .. } | ResinError::CorruptRun { .. }
        ));
    }

    #[test]
    fn test_declared_length_mismatch_fails() {
        let mut image = LayerImage::new(8, 8);
        image.pixels_mut().fill(255);
        let mut encoded = BitRunCodec
            .encode(&image, DEFAULT_THRESHOLD, &Progress::new())
            .unwrap();
        encoded.bit_len += 9;
        let err = BitRunCodec
            .decode(&encoded, 8, 8, &Progress::new())
            .unwrap_err();
        assert!(matches!(err, ResinError::CorruptRun { .. }));
    }

    #[test]
    fn test_run_length_bits() {
        assert_eq!(run_length_bits(1), 0);
        assert_eq!(run_length_bits(2), 1);
        assert_eq!(run_length_bits(3), 2);
        assert_eq!(run_length_bits(4), 2);
        assert_eq!(run_length_bits(16), 4);
        assert_eq!(run_length_bits(17), 5);
        assert_eq!(run_length_bits(3_686_400), 22); // 1440 x 2560
    }
}
