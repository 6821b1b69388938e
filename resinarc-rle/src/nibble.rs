//! Nibble-run codec with greedy chunk extension.
//!
//! Pixels are quantized to their top four bits, giving 16 gray levels
//! instead of a plain black/white binarization. Each payload byte carries
//! the color nibble in its high half and one base-16 digit of the run
//! length in its low half. Runs longer than 15 spill into successive
//! bytes that repeat the same color nibble; the decoder keeps extending
//! the pending run while consecutive bytes agree on color, accumulating
//! digits most-significant-first.
//!
//! Decoded pixels replicate the color nibble into both halves (`0xF0`
//! decodes to `0xFF`), so re-encoding a decoded layer is stable at the
//! 16-level quantization.

use crate::{CodecVariant, EncodedLayer, LayerCodec};
use resinarc_core::{LayerImage, Progress, ResinError, Result};

/// Emit one run as same-color bytes, digits most significant first.
fn put_run(data: &mut Vec<u8>, color: u8, mut run: u32) {
    debug_assert!(run > 0);
    let mut digits = [0u8; 8];
    let mut n = 0;
    while run > 0 {
        digits[n] = (run & 0xf) as u8;
        run >>= 4;
        n += 1;
    }
    for &digit in digits[..n].iter().rev() {
        data.push(color | digit);
    }
}

/// The nibble-run scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct NibbleRunCodec;

impl LayerCodec for NibbleRunCodec {
    fn variant(&self) -> CodecVariant {
        CodecVariant::NibbleRun
    }

    fn encode(
        &self,
        image: &LayerImage,
        threshold: u8,
        progress: &Progress,
    ) -> Result<EncodedLayer> {
        let mut data = Vec::new();
        let mut last_color = 0u8;
        let mut run = 0u32;
        let mut started = false;

        for &p in image.pixels() {
            let color = p & 0xf0;
            if started && color == last_color {
                run += 1;
            } else {
                if started {
                    progress.checkpoint()?;
                    put_run(&mut data, last_color, run);
                }
                last_color = color;
                run = 1;
                started = true;
            }
        }
        if started {
            put_run(&mut data, last_color, run);
        }

        Ok(EncodedLayer {
            width: image.width(),
            height: image.height(),
            bounding_rectangle: image.bounding_rectangle(threshold),
            white_pixel_count: image.white_pixel_count(threshold),
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
        let mut last_color = 0u8;
        let mut run = 0usize;
        let mut index = 0usize;

        for &b in &layer.data {
            let color = (b & 0xf0) | (b >> 4);
            if color == last_color {
                run = (run << 4) | (b & 0xf) as usize;
                if run > total {
                    return Err(ResinError::corrupt_run(index + run, total));
                }
            } else {
                progress.checkpoint()?;
                if index + run > total {
                    return Err(ResinError::corrupt_run(index + run, total));
                }
                image.fill_span(index, run, last_color);
                index += run;
                run = (b & 0xf) as usize;
                last_color = color;
            }
        }
        if index + run > total {
            return Err(ResinError::corrupt_run(index + run, total));
        }
        image.fill_span(index, run, last_color);
        index += run;

        if index != total {
            return Err(ResinError::corrupt_run(index, total));
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
        let encoded = NibbleRunCodec
            .encode(image, DEFAULT_THRESHOLD, &progress)
            .unwrap();
        NibbleRunCodec
            .decode(&encoded, image.width(), image.height(), &progress)
            .unwrap()
    }

    #[test]
    fn test_roundtrip_binary_image() {
        let mut image = LayerImage::new(16, 16);
        image.pixels_mut()[30..200].fill(255);
        let decoded = roundtrip(&image);
        assert_eq!(decoded.pixels(), image.pixels());
    }

    #[test]
    fn test_roundtrip_all_black() {
        let image = LayerImage::new(40, 40);
        assert_eq!(roundtrip(&image).pixels(), image.pixels());
    }

    #[test]
    fn test_gray_levels_quantized_to_top_nibble() {
        let mut image = LayerImage::new(4, 1);
        image.pixels_mut().copy_from_slice(&[0x00, 0x1F, 0x8A, 0xF3]);
        let decoded = roundtrip(&image);
        // Each nibble is replicated into both halves on decode.
        assert_eq!(decoded.pixels(), &[0x00, 0x11, 0x88, 0xFF]);
    }

    #[test]
    fn test_run_longer_than_15_extends_across_bytes() {
        // A run of 300 white pixels: 300 = 0x12C, three digits, so three
        // bytes sharing the 0xF color nibble, most significant first.
        let mut image = LayerImage::new(30, 10);
        image.pixels_mut().fill(255);
        let encoded = NibbleRunCodec
            .encode(&image, DEFAULT_THRESHOLD, &Progress::new())
            .unwrap();
        assert_eq!(encoded.data, vec![0xF1, 0xF2, 0xFC]);

        let decoded = NibbleRunCodec
            .decode(&encoded, 30, 10, &Progress::new())
            .unwrap();
        assert_eq!(decoded.pixels(), image.pixels());
    }

    #[test]
    fn test_run_of_exactly_16() {
        let mut image = LayerImage::new(16, 1);
        image.pixels_mut().fill(255);
        let encoded = NibbleRunCodec
            .encode(&image, DEFAULT_THRESHOLD, &Progress::new())
            .unwrap();
        // 16 = 0x10: digit 1 then digit 0, same color nibble.
        assert_eq!(encoded.data, vec![0xF1, 0xF0]);
        let decoded = NibbleRunCodec
            .decode(&encoded, 16, 1, &Progress::new())
            .unwrap();
        assert_eq!(decoded.pixels(), image.pixels());
    }

    #[test]
    fn test_short_payload_fails_pixel_count() {
        let layer = EncodedLayer {
            width: 4,
            height: 4,
            bounding_rectangle: Default::default(),
            white_pixel_count: 0,
            bit_len: 8,
            data: vec![0x05], // 5 black pixels, 16 expected
        };
        let err = NibbleRunCodec
            .decode(&layer, 4, 4, &Progress::new())
            .unwrap_err();
        assert!(matches!(
            err,
            ResinError::CorruptRun {
                decoded: 5,
                expected: 16
            }
        ));
    }

    #[test]
    fn test_overlong_run_fails() {
        let layer = EncodedLayer {
            width: 2,
            height: 2,
            bounding_rectangle: Default::default(),
            white_pixel_count: 4,
            bit_len: 8,
            data: vec![0xF9], // 9 white pixels into a 4-pixel layer
        };
        let err = NibbleRunCodec
            .decode(&layer, 2, 2, &Progress::new())
            .unwrap_err();
        assert!(matches!(err, ResinError::CorruptRun { .. }));
    }

    #[test]
    fn test_white_count_and_bounding_rect_in_header() {
        let mut image = LayerImage::new(8, 8);
        image.pixels_mut()[9] = 255; // (1, 1)
        image.pixels_mut()[18] = 255; // (2, 2)
        let encoded = NibbleRunCodec
            .encode(&image, DEFAULT_THRESHOLD, &Progress::new())
            .unwrap();
        assert_eq!(encoded.white_pixel_count, 2);
        assert_eq!(encoded.bounding_rectangle.x, 1);
        assert_eq!(encoded.bounding_rectangle.y, 1);
        assert_eq!(encoded.bounding_rectangle.width, 2);
        assert_eq!(encoded.bounding_rectangle.height, 2);
    }
}
