//! Column-major vertical span list codec.
//!
//! Not a true run-length scheme: the payload is a list of coordinates.
//! For every column inside the layer's tight bounding box, each maximal
//! contiguous vertical white span becomes a `(start_y, end_y, x)` triple
//! of big-endian u16 values with inclusive bounds. The list is prefixed
//! by a big-endian u32 triple count and terminated by the two-byte
//! page-break marker `0x0D 0x0A`.
//!
//! Triples are emitted in ascending `x`, then ascending `start_y`. The
//! decoder asserts that ordering instead of silently drawing unordered
//! segments: an out-of-order list would still rasterize to *something*,
//! but not necessarily the image the encoder meant.

use crate::{CodecVariant, EncodedLayer, LayerCodec};
use resinarc_core::{LayerImage, Progress, ResinError, Result};

/// Layer terminator, shared by the whole span-list format family.
pub const PAGE_BREAK: [u8; 2] = [0x0D, 0x0A];

const TRIPLE_LEN: usize = 6;

/// The span-list scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanListCodec;

impl LayerCodec for SpanListCodec {
    fn variant(&self) -> CodecVariant {
        CodecVariant::SpanList
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
                "span-list coordinates are 16-bit fields, got {width}x{height}"
            )));
        }

        let rect = image.bounding_rectangle(threshold);
        let mut triples: Vec<(u16, u16, u16)> = Vec::new();
        let mut white_pixel_count = 0u32;

        for x in rect.x..rect.right() {
            progress.checkpoint()?;
            let mut start_y: Option<u32> = None;
            for y in rect.y..rect.bottom() {
                if image.pixel(x, y) > threshold {
                    if start_y.is_none() {
                        start_y = Some(y);
                    }
                } else if let Some(start) = start_y.take() {
                    triples.push((start as u16, (y - 1) as u16, x as u16));
                    white_pixel_count += y - start;
                }
            }
            if let Some(start) = start_y {
                let end = rect.bottom() - 1;
                triples.push((start as u16, end as u16, x as u16));
                white_pixel_count += end - start + 1;
            }
        }

        let mut data = Vec::with_capacity(4 + triples.len() * TRIPLE_LEN + 2);
        data.extend_from_slice(&(triples.len() as u32).to_be_bytes());
        for (start_y, end_y, x) in &triples {
            data.extend_from_slice(&start_y.to_be_bytes());
            data.extend_from_slice(&end_y.to_be_bytes());
            data.extend_from_slice(&x.to_be_bytes());
        }
        data.extend_from_slice(&PAGE_BREAK);

        Ok(EncodedLayer {
            width,
            height,
            bounding_rectangle: rect,
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

        let data = &layer.data;
        if data.len() < 4 + PAGE_BREAK.len() {
            return Err(ResinError::corrupt_run(
                data.len(),
                4 + PAGE_BREAK.len(),
            ));
        }
        let count = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
        let expected_len = 4 + count * TRIPLE_LEN + PAGE_BREAK.len();
        if data.len() != expected_len {
            return Err(ResinError::corrupt_run(data.len(), expected_len));
        }
        if data[expected_len - 2..] != PAGE_BREAK {
            return Err(ResinError::invalid_format_tag(
                PAGE_BREAK.to_vec(),
                data[expected_len - 2..].to_vec(),
            ));
        }

        let mut image = LayerImage::new(width, height);
        let mut previous: Option<(u16, u16)> = None;

        for i in 0..count {
            progress.checkpoint()?;
            let at = 4 + i * TRIPLE_LEN;
            let start_y = u16::from_be_bytes([data[at], data[at + 1]]);
            let end_y = u16::from_be_bytes([data[at + 2], data[at + 3]]);
            let x = u16::from_be_bytes([data[at + 4], data[at + 5]]);

            if start_y > end_y {
                return Err(ResinError::corrupt_span_list(
                    i as u32,
                    format!("span ends at {end_y} before it starts at {start_y}"),
                ));
            }
            if u32::from(x) >= width || u32::from(end_y) >= height {
                return Err(ResinError::corrupt_span_list(
                    i as u32,
                    format!("span ({start_y}..={end_y}, x={x}) leaves the {width}x{height} layer"),
                ));
            }
            if let Some(prev) = previous {
                if (x, start_y) <= prev {
                    return Err(ResinError::corrupt_span_list(
                        i as u32,
                        format!(
                            "triple (x={x}, start_y={start_y}) not after (x={}, start_y={})",
                            prev.0, prev.1
                        ),
                    ));
                }
            }
            previous = Some((x, start_y));

            image.draw_vertical_span(u32::from(x), u32::from(start_y), u32::from(end_y), 0xFF);
        }

        Ok(image)
    }
}
