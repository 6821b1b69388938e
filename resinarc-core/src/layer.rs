//! In-memory layer raster and its derived geometry.
//!
//! A [`LayerImage`] owns one decoded (or pre-encode) 8-bit grayscale
//! raster. It knows nothing about any encoding; codecs query it for the
//! bounding rectangle and pixel counts their headers need and write into
//! it through the span helpers while decoding.

use crate::error::{ResinError, Result};

/// An axis-aligned rectangle with exclusive right/bottom edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rectangle {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels; zero for an empty rectangle.
    pub width: u32,
    /// Height in pixels; zero for an empty rectangle.
    pub height: u32,
}

impl Rectangle {
    /// Create a rectangle from its corner and size.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// One past the rightmost column.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// One past the bottom row.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Whether the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// One layer's 8-bit grayscale pixel buffer.
///
/// Invariant: the buffer length always equals `width * height`. Created
/// when a raster is decoded from bytes (or rasterized upstream) and meant
/// to be dropped as soon as its batch is done with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl LayerImage {
    /// Create an all-black layer of the given dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    /// Wrap an existing pixel buffer.
    ///
    /// Fails with [`ResinError::PixelBufferSize`] when the buffer length
    /// does not equal `width * height`.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if pixels.len() != width as usize * height as usize {
            return Err(ResinError::pixel_buffer_size(width, height, pixels.len()));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Layer width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Layer height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total pixel count (`width * height`).
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Whether the layer has zero area.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// The raw pixel buffer in row-major order.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable access to the raw pixel buffer.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// The pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics when the coordinate is outside the layer.
    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        assert!(x < self.width && y < self.height);
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Number of pixels with a non-zero value.
    pub fn non_zero_pixel_count(&self) -> u32 {
        self.pixels.iter().filter(|&&p| p != 0).count() as u32
    }

    /// Number of pixels strictly above the binarization threshold.
    pub fn white_pixel_count(&self, threshold: u8) -> u32 {
        self.pixels.iter().filter(|&&p| p > threshold).count() as u32
    }

    /// The tightest rectangle enclosing all pixels strictly above
    /// `threshold`, with corners inside `[0, width) x [0, height)`.
    ///
    /// An all-black layer yields an empty rectangle; printers do emit
    /// blank layers for raft/support gaps, so that is legal, not an error.
    pub fn bounding_rectangle(&self, threshold: u8) -> Rectangle {
        let mut min_x = self.width;
        let mut min_y = self.height;
        let mut max_x = 0u32;
        let mut max_y = 0u32;
        let mut any = false;

        for y in 0..self.height {
            let row = &self.pixels[y as usize * self.width as usize..][..self.width as usize];
            for (x, &p) in row.iter().enumerate() {
                if p > threshold {
                    let x = x as u32;
                    any = true;
                    min_x = min_x.min(x);
                    max_x = max_x.max(x);
                    min_y = min_y.min(y);
                    max_y = max_y.max(y);
                }
            }
        }

        if !any {
            return Rectangle::default();
        }
        Rectangle::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
    }

    /// Fill `len` consecutive pixels starting at linear index `start`.
    ///
    /// # Panics
    ///
    /// Panics when the span runs off the end of the buffer; decoders must
    /// bounds-check runs before filling.
    pub fn fill_span(&mut self, start: usize, len: usize, value: u8) {
        self.pixels[start..start + len].fill(value);
    }

    /// Draw a vertical segment at column `x` covering rows `y0..=y1`.
    ///
    /// # Panics
    ///
    /// Panics when the segment leaves the layer or `y0 > y1`.
    pub fn draw_vertical_span(&mut self, x: u32, y0: u32, y1: u32, value: u8) {
        assert!(x < self.width && y0 <= y1 && y1 < self.height);
        let stride = self.width as usize;
        let mut pos = y0 as usize * stride + x as usize;
        for _ in y0..=y1 {
            self.pixels[pos] = value;
            pos += stride;
        }
    }
}
