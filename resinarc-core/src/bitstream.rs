//! Positional bit-level packing over a growable byte buffer.
//!
//! This module provides [`BitBuffer`], the foundation for every run-length
//! scheme that does not align to byte boundaries. Unlike a streaming bit
//! reader, a `BitBuffer` is addressed by absolute bit offset: the bit-run
//! codec writes its 5-bit length prefixes at computed positions and the
//! decoder re-reads them the same way.
//!
//! # Bit Addressing
//!
//! Bit `pos` lives in byte `pos / 8` under mask `1 << (pos % 8)`. A field
//! of `count` bits is written highest-order bit first, so the field's most
//! significant bit occupies the lowest bit address.
//!
//! The buffer tracks a logical bit length separately from its byte length,
//! since the final byte is usually only partially used. Reads past the
//! logical length fail with [`ResinError::OutOfRange`].
//!
//! # Example
//!
//! ```
//! use resinarc_core::bitstream::BitBuffer;
//!
//! let mut buf = BitBuffer::new();
//! buf.write_bits(0, 4, 16);       // 16-bit width field
//! buf.write_bits(16, 4, 16);      // 16-bit height field
//! buf.write_bits(32, 1, 1);       // start-color flag
//! assert_eq!(buf.bit_len(), 33);
//! assert_eq!(buf.read_bits(0, 16).unwrap(), 4);
//! assert_eq!(buf.read_bits(32, 1).unwrap(), 1);
//! ```

use crate::error::{ResinError, Result};

/// A growable byte buffer addressed at the bit level.
///
/// Grows lazily in whole zero-filled bytes when a write extends past the
/// current capacity. Holds no shared state and performs no I/O.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitBuffer {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitBuffer {
    /// Create an empty bit buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing byte payload with its declared logical bit length.
    ///
    /// Fails with [`ResinError::OutOfRange`] when the byte payload cannot
    /// hold `bit_len` bits or declares more than a byte of slack.
    pub fn from_bytes(bytes: Vec<u8>, bit_len: usize) -> Result<Self> {
        if bit_len.div_ceil(8) != bytes.len() {
            return Err(ResinError::out_of_range(0, bit_len, bytes.len() * 8));
        }
        Ok(Self { bytes, bit_len })
    }

    /// The logical number of valid bits.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Whether no bits have been written.
    pub fn is_empty(&self) -> bool {
        self.bit_len == 0
    }

    /// The underlying bytes, including the partially-used final byte.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the buffer and return the underlying bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Write the `bit_count` least-significant bits of `value` at `bit_offset`.
    ///
    /// The field's highest-order bit lands at `bit_offset`. Grows the buffer
    /// as needed and extends the logical bit length to cover the write.
    ///
    /// # Panics
    ///
    /// Debug-asserts `bit_count <= 32`.
    pub fn write_bits(&mut self, bit_offset: usize, value: u32, bit_count: usize) {
        debug_assert!(bit_count <= 32, "Cannot write more than 32 bits at once");

        let end = bit_offset + bit_count;
        if self.bytes.len() * 8 < end {
            self.bytes.resize(end.div_ceil(8), 0);
        }

        let mut value = value;
        for pos in (bit_offset..end).rev() {
            let byte = &mut self.bytes[pos / 8];
            let mask = 1u8 << (pos % 8);
            if value & 1 == 1 {
                *byte |= mask;
            } else {
                *byte &= !mask;
            }
            value >>= 1;
        }

        self.bit_len = self.bit_len.max(end);
    }

    /// Read `bit_count` bits starting at `bit_offset`.
    ///
    /// Inverse of [`write_bits`](Self::write_bits): the bit at `bit_offset`
    /// becomes the result's most significant bit. Fails with
    /// [`ResinError::OutOfRange`] when the read crosses the logical bit
    /// length.
    ///
    /// # Panics
    ///
    /// Debug-asserts `bit_count <= 32`.
    pub fn read_bits(&self, bit_offset: usize, bit_count: usize) -> Result<u32> {
        debug_assert!(bit_count <= 32, "Cannot read more than 32 bits at once");

        let end = bit_offset + bit_count;
        if end > self.bit_len {
            return Err(ResinError::out_of_range(bit_offset, bit_count, self.bit_len));
        }

        let mut result = 0u32;
        for pos in bit_offset..end {
            result <<= 1;
            if self.bytes[pos / 8] & (1 << (pos % 8)) != 0 {
                result |= 1;
            }
        }
        Ok(result)
    }
}
