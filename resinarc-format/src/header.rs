//! Fixed-layout container header and per-layer records.
//!
//! The container is a flat binary file: a 20-byte base header, a 28-byte
//! print parameter block, then the layer table in index order. Everything
//! except the magic is little-endian. The print parameter block sits at a
//! fixed offset so a partial resave can rewrite it without touching the
//! layer table.

use resinarc_core::{Rectangle, ResinError, Result};
use resinarc_rle::{CodecVariant, EncodedLayer};
use std::io::{Read, Write};

/// Container magic bytes.
pub const FORMAT_MAGIC: [u8; 4] = *b"RARC";

/// Current container version.
pub const FORMAT_VERSION: u8 = 1;

/// Byte offset of the print parameter block.
pub const PARAMETER_OFFSET: u64 = 20;

/// Byte offset of the first layer record.
pub const LAYER_TABLE_OFFSET: u64 = 48;

/// Byte length of one layer record, excluding its payload.
pub const LAYER_RECORD_LEN: u64 = 28;

/// Print resolution the session targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Horizontal pixel count.
    pub width: u32,
    /// Vertical pixel count.
    pub height: u32,
}

impl Resolution {
    /// Create a resolution value.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Exposure and motion settings stored in the print parameter block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrintParameters {
    /// Layer height in millimeters.
    pub layer_height_mm: f32,
    /// Normal layer exposure time in seconds.
    pub exposure_time_s: f32,
    /// Bottom layer exposure time in seconds.
    pub bottom_exposure_time_s: f32,
    /// Number of bottom layers.
    pub bottom_layer_count: u32,
    /// Lift height in millimeters.
    pub lift_height_mm: f32,
    /// Lift speed in millimeters per second.
    pub lift_speed_mms: f32,
    /// Retract speed in millimeters per second.
    pub retract_speed_mms: f32,
}

impl Default for PrintParameters {
    fn default() -> Self {
        Self {
            layer_height_mm: 0.05,
            exposure_time_s: 2.5,
            bottom_exposure_time_s: 30.0,
            bottom_layer_count: 4,
            lift_height_mm: 6.0,
            lift_speed_mms: 1.0,
            retract_speed_mms: 2.5,
        }
    }
}

impl PrintParameters {
    /// Write the 28-byte parameter block.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.layer_height_mm.to_le_bytes())?;
        writer.write_all(&self.exposure_time_s.to_le_bytes())?;
        writer.write_all(&self.bottom_exposure_time_s.to_le_bytes())?;
        writer.write_all(&self.bottom_layer_count.to_le_bytes())?;
        writer.write_all(&self.lift_height_mm.to_le_bytes())?;
        writer.write_all(&self.lift_speed_mms.to_le_bytes())?;
        writer.write_all(&self.retract_speed_mms.to_le_bytes())?;
        Ok(())
    }

    /// Read the 28-byte parameter block.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; 28];
        reader.read_exact(&mut buf)?;
        Ok(Self {
            layer_height_mm: f32::from_le_bytes(buf[0..4].try_into().unwrap()),
            exposure_time_s: f32::from_le_bytes(buf[4..8].try_into().unwrap()),
            bottom_exposure_time_s: f32::from_le_bytes(buf[8..12].try_into().unwrap()),
            bottom_layer_count: u32::from_le_bytes(buf[12..16].try_into().unwrap()),
            lift_height_mm: f32::from_le_bytes(buf[16..20].try_into().unwrap()),
            lift_speed_mms: f32::from_le_bytes(buf[20..24].try_into().unwrap()),
            retract_speed_mms: f32::from_le_bytes(buf[24..28].try_into().unwrap()),
        })
    }

    /// Apply a partial patch, keeping stored values where the patch is `None`.
    pub fn apply(&mut self, patch: &HeaderPatch) {
        if let Some(v) = patch.layer_height_mm {
            self.layer_height_mm = v;
        }
        if let Some(v) = patch.exposure_time_s {
            self.exposure_time_s = v;
        }
        if let Some(v) = patch.bottom_exposure_time_s {
            self.bottom_exposure_time_s = v;
        }
        if let Some(v) = patch.bottom_layer_count {
            self.bottom_layer_count = v;
        }
        if let Some(v) = patch.lift_height_mm {
            self.lift_height_mm = v;
        }
        if let Some(v) = patch.lift_speed_mms {
            self.lift_speed_mms = v;
        }
        if let Some(v) = patch.retract_speed_mms {
            self.retract_speed_mms = v;
        }
    }
}

/// A partial update of the print parameter block.
///
/// `None` fields keep the value already stored in the file. The magic,
/// codec tag, resolution and layer table are never patchable.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeaderPatch {
    /// New layer height, if changed.
    pub layer_height_mm: Option<f32>,
    /// New normal exposure time, if changed.
    pub exposure_time_s: Option<f32>,
    /// New bottom exposure time, if changed.
    pub bottom_exposure_time_s: Option<f32>,
    /// New bottom layer count, if changed.
    pub bottom_layer_count: Option<u32>,
    /// New lift height, if changed.
    pub lift_height_mm: Option<f32>,
    /// New lift speed, if changed.
    pub lift_speed_mms: Option<f32>,
    /// New retract speed, if changed.
    pub retract_speed_mms: Option<f32>,
}

/// The 20-byte base header at offset 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Codec variant every layer in the file is encoded with.
    pub variant: CodecVariant,
    /// Print resolution.
    pub resolution: Resolution,
    /// Number of layer records that follow the parameter block.
    pub layer_count: u32,
}

impl FileHeader {
    /// Write the base header.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&FORMAT_MAGIC)?;
        writer.write_all(&[FORMAT_VERSION, self.variant.tag()])?;
        writer.write_all(&0u16.to_le_bytes())?;
        writer.write_all(&self.resolution.width.to_le_bytes())?;
        writer.write_all(&self.resolution.height.to_le_bytes())?;
        writer.write_all(&self.layer_count.to_le_bytes())?;
        Ok(())
    }

    /// Read and validate the base header.
    ///
    /// A wrong magic, unknown version or unknown codec tag all fail with
    /// [`ResinError::InvalidFormatTag`] carrying the offending bytes.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; 20];
        reader.read_exact(&mut buf)?;

        if buf[0..4] != FORMAT_MAGIC {
            return Err(ResinError::invalid_format_tag(
                FORMAT_MAGIC.to_vec(),
                buf[0..4].to_vec(),
            ));
        }
        if buf[4] != FORMAT_VERSION {
            return Err(ResinError::invalid_format_tag(
                vec![FORMAT_VERSION],
                vec![buf[4]],
            ));
        }
        let variant = CodecVariant::from_tag(buf[5])
            .ok_or_else(|| ResinError::invalid_format_tag(vec![0, 1, 2, 3], vec![buf[5]]))?;

        Ok(Self {
            variant,
            resolution: Resolution::new(
                u32::from_le_bytes(buf[8..12].try_into().unwrap()),
                u32::from_le_bytes(buf[12..16].try_into().unwrap()),
            ),
            layer_count: u32::from_le_bytes(buf[16..20].try_into().unwrap()),
        })
    }
}

/// The fixed 28-byte record prefixing each layer payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerRecord {
    /// Declared payload length in bits.
    pub bit_len: u32,
    /// Payload length in bytes.
    pub data_len: u32,
    /// Pixels above the binarization threshold.
    pub white_pixel_count: u32,
    /// Tightest rectangle around the layer's lit pixels.
    pub bounding_rectangle: Rectangle,
}

impl LayerRecord {
    /// Build the record for an encoded layer.
    pub fn from_layer(layer: &EncodedLayer) -> Self {
        Self {
            bit_len: layer.bit_len as u32,
            data_len: layer.data.len() as u32,
            white_pixel_count: layer.white_pixel_count,
            bounding_rectangle: layer.bounding_rectangle,
        }
    }

    /// Rebuild the [`EncodedLayer`] this record and payload describe.
    pub fn into_layer(self, resolution: Resolution, data: Vec<u8>) -> EncodedLayer {
        EncodedLayer {
            width: resolution.width,
            height: resolution.height,
            bounding_rectangle: self.bounding_rectangle,
            white_pixel_count: self.white_pixel_count,
            bit_len: self.bit_len as usize,
            data,
        }
    }

    /// Write the fixed record.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.bit_len.to_le_bytes())?;
        writer.write_all(&self.data_len.to_le_bytes())?;
        writer.write_all(&self.white_pixel_count.to_le_bytes())?;
        writer.write_all(&self.bounding_rectangle.x.to_le_bytes())?;
        writer.write_all(&self.bounding_rectangle.y.to_le_bytes())?;
        writer.write_all(&self.bounding_rectangle.width.to_le_bytes())?;
        writer.write_all(&self.bounding_rectangle.height.to_le_bytes())?;
        Ok(())
    }

    /// Read the fixed record.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; 28];
        reader.read_exact(&mut buf)?;
        let word = |i: usize| u32::from_le_bytes(buf[i * 4..i * 4 + 4].try_into().unwrap());
        Ok(Self {
            bit_len: word(0),
            data_len: word(1),
            white_pixel_count: word(2),
            bounding_rectangle: Rectangle::new(word(3), word(4), word(5), word(6)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_file_header_roundtrip() {
        let header = FileHeader {
            variant: CodecVariant::ByteRun,
            resolution: Resolution::new(1440, 2560),
            layer_count: 321,
        };
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        assert_eq!(buf.len(), PARAMETER_OFFSET as usize);
        assert_eq!(&buf[0..4], b"RARC");

        let parsed = FileHeader::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut buf = Vec::new();
        FileHeader {
            variant: CodecVariant::BitRun,
            resolution: Resolution::new(16, 16),
            layer_count: 0,
        }
        .write(&mut buf)
        .unwrap();
        buf[0] = b'X';
        let err = FileHeader::read(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, ResinError::InvalidFormatTag { .. }));
    }

    #[test]
    fn test_unknown_version_and_tag_rejected() {
        let mut good = Vec::new();
        FileHeader {
            variant: CodecVariant::BitRun,
            resolution: Resolution::new(16, 16),
            layer_count: 1,
        }
        .write(&mut good)
        .unwrap();

        let mut bad_version = good.clone();
        bad_version[4] = 9;
        assert!(matches!(
            FileHeader::read(&mut Cursor::new(bad_version)).unwrap_err(),
            ResinError::InvalidFormatTag { .. }
        ));

        let mut bad_tag = good;
        bad_tag[5] = 42;
        assert!(matches!(
            FileHeader::read(&mut Cursor::new(bad_tag)).unwrap_err(),
            ResinError::InvalidFormatTag { .. }
        ));
    }

    #[test]
    fn test_parameters_roundtrip_and_patch() {
        let mut params = PrintParameters::default();
        let mut buf = Vec::new();
        params.write(&mut buf).unwrap();
        assert_eq!(buf.len(), 28);
        assert_eq!(PrintParameters::read(&mut Cursor::new(&buf)).unwrap(), params);

        params.apply(&HeaderPatch {
            exposure_time_s: Some(3.5),
            bottom_layer_count: Some(6),
            ..HeaderPatch::default()
        });
        assert_eq!(params.exposure_time_s, 3.5);
        assert_eq!(params.bottom_layer_count, 6);
        assert_eq!(params.layer_height_mm, 0.05);
    }

    #[test]
    fn test_layer_record_roundtrip() {
        let record = LayerRecord {
            bit_len: 43,
            data_len: 6,
            white_pixel_count: 16,
            bounding_rectangle: Rectangle::new(1, 2, 3, 4),
        };
        let mut buf = Vec::new();
        record.write(&mut buf).unwrap();
        assert_eq!(buf.len(), LAYER_RECORD_LEN as usize);
        assert_eq!(LayerRecord::read(&mut Cursor::new(buf)).unwrap(), record);
    }
}
