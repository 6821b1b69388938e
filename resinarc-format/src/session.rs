//! Container encode/decode session.
//!
//! A [`FormatSession`] owns one print job's resolution, codec variant,
//! print parameters and decoded layers, and tracks where the job is in
//! its lifecycle. Every operation checks the state first; a failed
//! session is terminal and refuses all further work, while a cancelled
//! operation rolls back to [`SessionState::Idle`] since the session
//! itself is still sound.

use resinarc_core::{DEFAULT_THRESHOLD, LayerImage, Progress, ResinError, Result};
use resinarc_rle::CodecVariant;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::header::{
    FileHeader, HeaderPatch, LayerRecord, PARAMETER_OFFSET, PrintParameters, Resolution,
};
use crate::pipeline;

/// Where a session is in its encode/decode lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No job in flight; ready to decode or encode.
    Idle,
    /// A decode is running.
    Decoding,
    /// A decode finished; layers (or layer headers) are loaded.
    Decoded,
    /// An encode is running.
    Encoding,
    /// An encode finished.
    Encoded,
    /// A partial resave is rewriting the parameter block.
    PartialSaving,
    /// A non-recoverable error occurred; the session is dead.
    Failed,
}

/// How deep a decode should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeDepth {
    /// Read the header and layer records only, skipping payloads.
    HeadersOnly,
    /// Decode every layer back to pixels.
    Full,
}

/// One print job's container session.
#[derive(Debug)]
pub struct FormatSession {
    variant: CodecVariant,
    resolution: Resolution,
    threshold: u8,
    batch_size: u32,
    state: SessionState,
    parameters: PrintParameters,
    records: Vec<LayerRecord>,
    layers: Vec<LayerImage>,
}

impl FormatSession {
    /// Create an idle session for the given codec and resolution.
    pub fn new(variant: CodecVariant, resolution: Resolution) -> Self {
        Self {
            variant,
            resolution,
            threshold: DEFAULT_THRESHOLD,
            batch_size: 0,
            state: SessionState::Idle,
            parameters: PrintParameters::default(),
            records: Vec::new(),
            layers: Vec::new(),
        }
    }

    /// Override the binarization threshold (default 127).
    pub fn set_threshold(&mut self, threshold: u8) {
        self.threshold = threshold;
    }

    /// Override the layer batch size (0 selects the per-core default).
    pub fn set_batch_size(&mut self, batch_size: u32) {
        self.batch_size = batch_size;
    }

    /// Replace the print parameters written by the next encode.
    pub fn set_parameters(&mut self, parameters: PrintParameters) {
        self.parameters = parameters;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Codec variant this session reads and writes.
    pub fn variant(&self) -> CodecVariant {
        self.variant
    }

    /// Print resolution this session targets.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Print parameters from the last decode (or to be encoded).
    pub fn parameters(&self) -> &PrintParameters {
        &self.parameters
    }

    /// Layer records from the last decode.
    pub fn records(&self) -> &[LayerRecord] {
        &self.records
    }

    /// Decoded layer rasters; empty after a `HeadersOnly` decode.
    pub fn layers(&self) -> &[LayerImage] {
        &self.layers
    }

    fn ensure_ready(&self, operation: &str) -> Result<()> {
        match self.state {
            SessionState::Idle | SessionState::Decoded | SessionState::Encoded => Ok(()),
            state => Err(ResinError::invalid_state(format!(
                "cannot {operation} in state {state:?}"
            ))),
        }
    }

    /// Classify an operation failure into the state it leaves behind.
    ///
    /// Cancellation and a rejected header leave the session reusable;
    /// everything else is terminal.
    fn fail(&mut self, err: ResinError) -> ResinError {
        let recoverable =
            err.is_cancelled() || matches!(err, ResinError::InvalidFormatTag { .. });
        if recoverable {
            self.records.clear();
            self.layers.clear();
            self.state = SessionState::Idle;
        } else {
            self.state = SessionState::Failed;
        }
        err
    }

    /// Decode a container from `stream`.
    ///
    /// `HeadersOnly` loads the parameter block and layer records without
    /// touching payloads; `Full` also decodes every layer through the
    /// batch pipeline. A header that fails validation, or a cancellation,
    /// returns the session to `Idle`; any other failure is terminal.
    pub fn decode<R: Read + Seek>(
        &mut self,
        stream: &mut R,
        depth: DecodeDepth,
        progress: &Progress,
    ) -> Result<()> {
        self.ensure_ready("decode")?;
        self.state = SessionState::Decoding;
        self.records.clear();
        self.layers.clear();

        match self.decode_inner(stream, depth, progress) {
            Ok(()) => {
                self.state = SessionState::Decoded;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn decode_inner<R: Read + Seek>(
        &mut self,
        stream: &mut R,
        depth: DecodeDepth,
        progress: &Progress,
    ) -> Result<()> {
        stream.seek(SeekFrom::Start(0))?;
        let header = FileHeader::read(stream)?;
        if header.variant != self.variant {
            return Err(ResinError::invalid_format_tag(
                vec![self.variant.tag()],
                vec![header.variant.tag()],
            ));
        }
        if header.resolution != self.resolution {
            return Err(ResinError::resolution_mismatch(
                (self.resolution.width, self.resolution.height),
                (header.resolution.width, header.resolution.height),
            ));
        }
        self.parameters = PrintParameters::read(stream)?;

        match depth {
            DecodeDepth::HeadersOnly => {
                progress.reset(header.layer_count);
                for index in 0..header.layer_count {
                    progress.checkpoint()?;
                    let record =
                        LayerRecord::read(stream).map_err(|e| e.for_layer(index))?;
                    stream.seek(SeekFrom::Current(record.data_len as i64))?;
                    self.records.push(record);
                    progress.increment();
                }
            }
            DecodeDepth::Full => {
                let resolution = self.resolution;
                let records = &mut self.records;
                let layers = &mut self.layers;
                layers.reserve(header.layer_count as usize);
                pipeline::decode_layers(
                    header.layer_count,
                    self.variant.codec(),
                    resolution,
                    self.batch_size,
                    progress,
                    |_| {
                        let record = LayerRecord::read(stream)?;
                        let mut data = vec![0u8; record.data_len as usize];
                        stream.read_exact(&mut data)?;
                        records.push(record);
                        Ok(record.into_layer(resolution, data))
                    },
                    |_, image| {
                        layers.push(image);
                        Ok(())
                    },
                )?;
            }
        }
        Ok(())
    }

    /// Encode `layers` into `stream` as a fresh container.
    ///
    /// Every layer's dimensions are validated against the session
    /// resolution before any byte is written. Cancellation leaves the
    /// stream truncated at a batch boundary and the session `Idle`.
    pub fn encode<W: Write + Seek>(
        &mut self,
        stream: &mut W,
        layers: &[LayerImage],
        progress: &Progress,
    ) -> Result<()> {
        self.ensure_ready("encode")?;

        for (index, layer) in layers.iter().enumerate() {
            if layer.width() != self.resolution.width || layer.height() != self.resolution.height
            {
                let err = ResinError::resolution_mismatch(
                    (self.resolution.width, self.resolution.height),
                    (layer.width(), layer.height()),
                )
                .for_layer(index as u32);
                return Err(self.fail(err));
            }
        }

        self.state = SessionState::Encoding;
        self.records.clear();

        match self.encode_inner(stream, layers, progress) {
            Ok(()) => {
                self.state = SessionState::Encoded;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn encode_inner<W: Write + Seek>(
        &mut self,
        stream: &mut W,
        layers: &[LayerImage],
        progress: &Progress,
    ) -> Result<()> {
        stream.seek(SeekFrom::Start(0))?;
        let header = FileHeader {
            variant: self.variant,
            resolution: self.resolution,
            layer_count: layers.len() as u32,
        };
        header.write(stream)?;
        self.parameters.write(stream)?;

        let records = &mut self.records;
        pipeline::encode_layers(
            layers,
            self.variant.codec(),
            self.threshold,
            self.batch_size,
            progress,
            |_, encoded| {
                let record = LayerRecord::from_layer(&encoded);
                record.write(stream)?;
                stream.write_all(&encoded.data)?;
                records.push(record);
                Ok(())
            },
        )
    }

    /// Rewrite the print parameter block in place.
    ///
    /// Only legal from `Decoded`. The magic, codec tag, resolution and
    /// layer table are untouched; `None` patch fields keep their stored
    /// values.
    pub fn partial_resave<W: Write + Seek>(
        &mut self,
        stream: &mut W,
        patch: &HeaderPatch,
    ) -> Result<()> {
        if self.state != SessionState::Decoded {
            return Err(ResinError::invalid_state(format!(
                "cannot partial-resave in state {:?}",
                self.state
            )));
        }
        self.state = SessionState::PartialSaving;

        let mut patched = self.parameters;
        patched.apply(patch);

        let result = (|| -> Result<()> {
            stream.seek(SeekFrom::Start(PARAMETER_OFFSET))?;
            patched.write(stream)?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                self.parameters = patched;
                self.state = SessionState::Decoded;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }
}
