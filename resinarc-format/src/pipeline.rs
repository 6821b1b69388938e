//! Batched parallel layer encode/decode.
//!
//! Layers are processed in fixed-size batches: each batch is computed in
//! parallel with rayon, then handed to the caller's I/O callback strictly
//! in layer-index order. Only one batch of payloads is alive at a time,
//! which bounds peak memory on multi-thousand-layer print jobs, and the
//! caller never observes out-of-order I/O so the output bytes are
//! independent of the batch size.
//!
//! A batch is all-or-nothing: every result is collected before any I/O
//! happens, so a worker failure or a cancellation never leaves a partial
//! batch behind the callback. Cancellation is polled by the pipeline
//! between batches and by the codecs between runs.

use rayon::prelude::*;
use resinarc_core::{LayerImage, Progress, Result};
use resinarc_rle::{EncodedLayer, LayerCodec};
use std::ops::Range;

use crate::header::Resolution;

/// Default layer batch size: ten layers per available core.
pub fn default_batch_size() -> u32 {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1);
    cores * 10
}

/// Split `layer_count` layers into consecutive batches.
///
/// `batch_size == 0` selects [`default_batch_size`]. The last batch may be
/// short; an empty job yields no batches.
pub fn batch_ranges(layer_count: u32, batch_size: u32) -> Vec<Range<u32>> {
    let batch_size = if batch_size == 0 {
        default_batch_size()
    } else {
        batch_size
    };
    let mut ranges = Vec::with_capacity(layer_count.div_ceil(batch_size) as usize);
    let mut start = 0;
    while start < layer_count {
        let end = (start + batch_size).min(layer_count);
        ranges.push(start..end);
        start = end;
    }
    ranges
}

/// Encode `layers` in batches, handing each encoded layer to `sink` in
/// index order.
///
/// The first failing layer of a batch wins (lowest index), wrapped with
/// its layer index; nothing from a failed batch reaches the sink.
pub fn encode_layers<F>(
    layers: &[LayerImage],
    codec: &dyn LayerCodec,
    threshold: u8,
    batch_size: u32,
    progress: &Progress,
    mut sink: F,
) -> Result<()>
where
    F: FnMut(u32, EncodedLayer) -> Result<()>,
{
    progress.reset(layers.len() as u32);

    for range in batch_ranges(layers.len() as u32, batch_size) {
        progress.checkpoint()?;

        let results: Vec<Result<EncodedLayer>> = range
            .clone()
            .into_par_iter()
            .map(|index| {
                progress.checkpoint()?;
                codec
                    .encode(&layers[index as usize], threshold, progress)
                    .map_err(|e| e.for_layer(index))
            })
            .collect();

        // Materialize the whole batch before any I/O so a failure or a
        // cancellation inside it writes nothing.
        let mut batch = Vec::with_capacity(results.len());
        for result in results {
            batch.push(result?);
        }

        for (index, encoded) in range.zip(batch) {
            sink(index, encoded).map_err(|e| e.for_layer(index))?;
            progress.increment();
        }
    }

    Ok(())
}

/// Decode `layer_count` layers in batches.
///
/// `source` is called sequentially in index order to fetch each encoded
/// layer; the batch is decoded in parallel and handed to `emit` in index
/// order. Payloads are dropped as soon as their batch is done.
pub fn decode_layers<F, G>(
    layer_count: u32,
    codec: &dyn LayerCodec,
    resolution: Resolution,
    batch_size: u32,
    progress: &Progress,
    mut source: F,
    mut emit: G,
) -> Result<()>
where
    F: FnMut(u32) -> Result<EncodedLayer>,
    G: FnMut(u32, LayerImage) -> Result<()>,
{
    progress.reset(layer_count);

    for range in batch_ranges(layer_count, batch_size) {
        progress.checkpoint()?;

        let mut encoded = Vec::with_capacity(range.len());
        for index in range.clone() {
            encoded.push(source(index).map_err(|e| e.for_layer(index))?);
        }

        let results: Vec<Result<LayerImage>> = range
            .clone()
            .into_par_iter()
            .zip(encoded.par_iter())
            .map(|(index, layer)| {
                progress.checkpoint()?;
                codec
                    .decode(layer, resolution.width, resolution.height, progress)
                    .map_err(|e| e.for_layer(index))
            })
            .collect();
        drop(encoded);

        let mut batch = Vec::with_capacity(results.len());
        for result in results {
            batch.push(result?);
        }

        for (index, image) in range.zip(batch) {
            emit(index, image).map_err(|e| e.for_layer(index))?;
            progress.increment();
        }
    }

    Ok(())
}
