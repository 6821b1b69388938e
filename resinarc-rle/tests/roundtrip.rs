//! Round-trip property tests across every codec variant.

use resinarc_core::{DEFAULT_THRESHOLD, LayerImage, Progress, ResinError};
use resinarc_rle::CodecVariant;

/// Deterministic LCG so failures reproduce.
fn random_binary_image(width: u32, height: u32, seed: u64) -> LayerImage {
    let mut image = LayerImage::new(width, height);
    let mut state = seed;
    for p in image.pixels_mut() {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        *p = if state >> 63 == 1 { 255 } else { 0 };
    }
    image
}

fn checkerboard(width: u32, height: u32) -> LayerImage {
    let mut image = LayerImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            if (x + y) % 2 == 0 {
                image.pixels_mut()[(y * width + x) as usize] = 255;
            }
        }
    }
    image
}

fn roundtrip(variant: CodecVariant, image: &LayerImage) -> LayerImage {
    let progress = Progress::new();
    let codec = variant.codec();
    let encoded = codec
        .encode(image, DEFAULT_THRESHOLD, &progress)
        .unwrap_or_else(|e| panic!("{variant} encode failed: {e}"));
    codec
        .decode(&encoded, image.width(), image.height(), &progress)
        .unwrap_or_else(|e| panic!("{variant} decode failed: {e}"))
}

#[test]
fn test_roundtrip_identity_binary_images() {
    let images = [
        LayerImage::new(1, 1),
        LayerImage::new(33, 17),
        {
            let mut single = LayerImage::new(13, 11);
            single.pixels_mut()[70] = 255;
            single
        },
        {
            let mut white = LayerImage::new(24, 24);
            white.pixels_mut().fill(255);
            white
        },
        checkerboard(16, 16),
        checkerboard(7, 9),
        random_binary_image(64, 48, 1),
        random_binary_image(31, 57, 99),
        random_binary_image(128, 128, 0xDEAD_BEEF),
    ];

    for variant in CodecVariant::ALL {
        for (i, image) in images.iter().enumerate() {
            let decoded = roundtrip(variant, image);
            assert_eq!(
                decoded.pixels(),
                image.pixels(),
                "{variant} image {i} ({}x{})",
                image.width(),
                image.height()
            );
        }
    }
}

#[test]
fn test_decode_yields_exact_pixel_count() {
    let image = random_binary_image(40, 30, 7);
    let progress = Progress::new();
    for variant in CodecVariant::ALL {
        let codec = variant.codec();
        let encoded = codec.encode(&image, DEFAULT_THRESHOLD, &progress).unwrap();
        let decoded = codec.decode(&encoded, 40, 30, &progress).unwrap();
        assert_eq!(decoded.len(), 1200, "{variant}");
    }
}

#[test]
fn test_truncated_payload_always_fails() {
    // Dense alternating content so every variant carries a real payload.
    // Cut well past the byte-run codec's 128-pixel trailing-black
    // tolerance so the truncation is corruption for every variant.
    let image = checkerboard(32, 32);
    let progress = Progress::new();
    for variant in CodecVariant::ALL {
        let codec = variant.codec();
        let mut encoded = codec.encode(&image, DEFAULT_THRESHOLD, &progress).unwrap();
        let truncated = encoded.data.len() - 200;
        encoded.data.truncate(truncated);
        encoded.bit_len = encoded.data.len() * 8;
        let err = codec.decode(&encoded, 32, 32, &progress).unwrap_err();
        assert!(
            matches!(
                err,
                ResinError::CorruptRun { .. }
                    | ResinError::OutOfRange { .. }
                    | ResinError::CorruptSpanList { .. }
                    | ResinError::InvalidFormatTag { .. }
            ),
            "{variant} accepted a truncated payload: {err:?}"
        );
    }
}

#[test]
fn test_declared_length_disagreement_fails() {
    let image = random_binary_image(16, 16, 3);
    let progress = Progress::new();
    for variant in CodecVariant::ALL {
        let codec = variant.codec();
        let mut encoded = codec.encode(&image, DEFAULT_THRESHOLD, &progress).unwrap();
        encoded.bit_len += 16;
        let err = codec.decode(&encoded, 16, 16, &progress).unwrap_err();
        assert!(
            matches!(err, ResinError::CorruptRun { .. }),
            "{variant}: {err:?}"
        );
    }
}

#[test]
fn test_resolution_mismatch_rejected_by_all() {
    let image = random_binary_image(16, 16, 5);
    let progress = Progress::new();
    for variant in CodecVariant::ALL {
        let codec = variant.codec();
        let encoded = codec.encode(&image, DEFAULT_THRESHOLD, &progress).unwrap();
        let err = codec.decode(&encoded, 16, 32, &progress).unwrap_err();
        assert!(
            matches!(err, ResinError::ResolutionMismatch { .. }),
            "{variant}: {err:?}"
        );
    }
}

#[test]
fn test_cancelled_progress_stops_codecs() {
    let image = checkerboard(64, 64);
    let progress = Progress::new();
    progress.cancel();
    for variant in CodecVariant::ALL {
        let err = variant
            .codec()
            .encode(&image, DEFAULT_THRESHOLD, &progress)
            .unwrap_err();
        assert!(err.is_cancelled(), "{variant}: {err:?}");
    }
}
