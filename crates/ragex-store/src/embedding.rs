//! Lossy uint8 storage form for chunk embeddings.
//!
//! Cosine ranking tolerates coarse components, so each vector is stored as
//! one byte per dimension plus a per-vector `(scale, offset)` pair. A stored
//! byte `b` decodes to `b * scale + offset`.

use ndarray::Array1;

/// Encode an f32 vector as `(bytes, scale, offset)`, mapping its value
/// range linearly onto 0..=255.
pub fn quantize_uint8(embedding: &Array1<f32>) -> (Vec<u8>, f32, f32) {
    let (lo, hi) = embedding
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    let span = hi - lo;
    if span < 1e-9 {
        // Degenerate flat vector: every byte decodes to the shared value.
        return (vec![0u8; embedding.len()], 0.0, lo);
    }

    let scale = span / 255.0;
    let bytes = embedding
        .iter()
        .map(|&v| ((v - lo) / scale).round().clamp(0.0, 255.0) as u8)
        .collect();

    (bytes, scale, lo)
}

/// Decode bytes produced by [`quantize_uint8`] back into an f32 vector.
pub fn dequantize_uint8(bytes: &[u8], scale: f32, offset: f32) -> Array1<f32> {
    Array1::from_iter(bytes.iter().map(|&b| b as f32 * scale + offset))
}
