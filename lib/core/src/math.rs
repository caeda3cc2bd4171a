//! Scalar vector kernels.
//!
//! Written with fixed-width chunks and independent accumulators so the
//! compiler can auto-vectorize them on every target without `unsafe`.

const LANES: usize = 8;

/// Dot product of two equally sized slices. Mismatched lengths yield `0.0`.
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut acc = [0.0f32; LANES];
    let a_chunks = a.chunks_exact(LANES);
    let b_chunks = b.chunks_exact(LANES);
    let tail: f32 = a_chunks
        .remainder()
        .iter()
        .zip(b_chunks.remainder())
        .map(|(x, y)| x * y)
        .sum();

    for (ca, cb) in a_chunks.zip(b_chunks) {
        for lane in 0..LANES {
            acc[lane] += ca[lane] * cb[lane];
        }
    }

    acc.iter().sum::<f32>() + tail
}

/// Euclidean distance. Mismatched lengths yield `f32::INFINITY`.
#[inline]
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }

    let mut acc = [0.0f32; LANES];
    let a_chunks = a.chunks_exact(LANES);
    let b_chunks = b.chunks_exact(LANES);
    let tail: f32 = a_chunks
        .remainder()
        .iter()
        .zip(b_chunks.remainder())
        .map(|(x, y)| (x - y) * (x - y))
        .sum();

    for (ca, cb) in a_chunks.zip(b_chunks) {
        for lane in 0..LANES {
            let d = ca[lane] - cb[lane];
            acc[lane] += d * d;
        }
    }

    (acc.iter().sum::<f32>() + tail).sqrt()
}

#[inline]
pub fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}
