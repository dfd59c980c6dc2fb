use std::mem::size_of;

use ndarray::{ArrayView1, ArrayViewMut1, ArrayViewMut2};

pub fn padding<T>(pos: u64) -> u64 {
    let size = size_of::<T>() as u64;
    size - (pos % size)
}

pub fn l2_normalize(mut v: ArrayViewMut1<f32>) -> f32 {
    let norm = v.dot(&v).sqrt();

    if norm != 0. {
        v /= norm;
    }

    norm
}

pub fn l2_normalize_array(mut v: ArrayViewMut2<f32>) {
    for embedding in v.outer_iter_mut() {
        l2_normalize(embedding);
    }
}

/// Cosine similarity of two vectors.
///
/// The similarity is *0* when one of the vectors has a zero norm. The
/// result is clamped to *[-1, 1]* to absorb rounding errors.
pub fn cosine_similarity(u: ArrayView1<f32>, v: ArrayView1<f32>) -> f32 {
    let norms = (u.dot(&u) * v.dot(&v)).sqrt();
    if norms == 0. {
        return 0.;
    }

    (u.dot(&v) / norms).max(-1.).min(1.)
}
