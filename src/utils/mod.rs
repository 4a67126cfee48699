//! Small vector helpers shared by the learning rules and distance measures.

use ndarray::{Array2, ArrayView1, Axis};

/// Outer product `a ⊗ b`, shape `(a.len(), b.len())`.
///
/// Same broadcast trick as a column-times-row product: `a[:, None] * b[None, :]`.
#[inline]
pub fn outer(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Array2<f64> {
    let col = a.insert_axis(Axis(1));
    let row = b.insert_axis(Axis(0));
    &col * &row
}

/// L1 norm of `a - b`.
#[inline]
pub fn manhattan(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
}

/// L2 norm of `a - b`.
#[inline]
pub fn euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// L2 norm of a vector.
#[inline]
pub fn l2_norm(a: ArrayView1<'_, f64>) -> f64 {
    a.dot(&a).sqrt()
}

/// Mean of a slice, `None` when empty.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
