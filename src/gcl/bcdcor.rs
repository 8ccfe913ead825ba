//! Bias-corrected distance covariance and correlation.
//!
//! Both functions take matrices produced by [`crate::gcl::distance::double_center`] for the
//! same set of `cells`. A correlation that is statistically undefined (a constant distance
//! structure on either side) comes back as NaN rather than an error.

use ndarray::{ArrayView2, Zip};

/// Bias-corrected distance covariance of two centered distance matrices.
///
/// `(1 / (C (C - 3))) * (sum_ij A_ij B_ij - C / (C - 2) * sum_i A_ii B_ii)`.
/// Undefined (non-finite) for `cells <= 3`; callers validate the cell count beforehand.
pub fn variance(a: ArrayView2<f64>, b: ArrayView2<f64>, cells: usize) -> f64 {
    let n = cells as f64;
    let inner = Zip::from(&a).and(&b).fold(0.0, |acc, &x, &y| acc + x * y);
    let diagonal = a.diag().dot(&b.diag());

    (inner - n / (n - 2.0) * diagonal) / (n * (n - 3.0))
}

/// Bias-corrected distance correlation `V(A, B) / sqrt(V(A, A) V(B, B))`.
///
/// Returns NaN when either self-variance is not strictly positive.
pub fn correlation(a: ArrayView2<f64>, b: ArrayView2<f64>, cells: usize) -> f64 {
    let var_a = variance(a, a, cells);
    let var_b = variance(b, b, cells);

    if !(var_a > 0.0 && var_b > 0.0) {
        return f64::NAN;
    }

    variance(a, b, cells) / (var_a * var_b).sqrt()
}
