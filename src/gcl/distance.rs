//! Distance matrices for the bias-corrected distance correlation.
//!
//! Cells are compared by Euclidean distance over a subset of genes; the resulting
//! C × C matrix is double centered with the finite-sample correction of Székely & Rizzo (2013).

use ndarray::{Array2, ArrayView2, Axis};
use ndarray::parallel::prelude::*;

use crate::gcl::{GclError, Result};

/// Pairwise Euclidean distances between the rows of `points`.
///
/// The result is exactly symmetric with a zero diagonal.
pub fn euclidean_distances(points: ArrayView2<f64>) -> Array2<f64> {
    let n = points.nrows();
    let mut distances = Array2::<f64>::zeros((n, n));

    distances
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(i, mut row)| {
            let a = points.row(i);
            for j in 0..n {
                if i == j {
                    continue;
                }
                let b = points.row(j);
                let sq: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
                row[j] = sq.sqrt();
            }
        });

    distances
}

/// Double center a distance matrix with the bias-corrected construction.
///
/// With `v` the column means and `m` the grand mean of `distances`, off-diagonal entries become
/// `d_ij - v_i - v_j + m - v_j / C`, the diagonal becomes `v_i - m`, and the whole matrix is
/// scaled by `C / (C - 1)`.
pub fn double_center(distances: ArrayView2<f64>) -> Result<Array2<f64>> {
    let cells = distances.nrows();
    if cells != distances.ncols() {
        return Err(GclError::invalid(format!(
            "distance matrix must be square, got {} x {}",
            cells,
            distances.ncols()
        )));
    }
    if cells < 2 {
        return Err(GclError::invalid(format!(
            "double centering needs at least 2 cells, got {}",
            cells
        )));
    }

    let n = cells as f64;
    let grand_mean = distances.mean().unwrap_or(f64::NAN);
    let col_means = distances
        .mean_axis(Axis(0))
        .ok_or_else(|| GclError::invalid("empty distance matrix"))?;
    let scale = n / (n - 1.0);

    let centered = Array2::from_shape_fn((cells, cells), |(i, j)| {
        let value = if i == j {
            col_means[i] - grand_mean
        } else {
            distances[[i, j]] - col_means[i] - col_means[j] + grand_mean - col_means[j] / n
        };
        value * scale
    });

    Ok(centered)
}

/// Bias-corrected centered distance matrix of a set of cells (rows of `cells`).
pub fn centered_distance_matrix(cells: ArrayView2<f64>) -> Result<Array2<f64>> {
    let distances = euclidean_distances(cells);
    double_center(distances.view())
}
