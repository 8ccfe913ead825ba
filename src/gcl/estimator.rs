//! Gene-split trials and their aggregation into a single GCL value.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::gcl::bcdcor::correlation;
use crate::gcl::distance::centered_distance_matrix;
use crate::gcl::matrix::{ExpressionMatrix, check_shape};
use crate::gcl::utils::{SeedStreams, nan_mean};
use crate::gcl::{GclError, Result};

/// One random split of the genes into two halves and the bias-corrected distance
/// correlation between the cell distance structures of the halves.
///
/// The first half holds `floor(G / 2)` genes, the second the rest. The result is NaN when
/// either half has no spread across cells.
pub fn single_trial<R>(matrix: &ExpressionMatrix, rng: &mut R) -> Result<f64>
where
    R: Rng + ?Sized,
{
    let n_genes = matrix.n_genes();
    let n_cells = matrix.n_cells();
    check_shape(n_genes, n_cells)?;

    let mut genes: Vec<usize> = (0..n_genes).collect();
    genes.shuffle(rng);
    let (first_half, second_half) = genes.split_at(n_genes / 2);

    // rows become cells, columns the half's genes
    let first = matrix.genes(first_half);
    let second = matrix.genes(second_half);
    let a1 = centered_distance_matrix(first.t())?;
    let a2 = centered_distance_matrix(second.t())?;

    if a1.dim() != a2.dim() {
        return Err(GclError::invalid(format!(
            "gene halves disagree on cell count: {:?} vs {:?}",
            a1.dim(),
            a2.dim()
        )));
    }

    Ok(correlation(a2.view(), a1.view(), n_cells))
}

/// Raw results of `num_trials` independent gene splits, in the order they were drawn.
pub fn gcl_trials<R>(matrix: &ExpressionMatrix, num_trials: usize, rng: &mut R) -> Result<Vec<f64>>
where
    R: Rng + ?Sized,
{
    if num_trials == 0 {
        return Err(GclError::invalid("number of trials must be positive"));
    }

    let mut results = Vec::with_capacity(num_trials);
    for _ in 0..num_trials {
        results.push(single_trial(matrix, rng)?);
    }
    Ok(results)
}

/// NaN-aware mean of `num_trials` gene splits drawn from `rng`.
pub fn gcl_with_rng<R>(matrix: &ExpressionMatrix, num_trials: usize, rng: &mut R) -> Result<f64>
where
    R: Rng + ?Sized,
{
    let trials = gcl_trials(matrix, num_trials, rng)?;
    let value = aggregate_trials(&trials);

    if value.is_nan() {
        log::warn!(
            "All {} gene splits were degenerate for a {} x {} matrix; GCL is NaN",
            num_trials,
            matrix.n_genes(),
            matrix.n_cells()
        );
    } else {
        log::debug!("GCL over {} gene splits: {}", num_trials, value);
    }

    Ok(value)
}

/// Reduce trial results to one GCL value, skipping NaN trials.
pub fn aggregate_trials(trials: &[f64]) -> f64 {
    nan_mean(trials)
}

/// Regular (non-resampled) GCL of `matrix` from `num_trials` gene splits.
pub fn compute_gcl(matrix: &ExpressionMatrix, num_trials: usize) -> Result<f64> {
    compute_gcl_seeded(matrix, num_trials, None)
}

pub(crate) fn compute_gcl_seeded(
    matrix: &ExpressionMatrix,
    num_trials: usize,
    seed: Option<u64>,
) -> Result<f64> {
    let mut rng = SeedStreams::new(seed).stream(0);
    gcl_with_rng(matrix, num_trials, &mut rng)
}
