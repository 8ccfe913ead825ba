//! Global Coordination Level (GCL) estimation.
//!
//! The GCL of a genes × cells expression matrix is the average bias-corrected distance
//! correlation between the cell-to-cell distance structures of two random, disjoint halves
//! of the genes. Values near zero indicate genes that vary independently across cells, larger
//! values indicate globally coordinated expression.
//!
//! ## Building blocks
//!
//! - [`distance`]: pairwise Euclidean distances and the bias-corrected double centering
//! - [`bcdcor`]: bias-corrected distance covariance and correlation
//! - [`estimator`]: single random gene split and the NaN-aware trial aggregate
//! - [`resampling`]: repeated cell subsampling (jackknife) under bounded concurrency
//!
//! The [`MatrixGcl`] trait exposes the whole pipeline on dense and sparse matrices.

use nalgebra_sparse::CsrMatrix;
use ndarray::Array2;
use single_utilities::traits::FloatOpsTS;

pub mod bcdcor;
pub mod distance;
pub mod estimator;
pub mod matrix;
pub mod resampling;

pub(crate) mod utils;

pub use estimator::{compute_gcl, gcl_trials, gcl_with_rng};
pub use matrix::ExpressionMatrix;
pub use resampling::{EngineState, GclDistribution, IterationState, ResamplingEngine, compute_distribution};

/// Fewest cells the bias-corrected estimator can work with (it divides by `C - 3`).
pub const MIN_CELLS: usize = 4;
/// Fewest genes that still allow a split into two non-empty halves.
pub const MIN_GENES: usize = 2;

/// Default number of gene splits for a regular (non-resampled) GCL computation.
pub const DEFAULT_TRIALS: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum GclError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Resampling iteration {iteration} failed: {source}")]
    IterationFailed {
        iteration: usize,
        #[source]
        source: Box<GclError>,
    },

    #[error("Resampling cancelled after {completed} of {requested} iterations")]
    Cancelled { completed: usize, requested: usize },

    #[error("Worker panicked: {0}")]
    WorkerPanic(String),

    #[error("Resampling engine has already produced its distribution")]
    AlreadyFinished,

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Cannot parse value '{value}' at row {row}, column {column}")]
    Parse {
        row: usize,
        column: usize,
        value: String,
    },
}

impl GclError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        GclError::InvalidInput(message.into())
    }

    /// True for errors caused by the caller's arguments or data shape.
    pub fn is_invalid_input(&self) -> bool {
        match self {
            GclError::InvalidInput(_) => true,
            GclError::IterationFailed { source, .. } => source.is_invalid_input(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, GclError>;

/// Parameters for resampled GCL estimation.
#[derive(Debug, Clone)]
pub struct GclConfig {
    /// Gene splits averaged into each GCL value
    pub trials_per_iteration: usize,
    /// Requested number of resampling iterations
    pub iterations: usize,
    /// Fraction of cells kept in every resampled matrix, in (0, 1]
    pub keep_fraction: f64,
    /// Number of iterations run concurrently in one batch
    pub concurrency: usize,
    /// Lower bound on the number of iterations actually run. `None` runs exactly `iterations`.
    pub minimum_iterations: Option<usize>,
    /// Root seed for all random streams. `None` draws one from the operating system.
    pub seed: Option<u64>,
}

impl Default for GclConfig {
    fn default() -> Self {
        GclConfig {
            trials_per_iteration: 10,
            iterations: 70,
            keep_fraction: 0.8,
            concurrency: 4,
            minimum_iterations: Some(10),
            seed: None,
        }
    }
}

impl GclConfig {
    pub fn new(iterations: usize, keep_fraction: f64, trials_per_iteration: usize) -> Self {
        GclConfig {
            trials_per_iteration,
            iterations,
            keep_fraction,
            ..Default::default()
        }
    }

    pub fn with_concurrency(mut self, width: usize) -> Self {
        self.concurrency = width;
        self
    }

    pub fn with_minimum_iterations(mut self, minimum: Option<usize>) -> Self {
        self.minimum_iterations = minimum;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_trials_per_iteration(mut self, trials: usize) -> Self {
        self.trials_per_iteration = trials;
        self
    }

    /// Number of iterations the engine will run once the floor policy is applied.
    pub fn effective_iterations(&self) -> usize {
        match self.minimum_iterations {
            Some(floor) => self.iterations.max(floor),
            None => self.iterations,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(GclError::invalid("iterations must be positive"));
        }
        if self.trials_per_iteration == 0 {
            return Err(GclError::invalid("trials per iteration must be positive"));
        }
        if self.concurrency == 0 {
            return Err(GclError::invalid("concurrency width must be positive"));
        }
        if !(self.keep_fraction > 0.0 && self.keep_fraction <= 1.0) {
            return Err(GclError::invalid(format!(
                "keep fraction must lie in (0, 1], got {}",
                self.keep_fraction
            )));
        }
        Ok(())
    }
}

/// GCL estimation directly on expression matrices laid out genes × cells.
pub trait MatrixGcl<T>
where
    T: FloatOpsTS,
{
    fn gcl(&self, num_trials: usize, seed: Option<u64>) -> Result<f64>;

    fn gcl_distribution(&self, config: &GclConfig) -> Result<GclDistribution>;
}

impl<T> MatrixGcl<T> for Array2<T>
where
    T: FloatOpsTS,
{
    fn gcl(&self, num_trials: usize, seed: Option<u64>) -> Result<f64> {
        let matrix = ExpressionMatrix::from_array(self.view())?;
        estimator::compute_gcl_seeded(&matrix, num_trials, seed)
    }

    fn gcl_distribution(&self, config: &GclConfig) -> Result<GclDistribution> {
        let matrix = ExpressionMatrix::from_array(self.view())?;
        ResamplingEngine::new(config.clone())?.run(&matrix)
    }
}

impl<T> MatrixGcl<T> for CsrMatrix<T>
where
    T: FloatOpsTS,
{
    fn gcl(&self, num_trials: usize, seed: Option<u64>) -> Result<f64> {
        let matrix = ExpressionMatrix::from_csr(self)?;
        estimator::compute_gcl_seeded(&matrix, num_trials, seed)
    }

    fn gcl_distribution(&self, config: &GclConfig) -> Result<GclDistribution> {
        let matrix = ExpressionMatrix::from_csr(self)?;
        ResamplingEngine::new(config.clone())?.run(&matrix)
    }
}
