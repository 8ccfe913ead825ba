//! Resampled GCL distributions.
//!
//! Each iteration removes a random subset of cells (without replacement), computes the GCL
//! of the remaining matrix, and contributes exactly one value to the distribution. The caller
//! terminology ("bootstrap", "jackknife") refers to this same subsampling scheme.
//!
//! Iterations run in batches on a [`BatchScheduler`]; every iteration owns its random
//! stream, derived from the configured root seed and the iteration index, so the distribution
//! is reproducible for a fixed seed independent of thread scheduling.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::seq::index;

use crate::gcl::estimator::gcl_with_rng;
use crate::gcl::matrix::{ExpressionMatrix, check_shape};
use crate::gcl::utils::{SeedStreams, drop_count};
use crate::gcl::{GclConfig, GclError, Result};
use crate::scheduling::{BatchEvent, BatchFailure, BatchScheduler};

/// Lifecycle of a single resampling iteration.
///
/// When a run aborts, iterations of the interrupted batch fall back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationState {
    Pending,
    Running,
    Complete,
}

/// Lifecycle of the engine as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Collecting,
    Done,
    /// Stopped early by a failed iteration or a cancellation request.
    Aborted,
}

/// GCL values from a resampling run, one per iteration.
#[derive(Debug, Clone)]
pub struct GclDistribution {
    pub values: Vec<f64>,
    /// Cells kept in each resampled matrix
    pub cells_per_sample: usize,
    /// Gene splits averaged into each value
    pub trials_per_iteration: usize,
}

impl GclDistribution {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values that are not NaN.
    pub fn valid_values(&self) -> Vec<f64> {
        self.values.iter().copied().filter(|v| !v.is_nan()).collect()
    }
}

pub struct ResamplingEngine {
    config: GclConfig,
    scheduler: BatchScheduler,
    state: EngineState,
    iterations: Vec<IterationState>,
}

impl ResamplingEngine {
    pub fn new(config: GclConfig) -> Result<Self> {
        config.validate()?;
        let scheduler = BatchScheduler::new(config.concurrency)?;
        Ok(ResamplingEngine {
            config,
            scheduler,
            state: EngineState::Idle,
            iterations: Vec::new(),
        })
    }

    pub fn config(&self) -> &GclConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Per-iteration lifecycle, empty until a run has started.
    pub fn iteration_states(&self) -> &[IterationState] {
        &self.iterations
    }

    /// Setting the returned flag stops the run before its next batch.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.scheduler.cancel_handle()
    }

    /// Compute the resampled GCL distribution of `matrix`.
    ///
    /// Returns exactly [`GclConfig::effective_iterations`] values. An engine runs once;
    /// calling this again after it finished is an error.
    pub fn run(&mut self, matrix: &ExpressionMatrix) -> Result<GclDistribution> {
        if self.state != EngineState::Idle {
            return Err(GclError::AlreadyFinished);
        }

        let n_cells = matrix.n_cells();
        let dropped = drop_count(n_cells, self.config.keep_fraction);
        let kept = n_cells - dropped;
        check_shape(matrix.n_genes(), kept).map_err(|_| {
            GclError::invalid(format!(
                "keeping {} of {} cells (fraction {}) leaves too few cells for the estimator",
                kept, n_cells, self.config.keep_fraction
            ))
        })?;

        let total = self.config.effective_iterations();
        if total != self.config.iterations {
            log::info!(
                "Raising {} requested iterations to the configured minimum of {}",
                self.config.iterations,
                total
            );
        }
        log::info!(
            "Resampling GCL: {} iterations, {} of {} cells kept, {} gene splits each, batch width {}",
            total,
            kept,
            n_cells,
            self.config.trials_per_iteration,
            self.scheduler.width()
        );

        let streams = SeedStreams::new(self.config.seed);
        let trials = self.config.trials_per_iteration;

        self.state = EngineState::Collecting;
        self.iterations = vec![IterationState::Pending; total];

        let iterations = &mut self.iterations;
        let outcome = self.scheduler.run_observed(
            total,
            |iteration| {
                let mut rng = streams.stream(iteration);
                let removed = index::sample(&mut rng, n_cells, dropped).into_vec();
                let sample = matrix.drop_cells(&removed)?;
                gcl_with_rng(&sample, trials, &mut rng)
            },
            |event| match event {
                BatchEvent::Started(range) => {
                    for slot in &mut iterations[range] {
                        debug_assert_eq!(*slot, IterationState::Pending);
                        *slot = IterationState::Running;
                    }
                }
                BatchEvent::Finished(range) => {
                    for slot in &mut iterations[range] {
                        *slot = IterationState::Complete;
                    }
                }
            },
        );

        match outcome {
            Ok(values) => {
                self.state = EngineState::Done;
                log::info!("Resampling finished with {} GCL values", values.len());
                Ok(GclDistribution {
                    values,
                    cells_per_sample: kept,
                    trials_per_iteration: trials,
                })
            }
            Err(failure) => {
                self.state = EngineState::Aborted;
                reset_unfinished(&mut self.iterations);
                Err(map_failure(failure, total))
            }
        }
    }

    /// Request cancellation of batches that have not started yet.
    pub fn cancel(&self) {
        self.scheduler.cancel_handle().store(true, Ordering::Relaxed);
    }
}

/// Iterations of an interrupted batch did not contribute a value; mark them `Pending` again.
fn reset_unfinished(iterations: &mut [IterationState]) {
    for slot in iterations.iter_mut() {
        if *slot == IterationState::Running {
            *slot = IterationState::Pending;
        }
    }
}

/// Translate a scheduler failure into the engine's error for a run of `total` iterations.
fn map_failure(failure: BatchFailure<GclError>, total: usize) -> GclError {
    match failure {
        BatchFailure::Task { index, error } => {
            log::error!("Resampling iteration {} failed: {}", index, error);
            GclError::IterationFailed {
                iteration: index,
                source: Box::new(error),
            }
        }
        BatchFailure::Panicked { index, message } => {
            log::error!("Resampling iteration {} panicked: {}", index, message);
            GclError::IterationFailed {
                iteration: index,
                source: Box::new(GclError::WorkerPanic(message)),
            }
        }
        BatchFailure::Cancelled { completed } => {
            log::warn!("Resampling cancelled after {} of {} iterations", completed, total);
            GclError::Cancelled {
                completed,
                requested: total,
            }
        }
    }
}

/// Resampled GCL distribution with the default concurrency and iteration floor.
pub fn compute_distribution(
    matrix: &ExpressionMatrix,
    iterations: usize,
    keep_fraction: f64,
    trials_per_iteration: usize,
) -> Result<Vec<f64>> {
    let config = GclConfig::new(iterations, keep_fraction, trials_per_iteration);
    let distribution = ResamplingEngine::new(config)?.run(matrix)?;
    Ok(distribution.values)
}
