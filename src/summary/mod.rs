//! Descriptive summaries of GCL distributions.
//!
//! These feed reporting front ends: a numeric summary of the resampled values and an
//! equal-width histogram that can be printed or plotted.

use statrs::statistics::{Data, OrderStatistics, Statistics};

/// Number of histogram bins used by default when reporting a distribution.
pub const DEFAULT_BINS: usize = 8;

#[derive(Debug, Clone)]
pub struct DistributionSummary {
    /// All values, NaN included
    pub count: usize,
    /// Values that are not NaN
    pub valid: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub median: f64,
    pub lower_95: f64,
    pub upper_95: f64,
    pub min: f64,
    pub max: f64,
}

impl DistributionSummary {
    /// Summarise `values`, ignoring NaN entries. Statistics are NaN when no value is valid.
    pub fn from_values(values: &[f64]) -> Self {
        let valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();

        if valid.is_empty() {
            return DistributionSummary {
                count: values.len(),
                valid: 0,
                mean: f64::NAN,
                std_dev: f64::NAN,
                median: f64::NAN,
                lower_95: f64::NAN,
                upper_95: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
            };
        }

        let mean = valid.iter().mean();
        // sample standard deviation is undefined for a single value
        let std_dev = if valid.len() > 1 { valid.iter().std_dev() } else { 0.0 };
        let min = valid.iter().copied().fold(f64::INFINITY, f64::min);
        let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let n_valid = valid.len();
        let mut data = Data::new(valid);
        DistributionSummary {
            count: values.len(),
            valid: n_valid,
            mean,
            std_dev,
            median: data.quantile(0.5),
            lower_95: data.quantile(0.025),
            upper_95: data.quantile(0.975),
            min,
            max,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width histogram over the non-NaN range of `values`.
///
/// Bins are half-open except the last, which also holds the maximum. When all values are equal
/// a single unit-width bin centred on them is returned.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }

    let lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if hi == lo {
        return vec![HistogramBin {
            lower: lo - 0.5,
            upper: hi + 0.5,
            count: finite.len(),
        }];
    }

    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in &finite {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: lo + width * i as f64,
            upper: if i + 1 == bins { hi } else { lo + width * (i + 1) as f64 },
            count,
        })
        .collect()
}
