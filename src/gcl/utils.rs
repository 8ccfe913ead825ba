use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

/// Arithmetic mean over the non-NaN entries; NaN when there are none.
pub fn nan_mean(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &v in values {
        if !v.is_nan() {
            sum += v;
            count += 1;
        }
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Number of cells removed from `n_cells` to keep `keep_fraction` of them.
///
/// Halfway cases round to even.
pub fn drop_count(n_cells: usize, keep_fraction: f64) -> usize {
    let dropped = (n_cells as f64 * (1.0 - keep_fraction)).round_ties_even();
    (dropped.max(0.0) as usize).min(n_cells)
}

/// Odd 64-bit constant (2^64 / golden ratio); multiplying by it is a bijection on `u64`.
const STREAM_STEP: u64 = 0x9E37_79B9_7F4A_7C15;

/// Source of independent random streams derived from one root seed.
///
/// Stream `i` is a generator seeded from its own 64-bit seed, `root + (i + 1) * STREAM_STEP`.
/// Distinct indices give distinct seeds, and seeding expands each one into a full PCG state
/// and increment, so streams do not share state. Stream `i` is the same sequence no matter
/// which thread draws from it.
#[derive(Debug, Clone, Copy)]
pub struct SeedStreams {
    root: u64,
}

impl SeedStreams {
    pub fn new(seed: Option<u64>) -> Self {
        let root = seed.unwrap_or_else(|| rand::rng().random());
        SeedStreams { root }
    }

    pub fn stream_seed(&self, index: usize) -> u64 {
        let step = (index as u64).wrapping_add(1).wrapping_mul(STREAM_STEP);
        self.root.wrapping_add(step)
    }

    pub fn stream(&self, index: usize) -> Pcg64 {
        Pcg64::seed_from_u64(self.stream_seed(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_mean() {
        assert_eq!(nan_mean(&[1.0, f64::NAN, 3.0]), 2.0);
        assert!(nan_mean(&[f64::NAN, f64::NAN]).is_nan());
        assert!(nan_mean(&[]).is_nan());
    }

    #[test]
    fn test_drop_count() {
        assert_eq!(drop_count(50, 0.8), 10);
        assert_eq!(drop_count(10, 1.0), 0);
        // 5 * 0.5 = 2.5 rounds to 2
        assert_eq!(drop_count(5, 0.5), 2);
        // 7 * 0.5 = 3.5 rounds to 4
        assert_eq!(drop_count(7, 0.5), 4);
    }

    #[test]
    fn test_streams_reproducible_and_distinct() {
        let a = SeedStreams::new(Some(7));
        let b = SeedStreams::new(Some(7));

        let x: u64 = a.stream(3).random();
        let y: u64 = b.stream(3).random();
        assert_eq!(x, y);

        let z: u64 = a.stream(4).random();
        assert_ne!(x, z);
    }

    #[test]
    fn test_streams_have_separate_seeds() {
        let streams = SeedStreams::new(Some(11));
        let seeds: Vec<u64> = (0..64).map(|i| streams.stream_seed(i)).collect();
        for i in 0..seeds.len() {
            for j in (i + 1)..seeds.len() {
                assert_ne!(seeds[i], seeds[j]);
            }
        }

        // neighbouring streams start from unrelated states
        let first: Vec<u64> = {
            let mut rng = streams.stream(0);
            (0..4).map(|_| rng.random()).collect()
        };
        let second: Vec<u64> = {
            let mut rng = streams.stream(1);
            (0..4).map(|_| rng.random()).collect()
        };
        assert!(first.iter().zip(&second).all(|(a, b)| a != b));
        assert_eq!(
            second[0],
            Pcg64::seed_from_u64(streams.stream_seed(1)).random::<u64>()
        );
    }
}
