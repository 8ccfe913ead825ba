use approx::assert_relative_eq;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use ndarray::{Array2, array};
use single_gcl::gcl::bcdcor::{correlation, variance};
use single_gcl::gcl::distance::{centered_distance_matrix, double_center, euclidean_distances};
use single_gcl::scheduling::BatchScheduler;
use single_gcl::summary::{DistributionSummary, histogram};
use single_gcl::{GclConfig, MatrixGcl};

#[cfg(test)]
mod estimator_parts {
    use super::*;

    #[test]
    fn check_self_correlation() {
        // 5 cells described by 3 genes
        let cells = array![
            [1.0, 0.0, 2.0],
            [0.5, 1.5, 0.0],
            [3.0, 2.0, 1.0],
            [0.0, 0.0, 0.0],
            [2.0, 4.0, 3.5],
        ];
        let a = centered_distance_matrix(cells.view()).unwrap();

        println!("V(A, A) = {}", variance(a.view(), a.view(), 5));
        assert_relative_eq!(correlation(a.view(), a.view(), 5), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn check_variance_symmetry() {
        let x = array![[0.0, 1.0], [1.0, 1.0], [2.0, 5.0], [3.0, 2.0], [4.0, 0.5], [0.5, 0.5]];
        let y = array![[1.0], [3.0], [2.0], [7.0], [0.0], [5.0]];
        let a = centered_distance_matrix(x.view()).unwrap();
        let b = centered_distance_matrix(y.view()).unwrap();

        assert_relative_eq!(
            variance(a.view(), b.view(), 6),
            variance(b.view(), a.view(), 6),
            epsilon = 1e-14
        );
        let r = correlation(a.view(), b.view(), 6);
        assert!(r.is_finite());
    }

    #[test]
    fn check_diagonal_is_mean_offset() {
        let points = array![[0.0], [2.0], [3.0], [7.0]];
        let d = euclidean_distances(points.view());
        let a = double_center(d.view()).unwrap();

        let m = d.mean().unwrap();
        let scale = 4.0 / 3.0;
        for i in 0..4 {
            let v_i = d.column(i).mean().unwrap();
            assert_relative_eq!(a[[i, i]], (v_i - m) * scale, epsilon = 1e-12);
        }
    }

    #[test]
    fn check_constant_half_is_nan() {
        let flat = Array2::<f64>::zeros((6, 2));
        let spread = array![[1.0], [3.0], [2.0], [7.0], [0.0], [5.0]];
        let a = centered_distance_matrix(flat.view()).unwrap();
        let b = centered_distance_matrix(spread.view()).unwrap();

        assert!(correlation(a.view(), b.view(), 6).is_nan());
    }
}

#[cfg(test)]
mod matrix_inputs {
    use super::*;

    #[test]
    fn check_sparse_and_dense_agree() {
        let mut coo = CooMatrix::new(6, 8);
        let mut dense = Array2::<f64>::zeros((6, 8));
        for g in 0..6 {
            for c in 0..8 {
                if (g * 3 + c * 5) % 4 != 0 {
                    let value = ((g + 1) * (c + 2) % 7) as f64;
                    coo.push(g, c, value);
                    dense[[g, c]] = value;
                }
            }
        }
        let sparse = CsrMatrix::from(&coo);

        let from_sparse = sparse.gcl(20, Some(3)).unwrap();
        let from_dense = dense.gcl(20, Some(3)).unwrap();
        assert_eq!(from_sparse.to_bits(), from_dense.to_bits());
    }

    #[test]
    fn check_single_precision_input() {
        let data = Array2::from_shape_fn((6, 10), |(g, c)| ((g * 7 + c * 3) % 11) as f32);
        let value = data.gcl(10, Some(1)).unwrap();
        assert!(value.is_nan() || (-1.0..=1.0).contains(&value));
    }

    #[test]
    fn check_no_floor_distribution() {
        let data = Array2::from_shape_fn((6, 10), |(g, c)| ((g * 7 + c * 3) % 11) as f64);
        let config = GclConfig::new(3, 0.9, 2)
            .with_minimum_iterations(None)
            .with_seed(10);
        assert_eq!(data.gcl_distribution(&config).unwrap().len(), 3);
    }
}

#[cfg(test)]
mod reporting {
    use super::*;

    #[test]
    fn check_summary_and_histogram() {
        let values: Vec<f64> = (0..16).map(|i| 0.1 + i as f64 * 0.01).collect();
        let summary = DistributionSummary::from_values(&values);
        assert_relative_eq!(summary.mean, 0.175, epsilon = 1e-12);

        let bins = histogram(&values, 8);
        assert_eq!(bins.len(), 8);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 16);
    }

    #[test]
    fn check_scheduler_is_reusable() {
        let scheduler = BatchScheduler::new(4).unwrap();
        let first = scheduler.run(5, |i| Ok::<_, ()>(i + 1)).unwrap();
        let second = scheduler.run(3, |i| Ok::<_, ()>(i * 2)).unwrap();
        assert_eq!(first, vec![1, 2, 3, 4, 5]);
        assert_eq!(second, vec![0, 2, 4]);
    }
}
