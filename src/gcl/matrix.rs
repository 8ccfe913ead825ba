use nalgebra_sparse::CsrMatrix;
use ndarray::{Array2, ArrayView2, Axis};
use single_utilities::traits::FloatOps;

use crate::gcl::{GclError, MIN_CELLS, MIN_GENES, Result};

/// Dense expression values, rows are genes and columns are cells.
///
/// The matrix is never modified after construction; every subset is a new matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionMatrix {
    data: Array2<f64>,
}

impl ExpressionMatrix {
    /// Wrap a genes × cells array, rejecting shapes the estimator cannot handle.
    pub fn new(data: Array2<f64>) -> Result<Self> {
        check_shape(data.nrows(), data.ncols())?;

        let non_finite = data.iter().filter(|v| !v.is_finite()).count();
        if non_finite > 0 {
            log::warn!(
                "Expression matrix contains {} non-finite values; affected gene splits will yield NaN",
                non_finite
            );
        }

        Ok(ExpressionMatrix { data })
    }

    pub fn from_array<T>(data: ArrayView2<T>) -> Result<Self>
    where
        T: FloatOps,
    {
        Self::new(data.mapv(|v| v.to_f64().unwrap_or(f64::NAN)))
    }

    /// Densify a sparse genes × cells matrix; absent entries are zero.
    pub fn from_csr<T>(matrix: &CsrMatrix<T>) -> Result<Self>
    where
        T: FloatOps,
    {
        let mut data = Array2::<f64>::zeros((matrix.nrows(), matrix.ncols()));
        for (row, col, value) in matrix.triplet_iter() {
            data[[row, col]] = value.to_f64().unwrap_or(f64::NAN);
        }
        Self::new(data)
    }

    pub fn n_genes(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_cells(&self) -> usize {
        self.data.ncols()
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// Gene rows picked by index, still genes × cells.
    pub(crate) fn genes(&self, indices: &[usize]) -> Array2<f64> {
        self.data.select(Axis(0), indices)
    }

    /// New matrix holding only the given cell columns, in the given order.
    pub fn select_cells(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.n_cells()) {
            return Err(GclError::invalid(format!(
                "cell index {} out of range for {} cells",
                bad,
                self.n_cells()
            )));
        }
        check_shape(self.n_genes(), indices.len())?;
        Ok(ExpressionMatrix {
            data: self.data.select(Axis(1), indices),
        })
    }

    /// New matrix without the given cell columns; remaining cells keep their order.
    pub fn drop_cells(&self, indices: &[usize]) -> Result<Self> {
        let mut keep = vec![true; self.n_cells()];
        for &i in indices {
            match keep.get_mut(i) {
                Some(slot) => *slot = false,
                None => {
                    return Err(GclError::invalid(format!(
                        "cell index {} out of range for {} cells",
                        i,
                        self.n_cells()
                    )));
                }
            }
        }
        let kept: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter_map(|(i, &k)| if k { Some(i) } else { None })
            .collect();
        self.select_cells(&kept)
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.data
    }
}

pub(crate) fn check_shape(n_genes: usize, n_cells: usize) -> Result<()> {
    if n_genes < MIN_GENES {
        return Err(GclError::invalid(format!(
            "at least {} genes are required, got {}",
            MIN_GENES, n_genes
        )));
    }
    if n_cells < MIN_CELLS {
        return Err(GclError::invalid(format!(
            "at least {} cells are required, got {}",
            MIN_CELLS, n_cells
        )));
    }
    Ok(())
}
