//! Loading expression matrices from delimited text.

use std::io::Read;
use std::path::Path;

use ndarray::Array2;

use crate::gcl::{ExpressionMatrix, GclError, Result};

/// Read a headerless, comma-separated genes × cells matrix from `path`.
///
/// Empty fields are read as NaN. All rows must have the same number of fields.
pub fn read_expression_csv<P: AsRef<Path>>(path: P) -> Result<ExpressionMatrix> {
    let file = std::fs::File::open(path.as_ref())?;
    log::debug!("Reading expression matrix from {}", path.as_ref().display());
    read_expression(file)
}

/// Same as [`read_expression_csv`] for any reader.
pub fn read_expression<R: Read>(reader: R) -> Result<ExpressionMatrix> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut values = Vec::new();
    let mut n_rows = 0;
    let mut n_cols = 0;

    for (row, record) in csv_reader.records().enumerate() {
        let record = record?;
        if row == 0 {
            n_cols = record.len();
        }
        for (column, field) in record.iter().enumerate() {
            let value = if field.is_empty() {
                f64::NAN
            } else {
                field.parse::<f64>().map_err(|_| GclError::Parse {
                    row,
                    column,
                    value: field.to_string(),
                })?
            };
            values.push(value);
        }
        n_rows += 1;
    }

    let data = Array2::from_shape_vec((n_rows, n_cols), values)
        .map_err(|e| GclError::invalid(format!("malformed matrix: {}", e)))?;
    log::debug!("Loaded {} genes x {} cells", n_rows, n_cols);
    ExpressionMatrix::new(data)
}
