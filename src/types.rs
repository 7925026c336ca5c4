//! Result types of derivative evaluation.

use std::fmt;
use std::ops::Index;

use itertools::Itertools;

/// Quantities a derivative table is taken with respect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DerivativeTarget {
    /// One derivative per input column; column loads seed unit vectors
    #[default]
    Columns,
    /// One derivative per constant; constant loads seed unit vectors
    Constants,
}

/// A row-major table of partial derivatives, one row per input row.
///
/// Entry `(r, d)` is the derivative of the output at row `r` with respect to
/// column `d` (or constant `d`, depending on the [`DerivativeTarget`]).
#[derive(Debug, Clone, PartialEq)]
pub struct DerivativeTable {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DerivativeTable {
    /// Wraps row-major data.
    ///
    /// # Panics
    /// Panics if `data.len() != rows * cols`.
    pub fn from_row_major(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        assert_eq!(data.len(), rows * cols, "data does not match dimensions");
        Self { rows, cols, data }
    }

    /// Returns the number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of derivative columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns `(rows, cols)`.
    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Returns the derivative at `(row, col)`, or `None` out of range.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// Returns all derivatives of one row.
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Returns the derivatives with respect to one column, for every row.
    pub fn column(&self, col: usize) -> Vec<f64> {
        self.data.iter().skip(col).step_by(self.cols.max(1)).copied().take(self.rows).collect()
    }

    /// Returns the table as a vector of rows.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.rows).map(|row| self.row(row).to_vec()).collect()
    }

    /// Returns the row-major data.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Consumes the table, returning its row-major data.
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }
}

impl Index<(usize, usize)> for DerivativeTable {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        assert!(col < self.cols, "column {col} out of range");
        &self.data[row * self.cols + col]
    }
}

impl fmt::Display for DerivativeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            writeln!(
                f,
                "[{}]",
                self.row(row).iter().map(|v| format!("{v:.6}")).join(", ")
            )?;
        }
        Ok(())
    }
}

#[cfg(feature = "ndarray")]
impl From<DerivativeTable> for ndarray::Array2<f64> {
    fn from(table: DerivativeTable) -> Self {
        let (rows, cols) = table.dims();
        match ndarray::Array2::from_shape_vec((rows, cols), table.data) {
            Ok(array) => array,
            Err(err) => unreachable!("derivative table shape is consistent: {err}"),
        }
    }
}

#[cfg(feature = "nalgebra")]
impl From<DerivativeTable> for nalgebra::DMatrix<f64> {
    fn from(table: DerivativeTable) -> Self {
        nalgebra::DMatrix::from_row_slice(table.rows, table.cols, &table.data)
    }
}
