use crate::errors::TableError;

/// A trait for table-like types that can be evaluated row by row.
///
/// This trait provides a common interface for the different ways an input table
/// can be stored, allowing them to be used interchangeably with the evaluator.
/// Rows are samples and columns are features. Implementations only need
/// random access to single values; the evaluator never requires a particular
/// memory layout.
///
/// # Examples
///
/// ```rust
/// use agraph_eval::prelude::InputTable;
///
/// let table = vec![vec![1.0, 4.0, 7.0], vec![2.0, 5.0, 8.0]];
/// assert_eq!(table.n_rows(), 2);
/// assert_eq!(table.n_cols(), 3);
/// assert_eq!(table.value(1, 2), 8.0);
/// assert!(table.validate().is_ok());
/// ```
pub trait InputTable {
    /// Returns the number of rows (samples).
    fn n_rows(&self) -> usize;

    /// Returns the number of columns (features).
    fn n_cols(&self) -> usize;

    /// Returns the value at `(row, col)`.
    ///
    /// Only called with `row < n_rows()` and `col < n_cols()` on a table that
    /// passed [`validate`](InputTable::validate).
    fn value(&self, row: usize, col: usize) -> f64;

    /// Checks that the table is rectangular.
    ///
    /// # Returns
    /// `Ok(())` for storage that is rectangular by construction
    fn validate(&self) -> Result<(), TableError> {
        Ok(())
    }

    /// Returns `(rows, columns)`.
    fn dims(&self) -> (usize, usize) {
        (self.n_rows(), self.n_cols())
    }
}

/// Nested vectors, one inner vector per row.
///
/// The width is taken from the first row; [`validate`](InputTable::validate)
/// rejects rows of a different width.
impl InputTable for [Vec<f64>] {
    fn n_rows(&self) -> usize {
        self.len()
    }

    fn n_cols(&self) -> usize {
        self.first().map_or(0, Vec::len)
    }

    fn value(&self, row: usize, col: usize) -> f64 {
        self[row][col]
    }

    fn validate(&self) -> Result<(), TableError> {
        let expected = self.n_cols();
        match self.iter().position(|row| row.len() != expected) {
            Some(row) => Err(TableError::Ragged {
                row,
                expected,
                got: self[row].len(),
            }),
            None => Ok(()),
        }
    }
}

impl InputTable for Vec<Vec<f64>> {
    fn n_rows(&self) -> usize {
        self.as_slice().n_rows()
    }

    fn n_cols(&self) -> usize {
        self.as_slice().n_cols()
    }

    fn value(&self, row: usize, col: usize) -> f64 {
        self[row][col]
    }

    fn validate(&self) -> Result<(), TableError> {
        self.as_slice().validate()
    }
}

/// Rows of fixed width `N`.
impl<const N: usize> InputTable for [[f64; N]] {
    fn n_rows(&self) -> usize {
        self.len()
    }

    fn n_cols(&self) -> usize {
        N
    }

    fn value(&self, row: usize, col: usize) -> f64 {
        self[row][col]
    }
}

impl<const N: usize> InputTable for Vec<[f64; N]> {
    fn n_rows(&self) -> usize {
        self.len()
    }

    fn n_cols(&self) -> usize {
        N
    }

    fn value(&self, row: usize, col: usize) -> f64 {
        self[row][col]
    }
}

impl<const R: usize, const N: usize> InputTable for [[f64; N]; R] {
    fn n_rows(&self) -> usize {
        R
    }

    fn n_cols(&self) -> usize {
        N
    }

    fn value(&self, row: usize, col: usize) -> f64 {
        self[row][col]
    }
}

/// A dense row-major table.
///
/// # Examples
///
/// ```rust
/// use agraph_eval::prelude::{DataTable, InputTable};
///
/// let table = DataTable::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
/// assert_eq!(table.value(1, 0), 3.0);
/// assert_eq!(table.row(1), &[3.0, 4.0]);
///
/// assert!(DataTable::new(2, 2, vec![1.0]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DataTable {
    /// Wraps row-major data.
    ///
    /// # Errors
    /// `TableError::Shape` if `data.len() != rows * cols`
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, TableError> {
        if data.len() != rows * cols {
            return Err(TableError::Shape {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Copies nested rows into a dense table.
    ///
    /// # Errors
    /// `TableError::Ragged` if the rows differ in width
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, TableError> {
        rows.validate()?;
        Ok(Self {
            rows: rows.n_rows(),
            cols: rows.n_cols(),
            data: rows.concat(),
        })
    }

    /// Builds a table by calling `f(row, col)` for every cell.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                data.push(f(row, col));
            }
        }
        Self { rows, cols, data }
    }

    /// Returns one row.
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Returns the row-major data.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Sets the value at `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(col < self.cols, "column {col} out of range");
        self.data[row * self.cols + col] = value;
    }
}

impl InputTable for DataTable {
    fn n_rows(&self) -> usize {
        self.rows
    }

    fn n_cols(&self) -> usize {
        self.cols
    }

    fn value(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }
}

/// Implementation of InputTable for ndarray's Array2<f64>.
///
/// Values are read by index, so any memory layout is accepted.
#[cfg(feature = "ndarray")]
impl InputTable for ndarray::Array2<f64> {
    fn n_rows(&self) -> usize {
        self.nrows()
    }

    fn n_cols(&self) -> usize {
        self.ncols()
    }

    fn value(&self, row: usize, col: usize) -> f64 {
        self[[row, col]]
    }
}

/// Implementation of InputTable for nalgebra's DMatrix<f64>.
///
/// nalgebra stores matrices column-major; values are still addressed as
/// `(row, col)`.
#[cfg(feature = "nalgebra")]
impl InputTable for nalgebra::DMatrix<f64> {
    fn n_rows(&self) -> usize {
        self.nrows()
    }

    fn n_cols(&self) -> usize {
        self.ncols()
    }

    fn value(&self, row: usize, col: usize) -> f64 {
        self[(row, col)]
    }
}
