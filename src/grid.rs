//! Row-major 2D grids of cell values and the static per-cell attributes of a run.
//!
//! Rows run along latitude and columns along longitude. Masked cells (e.g. ocean) hold `NaN` and
//! propagate through every calculation in the crate.
use std::{fmt, ops::Range};

use itertools::izip;

use crate::error::{Result, SplashError};

/// Number of rows (latitude) and columns (longitude) of a grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Shape {
    /// Number of latitude rows.
    pub rows: usize,
    /// Number of longitude columns.
    pub cols: usize,
}

impl Shape {
    /// Create a new shape.
    #[inline]
    pub fn new(rows: usize, cols: usize) -> Self {
        Shape { rows, cols }
    }

    /// Total number of cells.
    #[inline]
    pub fn len(self) -> usize {
        self.rows * self.cols
    }

    /// Returns `true` if the shape has no cells.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.rows, self.cols)
    }
}

/// An immutable row-major 2D array of cell values.
///
/// # Examples
///
/// ```rust
/// use splash_driver::{Grid, Shape};
///
/// let grid = Grid::new(Shape::new(2, 3), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
/// assert_eq!(grid.get(1, 2), 5.0);
///
/// // The number of values must match the shape.
/// assert!(Grid::new(Shape::new(2, 2), vec![0.0; 3]).is_err());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    shape: Shape,
    values: Vec<f64>,
}

impl Grid {
    /// Create a grid from row-major values.
    pub fn new(shape: Shape, values: Vec<f64>) -> Result<Self> {
        if values.len() != shape.len() {
            return Err(SplashError::ShapeMismatch {
                what: "grid values",
                expected: shape,
                found: Shape::new(1, values.len()),
            });
        }

        Ok(Grid { shape, values })
    }

    /// Create a grid with every cell set to `value`.
    #[inline]
    pub fn filled(shape: Shape, value: f64) -> Self {
        Grid {
            shape,
            values: vec![value; shape.len()],
        }
    }

    // Callers guarantee `values.len() == shape.len()`.
    #[inline]
    pub(crate) fn from_raw(shape: Shape, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), shape.len());
        Grid { shape, values }
    }

    /// The shape of the grid.
    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// The row-major cell values.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Mutable access to the row-major values.
    #[inline]
    pub(crate) fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Consume the grid and return the row-major values.
    #[inline]
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Value at the given row and column.
    ///
    /// # Panics
    ///
    /// If the indexes are out of bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.shape.rows && col < self.shape.cols);
        self.values[row * self.shape.cols + col]
    }

    /// Apply `f` to every cell, producing a new grid.
    pub fn map<F>(&self, f: F) -> Grid
    where
        F: Fn(f64) -> f64,
    {
        Grid::from_raw(self.shape, self.values.iter().map(|&v| f(v)).collect())
    }

    /// Check this grid has the expected shape.
    pub fn check_shape(&self, what: &'static str, expected: Shape) -> Result<()> {
        if self.shape != expected {
            Err(SplashError::ShapeMismatch {
                what,
                expected,
                found: self.shape,
            })
        } else {
            Ok(())
        }
    }

    /// Largest absolute cell-by-cell difference between two grids of the same shape.
    ///
    /// Cells that are masked (`NaN`) in either grid are skipped. Returns 0.0 if every cell is
    /// masked.
    pub fn max_abs_diff(&self, other: &Grid) -> f64 {
        debug_assert_eq!(self.shape, other.shape);

        izip!(&self.values, &other.values)
            .filter(|(a, b)| !a.is_nan() && !b.is_nan())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }

    /// Copy out a band of whole rows.
    pub fn rows(&self, rows: Range<usize>) -> Grid {
        debug_assert!(rows.end <= self.shape.rows);

        let cols = self.shape.cols;
        let shape = Shape::new(rows.len(), cols);
        let values = self.values[rows.start * cols..rows.end * cols].to_vec();
        Grid::from_raw(shape, values)
    }

    /// Stack row bands (in order) back into a single grid.
    ///
    /// All bands must have the same number of columns.
    pub fn stack_rows<'a, I>(bands: I) -> Grid
    where
        I: IntoIterator<Item = &'a Grid>,
    {
        let mut rows = 0;
        let mut cols = 0;
        let mut values = vec![];
        for band in bands {
            debug_assert!(rows == 0 || band.shape.cols == cols);
            cols = band.shape.cols;
            rows += band.shape.rows;
            values.extend_from_slice(&band.values);
        }

        Grid::from_raw(Shape::new(rows, cols), values)
    }
}

/// The static per-cell attributes of a run: elevation (m) and latitude (degrees).
#[derive(Clone, Debug, PartialEq)]
pub struct StaticGrid {
    elevation: Grid,
    latitude: Grid,
}

impl StaticGrid {
    /// Create from elevation and latitude grids of identical shape.
    pub fn new(elevation: Grid, latitude: Grid) -> Result<Self> {
        latitude.check_shape("latitude", elevation.shape())?;
        Ok(StaticGrid {
            elevation,
            latitude,
        })
    }

    /// Create from an elevation grid and the latitude of each row, broadcasting latitude along
    /// the longitude axis.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use splash_driver::{Grid, Shape, StaticGrid};
    ///
    /// let elevation = Grid::filled(Shape::new(2, 3), 100.0);
    /// let statics = StaticGrid::from_row_latitudes(elevation, &[-0.25, 0.25]).unwrap();
    /// assert_eq!(statics.latitude().get(1, 2), 0.25);
    /// ```
    pub fn from_row_latitudes(elevation: Grid, latitudes: &[f64]) -> Result<Self> {
        let shape = elevation.shape();
        if latitudes.len() != shape.rows {
            return Err(SplashError::ShapeMismatch {
                what: "row latitudes",
                expected: shape,
                found: Shape::new(latitudes.len(), shape.cols),
            });
        }

        let values = latitudes
            .iter()
            .flat_map(|&lat| std::iter::repeat(lat).take(shape.cols))
            .collect();

        StaticGrid::new(elevation, Grid::from_raw(shape, values))
    }

    /// The shape shared by all grids of the run.
    #[inline]
    pub fn shape(&self) -> Shape {
        self.elevation.shape()
    }

    /// Elevation in meters.
    #[inline]
    pub fn elevation(&self) -> &Grid {
        &self.elevation
    }

    /// Latitude in degrees.
    #[inline]
    pub fn latitude(&self) -> &Grid {
        &self.latitude
    }

    /// Copy out a band of whole rows.
    pub fn rows(&self, rows: Range<usize>) -> StaticGrid {
        StaticGrid {
            elevation: self.elevation.rows(rows.clone()),
            latitude: self.latitude.rows(rows),
        }
    }
}

/// Split `n_rows` rows into consecutive bands of at most `band_rows` rows.
pub(crate) fn row_bands(n_rows: usize, band_rows: usize) -> Vec<Range<usize>> {
    let band_rows = band_rows.max(1);
    (0..n_rows)
        .step_by(band_rows)
        .map(|start| start..(start + band_rows).min(n_rows))
        .collect()
}
