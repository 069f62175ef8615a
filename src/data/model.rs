use ndarray::{Array1, Array2, ArrayView1, Axis};

use super::experiment::{AccessorPath, ExperimentRecord};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// ScanDataset – one swept parameter vs. a spectral axis
// ---------------------------------------------------------------------------

/// A 2D scan: one spectrum per sweep point.
///
/// Rows are kept sorted by ascending `y`; `data` is `(y.len(), x.len())`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanDataset {
    x: Array1<f64>,
    y: Array1<f64>,
    data: Array2<f64>,
}

impl ScanDataset {
    /// Validate shapes and sort rows by `y` (stable for equal values).
    pub fn new(x: Array1<f64>, y: Array1<f64>, data: Array2<f64>) -> Result<Self> {
        if x.is_empty() || y.is_empty() {
            return Err(Error::DataFormat(format!(
                "empty axis: {} x values, {} y values",
                x.len(),
                y.len()
            )));
        }
        if data.dim() != (y.len(), x.len()) {
            return Err(Error::DataFormat(format!(
                "data is {}x{} but axes need {}x{} (rows = y, columns = x)",
                data.nrows(),
                data.ncols(),
                y.len(),
                x.len()
            )));
        }
        if let Some(bad) = y.iter().find(|v| !v.is_finite()) {
            return Err(Error::DataFormat(format!("non-finite sweep value {bad}")));
        }

        let mut order: Vec<usize> = (0..y.len()).collect();
        order.sort_by(|&a, &b| y[a].total_cmp(&y[b]));
        let (y, data) = if order.windows(2).all(|w| w[0] < w[1]) {
            (y, data)
        } else {
            (y.select(Axis(0), &order), data.select(Axis(0), &order))
        };

        Ok(Self { x, y, data })
    }

    /// Build from plain vectors, `rows[i]` being the spectrum at `y[i]`.
    pub fn from_rows(x: Vec<f64>, y: Vec<f64>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let columns = x.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns) {
            return Err(Error::DataFormat(format!(
                "row {i} has {} values, x has {columns}",
                row.len()
            )));
        }
        let n_rows = rows.len();
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let data = Array2::from_shape_vec((n_rows, columns), flat)
            .map_err(|e| Error::DataFormat(e.to_string()))?;
        Self::new(Array1::from_vec(x), Array1::from_vec(y), data)
    }

    pub fn x(&self) -> &Array1<f64> {
        &self.x
    }

    pub fn y(&self) -> &Array1<f64> {
        &self.y
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.row(index)
    }

    pub fn n_rows(&self) -> usize {
        self.y.len()
    }

    pub fn n_columns(&self) -> usize {
        self.x.len()
    }

    /// Row whose sweep value is closest to `value`.
    pub fn nearest_row(&self, value: f64) -> Option<usize> {
        if !value.is_finite() {
            return None;
        }
        self.y
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (*a - value).abs().total_cmp(&(*b - value).abs()))
            .map(|(i, _)| i)
    }

    /// Coordinate grids for the heatmap, both `(y.len(), x.len())`.
    pub fn mesh(&self) -> (Array2<f64>, Array2<f64>) {
        let shape = (self.y.len(), self.x.len());
        let xx = Array2::from_shape_fn(shape, |(_, j)| self.x[j]);
        let yy = Array2::from_shape_fn(shape, |(i, _)| self.y[i]);
        (xx, yy)
    }

    pub fn x_range(&self) -> (f64, f64) {
        finite_range(self.x.iter())
    }

    pub fn y_range(&self) -> (f64, f64) {
        (self.y[0], self.y[self.y.len() - 1])
    }

    /// Smallest and largest finite data value.
    pub fn value_range(&self) -> (f64, f64) {
        finite_range(self.data.iter())
    }

    pub(crate) fn set_x(&mut self, x: Array1<f64>) {
        debug_assert_eq!(x.len(), self.x.len());
        self.x = x;
    }

    pub(crate) fn set_data(&mut self, data: Array2<f64>) {
        debug_assert_eq!(data.dim(), self.data.dim());
        self.data = data;
    }
}

fn finite_range<'a>(values: impl Iterator<Item = &'a f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if lo > hi {
        (0.0, 0.0)
    } else {
        (lo, hi)
    }
}

// ---------------------------------------------------------------------------
// PlotInput – the two accepted input shapes
// ---------------------------------------------------------------------------

/// What a plotter can be built from.
#[derive(Debug, Clone)]
pub enum PlotInput {
    /// Axes and the matrix directly.
    Raw {
        x: Vec<f64>,
        y: Vec<f64>,
        data: Vec<Vec<f64>>,
    },
    /// An experiment record plus the path of each scan's sweep value.
    Experiment {
        record: ExperimentRecord,
        path: AccessorPath,
    },
}

impl PlotInput {
    pub fn into_dataset(self) -> Result<ScanDataset> {
        match self {
            PlotInput::Raw { x, y, data } => {
                if data.len() != y.len() {
                    return Err(Error::DataFormat(format!(
                        "{} rows of data for {} y values",
                        data.len(),
                        y.len()
                    )));
                }
                ScanDataset::from_rows(x, y, data)
            }
            PlotInput::Experiment { record, path } => record.to_dataset(&path),
        }
    }
}
