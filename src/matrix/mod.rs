//! Shared, immutable feature × observation matrices.
//!
//! A [`MatrixHandle`] is a cheap-to-clone reference to one of a small set of storage
//! variants: a dense `ndarray` leaf, a sparse `CsrMatrix` leaf, a delayed bind of other
//! handles, or a delayed row subset of another handle. Composite handles never copy the
//! data of their inputs; every read is routed to the owning leaf.
//!
//! Rows are features (genes) and columns are observations (cells) throughout the crate.

use std::sync::Arc;

use nalgebra_sparse::CsrMatrix;
use ndarray::Array2;
use single_utilities::traits::FloatOpsTS;

use crate::error::{MarkerError, Result};

pub mod bind;

pub use bind::{cbind, cbind_with_rownames, rbind, select_by_index, RowIdentifier};

/// Axis along which a set of matrices is concatenated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindAxis {
    /// Stack matrices on top of each other (`rbind`), columns must agree.
    Rows,
    /// Place matrices side by side (`cbind`), rows must agree.
    Columns,
}

/// Reference-counted handle to an immutable numeric matrix.
#[derive(Debug)]
pub struct MatrixHandle<T> {
    node: Arc<MatrixNode<T>>,
}

// Manual impl so cloning a handle never requires `T: Clone`.
impl<T> Clone for MatrixHandle<T> {
    fn clone(&self) -> Self {
        MatrixHandle {
            node: Arc::clone(&self.node),
        }
    }
}

#[derive(Debug)]
enum MatrixNode<T> {
    Dense(Array2<T>),
    Sparse(CsrMatrix<T>),
    Bound(BoundMatrix<T>),
    RowSubset(RowSubset<T>),
}

#[derive(Debug)]
struct BoundMatrix<T> {
    axis: BindAxis,
    parts: Vec<MatrixHandle<T>>,
    /// Cumulative extents along `axis`, `parts.len() + 1` entries starting at zero.
    offsets: Vec<usize>,
    nrows: usize,
    ncols: usize,
}

#[derive(Debug)]
struct RowSubset<T> {
    inner: MatrixHandle<T>,
    rows: Vec<usize>,
}

impl<T> BoundMatrix<T> {
    /// Index of the part owning `position` along the bound axis, and the offset within it.
    fn locate(&self, position: usize) -> (usize, usize) {
        // Empty parts share their offset with the next part, so take the last match.
        let part = self.offsets.partition_point(|&o| o <= position) - 1;
        (part, position - self.offsets[part])
    }
}

#[inline]
fn to_f64<T: FloatOpsTS>(value: T) -> f64 {
    num_traits::ToPrimitive::to_f64(&value).unwrap_or(f64::NAN)
}

impl<T> MatrixHandle<T>
where
    T: FloatOpsTS,
{
    /// Wrap a dense matrix (features in rows, observations in columns).
    pub fn from_dense(matrix: Array2<T>) -> Self {
        Self::from_node(MatrixNode::Dense(matrix))
    }

    /// Wrap a sparse CSR matrix (features in rows, observations in columns).
    pub fn from_csr(matrix: CsrMatrix<T>) -> Self {
        Self::from_node(MatrixNode::Sparse(matrix))
    }

    fn from_node(node: MatrixNode<T>) -> Self {
        MatrixHandle {
            node: Arc::new(node),
        }
    }

    /// Build a delayed bind. Shapes must already have been validated by the caller.
    pub(crate) fn bound(axis: BindAxis, parts: Vec<MatrixHandle<T>>) -> Self {
        let mut offsets = Vec::with_capacity(parts.len() + 1);
        offsets.push(0);
        let mut total = 0;
        for part in &parts {
            total += match axis {
                BindAxis::Rows => part.nrows(),
                BindAxis::Columns => part.ncols(),
            };
            offsets.push(total);
        }

        let (nrows, ncols) = match axis {
            BindAxis::Rows => (total, parts.first().map_or(0, |p| p.ncols())),
            BindAxis::Columns => (parts.first().map_or(0, |p| p.nrows()), total),
        };

        Self::from_node(MatrixNode::Bound(BoundMatrix {
            axis,
            parts,
            offsets,
            nrows,
            ncols,
        }))
    }

    /// Delayed selection of `rows` (in the given order, repeats allowed).
    pub fn subset_rows(&self, rows: Vec<usize>) -> Result<Self> {
        let nrows = self.nrows();
        if let Some(&bad) = rows.iter().find(|&&r| r >= nrows) {
            return Err(MarkerError::invalid_config(format!(
                "row index {} out of range for a matrix with {} rows",
                bad, nrows
            )));
        }
        Ok(Self::from_node(MatrixNode::RowSubset(RowSubset {
            inner: self.clone(),
            rows,
        })))
    }

    pub fn nrows(&self) -> usize {
        match self.node.as_ref() {
            MatrixNode::Dense(m) => m.nrows(),
            MatrixNode::Sparse(m) => m.nrows(),
            MatrixNode::Bound(b) => b.nrows,
            MatrixNode::RowSubset(s) => s.rows.len(),
        }
    }

    pub fn ncols(&self) -> usize {
        match self.node.as_ref() {
            MatrixNode::Dense(m) => m.ncols(),
            MatrixNode::Sparse(m) => m.ncols(),
            MatrixNode::Bound(b) => b.ncols,
            MatrixNode::RowSubset(s) => s.inner.ncols(),
        }
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    /// Whether both handles refer to the same underlying node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// Read a single element, `None` if out of range.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.nrows() || col >= self.ncols() {
            return None;
        }
        Some(self.get_unchecked(row, col))
    }

    fn get_unchecked(&self, row: usize, col: usize) -> f64 {
        match self.node.as_ref() {
            MatrixNode::Dense(m) => to_f64(m[[row, col]]),
            MatrixNode::Sparse(m) => m
                .get_entry(row, col)
                .map_or(0.0, |entry| to_f64(entry.into_value())),
            MatrixNode::Bound(b) => match b.axis {
                BindAxis::Rows => {
                    let (part, local) = b.locate(row);
                    b.parts[part].get_unchecked(local, col)
                }
                BindAxis::Columns => {
                    let (part, local) = b.locate(col);
                    b.parts[part].get_unchecked(row, local)
                }
            },
            MatrixNode::RowSubset(s) => s.inner.get_unchecked(s.rows[row], col),
        }
    }

    /// Dense copy of one feature across all observations.
    pub fn row(&self, row: usize) -> Vec<f64> {
        let mut out = vec![0.0; self.ncols()];
        self.fetch_row(row, &mut out);
        out
    }

    /// Dense copy of one observation across all features.
    pub fn column(&self, col: usize) -> Vec<f64> {
        let mut out = vec![0.0; self.nrows()];
        self.fetch_column(col, &mut out);
        out
    }

    /// Fill `out` (length `ncols`) with row `row`.
    pub(crate) fn fetch_row(&self, row: usize, out: &mut [f64]) {
        debug_assert_eq!(out.len(), self.ncols());
        match self.node.as_ref() {
            MatrixNode::Dense(m) => {
                for (o, &v) in out.iter_mut().zip(m.row(row).iter()) {
                    *o = to_f64(v);
                }
            }
            MatrixNode::Sparse(m) => {
                out.fill(0.0);
                let lane = m.row(row);
                for (&c, &v) in lane.col_indices().iter().zip(lane.values()) {
                    out[c] = to_f64(v);
                }
            }
            MatrixNode::Bound(b) => match b.axis {
                BindAxis::Rows => {
                    let (part, local) = b.locate(row);
                    b.parts[part].fetch_row(local, out);
                }
                BindAxis::Columns => {
                    for (part, window) in b.parts.iter().zip(b.offsets.windows(2)) {
                        part.fetch_row(row, &mut out[window[0]..window[1]]);
                    }
                }
            },
            MatrixNode::RowSubset(s) => s.inner.fetch_row(s.rows[row], out),
        }
    }

    /// Fill `out` (length `nrows`) with column `col`.
    pub(crate) fn fetch_column(&self, col: usize, out: &mut [f64]) {
        debug_assert_eq!(out.len(), self.nrows());
        match self.node.as_ref() {
            MatrixNode::Dense(m) => {
                for (o, &v) in out.iter_mut().zip(m.column(col).iter()) {
                    *o = to_f64(v);
                }
            }
            MatrixNode::Sparse(m) => {
                for (r, o) in out.iter_mut().enumerate() {
                    *o = m
                        .get_entry(r, col)
                        .map_or(0.0, |entry| to_f64(entry.into_value()));
                }
            }
            MatrixNode::Bound(b) => match b.axis {
                BindAxis::Rows => {
                    for (part, window) in b.parts.iter().zip(b.offsets.windows(2)) {
                        part.fetch_column(col, &mut out[window[0]..window[1]]);
                    }
                }
                BindAxis::Columns => {
                    let (part, local) = b.locate(col);
                    b.parts[part].fetch_column(local, out);
                }
            },
            MatrixNode::RowSubset(s) => {
                let full = s.inner.column(col);
                for (o, &r) in out.iter_mut().zip(&s.rows) {
                    *o = full[r];
                }
            }
        }
    }

    /// Materialize the handle into a dense `f64` array.
    pub fn to_dense(&self) -> Array2<f64> {
        let (nrows, ncols) = self.shape();
        let mut out = Array2::zeros((nrows, ncols));
        let mut buffer = vec![0.0; ncols];
        for (r, mut lane) in out.rows_mut().into_iter().enumerate() {
            self.fetch_row(r, &mut buffer);
            for (o, &v) in lane.iter_mut().zip(&buffer) {
                *o = v;
            }
        }
        out
    }
}

impl<T: FloatOpsTS> From<Array2<T>> for MatrixHandle<T> {
    fn from(matrix: Array2<T>) -> Self {
        MatrixHandle::from_dense(matrix)
    }
}

impl<T: FloatOpsTS> From<CsrMatrix<T>> for MatrixHandle<T> {
    fn from(matrix: CsrMatrix<T>) -> Self {
        MatrixHandle::from_csr(matrix)
    }
}
