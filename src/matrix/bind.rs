//! Delayed concatenation of matrices, with an optional name-based row intersection.

use std::collections::{HashMap, HashSet};

use log::debug;
use rayon::prelude::*;
use single_utilities::traits::FloatOpsTS;

use crate::error::{Dimension, MarkerError, Result};
use crate::matrix::{BindAxis, MatrixHandle};

/// Integer code naming a feature, used to match rows across inputs.
pub type RowIdentifier = i32;

/// Place `matrices` side by side. All inputs must have the same number of rows.
pub fn cbind<T>(matrices: &[MatrixHandle<T>]) -> Result<MatrixHandle<T>>
where
    T: FloatOpsTS,
{
    bind(matrices, BindAxis::Columns)
}

/// Stack `matrices` on top of each other. All inputs must have the same number of columns.
pub fn rbind<T>(matrices: &[MatrixHandle<T>]) -> Result<MatrixHandle<T>>
where
    T: FloatOpsTS,
{
    bind(matrices, BindAxis::Rows)
}

fn bind<T>(matrices: &[MatrixHandle<T>], axis: BindAxis) -> Result<MatrixHandle<T>>
where
    T: FloatOpsTS,
{
    let (operation, dimension) = match axis {
        BindAxis::Columns => ("cbind", Dimension::Rows),
        BindAxis::Rows => ("rbind", Dimension::Columns),
    };
    let extent = |m: &MatrixHandle<T>| match axis {
        BindAxis::Columns => m.nrows(),
        BindAxis::Rows => m.ncols(),
    };

    let first = matrices
        .first()
        .ok_or(MarkerError::EmptyInput { operation })?;
    let shared = extent(first);

    for (i, current) in matrices.iter().enumerate().skip(1) {
        let found = extent(current);
        if found != shared {
            return Err(MarkerError::shape_mismatch(i, dimension, shared, found));
        }
    }

    if matrices.len() == 1 {
        return Ok(first.clone());
    }

    let bound = MatrixHandle::bound(axis, matrices.to_vec());
    debug!(
        "{} of {} matrices -> {} x {}",
        operation,
        matrices.len(),
        bound.nrows(),
        bound.ncols()
    );
    Ok(bound)
}

/// Column-bind `matrices` after restricting every input to the row identifiers they all share.
///
/// Rows of the result follow the order in which the shared identifiers first appear in
/// `row_ids[0]`. Within a single input, a repeated identifier resolves to its last row.
///
/// # Returns
///
/// The combined matrix and, for each of its rows, the row index in the first input. Use the
/// latter with [`select_by_index`] to recover row labels for the combined matrix.
pub fn cbind_with_rownames<T>(
    matrices: &[MatrixHandle<T>],
    row_ids: &[&[RowIdentifier]],
) -> Result<(MatrixHandle<T>, Vec<usize>)>
where
    T: FloatOpsTS,
{
    if matrices.is_empty() {
        return Err(MarkerError::EmptyInput {
            operation: "cbind_with_rownames",
        });
    }
    if row_ids.len() != matrices.len() {
        return Err(MarkerError::invalid_config(format!(
            "expected one identifier array per matrix ({}), got {}",
            matrices.len(),
            row_ids.len()
        )));
    }
    for (i, (matrix, ids)) in matrices.iter().zip(row_ids).enumerate() {
        if ids.len() != matrix.nrows() {
            return Err(MarkerError::shape_mismatch(
                i,
                Dimension::RowIdentifiers,
                matrix.nrows(),
                ids.len(),
            ));
        }
    }

    // Later inserts overwrite earlier ones, so the last duplicate wins.
    let lookups: Vec<HashMap<RowIdentifier, usize>> = row_ids
        .par_iter()
        .map(|ids| ids.iter().enumerate().map(|(row, &id)| (id, row)).collect())
        .collect();

    let mut seen = HashSet::new();
    let common: Vec<RowIdentifier> = row_ids[0]
        .iter()
        .copied()
        .filter(|id| lookups.iter().all(|lookup| lookup.contains_key(id)))
        .filter(|&id| seen.insert(id))
        .collect();

    if common.is_empty() {
        return Err(MarkerError::EmptyIntersection {
            inputs: matrices.len(),
        });
    }
    debug!(
        "intersection of {} inputs retains {} rows",
        matrices.len(),
        common.len()
    );

    let selections: Vec<Vec<usize>> = lookups
        .par_iter()
        .map(|lookup| common.iter().map(|id| lookup[id]).collect())
        .collect();

    let resliced = matrices
        .iter()
        .zip(&selections)
        .map(|(matrix, rows)| {
            let identity = rows.len() == matrix.nrows() && rows.iter().enumerate().all(|(i, &r)| i == r);
            if identity {
                Ok(matrix.clone())
            } else {
                matrix.subset_rows(rows.clone())
            }
        })
        .collect::<Result<Vec<_>>>()?;

    let combined = cbind(&resliced)?;
    let first_rows = selections.into_iter().next().unwrap_or_default();
    Ok((combined, first_rows))
}

/// Pick `labels[i]` for every `i` in `indices`, e.g. to label the rows of an intersection bind.
///
/// Returns `None` if any index is out of range for `labels`.
pub fn select_by_index<L: Clone>(labels: &[L], indices: &[usize]) -> Option<Vec<L>> {
    indices.iter().map(|&i| labels.get(i).cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn create_matrix(nrows: usize, ncols: usize, start: f64) -> MatrixHandle<f64> {
        let values = Array2::from_shape_fn((nrows, ncols), |(r, c)| start + (r * ncols + c) as f64);
        MatrixHandle::from_dense(values)
    }

    #[test]
    fn test_cbind_routes_columns() {
        let a = create_matrix(3, 2, 0.0);
        let b = create_matrix(3, 4, 100.0);
        let bound = cbind(&[a.clone(), b.clone()]).unwrap();

        assert_eq!(bound.shape(), (3, 6));
        for c in 0..2 {
            assert_eq!(bound.column(c), a.column(c));
        }
        for c in 2..6 {
            assert_eq!(bound.column(c), b.column(c - 2));
        }
        assert_eq!(bound.row(1), vec![2.0, 3.0, 104.0, 105.0, 106.0, 107.0]);
    }

    #[test]
    fn test_rbind_routes_rows() {
        let a = create_matrix(2, 3, 0.0);
        let b = create_matrix(1, 3, 50.0);
        let bound = rbind(&[a.clone(), b.clone()]).unwrap();

        assert_eq!(bound.shape(), (3, 3));
        assert_eq!(bound.row(0), a.row(0));
        assert_eq!(bound.row(2), b.row(0));
        assert_eq!(bound.column(2), vec![2.0, 5.0, 52.0]);
    }

    #[test]
    fn test_single_input_is_returned_as_is() {
        let a = create_matrix(2, 2, 0.0);
        assert!(cbind(&[a.clone()]).unwrap().ptr_eq(&a));
        assert!(rbind(&[a.clone()]).unwrap().ptr_eq(&a));
    }

    #[test]
    fn test_mismatch_identifies_input() {
        let a = create_matrix(3, 2, 0.0);
        let b = create_matrix(3, 2, 0.0);
        let c = create_matrix(4, 2, 0.0);

        let err = cbind(&[a.clone(), b, c]).unwrap_err();
        assert_eq!(err, MarkerError::shape_mismatch(2, Dimension::Rows, 3, 4));

        let d = create_matrix(3, 5, 0.0);
        let err = rbind(&[a, d]).unwrap_err();
        assert_eq!(err, MarkerError::shape_mismatch(1, Dimension::Columns, 2, 5));
    }

    #[test]
    fn test_empty_input() {
        let empty: Vec<MatrixHandle<f64>> = Vec::new();
        assert!(matches!(cbind(&empty), Err(MarkerError::EmptyInput { .. })));
        assert!(matches!(rbind(&empty), Err(MarkerError::EmptyInput { .. })));
        assert!(matches!(
            cbind_with_rownames(&empty, &[]),
            Err(MarkerError::EmptyInput { .. })
        ));
    }

    #[test]
    fn test_intersection_keeps_first_input_order() {
        let a = MatrixHandle::from_dense(array![[1.0, 1.5], [2.0, 2.5], [3.0, 3.5]]);
        let b = MatrixHandle::from_dense(array![[20.0], [30.0], [40.0]]);

        let (combined, first_rows) =
            cbind_with_rownames(&[a, b], &[&[1, 2, 3], &[2, 3, 4]]).unwrap();

        assert_eq!(first_rows, vec![1, 2]);
        assert_eq!(combined.shape(), (2, 3));
        assert_eq!(combined.row(0), vec![2.0, 2.5, 20.0]);
        assert_eq!(combined.row(1), vec![3.0, 3.5, 30.0]);
    }

    #[test]
    fn test_intersection_reorders_later_inputs() {
        let a = MatrixHandle::from_dense(array![[1.0], [2.0], [3.0]]);
        let b = MatrixHandle::from_dense(array![[30.0], [10.0], [20.0]]);

        let (combined, first_rows) =
            cbind_with_rownames(&[a, b], &[&[7, 8, 9], &[9, 7, 8]]).unwrap();

        assert_eq!(first_rows, vec![0, 1, 2]);
        assert_eq!(combined.to_dense(), array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]]);
    }

    #[test]
    fn test_intersection_duplicates_take_last_row() {
        let a = MatrixHandle::from_dense(array![[1.0], [2.0], [3.0]]);
        let b = MatrixHandle::from_dense(array![[10.0], [20.0]]);

        let (combined, first_rows) =
            cbind_with_rownames(&[a, b], &[&[5, 6, 5], &[5, 5]]).unwrap();

        assert_eq!(first_rows, vec![2]);
        assert_eq!(combined.row(0), vec![3.0, 20.0]);
    }

    #[test]
    fn test_intersection_errors() {
        let a = create_matrix(2, 1, 0.0);
        let b = create_matrix(2, 1, 0.0);

        let err = cbind_with_rownames(&[a.clone(), b.clone()], &[&[1, 2], &[3, 4]]).unwrap_err();
        assert_eq!(err, MarkerError::EmptyIntersection { inputs: 2 });

        let err = cbind_with_rownames(&[a, b], &[&[1, 2], &[1]]).unwrap_err();
        assert_eq!(
            err,
            MarkerError::shape_mismatch(1, Dimension::RowIdentifiers, 2, 1)
        );
    }

    #[test]
    fn test_select_by_index() {
        let labels = vec!["CD3E", "CD4", "MS4A1"];
        assert_eq!(select_by_index(&labels, &[2, 0]), Some(vec!["MS4A1", "CD3E"]));
        assert_eq!(select_by_index(&labels, &[]), Some(vec![]));
        assert_eq!(select_by_index(&labels, &[1, 3]), None);
    }
}
