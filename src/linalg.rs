//! Dense linear algebra helpers
use crate::error::{Error, Result};
use itertools::izip;
use rlst::{
    rlst_array_from_slice1, rlst_array_from_slice2, rlst_dynamic_array2, DefaultIterator,
    MatrixInverse, RandomAccessByRef, RandomAccessMut, RlstScalar,
};

/// Invert a row-major `n x n` matrix in place
pub fn invert<T: RlstScalar + MatrixInverse>(values: &mut [T], n: usize) -> Result<()> {
    let out_of_bounds = || Error::LinearAlgebra(format!("Index out of bounds in {n}x{n} matrix"));

    let mut inverse = rlst_dynamic_array2!(T, [n, n]);
    for i in 0..n {
        for j in 0..n {
            *inverse.get_mut([i, j]).ok_or_else(out_of_bounds)? = values[i * n + j];
        }
    }
    inverse
        .view_mut()
        .into_inverse_alloc()
        .map_err(|e| Error::LinearAlgebra(format!("Cannot invert {n}x{n} matrix: {e:?}")))?;
    for i in 0..n {
        for j in 0..n {
            values[i * n + j] = *inverse.get([i, j]).ok_or_else(out_of_bounds)?;
        }
    }
    Ok(())
}

/// `y += mat x` for a row-major block with `x.len()` columns and `y.len()` rows
pub fn gemv(mat: &[f64], x: &[f64], y: &mut [f64]) {
    if x.is_empty() || y.is_empty() {
        return;
    }
    // Columns of the transpose are the rows of the block
    let transpose = rlst_array_from_slice2!(mat, [x.len(), y.len()]);
    let x = rlst_array_from_slice1!(x, [x.len()]);
    for (target, row) in izip!(y.iter_mut(), transpose.col_iter()) {
        *target += izip!(row.iter(), x.iter()).map(|(a, b)| a * b).sum::<f64>();
    }
}

/// `y[rows[i]] += sum_j mat[i, j] x[j]` for a row-major `rows.len() x x.len()` block
pub fn scatter_gemv(mat: &[f64], rows: &[usize], x: &[f64], y: &mut [f64]) {
    let mut local = vec![0.0; rows.len()];
    gemv(mat, x, &mut local);
    for (target, value) in izip!(rows, local) {
        y[*target] += value;
    }
}

/// `y[rows[i]] += sum_j mat[i, j] x[cols[j]]` for a row-major `rows.len() x cols.len()` block
pub fn gather_gemv(mat: &[f64], rows: &[usize], cols: &[usize], x: &[f64], y: &mut [f64]) {
    scatter_gemv(mat, rows, &gather(x, cols), y);
}

/// Entries of `x` at `indices`
pub fn gather(x: &[f64], indices: &[usize]) -> Vec<f64> {
    indices.iter().map(|i| x[*i]).collect()
}

/// Dot product
pub fn inner(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let a = rlst_array_from_slice1!(&a[..n], [n]);
    let b = rlst_array_from_slice1!(&b[..n], [n]);
    izip!(a.iter(), b.iter()).map(|(x, y)| x * y).sum()
}

/// Largest absolute entry
pub fn max_abs(a: &[f64]) -> f64 {
    a.iter().fold(0.0, |m, x| f64::max(m, x.abs()))
}
