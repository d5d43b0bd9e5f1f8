//! linalg::dense — `ndarray` ⇄ `nalgebra` bridge and dense primitives.
//!
//! Purpose
//! -------
//! Provide the small set of dense linear-algebra primitives the path
//! tracer needs (SPD solves, general solves, cross-products, orthogonal
//! complements, masked sub-matrix selection) while keeping `ndarray` as the
//! storage type everywhere else in the crate. Factorizations are delegated
//! to `nalgebra`; matrices are copied across the boundary explicitly.
//!
//! Key behaviors
//! -------------
//! - Copy `ndarray` matrices into `nalgebra::DMatrix` and back
//!   ([`to_dmatrix`], [`from_dmatrix`]).
//! - Solve SPD systems via Cholesky with a pivot-ratio conditioning guard
//!   ([`solve_spd`], [`solve_spd_vec`]) and general square systems via LU
//!   ([`solve_general`]).
//! - Complete a basis matrix `B` to an orthonormal basis of ℝ^dg and return
//!   the trailing columns ([`orthogonal_complement`]).
//! - Select rows/columns by boolean masks ([`mask_indices`], [`submatrix`]).
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are finite; finiteness is validated upstream.
//! - Every solve either returns a finite solution or
//!   [`LinalgError::Singular`]. Nothing in this module panics on singular
//!   input.
//!
//! Conventions
//! -----------
//! - `context` arguments are static labels (`"Sig_AA"`, `"crossprod(B, B)"`)
//!   carried into errors so failures are attributable.
//! - No explicit inverse is ever formed.
use crate::linalg::{
    errors::{LinalgError, LinalgResult},
    tolerances::{PIVOT_RATIO_TOL, RANK_TOL},
};
use nalgebra::{Cholesky, DMatrix, Dyn};
use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Copy an `ndarray` matrix view into a freshly allocated `DMatrix`.
pub fn to_dmatrix(a: ArrayView2<'_, f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

/// Copy a `DMatrix` back into an owned `Array2`.
pub fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// solve_spd — solve `A X = RHS` for symmetric positive-definite `A`.
///
/// Parameters
/// ----------
/// - `a`: `&Array2<f64>`
///   Square `n×n` SPD matrix.
/// - `rhs`: `&Array2<f64>`
///   Right-hand side with `n` rows and any number of columns.
/// - `context`: `&'static str`
///   Label for `a` used in error messages.
///
/// Returns
/// -------
/// `LinalgResult<Array2<f64>>`
///   The `n×m` solution `X`.
///
/// Errors
/// ------
/// - `LinalgError::DimensionMismatch`
///   `a` is not square or `rhs` has the wrong number of rows.
/// - `LinalgError::Singular`
///   The Cholesky factorization fails, its pivots are too unbalanced
///   (see [`PIVOT_RATIO_TOL`]), or the solution is not finite.
pub fn solve_spd(a: &Array2<f64>, rhs: &Array2<f64>, context: &'static str) -> LinalgResult<Array2<f64>> {
    check_square(a, context)?;
    if rhs.nrows() != a.nrows() {
        return Err(LinalgError::DimensionMismatch {
            context,
            expected: (a.nrows(), rhs.ncols()),
            found: rhs.dim(),
        });
    }
    if a.nrows() == 0 {
        return Ok(Array2::zeros(rhs.dim()));
    }

    let chol = checked_cholesky(a, context)?;
    let x = from_dmatrix(&chol.solve(&to_dmatrix(rhs.view())));
    finite_or_singular(x, context)
}

/// Vector right-hand-side convenience wrapper around [`solve_spd`].
pub fn solve_spd_vec(a: &Array2<f64>, rhs: &Array1<f64>, context: &'static str) -> LinalgResult<Array1<f64>> {
    let rhs_col = rhs.view().insert_axis(Axis(1)).to_owned();
    let x = solve_spd(a, &rhs_col, context)?;
    Ok(x.column(0).to_owned())
}

/// solve_general — solve `A x = rhs` for a general square `A` via LU.
///
/// Errors
/// ------
/// - `LinalgError::DimensionMismatch` for non-conformable operands.
/// - `LinalgError::Singular` when LU reports a zero pivot or the solution
///   is not finite.
pub fn solve_general(a: &Array2<f64>, rhs: &Array1<f64>, context: &'static str) -> LinalgResult<Array1<f64>> {
    check_square(a, context)?;
    if rhs.len() != a.nrows() {
        return Err(LinalgError::DimensionMismatch {
            context,
            expected: (a.nrows(), 1),
            found: (rhs.len(), 1),
        });
    }
    if a.nrows() == 0 {
        return Ok(Array1::zeros(0));
    }

    let rhs_col = to_dmatrix(rhs.view().insert_axis(Axis(1)));
    let x = to_dmatrix(a.view()).lu().solve(&rhs_col).ok_or(LinalgError::Singular { context })?;
    let x = Array1::from_shape_fn(a.nrows(), |i| x[(i, 0)]);
    if x.iter().all(|v| v.is_finite()) { Ok(x) } else { Err(LinalgError::Singular { context }) }
}

/// Cross-product `AᵗB`.
#[inline]
pub fn crossprod(a: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
    a.t().dot(b)
}

/// orthogonal_complement — orthonormal basis of the complement of `col(B)`.
///
/// Purpose
/// -------
/// Pad `B` (dg × r) with the identity, take the Householder QR
/// decomposition of `[B | I_dg]`, and return the trailing `dg − r` columns
/// of the full `dg × dg` orthogonal factor. The leading `r` columns of that
/// factor span `col(B)`, so the returned block `B⊥` satisfies
/// `B⊥ᵗB⊥ = I` and `B⊥ᵗB = 0`.
///
/// Returns
/// -------
/// `LinalgResult<Array2<f64>>`
///   A `dg × (dg − r)` matrix. When `r == dg` the result has zero columns.
///
/// Errors
/// ------
/// - `LinalgError::DimensionMismatch` when `r > dg`.
/// - `LinalgError::RankDeficient { column }` when column `column` of `B`
///   lies (numerically) in the span of the preceding columns; the relative
///   threshold is [`RANK_TOL`].
pub fn orthogonal_complement(b: &Array2<f64>) -> LinalgResult<Array2<f64>> {
    let (dg, r) = b.dim();
    if r > dg {
        return Err(LinalgError::DimensionMismatch { context: "B", expected: (dg, dg), found: (dg, r) });
    }

    let mut padded = DMatrix::<f64>::zeros(dg, r + dg);
    for j in 0..r {
        for i in 0..dg {
            padded[(i, j)] = b[[i, j]];
        }
    }
    for i in 0..dg {
        padded[(i, r + i)] = 1.0;
    }

    let qr = padded.qr();
    let upper = qr.r();
    for j in 0..r {
        let col_norm = b.column(j).dot(&b.column(j)).sqrt();
        if col_norm == 0.0 || upper[(j, j)].abs() <= RANK_TOL * col_norm {
            return Err(LinalgError::RankDeficient { context: "B", column: j });
        }
    }

    let q = qr.q();
    Ok(Array2::from_shape_fn((dg, dg - r), |(i, j)| q[(i, r + j)]))
}

/// Positions of the `true` entries of a boolean mask, in increasing order.
pub fn mask_indices(mask: &[bool]) -> Vec<usize> {
    mask.iter().enumerate().filter(|(_, on)| **on).map(|(i, _)| i).collect()
}

/// Rows `rows` and columns `cols` of `a`, in the given order.
pub fn submatrix(a: &Array2<f64>, rows: &[usize], cols: &[usize]) -> Array2<f64> {
    a.select(Axis(0), rows).select(Axis(1), cols)
}

/// Replace `a` by `(a + aᵗ) / 2` in place.
///
/// Products like `T Σ Tᵗ` pick up asymmetry of order machine epsilon; the
/// Cholesky-based solves downstream read only one triangle, so the two
/// triangles are made to agree exactly.
pub fn symmetrize(a: &mut Array2<f64>) {
    let n = a.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            let avg = 0.5 * (a[[i, j]] + a[[j, i]]);
            a[[i, j]] = avg;
            a[[j, i]] = avg;
        }
    }
}

// ---- Helper methods ----

fn check_square(a: &Array2<f64>, context: &'static str) -> LinalgResult<()> {
    if a.nrows() != a.ncols() {
        return Err(LinalgError::DimensionMismatch {
            context,
            expected: (a.nrows(), a.nrows()),
            found: a.dim(),
        });
    }
    Ok(())
}

/// Cholesky factorization rejecting numerically singular matrices.
///
/// `nalgebra` only fails on non-positive pivots; a pivot of `1e-9` against
/// a largest pivot of `1.0` still factorizes but produces garbage solves.
/// The squared pivot ratio is compared against [`PIVOT_RATIO_TOL`].
fn checked_cholesky(a: &Array2<f64>, context: &'static str) -> LinalgResult<Cholesky<f64, Dyn>> {
    let chol = to_dmatrix(a.view()).cholesky().ok_or(LinalgError::Singular { context })?;
    let l = chol.l();
    let diag = l.diagonal();
    let max_pivot = diag.iter().copied().fold(0.0_f64, f64::max);
    let min_pivot = diag.iter().copied().fold(f64::INFINITY, f64::min);
    if !(max_pivot > 0.0) || (min_pivot / max_pivot).powi(2) < PIVOT_RATIO_TOL {
        return Err(LinalgError::Singular { context });
    }
    Ok(chol)
}

fn finite_or_singular(x: Array2<f64>, context: &'static str) -> LinalgResult<Array2<f64>> {
    if x.iter().all(|v| v.is_finite()) { Ok(x) } else { Err(LinalgError::Singular { context }) }
}
