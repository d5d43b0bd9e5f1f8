//! sensitivity::validation — shape and finiteness guards for path inputs.
//!
//! Purpose
//! -------
//! Reject malformed moment models and constraint bases before any
//! factorization runs, so that every later failure is a genuine numerical
//! one (singular matrix, negative step) rather than a shape or NaN problem.
//!
//! Key behaviors
//! -------------
//! - [`validate_model_parts`] checks `G`, `Sig`, `H` for emptiness,
//!   identification (`dg ≥ dk`), conformable shapes, finiteness, and symmetry
//!   of `Sig`.
//! - [`validate_basis`] checks `B` for row count, `r ≤ dg` and finiteness.
//!
//! Invariants & assumptions
//! ------------------------
//! - Checks run in a fixed order (emptiness, identification, shapes,
//!   finiteness, symmetry) so the reported error is deterministic when an
//!   input violates several constraints.
//! - Positive definiteness and rank are *not* checked here; they need a
//!   factorization and are handled by the model and transform constructors.
//!
//! Testing notes
//! -------------
//! - Unit tests cover each error branch and the success paths.
use ndarray::{Array1, Array2};

use crate::{
    linalg::tolerances::SYMMETRY_TOL,
    sensitivity::errors::{PathError, PathResult},
};

/// Validate the parts of a moment model.
///
/// Parameters
/// ----------
/// - `g`: `&Array2<f64>`
///   Moment Jacobian, `dg × dk` with `dg ≥ dk ≥ 1`.
/// - `sigma`: `&Array2<f64>`
///   Moment covariance, `dg × dg`, symmetric up to [`SYMMETRY_TOL`]
///   (relative to `max(1, |Sig_ij|, |Sig_ji|)`).
/// - `h`: `&Array1<f64>`
///   Derivative of the functional of interest, length `dk`.
///
/// Errors
/// ------
/// - `PathError::EmptyModel` when `G` has no rows or no columns.
/// - `PathError::Underidentified` when `dk > dg`.
/// - `PathError::DimensionMismatch` for a non-conformable `Sig` or `H`.
/// - `PathError::NonFinite` for the first NaN/±∞ entry found.
/// - `PathError::NotSymmetric` for the first asymmetric pair `(i, j)`,
///   `i < j`.
pub fn validate_model_parts(g: &Array2<f64>, sigma: &Array2<f64>, h: &Array1<f64>) -> PathResult<()> {
    let (dg, dk) = g.dim();
    if dg == 0 || dk == 0 {
        return Err(PathError::EmptyModel);
    }
    if dk > dg {
        return Err(PathError::Underidentified { dg, dk });
    }
    if sigma.dim() != (dg, dg) {
        return Err(PathError::DimensionMismatch { what: "Sig", expected: (dg, dg), found: sigma.dim() });
    }
    if h.len() != dk {
        return Err(PathError::DimensionMismatch { what: "H", expected: (dk, 1), found: (h.len(), 1) });
    }

    check_finite_matrix(g, "G")?;
    check_finite_matrix(sigma, "Sig")?;
    for (i, &value) in h.iter().enumerate() {
        if !value.is_finite() {
            return Err(PathError::NonFinite { what: "H", row: i, col: 0, value });
        }
    }

    for i in 0..dg {
        for j in (i + 1)..dg {
            let (a, b) = (sigma[[i, j]], sigma[[j, i]]);
            let scale = 1.0_f64.max(a.abs()).max(b.abs());
            if (a - b).abs() > SYMMETRY_TOL * scale {
                return Err(PathError::NotSymmetric { row: i, col: j });
            }
        }
    }

    Ok(())
}

/// Validate a constraint basis `B` against the number of moments `dg`.
///
/// `r = 0` (a `dg × 0` matrix) is valid and selects the unconstrained
/// closed form.
///
/// Errors
/// ------
/// - `PathError::DimensionMismatch` when `B` does not have `dg` rows.
/// - `PathError::TooManyConstraints` when `r > dg`.
/// - `PathError::NonFinite` for the first non-finite entry.
pub fn validate_basis(b: &Array2<f64>, dg: usize) -> PathResult<()> {
    let (rows, r) = b.dim();
    if rows != dg {
        return Err(PathError::DimensionMismatch { what: "B", expected: (dg, r), found: (rows, r) });
    }
    if r > dg {
        return Err(PathError::TooManyConstraints { r, dg });
    }
    check_finite_matrix(b, "B")
}

fn check_finite_matrix(a: &Array2<f64>, what: &'static str) -> PathResult<()> {
    match a.indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some(((row, col), &value)) => Err(PathError::NonFinite { what, row, col, value }),
        None => Ok(()),
    }
}
