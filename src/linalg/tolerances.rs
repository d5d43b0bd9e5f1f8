//! Shared numerical tolerances for the dense linear-algebra helpers.
//!
//! # Provided items
//! - [`SYMMETRY_TOL`]: relative tolerance when checking that a covariance
//!   matrix is symmetric.
//! - [`RANK_TOL`]: relative threshold on QR pivots below which a basis
//!   column is treated as linearly dependent.
//! - [`PIVOT_RATIO_TOL`]: lower bound on the squared ratio of the smallest
//!   to the largest Cholesky pivot. Below it the matrix is reported as
//!   singular even though the factorization technically succeeded.

/// Relative tolerance for `|a_ij - a_ji|` in symmetry checks.
pub const SYMMETRY_TOL: f64 = 1e-8;

/// Relative tolerance on `|R_jj| / ‖b_j‖` in QR rank checks.
pub const RANK_TOL: f64 = 1e-10;

/// Minimum accepted `(min l_ii / max l_ii)²` for a Cholesky factor.
///
/// The squared pivot ratio is a cheap proxy for the reciprocal condition
/// number of an SPD matrix. Anything smaller than this is indistinguishable
/// from a singular matrix in double precision.
pub const PIVOT_RATIO_TOL: f64 = 1e-14;
