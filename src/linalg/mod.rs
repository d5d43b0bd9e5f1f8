//! linalg — dense linear-algebra primitives for the sensitivity path.
//!
//! Purpose
//! -------
//! Supply the handful of dense operations the homotopy needs (SPD and
//! general solves, cross-products, orthogonal complements, masked
//! sub-matrices) on top of `nalgebra` factorizations, while the rest of the
//! crate works exclusively with `ndarray` containers.
//!
//! Key behaviors
//! -------------
//! - [`dense`] copies between `ndarray` and `nalgebra` and wraps Cholesky,
//!   LU and QR into `ndarray`-in / `ndarray`-out helpers.
//! - [`errors`] defines [`LinalgError`] / [`LinalgResult`], converted into
//!   the path-level error type by callers.
//! - [`tolerances`] centralizes the numeric thresholds (symmetry, rank,
//!   Cholesky pivot ratio).
//!
//! Conventions
//! -----------
//! - All routines are pure: no logging, no global state, no `unsafe`.
//! - Failures are reported through [`LinalgResult`] only.

pub mod dense;
pub mod errors;
pub mod tolerances;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::dense::{
    crossprod, mask_indices, orthogonal_complement, solve_general, solve_spd, solve_spd_vec,
    submatrix, symmetrize,
};
pub use self::errors::{LinalgError, LinalgResult};
