//! sensitivity::errors — error type for sensitivity-path computations.
//!
//! Purpose
//! -------
//! Provide the error enum and result alias used by every stage of the
//! sensitivity path: input validation, coordinate transformation, the
//! homotopy loop, and path assembly. Linear-algebra failures from
//! [`crate::linalg`] are folded in via `From`, so `?` works across layers.
//!
//! Key behaviors
//! -------------
//! - Define [`PathError`] / [`PathResult`] as the canonical error surface.
//! - Classify variants into the three failure families callers care
//!   about: invalid arguments ([`PathError::is_invalid_argument`]),
//!   singular linear systems, and fatal path-invariant violations
//!   ([`PathError::is_fatal_numerical`]).
//! - Map errors into Python `ValueError`s when the `python-bindings`
//!   feature is enabled.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every failure aborts the whole call; there is no partial path.
//! - Variants carry only small payloads (indices, offending scalars,
//!   static labels) so they are cheap to clone and compare.
//!
//! Testing notes
//! -------------
//! - Unit tests check that `Display` messages embed their payloads and
//!   that the classification helpers partition the variants.

#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

use crate::linalg::errors::LinalgError;

/// Result alias for sensitivity-path operations.
pub type PathResult<T> = Result<T, PathError>;

/// PathError — failures of sensitivity-path computations.
///
/// Variants
/// --------
/// Input validation (invalid arguments):
/// - `EmptyModel`: `G` has no rows or no columns.
/// - `Underidentified { dg, dk }`: fewer moments than parameters.
/// - `DimensionMismatch { what, expected, found }`: an input has the wrong
///   shape (vectors are reported as `(len, 1)`).
/// - `NonFinite { what, row, col, value }`: NaN or ±∞ in an input.
/// - `NotSymmetric { row, col }`: `Sig` is not symmetric at `(row, col)`.
/// - `TooManyConstraints { r, dg }`: `B` has more columns than rows.
/// - `InvalidOption { name, value, reason }`: a tuning option or query
///   argument is out of range.
///
/// Linear algebra:
/// - `Singular { context }`: a matrix that must be factorized is singular.
/// - `RankDeficient { context, column }`: a basis column is dependent.
///
/// Path tracing (fatal numerical errors):
/// - `NegativeStep { step, lam, knot }`: the next breakpoint lies behind
///   the current one, which breaks the monotonicity of the path.
/// - `MaxStepsExceeded { max_steps }`: the loop hit its step budget.
#[derive(Debug, Clone, PartialEq)]
pub enum PathError {
    // ---- Input validation ----
    EmptyModel,
    Underidentified { dg: usize, dk: usize },
    DimensionMismatch { what: &'static str, expected: (usize, usize), found: (usize, usize) },
    NonFinite { what: &'static str, row: usize, col: usize, value: f64 },
    NotSymmetric { row: usize, col: usize },
    TooManyConstraints { r: usize, dg: usize },
    InvalidOption { name: &'static str, value: f64, reason: &'static str },

    // ---- Linear algebra ----
    Singular { context: &'static str },
    RankDeficient { context: &'static str, column: usize },

    // ---- Path tracing ----
    NegativeStep { step: f64, lam: f64, knot: usize },
    MaxStepsExceeded { max_steps: usize },
}

impl PathError {
    /// True for errors caused by malformed inputs or options.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            PathError::EmptyModel
                | PathError::Underidentified { .. }
                | PathError::DimensionMismatch { .. }
                | PathError::NonFinite { .. }
                | PathError::NotSymmetric { .. }
                | PathError::TooManyConstraints { .. }
                | PathError::InvalidOption { .. }
                | PathError::RankDeficient { .. }
        )
    }

    /// True for violations of the path invariants detected inside the loop.
    pub fn is_fatal_numerical(&self) -> bool {
        matches!(self, PathError::NegativeStep { .. } | PathError::MaxStepsExceeded { .. })
    }
}

impl From<LinalgError> for PathError {
    fn from(err: LinalgError) -> Self {
        match err {
            LinalgError::Singular { context } => PathError::Singular { context },
            LinalgError::RankDeficient { context, column } => {
                PathError::RankDeficient { context, column }
            }
            LinalgError::DimensionMismatch { context, expected, found } => {
                PathError::DimensionMismatch { what: context, expected, found }
            }
        }
    }
}

impl std::error::Error for PathError {}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Input validation ----
            PathError::EmptyModel => {
                write!(f, "Path Error: G must have at least one row and one column")
            }
            PathError::Underidentified { dg, dk } => write!(
                f,
                "Path Error: model is underidentified ({dg} moments for {dk} parameters)"
            ),
            PathError::DimensionMismatch { what, expected, found } => write!(
                f,
                "Path Error: {what} has shape {}x{}, expected {}x{}",
                found.0, found.1, expected.0, expected.1
            ),
            PathError::NonFinite { what, row, col, value } => {
                write!(f, "Path Error: {what}[{row}, {col}] = {value} is not finite")
            }
            PathError::NotSymmetric { row, col } => {
                write!(f, "Path Error: Sig is not symmetric at ({row}, {col})")
            }
            PathError::TooManyConstraints { r, dg } => write!(
                f,
                "Path Error: B has {r} columns but only {dg} rows; need r <= dg"
            ),
            PathError::InvalidOption { name, value, reason } => {
                write!(f, "Path Error: invalid {name} = {value}: {reason}")
            }

            // ---- Linear algebra ----
            PathError::Singular { context } => {
                write!(f, "Path Error: matrix {context} is singular")
            }
            PathError::RankDeficient { context, column } => write!(
                f,
                "Path Error: column {column} of {context} is linearly dependent on earlier columns"
            ),

            // ---- Path tracing ----
            PathError::NegativeStep { step, lam, knot } => write!(
                f,
                "Path Error: negative step {step} at knot {knot} (lam = {lam})"
            ),
            PathError::MaxStepsExceeded { max_steps } => {
                write!(f, "Path Error: path did not terminate within {max_steps} steps")
            }
        }
    }
}

#[cfg(feature = "python-bindings")]
impl From<PathError> for PyErr {
    fn from(err: PathError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
