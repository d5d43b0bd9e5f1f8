//! Error handling for the dense linear-algebra layer.
//!
//! This module defines `LinalgError`, the error type returned by the
//! solve / factorization / basis-completion helpers in [`crate::linalg`].
//! Higher layers convert it into their own error types via `From`, so a
//! singular sub-matrix deep inside the path loop surfaces with the name of
//! the matrix that failed rather than as a panic.

/// Result alias for linear-algebra helpers.
pub type LinalgResult<T> = Result<T, LinalgError>;

/// LinalgError — failures of dense factorizations and solves.
///
/// Variants
/// --------
/// - `Singular { context }`
///   A matrix that had to be factorized is singular, not positive definite,
///   or so badly conditioned that the solution is not finite. `context`
///   names the matrix (e.g. `"Sig_AA"`).
/// - `DimensionMismatch { context, expected, found }`
///   Operand shapes are not conformable.
/// - `RankDeficient { context, column }`
///   A basis matrix has a column that is (numerically) a linear
///   combination of the preceding ones.
#[derive(Debug, Clone, PartialEq)]
pub enum LinalgError {
    Singular { context: &'static str },
    DimensionMismatch { context: &'static str, expected: (usize, usize), found: (usize, usize) },
    RankDeficient { context: &'static str, column: usize },
}

impl std::error::Error for LinalgError {}

impl std::fmt::Display for LinalgError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinalgError::Singular { context } => {
                write!(f, "Linalg Error: matrix {context} is singular or not positive definite")
            }
            LinalgError::DimensionMismatch { context, expected, found } => write!(
                f,
                "Linalg Error: {context} has shape {}x{}, expected {}x{}",
                found.0, found.1, expected.0, expected.1
            ),
            LinalgError::RankDeficient { context, column } => {
                write!(f, "Linalg Error: column {column} of {context} is linearly dependent")
            }
        }
    }
}
