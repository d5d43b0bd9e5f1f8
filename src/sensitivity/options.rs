//! sensitivity::options — norm selection and tuning options for the path.
//!
//! Purpose
//! -------
//! Hold the user-facing configuration of a path computation: which
//! misspecification ball to trace ([`NormKind`]) and the numeric tolerances
//! and step budget of the homotopy loop ([`PathOptions`]).
//!
//! Key behaviors
//! -------------
//! - [`NormKind`] parses from the short names used at the API boundary
//!   (`"inf"`, `"linf"`, `"max"`, `"1"`, `"l1"`) and knows the dual norm
//!   used for bias bounds.
//! - [`PathOptions::new`] validates tolerances and the step budget and
//!   reports violations as [`PathError::InvalidOption`].
//!
//! Invariants & assumptions
//! ------------------------
//! - `0 < tie_tol < 1` and `0 ≤ zero_tol < 1`, both finite.
//! - `max_steps`, when given, is at least 1.
//!
//! Conventions
//! -----------
//! - Tolerances are dimensionless. `tie_tol` is applied relative to
//!   `max(1, |d|)` when grouping simultaneous events; `zero_tol` is an
//!   absolute threshold on coordinates and on the bound `t`.
use std::{fmt, str::FromStr};

use ndarray::ArrayView1;

use crate::sensitivity::errors::{PathError, PathResult};

/// Default relative tolerance for grouping simultaneous knot events.
pub const DEFAULT_TIE_TOL: f64 = 1e-10;

/// Default absolute tolerance below which a coordinate counts as zero.
pub const DEFAULT_ZERO_TOL: f64 = 1e-12;

/// NormKind — shape of the misspecification ball for `γ`.
///
/// Variants
/// --------
/// - `LInf`
///   Max-norm ball `‖γ‖∞ ≤ δ`. The sensitivity penalty is the dual ℓ1 norm
///   of the constrained coordinates.
/// - `L1`
///   One-norm ball `‖γ‖₁ ≤ δ`. The sensitivity penalty is the dual ℓ∞ norm
///   of the constrained coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormKind {
    L1,
    LInf,
}

impl NormKind {
    /// Dual norm of `x` for this ball: `Σ|x_i|` for `LInf`, `max |x_i|` for
    /// `L1`. Empty input gives 0.
    pub fn dual_norm(&self, x: ArrayView1<'_, f64>) -> f64 {
        match self {
            NormKind::LInf => x.iter().map(|v| v.abs()).sum(),
            NormKind::L1 => x.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())),
        }
    }
}

impl FromStr for NormKind {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "l1" => Ok(NormKind::L1),
            "inf" | "linf" | "max" => Ok(NormKind::LInf),
            _ => Err(PathError::InvalidOption {
                name: "norm",
                value: f64::NAN,
                reason: "expected one of \"1\", \"l1\", \"inf\", \"linf\", \"max\"",
            }),
        }
    }
}

impl fmt::Display for NormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormKind::L1 => write!(f, "l1"),
            NormKind::LInf => write!(f, "linf"),
        }
    }
}

/// PathOptions — tolerances and step budget of the homotopy loop.
///
/// Fields
/// ------
/// - `tie_tol`: `f64`
///   Relative tolerance: candidate steps within `tie_tol · max(1, |d|)` of
///   the minimum `d` are treated as the same knot.
/// - `zero_tol`: `f64`
///   Absolute tolerance used to decide that a coordinate is zero (sign
///   selection) or sits on the bound `t` (ℓ1 pinned set).
/// - `max_steps`: `Option<usize>`
///   Upper bound on the number of transitions. `None` uses
///   `50 · dg + 10`.
///
/// Notes
/// -----
/// - Construct through [`PathOptions::new`] to get validation; the
///   `Default` impl uses [`DEFAULT_TIE_TOL`], [`DEFAULT_ZERO_TOL`] and no
///   explicit step budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathOptions {
    pub tie_tol: f64,
    pub zero_tol: f64,
    pub max_steps: Option<usize>,
}

impl PathOptions {
    /// Construct validated path options.
    ///
    /// Errors
    /// ------
    /// - `PathError::InvalidOption`
    ///   Returned when `tie_tol` is not in `(0, 1)`, `zero_tol` is not in
    ///   `[0, 1)`, either is non-finite, or `max_steps == Some(0)`.
    ///
    /// Examples
    /// --------
    /// ```rust
    /// # use gmm_sensitivity::sensitivity::options::PathOptions;
    /// let opts = PathOptions::new(1e-9, 1e-12, Some(200)).unwrap();
    /// assert_eq!(opts.step_budget(3), 200);
    ///
    /// assert!(PathOptions::new(0.0, 1e-12, None).is_err());
    /// ```
    pub fn new(tie_tol: f64, zero_tol: f64, max_steps: Option<usize>) -> PathResult<Self> {
        if !tie_tol.is_finite() || tie_tol <= 0.0 || tie_tol >= 1.0 {
            return Err(PathError::InvalidOption {
                name: "tie_tol",
                value: tie_tol,
                reason: "must be finite and in (0, 1)",
            });
        }
        if !zero_tol.is_finite() || !(0.0..1.0).contains(&zero_tol) {
            return Err(PathError::InvalidOption {
                name: "zero_tol",
                value: zero_tol,
                reason: "must be finite and in [0, 1)",
            });
        }
        if max_steps == Some(0) {
            return Err(PathError::InvalidOption {
                name: "max_steps",
                value: 0.0,
                reason: "must be at least 1",
            });
        }

        Ok(PathOptions { tie_tol, zero_tol, max_steps })
    }

    /// Number of transitions allowed for a problem with `dg` moments.
    pub fn step_budget(&self, dg: usize) -> usize {
        self.max_steps.unwrap_or(50 * dg + 10)
    }
}

impl Default for PathOptions {
    fn default() -> Self {
        PathOptions { tie_tol: DEFAULT_TIE_TOL, zero_tol: DEFAULT_ZERO_TOL, max_steps: None }
    }
}
