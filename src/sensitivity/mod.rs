//! sensitivity — optimal GMM sensitivity paths under misspecification.
//!
//! Purpose
//! -------
//! For a GMM model with moment Jacobian `G`, moment covariance `Σ` and
//! functional derivative `H`, a *sensitivity* `k` (with `Gᵗk = −H`) gives
//! the first-order effect `kᵗc` of a moment bias `c` on the estimated
//! functional. When `c = Bγ` with `γ` in a max-norm or one-norm ball of
//! radius `δ`, the worst-case bias is `δ·‖Bᵗk‖_dual`. This module traces
//! the exact path of sensitivities minimizing `½kᵗΣk + lam·‖Bᵗk‖_dual` for
//! all `lam ≥ 0`, from the efficient sensitivity (`lam = 0`) to the
//! least-biased one.
//!
//! Key behaviors
//! -------------
//! - [`model`]: the validated `(G, Σ, H)` triple and its closed form.
//! - [`transform`]: coordinates in which `Bᵗk` becomes a block of `k`.
//! - [`path`]: the active-set homotopy, one stepper per norm.
//! - [`assemble`]: the user-facing [`SensitivityPath`].
//! - [`solve`]: the [`solve_path`] / [`solve_path_with`] entry points.
//! - [`options`], [`validation`], [`errors`]: configuration, input guards
//!   and the error type.
//!
//! Invariants & assumptions
//! ------------------------
//! - Along the path `lam` is non-decreasing, `Gᵗk = −H` holds at every
//!   knot, the variance `kᵗΣk` is non-decreasing and the bias bound is
//!   non-increasing.
//! - All computations are single-threaded, allocate per call, and keep no
//!   global state; all public types are `Send + Sync`.
//!
//! Downstream usage
//! ----------------
//! - Build a [`MomentModel`], choose `B` and a [`NormKind`], call
//!   [`solve_path`], then read [`SensitivityPath::sensitivities`] or
//!   evaluate [`SensitivityPath::at`] at the `lam` of interest.

pub mod assemble;
pub mod errors;
pub mod model;
pub mod options;
pub mod path;
pub mod solve;
pub mod transform;
pub mod validation;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::assemble::{Knot, SensitivityPath};
pub use self::errors::{PathError, PathResult};
pub use self::model::MomentModel;
pub use self::options::{NormKind, PathOptions};
pub use self::path::KnotEvent;
pub use self::solve::{solve_path, solve_path_with};
pub use self::transform::{CoordinateTransform, TransformedProblem};

// ---- Optional convenience prelude for downstream crates -------------------
//
//     use gmm_sensitivity::sensitivity::prelude::*;

pub mod prelude {
    pub use super::assemble::SensitivityPath;
    pub use super::errors::{PathError, PathResult};
    pub use super::model::MomentModel;
    pub use super::options::{NormKind, PathOptions};
    pub use super::solve::{solve_path, solve_path_with};
}
