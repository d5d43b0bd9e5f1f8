//! sensitivity::path — active-set homotopy for the penalized sensitivity
//! problem.
//!
//! Purpose
//! -------
//! Compute the exact piecewise-linear solution path of
//! `minimize ½kᵗΣ̃k + lam·pen(k_I) s.t. G̃ᵗk = −H` over `lam ≥ 0`, with
//! `pen = ‖·‖₁` (max-norm ball) or `pen = ‖·‖∞` (one-norm ball).
//!
//! Key behaviors
//! -------------
//! - [`state`]: the immutable per-knot value, transition outcomes, the
//!   shared direction solver and the KKT diagnostic.
//! - [`linf`] / [`l1`]: the two transition functions.
//! - [`tracer`]: the [`PathStepper`] trait and the loop that drives it.
//!
//! Conventions
//! -----------
//! - Everything here works in transformed coordinates; mapping back to the
//!   original moment space happens in [`crate::sensitivity::assemble`].
//! - Ties: candidate steps within `tie_tol · max(1, |d|)` of the smallest
//!   step `d` are processed at the same knot. A join beats a leave only if
//!   its step is strictly smaller.

pub mod l1;
pub mod linf;
pub mod state;
pub mod tracer;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::l1::OneNormStep;
pub use self::linf::MaxNormStep;
pub use self::state::{KnotEvent, PathState, TracedKnot, Transition, kkt_residual, segment_direction};
pub use self::tracer::{PathStepper, trace};
