//! sensitivity::solve — entry points for computing a sensitivity path.
//!
//! Purpose
//! -------
//! Wire the pipeline together: validate the constraint basis, transform
//! coordinates, trace the path, and map the knots back. This is the
//! primary surface for Rust callers and the function the Python binding
//! forwards to.
//!
//! Key behaviors
//! -------------
//! - `r = 0` short-circuits to the closed-form efficient sensitivity.
//! - Every failure aborts the whole call; no partial path is returned.
use log::debug;
use ndarray::Array2;

use crate::sensitivity::{
    assemble::{SensitivityPath, assemble, closed_form_path},
    errors::PathResult,
    model::MomentModel,
    options::{NormKind, PathOptions},
    path::trace,
    transform::CoordinateTransform,
    validation::validate_basis,
};

/// solve_path — optimal-sensitivity path with default options.
///
/// Parameters
/// ----------
/// - `model`: `&MomentModel`
///   Validated `(G, Σ, H)`.
/// - `b`: `&Array2<f64>`
///   Misspecification directions, `dg × r` with `0 ≤ r ≤ dg` and full
///   column rank. The moment bias is `c = Bγ`.
/// - `norm`: `NormKind`
///   Ball for `γ`: `LInf` for `‖γ‖∞ ≤ δ`, `L1` for `‖γ‖₁ ≤ δ`.
///
/// Returns
/// -------
/// `PathResult<SensitivityPath>`
///   Knots with non-decreasing `lam`. Larger `lam` weights worst-case bias
///   more heavily: the first knot is the efficient (minimum-variance)
///   sensitivity, the last one the least-biased sensitivity reachable.
///
/// Errors
/// ------
/// - Basis validation errors (`DimensionMismatch`, `TooManyConstraints`,
///   `NonFinite`) and `RankDeficient` for dependent columns of `b`.
/// - `Singular` for a numerically singular active block.
/// - `NegativeStep` / `MaxStepsExceeded` if the homotopy breaks down.
///
/// Examples
/// --------
/// ```rust
/// # use gmm_sensitivity::sensitivity::{model::MomentModel, options::NormKind, solve::solve_path};
/// # use ndarray::{array, Array2};
/// let model = MomentModel::new(array![[1.0], [1.0], [1.0]], Array2::eye(3), array![1.0]).unwrap();
/// let b = array![[1.0], [0.0], [0.0]];
///
/// let path = solve_path(&model, &b, NormKind::LInf).unwrap();
/// assert_eq!(path.len(), 2);
/// assert!((path.lambdas()[1] - 0.5).abs() < 1e-12);
/// assert!(path.sensitivities()[[1, 0]].abs() < 1e-12);
/// ```
pub fn solve_path(model: &MomentModel, b: &Array2<f64>, norm: NormKind) -> PathResult<SensitivityPath> {
    solve_path_with(model, b, norm, &PathOptions::default())
}

/// solve_path_with — [`solve_path`] with explicit [`PathOptions`].
pub fn solve_path_with(
    model: &MomentModel, b: &Array2<f64>, norm: NormKind, options: &PathOptions,
) -> PathResult<SensitivityPath> {
    let dg = model.n_moments();
    validate_basis(b, dg)?;
    if b.ncols() == 0 {
        debug!("no constraint directions; returning the closed-form sensitivity");
        return Ok(closed_form_path(model, norm));
    }

    let transform = CoordinateTransform::new(b)?;
    let problem = transform.apply(model);
    debug!(
        "tracing {norm} path: dg = {dg}, dk = {}, r = {}",
        model.n_params(),
        transform.n_constrained()
    );
    let knots = trace(&problem, norm, options)?;
    Ok(assemble(&transform, model, norm, &knots))
}
