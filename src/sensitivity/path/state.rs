//! sensitivity::path::state — per-knot state shared by both path variants.
//!
//! Purpose
//! -------
//! Define the immutable value recorded at every knot of the homotopy
//! ([`PathState`]), the outcome of one transition ([`Transition`],
//! [`KnotEvent`]), and the linear-algebra kernel both variants use to get
//! the segment velocities ([`segment_direction`]).
//!
//! Key behaviors
//! -------------
//! - A [`PathState`] carries the primal point `k`, the multipliers `mu`,
//!   the active mask, and the velocities `(k_dot, mu_dot)` valid on the
//!   segment that starts at this knot. States are never mutated after they
//!   are emitted; each transition builds a fresh one.
//! - [`segment_direction`] solves the differentiated KKT system on the
//!   active block.
//! - [`kkt_residual`] measures how far a state is from satisfying the
//!   optimality conditions of its variant.
//!
//! Conventions
//! -----------
//! - All vectors are in transformed coordinates.
//! - `active` has length `dg`. For the max-norm variant it marks the
//!   coordinates allowed to be nonzero; for the one-norm variant it marks
//!   the *free* coordinates, and the remaining constrained coordinates are
//!   pinned at `±t`.
//! - `signs` holds the penalty subgradient used on the segment: `sign(k_i)`
//!   on active constrained coordinates (max-norm) or the pin sign `σ_i`
//!   (one-norm), zero elsewhere.
use ndarray::{Array1, Array2};

use crate::{
    linalg::{crossprod, solve_spd, solve_spd_vec, symmetrize},
    sensitivity::{errors::PathResult, options::NormKind, transform::TransformedProblem},
};

/// PathState — one knot of the piecewise-linear solution path.
///
/// Fields
/// ------
/// - `lam`: path parameter at this knot (non-negative).
/// - `k`: sensitivity in transformed coordinates (length dg).
/// - `mu`: multipliers of `G̃ᵗk = −H` (length dk).
/// - `active`: active / free mask (length dg).
/// - `joined`: indices that joined at this knot; they cannot leave on the
///   next transition.
/// - `k_dot`, `mu_dot`: `dk/dlam`, `dmu/dlam` on the outgoing segment.
///   Both are zero on terminal states.
/// - `signs`: penalty subgradient on the outgoing segment.
#[derive(Debug, Clone, PartialEq)]
pub struct PathState {
    pub(crate) lam: f64,
    pub(crate) k: Array1<f64>,
    pub(crate) mu: Array1<f64>,
    pub(crate) active: Vec<bool>,
    pub(crate) joined: Vec<usize>,
    pub(crate) k_dot: Array1<f64>,
    pub(crate) mu_dot: Array1<f64>,
    pub(crate) signs: Array1<f64>,
}

impl PathState {
    pub fn lam(&self) -> f64 {
        self.lam
    }

    pub fn k(&self) -> &Array1<f64> {
        &self.k
    }

    pub fn mu(&self) -> &Array1<f64> {
        &self.mu
    }

    pub fn active(&self) -> &[bool] {
        &self.active
    }

    pub fn joined(&self) -> &[usize] {
        &self.joined
    }

    pub fn k_dot(&self) -> &Array1<f64> {
        &self.k_dot
    }

    pub fn mu_dot(&self) -> &Array1<f64> {
        &self.mu_dot
    }

    pub fn signs(&self) -> &Array1<f64> {
        &self.signs
    }

    /// Number of `true` entries in `active`.
    pub fn n_active(&self) -> usize {
        self.active.iter().filter(|a| **a).count()
    }
}

/// What happened at a knot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnotEvent {
    /// The `lam = 0` starting point.
    Start,
    /// These coordinates became active (max-norm) or pinned at `±t`
    /// (one-norm).
    Join(Vec<usize>),
    /// These coordinates left: snapped to zero (max-norm) or released from
    /// the bound (one-norm).
    Leave(Vec<usize>),
    /// The one-norm bound `t` reached zero.
    Floor,
}

/// Result of one call to a stepper's transition function.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// A finite next knot.
    Knot(PathState, KnotEvent),
    /// No candidate step is finite: the solution is constant in `lam` from
    /// the current knot on.
    Stationary,
}

/// A recorded knot together with the event that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct TracedKnot {
    pub state: PathState,
    pub event: KnotEvent,
}

/// segment_direction — velocities of the active block on one segment.
///
/// Parameters
/// ----------
/// - `sigma_aa`: `&Array2<f64>` — `Σ` restricted to the active block (SPD).
/// - `g_a`: `&Array2<f64>` — `G` restricted to the active rows.
/// - `s_a`: `&Array1<f64>` — penalty subgradient on the active block.
///
/// Returns
/// -------
/// `PathResult<(Array1<f64>, Array1<f64>)>`
///   `(k_dot_A, mu_dot)` solving
///   `Σ_AA k_dot_A + G_A mu_dot = −s_A` and `G_Aᵗ k_dot_A = 0`, i.e.
///   `(G_AᵗΣ_AA⁻¹G_A) mu_dot = −G_AᵗΣ_AA⁻¹s_A` and
///   `k_dot_A = Σ_AA⁻¹(−G_A mu_dot − s_A)`.
///
/// Errors
/// ------
/// - `PathError::Singular { context: "Sig_AA" }` when the active block of
///   `Σ` cannot be factorized.
/// - `PathError::Singular { context: "G_A'Sig_AA^-1G_A" }` when the active
///   rows of `G` do not have full column rank.
pub fn segment_direction(
    sigma_aa: &Array2<f64>, g_a: &Array2<f64>, s_a: &Array1<f64>,
) -> PathResult<(Array1<f64>, Array1<f64>)> {
    let sig_inv_g = solve_spd(sigma_aa, g_a, "Sig_AA")?;
    let sig_inv_s = solve_spd_vec(sigma_aa, s_a, "Sig_AA")?;

    let mut reduced = crossprod(g_a, &sig_inv_g);
    symmetrize(&mut reduced);
    let rhs = -g_a.t().dot(&sig_inv_s);
    let mu_dot = solve_spd_vec(&reduced, &rhs, "G_A'Sig_AA^-1G_A")?;

    let k_dot_a = -sig_inv_g.dot(&mu_dot) - &sig_inv_s;
    Ok((k_dot_a, mu_dot))
}

/// kkt_residual — largest violation of the optimality conditions at a knot.
///
/// Checks, in transformed coordinates and with `a = Σ̃k + G̃mu`:
/// - the moment condition `G̃ᵗk = −H`;
/// - stationarity `a_i = 0` on unpenalized and free coordinates;
/// - for `NormKind::LInf`: `a_i + lam·s_i = 0` on active constrained
///   coordinates, and `|a_i| ≤ lam`, `k_i = 0` on inactive ones;
/// - for `NormKind::L1`: `σ_i a_i ≤ 0` on pinned coordinates and
///   `Σ −σ_i a_i = lam` over the pinned set.
///
/// Returns the maximum absolute violation (0 for an exact solution).
pub fn kkt_residual(problem: &TransformedProblem, state: &PathState, norm: NormKind) -> f64 {
    let a = problem.dual_slack(&state.k, &state.mu);
    let lam = state.lam;
    let mut worst = problem.moment_residual(&state.k);
    let mut pinned_weight = 0.0;
    let mut any_pinned = false;

    for i in 0..problem.dg() {
        let violation = if !problem.constrained[i] {
            a[i].abs()
        } else {
            match norm {
                NormKind::LInf if state.active[i] => (a[i] + lam * state.signs[i]).abs(),
                NormKind::LInf => (a[i].abs() - lam).max(0.0).max(state.k[i].abs()),
                NormKind::L1 if state.active[i] => a[i].abs(),
                NormKind::L1 => {
                    any_pinned = true;
                    pinned_weight -= state.signs[i] * a[i];
                    (state.signs[i] * a[i]).max(0.0)
                }
            }
        };
        worst = worst.max(violation);
    }

    if any_pinned {
        worst = worst.max((pinned_weight - lam).abs());
    }
    worst
}

/// Sign with `sign(0) = 0`.
#[inline]
pub(crate) fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Smallest finite-or-infinite entry of `v` (∞ for an empty vector).
pub(crate) fn min_entry(v: &Array1<f64>) -> f64 {
    v.iter().copied().fold(f64::INFINITY, f64::min)
}

/// Indices whose entry lies within `tie_tol · max(1, |min|)` of `min`.
pub(crate) fn tied_indices(v: &Array1<f64>, min: f64, tie_tol: f64) -> Vec<usize> {
    let band = tie_tol * min.abs().max(1.0);
    v.iter().enumerate().filter(|(_, x)| **x - min <= band).map(|(i, _)| i).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - `segment_direction` on a small active block with a hand-computed
    //   answer, and its singular error path.
    // - `kkt_residual` on exact and perturbed states of both variants.
    // - The tie-grouping and sign helpers.
    // -------------------------------------------------------------------------

    fn problem() -> TransformedProblem {
        TransformedProblem::from_parts(
            Array2::eye(3),
            array![[1.0], [1.0], [1.0]],
            array![1.0],
            vec![false, false, true],
        )
    }

    #[test]
    // Purpose
    // -------
    // The velocities solve the differentiated KKT system.
    //
    // Given
    // -----
    // - Σ_AA = I₃, G_A = (1, 1, 1)ᵗ, s_A = (0, 0, −1).
    //
    // Expect
    // ------
    // - mu_dot = 1/3 and k_dot = (−1/3, −1/3, 2/3), so G_Aᵗk_dot = 0.
    fn segment_direction_matches_hand_computation() {
        // Arrange
        let sigma = Array2::<f64>::eye(3);
        let g = array![[1.0], [1.0], [1.0]];
        let s = array![0.0, 0.0, -1.0];

        // Act
        let (k_dot, mu_dot) = segment_direction(&sigma, &g, &s).unwrap();

        // Assert
        assert_abs_diff_eq!(mu_dot[0], 1.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(k_dot[0], -1.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(k_dot[1], -1.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(k_dot[2], 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // An active block with fewer rows than parameters has a singular
    // reduced system and is reported as such.
    fn segment_direction_reports_underdetermined_block() {
        // Arrange
        let sigma = Array2::<f64>::eye(1);
        let g = array![[1.0, 2.0]];
        let s = array![1.0];

        // Act
        let err = segment_direction(&sigma, &g, &s).unwrap_err();

        // Assert
        assert_eq!(
            err,
            crate::sensitivity::errors::PathError::Singular { context: "G_A'Sig_AA^-1G_A" }
        );
    }

    #[test]
    // Purpose
    // -------
    // A max-norm state on the exact path has zero residual; moving `k` off
    // the moment condition is detected.
    //
    // Given
    // -----
    // - lam = 0.25 on the path of min ½|k|² + lam|k₂| s.t. Σk = −1:
    //   k = (−5/12, −5/12, −1/6), mu = 5/12, all active, s = (0, 0, −1).
    //
    // Expect
    // ------
    // - Residual ≈ 0; after perturbing k₀ by 0.1 the residual is ≥ 0.1.
    fn kkt_residual_zero_on_path_and_detects_perturbation() {
        // Arrange
        let p = problem();
        let mut state = PathState {
            lam: 0.25,
            k: array![-5.0 / 12.0, -5.0 / 12.0, -1.0 / 6.0],
            mu: array![5.0 / 12.0],
            active: vec![true; 3],
            joined: vec![],
            k_dot: Array1::zeros(3),
            mu_dot: Array1::zeros(1),
            signs: array![0.0, 0.0, -1.0],
        };

        // Act
        let exact = kkt_residual(&p, &state, NormKind::LInf);
        state.k[0] += 0.1;
        let perturbed = kkt_residual(&p, &state, NormKind::LInf);

        // Assert
        assert_abs_diff_eq!(exact, 0.0, epsilon = 1e-12);
        assert!(perturbed >= 0.1 - 1e-12, "perturbed residual {perturbed}");
    }

    #[test]
    // Purpose
    // -------
    // For the one-norm variant the pinned weights must sum to lam.
    //
    // Given
    // -----
    // - The same point with coordinate 2 pinned (σ = −1) and lam = 0.25:
    //   a₂ = k₂ + mu = 0.25, so −σ₂a₂ = lam.
    //
    // Expect
    // ------
    // - Residual ≈ 0 at lam = 0.25 and ≈ 0.25 at lam = 0.5.
    fn kkt_residual_one_norm_checks_pinned_weight_sum() {
        // Arrange
        let p = problem();
        let mut state = PathState {
            lam: 0.25,
            k: array![-5.0 / 12.0, -5.0 / 12.0, -1.0 / 6.0],
            mu: array![5.0 / 12.0],
            active: vec![true, true, false],
            joined: vec![],
            k_dot: Array1::zeros(3),
            mu_dot: Array1::zeros(1),
            signs: array![0.0, 0.0, -1.0],
        };

        // Act
        let exact = kkt_residual(&p, &state, NormKind::L1);
        state.lam = 0.5;
        let wrong_lam = kkt_residual(&p, &state, NormKind::L1);

        // Assert
        assert_abs_diff_eq!(exact, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(wrong_lam, 0.25, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Helpers: `sign(0) = 0`, the minimum of an empty vector is ∞, and ties
    // are grouped relative to max(1, |min|).
    fn helpers_sign_min_and_ties() {
        let v = array![0.5, 0.5 + 1e-12, 0.7, f64::INFINITY];

        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-3.0), -1.0);
        assert_eq!(min_entry(&Array1::zeros(0)), f64::INFINITY);
        assert_eq!(min_entry(&v), 0.5);
        assert_eq!(tied_indices(&v, 0.5, 1e-10), vec![0, 1]);
    }
}
