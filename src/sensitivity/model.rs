//! sensitivity::model — the GMM moment model the path is computed for.
//!
//! Purpose
//! -------
//! Bundle the three first-order objects that determine local sensitivity of
//! a GMM estimator: the moment Jacobian `G` (dg × dk), the moment covariance
//! `Sig` (dg × dg) and the derivative `H` (length dk) of the scalar
//! functional of interest. The struct is validated once at construction
//! and read-only afterwards.
//!
//! Key behaviors
//! -------------
//! - [`MomentModel::new`] validates shapes and finiteness, then checks that
//!   `Sig` and the information matrix `GᵗSig⁻¹G` are positive definite.
//! - [`MomentModel::unconstrained_sensitivity`] returns the efficient GMM
//!   sensitivity `kᵗ = −Hᵗ(GᵗSig⁻¹G)⁻¹GᵗSig⁻¹`, computed at construction.
//!
//! Invariants & assumptions
//! ------------------------
//! - `dg ≥ dk ≥ 1`; `Sig` symmetric positive definite; `G` full column
//!   rank in the `Sig⁻¹` metric.
//! - Every sensitivity `k` produced for this model satisfies `Gᵗk = −H`.
//!
//! Downstream usage
//! ----------------
//! - Pass a `&MomentModel` to [`crate::sensitivity::solve::solve_path`]
//!   together with a constraint basis `B`.
use ndarray::{Array1, Array2, ArrayView1};

use crate::{
    linalg::{crossprod, solve_spd, solve_spd_vec, symmetrize},
    sensitivity::{errors::PathResult, validation::validate_model_parts},
};

/// MomentModel — validated `(G, Sig, H)` triple.
///
/// Fields
/// ------
/// - `g`: `Array2<f64>` — moment Jacobian, `dg × dk`.
/// - `sigma`: `Array2<f64>` — moment covariance, `dg × dg`, SPD.
/// - `h`: `Array1<f64>` — functional derivative, length `dk`.
/// - `unconstrained`: `Array1<f64>` — cached efficient sensitivity.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentModel {
    g: Array2<f64>,
    sigma: Array2<f64>,
    h: Array1<f64>,
    unconstrained: Array1<f64>,
}

impl MomentModel {
    /// Construct a validated moment model.
    ///
    /// Parameters
    /// ----------
    /// - `g`: `Array2<f64>`
    ///   Moment Jacobian, `dg × dk`, `dg ≥ dk ≥ 1`.
    /// - `sigma`: `Array2<f64>`
    ///   Symmetric positive-definite moment covariance, `dg × dg`.
    /// - `h`: `Array1<f64>`
    ///   Derivative of the functional of interest, length `dk`.
    ///
    /// Returns
    /// -------
    /// `PathResult<MomentModel>`
    ///
    /// Errors
    /// ------
    /// - Any error of
    ///   [`validate_model_parts`](crate::sensitivity::validation::validate_model_parts).
    /// - `PathError::Singular { context: "Sig" }` when `Sig` is not
    ///   (numerically) positive definite.
    /// - `PathError::Singular { context: "G'Sig^-1G" }` when `G` is rank
    ///   deficient.
    ///
    /// Examples
    /// --------
    /// ```rust
    /// # use gmm_sensitivity::sensitivity::model::MomentModel;
    /// # use ndarray::{array, Array2};
    /// let model = MomentModel::new(array![[1.0], [1.0]], Array2::eye(2), array![1.0]).unwrap();
    /// let k = model.unconstrained_sensitivity();
    /// assert!((k[0] + 0.5).abs() < 1e-12 && (k[1] + 0.5).abs() < 1e-12);
    /// ```
    pub fn new(g: Array2<f64>, sigma: Array2<f64>, h: Array1<f64>) -> PathResult<Self> {
        validate_model_parts(&g, &sigma, &h)?;
        let (_, unconstrained) = gls_solution(&sigma, &g, &h)?;
        Ok(MomentModel { g, sigma, h, unconstrained })
    }

    pub fn g(&self) -> &Array2<f64> {
        &self.g
    }

    pub fn sigma(&self) -> &Array2<f64> {
        &self.sigma
    }

    pub fn h(&self) -> &Array1<f64> {
        &self.h
    }

    /// Number of moments `dg`.
    pub fn n_moments(&self) -> usize {
        self.g.nrows()
    }

    /// Number of parameters `dk`.
    pub fn n_params(&self) -> usize {
        self.g.ncols()
    }

    /// Efficient (unconstrained) sensitivity `−Sig⁻¹G(GᵗSig⁻¹G)⁻¹H`.
    pub fn unconstrained_sensitivity(&self) -> &Array1<f64> {
        &self.unconstrained
    }

    /// Asymptotic variance `kᵗ Sig k` of the estimator with sensitivity `k`.
    pub fn variance(&self, k: ArrayView1<'_, f64>) -> f64 {
        k.dot(&self.sigma.dot(&k))
    }
}

/// Solve the equality-constrained quadratic program at `lam = 0`.
///
/// Returns `(mu, k)` with `(GᵗSig⁻¹G) mu = H` and `k = −Sig⁻¹G mu`, the
/// minimizer of `½kᵗSig k` subject to `Gᵗk = −H` and its multiplier.
pub(crate) fn gls_solution(
    sigma: &Array2<f64>, g: &Array2<f64>, h: &Array1<f64>,
) -> PathResult<(Array1<f64>, Array1<f64>)> {
    let sig_inv_g = solve_spd(sigma, g, "Sig")?;
    let mut info = crossprod(g, &sig_inv_g);
    symmetrize(&mut info);
    let mu = solve_spd_vec(&info, h, "G'Sig^-1G")?;
    let k = -sig_inv_g.dot(&mu);
    Ok((mu, k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensitivity::errors::PathError;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The closed-form efficient sensitivity on small models, including
    //   the moment condition `Gᵗk = −H`.
    // - Construction errors that need a factorization (singular `Sig`,
    //   rank-deficient `G`) and propagation of validation errors.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // With `G = 1`, `Sig = I₃`, `H = 1` the efficient sensitivity spreads
    // evenly over the three moments.
    //
    // Given
    // -----
    // - dg = 3, dk = 1, G = (1, 1, 1)ᵗ, Sig = I₃, H = 1.
    //
    // Expect
    // ------
    // - k = −(1, 1, 1)/3 and variance kᵗSig k = 1/3.
    fn unconstrained_sensitivity_equal_weights_for_identity_covariance() {
        // Arrange
        let model = MomentModel::new(array![[1.0], [1.0], [1.0]], Array2::eye(3), array![1.0]).unwrap();

        // Act
        let k = model.unconstrained_sensitivity();

        // Assert
        for &v in k.iter() {
            assert_abs_diff_eq!(v, -1.0 / 3.0, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(model.variance(k.view()), 1.0 / 3.0, epsilon = 1e-12);
        assert_eq!((model.n_moments(), model.n_params()), (3, 1));
    }

    #[test]
    // Purpose
    // -------
    // The closed form satisfies the moment condition for a two-parameter
    // model with correlated moments.
    //
    // Given
    // -----
    // - G 3×2, tridiagonal Sig with off-diagonal 0.3, H = (1, -2).
    //
    // Expect
    // ------
    // - Gᵗk = −H to round-off.
    fn unconstrained_sensitivity_satisfies_moment_condition() {
        // Arrange
        let g = array![[1.0, 0.0], [0.5, 1.0], [0.0, 2.0]];
        let sigma = array![[1.0, 0.3, 0.0], [0.3, 1.0, 0.3], [0.0, 0.3, 1.0]];
        let h = array![1.0, -2.0];

        // Act
        let model = MomentModel::new(g.clone(), sigma, h.clone()).unwrap();
        let gk = g.t().dot(model.unconstrained_sensitivity());

        // Assert
        for j in 0..2 {
            assert_abs_diff_eq!(gk[j], -h[j], epsilon = 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // Factorization failures are attributed to the right matrix.
    //
    // Given
    // -----
    // - A zero covariance; then `Sig = I₃` with two identical columns in G.
    //
    // Expect
    // ------
    // - `Singular { "Sig" }`, then `Singular { "G'Sig^-1G" }`.
    fn new_reports_singular_covariance_and_rank_deficient_jacobian() {
        // Arrange
        let g = array![[1.0], [1.0], [1.0]];
        let collinear = array![[1.0, 1.0], [2.0, 2.0], [0.5, 0.5]];

        // Act
        let e1 = MomentModel::new(g, Array2::zeros((3, 3)), array![1.0]).unwrap_err();
        let e2 = MomentModel::new(collinear, Array2::eye(3), array![1.0, 0.0]).unwrap_err();

        // Assert
        assert_eq!(e1, PathError::Singular { context: "Sig" });
        assert_eq!(e2, PathError::Singular { context: "G'Sig^-1G" });
    }

    #[test]
    // Purpose
    // -------
    // Validation errors surface unchanged through the constructor.
    fn new_propagates_validation_errors() {
        let wide = MomentModel::new(Array2::ones((1, 2)), Array2::eye(1), array![1.0, 1.0]);
        let short_h = MomentModel::new(Array2::ones((3, 1)), Array2::eye(3), array![1.0, 1.0]);
        let nan_sigma = MomentModel::new(
            Array2::ones((2, 1)),
            array![[1.0, f64::NAN], [f64::NAN, 1.0]],
            array![1.0],
        );
        let asym = MomentModel::new(Array2::ones((2, 1)), array![[1.0, 0.5], [0.0, 1.0]], array![1.0]);

        assert_eq!(wide.unwrap_err(), PathError::Underidentified { dg: 1, dk: 2 });
        assert!(matches!(short_h.unwrap_err(), PathError::DimensionMismatch { what: "H", .. }));
        assert!(matches!(nan_sigma.unwrap_err(), PathError::NonFinite { what: "Sig", row: 0, col: 1, .. }));
        assert_eq!(asym.unwrap_err(), PathError::NotSymmetric { row: 0, col: 1 });
    }
}
