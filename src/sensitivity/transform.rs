//! sensitivity::transform — change of coordinates separating constrained
//! and unconstrained moment directions.
//!
//! Purpose
//! -------
//! Rewrite the sensitivity problem so that the misspecification directions
//! `col(B)` become coordinate axes. With `B⊥` an orthonormal basis of the
//! orthogonal complement of `col(B)`,
//!
//! ```text
//! T = [ B⊥ᵗ        ]   (dg − r rows, unconstrained)
//!     [ (BᵗB)⁻¹Bᵗ  ]   (r rows, constrained)
//! ```
//!
//! satisfies `T B = [0; I_r]`. For any sensitivity `k` in original
//! coordinates, `k = Tᵗk̃` and `Bᵗk = k̃_I`: the worst-case bias over
//! `c = Bγ` only involves the last `r` transformed coordinates.
//!
//! Key behaviors
//! -------------
//! - [`CoordinateTransform::new`] builds `T` and the constrained-row mask.
//! - [`CoordinateTransform::apply`] produces the [`TransformedProblem`]
//!   `(Σ̃, G̃, H)` with `Σ̃ = TΣTᵗ` (re-symmetrized) and `G̃ = TG`.
//! - [`CoordinateTransform::to_original`] / [`to_transformed`] map
//!   sensitivity vectors between the two coordinate systems.
//!
//! [`to_transformed`]: CoordinateTransform::to_transformed
//!
//! Invariants & assumptions
//! ------------------------
//! - `B` has been validated (`dg` rows, `r ≤ dg`, finite) and has full
//!   column rank; rank deficiency is reported by the QR step.
//! - `T` is invertible, so `Σ̃` is SPD whenever `Σ` is.
use ndarray::{Array1, Array2, ArrayView1, s};

use crate::{
    linalg::{crossprod, orthogonal_complement, solve_general, solve_spd, symmetrize},
    sensitivity::{errors::PathResult, model::MomentModel},
};

/// CoordinateTransform — the matrix `T` and its constrained-row mask.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateTransform {
    t: Array2<f64>,
    constrained: Vec<bool>,
}

impl CoordinateTransform {
    /// Build the transform for constraint basis `b` (dg × r).
    ///
    /// Errors
    /// ------
    /// - `PathError::RankDeficient { context: "B", column }` when a column of
    ///   `b` is a linear combination of earlier ones.
    /// - `PathError::DimensionMismatch` when `r > dg`.
    /// - `PathError::Singular { context: "B'B" }` if the Gram matrix of a
    ///   full-rank but extremely ill-conditioned `b` cannot be factorized.
    pub fn new(b: &Array2<f64>) -> PathResult<Self> {
        let (dg, r) = b.dim();
        let complement = orthogonal_complement(b)?;
        let gram = crossprod(b, b);
        let coef = solve_spd(&gram, &b.t().to_owned(), "B'B")?;

        let n_free = dg - r;
        let mut t = Array2::<f64>::zeros((dg, dg));
        t.slice_mut(s![..n_free, ..]).assign(&complement.t());
        t.slice_mut(s![n_free.., ..]).assign(&coef);

        let constrained = (0..dg).map(|i| i >= n_free).collect();
        Ok(CoordinateTransform { t, constrained })
    }

    /// The `dg × dg` transform matrix `T`.
    pub fn matrix(&self) -> &Array2<f64> {
        &self.t
    }

    /// Mask of constrained rows: `false` for the first `dg − r`, `true` for
    /// the last `r`.
    pub fn constrained(&self) -> &[bool] {
        &self.constrained
    }

    /// Number of constrained coordinates `r`.
    pub fn n_constrained(&self) -> usize {
        self.constrained.iter().filter(|c| **c).count()
    }

    /// Transform `(Σ, G, H)` of `model` into `(TΣTᵗ, TG, H)`.
    pub fn apply(&self, model: &MomentModel) -> TransformedProblem {
        let mut sigma = self.t.dot(model.sigma()).dot(&self.t.t());
        symmetrize(&mut sigma);
        let g = self.t.dot(model.g());
        TransformedProblem::from_parts(sigma, g, model.h().clone(), self.constrained.clone())
    }

    /// Map a transformed sensitivity back to original coordinates: `Tᵗk̃`.
    pub fn to_original(&self, k_t: ArrayView1<'_, f64>) -> Array1<f64> {
        self.t.t().dot(&k_t)
    }

    /// Map an original-coordinate sensitivity into transformed coordinates
    /// by solving `Tᵗx = k`.
    pub fn to_transformed(&self, k: &Array1<f64>) -> PathResult<Array1<f64>> {
        Ok(solve_general(&self.t.t().to_owned(), k, "T'")?)
    }
}

/// TransformedProblem — `(Σ̃, G̃, H)` plus the constrained-row mask.
///
/// This is the only input the path tracers see. The penalized coordinates
/// are exactly those with `constrained[i] == true`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedProblem {
    pub(crate) sigma: Array2<f64>,
    pub(crate) g: Array2<f64>,
    pub(crate) h: Array1<f64>,
    pub(crate) constrained: Vec<bool>,
}

impl TransformedProblem {
    pub(crate) fn from_parts(
        sigma: Array2<f64>, g: Array2<f64>, h: Array1<f64>, constrained: Vec<bool>,
    ) -> Self {
        TransformedProblem { sigma, g, h, constrained }
    }

    pub fn sigma(&self) -> &Array2<f64> {
        &self.sigma
    }

    pub fn g(&self) -> &Array2<f64> {
        &self.g
    }

    pub fn h(&self) -> &Array1<f64> {
        &self.h
    }

    pub fn constrained(&self) -> &[bool] {
        &self.constrained
    }

    /// Number of moments `dg`.
    pub fn dg(&self) -> usize {
        self.g.nrows()
    }

    /// Number of parameters `dk`.
    pub fn dk(&self) -> usize {
        self.g.ncols()
    }

    pub fn n_constrained(&self) -> usize {
        self.constrained.iter().filter(|c| **c).count()
    }

    pub fn n_unconstrained(&self) -> usize {
        self.dg() - self.n_constrained()
    }

    /// Dual slack `a = Σ̃k + G̃mu`.
    ///
    /// Stationarity of the Lagrangian reads `a + lam·s = 0` with `s` a
    /// subgradient of the penalty, so `a` is zero on free coordinates and
    /// bounded by `lam` in the dual norm on penalized ones. Applied to
    /// velocities `(k_dot, mu_dot)` it gives the slack's rate of change.
    pub fn dual_slack(&self, k: &Array1<f64>, mu: &Array1<f64>) -> Array1<f64> {
        self.sigma.dot(k) + self.g.dot(mu)
    }

    /// Violation of the moment condition `‖G̃ᵗk + H‖∞`.
    pub fn moment_residual(&self, k: &Array1<f64>) -> f64 {
        (self.g.t().dot(k) + &self.h).iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }
}
