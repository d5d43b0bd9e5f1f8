//! sensitivity::assemble — the sensitivity path in original coordinates.
//!
//! Purpose
//! -------
//! Turn the knots recorded by the tracer into the user-facing
//! [`SensitivityPath`]: sensitivities mapped back to the original moment
//! space, the path parameters, the active masks, and per-knot summaries
//! (variance and worst-case bias).
//!
//! Key behaviors
//! -------------
//! - [`assemble`] maps every knot through `k = Tᵗk̃`.
//! - [`closed_form_path`] builds the single-knot path used when there are
//!   no constraint directions (`r = 0`).
//! - [`SensitivityPath::at`] evaluates the path at any `lam ≥ 0` by linear
//!   interpolation between the bracketing knots, which is exact because the
//!   solution is linear in `lam` on each segment.
//!
//! Invariants & assumptions
//! ------------------------
//! - Knots are stored in emission order with non-decreasing `lam`; the
//!   first knot has `lam = 0`.
//! - `variance(i) = kᵗΣk` is non-decreasing and `bias_bound(i)` is
//!   non-increasing along the path (the path trades variance for bias).
//!
//! Testing notes
//! -------------
//! - Unit tests build paths from small problems and check accessors,
//!   interpolation and summaries against hand-computed values.
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, s};

use crate::sensitivity::{
    errors::{PathError, PathResult},
    model::MomentModel,
    options::NormKind,
    path::{KnotEvent, TracedKnot},
    transform::CoordinateTransform,
};

/// SensitivityPath — knots of the optimal-sensitivity path.
///
/// Fields
/// ------
/// - `norm`: ball the path was traced for.
/// - `lambdas`: path parameter per knot (length n).
/// - `sensitivities`: `n × dg` matrix; row `i` is `k` at knot `i` in
///   original coordinates.
/// - `active`: active (max-norm) or free (one-norm) mask per knot, in
///   transformed coordinates.
/// - `events`: what happened at each knot.
/// - `variances`, `bias_bounds`: `kᵗΣk` and the worst-case bias
///   `‖Bᵗk‖_dual` per knot.
#[derive(Debug, Clone, PartialEq)]
pub struct SensitivityPath {
    norm: NormKind,
    lambdas: Array1<f64>,
    sensitivities: Array2<f64>,
    active: Vec<Vec<bool>>,
    events: Vec<KnotEvent>,
    variances: Array1<f64>,
    bias_bounds: Array1<f64>,
}

/// Knot — borrowed view of one row of a [`SensitivityPath`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Knot<'a> {
    pub lam: f64,
    pub k: ArrayView1<'a, f64>,
    pub active: &'a [bool],
    pub event: &'a KnotEvent,
    pub variance: f64,
    pub bias_bound: f64,
}

impl SensitivityPath {
    pub fn norm(&self) -> NormKind {
        self.norm
    }

    /// Number of knots.
    pub fn len(&self) -> usize {
        self.lambdas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lambdas.is_empty()
    }

    pub fn lambdas(&self) -> ArrayView1<'_, f64> {
        self.lambdas.view()
    }

    /// `n × dg` matrix of sensitivities, one row per knot.
    pub fn sensitivities(&self) -> ArrayView2<'_, f64> {
        self.sensitivities.view()
    }

    pub fn active_masks(&self) -> &[Vec<bool>] {
        &self.active
    }

    pub fn events(&self) -> &[KnotEvent] {
        &self.events
    }

    pub fn variances(&self) -> ArrayView1<'_, f64> {
        self.variances.view()
    }

    pub fn bias_bounds(&self) -> ArrayView1<'_, f64> {
        self.bias_bounds.view()
    }

    /// Knot `i`, or `None` past the end.
    pub fn knot(&self, i: usize) -> Option<Knot<'_>> {
        if i >= self.len() {
            return None;
        }
        Some(Knot {
            lam: self.lambdas[i],
            k: self.sensitivities.row(i),
            active: &self.active[i],
            event: &self.events[i],
            variance: self.variances[i],
            bias_bound: self.bias_bounds[i],
        })
    }

    /// Asymptotic variance `kᵗΣk` at knot `i`.
    pub fn variance(&self, i: usize) -> Option<f64> {
        self.variances.get(i).copied()
    }

    /// Worst-case bias per unit radius at knot `i`: `‖Bᵗk‖₁` for the
    /// max-norm ball, `‖Bᵗk‖∞` for the one-norm ball.
    pub fn bias_bound(&self, i: usize) -> Option<f64> {
        self.bias_bounds.get(i).copied()
    }

    /// at — the optimal sensitivity at an arbitrary `lam`.
    ///
    /// Parameters
    /// ----------
    /// - `lam`: `f64`
    ///   Path parameter, finite and `≥ 0`. Values beyond the last knot
    ///   return the terminal sensitivity.
    ///
    /// Returns
    /// -------
    /// `PathResult<Array1<f64>>`
    ///   `k(lam)` in original coordinates.
    ///
    /// Errors
    /// ------
    /// - `PathError::InvalidOption { name: "lam", .. }` for negative or
    ///   non-finite `lam`.
    pub fn at(&self, lam: f64) -> PathResult<Array1<f64>> {
        if !lam.is_finite() || lam < 0.0 {
            return Err(PathError::InvalidOption {
                name: "lam",
                value: lam,
                reason: "must be finite and non-negative",
            });
        }

        // First knot strictly past `lam`; the one before it is the last knot
        // with lambda <= lam.
        match self.lambdas.iter().position(|&l| l > lam) {
            None => Ok(self.sensitivities.row(self.len() - 1).to_owned()),
            Some(0) => Ok(self.sensitivities.row(0).to_owned()),
            Some(j) => {
                let (lo, hi) = (self.lambdas[j - 1], self.lambdas[j]);
                let w = (lam - lo) / (hi - lo);
                let left = self.sensitivities.row(j - 1);
                let right = self.sensitivities.row(j);
                Ok(&left * (1.0 - w) + &right * w)
            }
        }
    }
}

/// assemble — map traced knots back to original coordinates.
///
/// The bias bound at each knot is the dual norm of the constrained
/// transformed coordinates `k̃_I`, which equal `Bᵗk`.
pub fn assemble(
    transform: &CoordinateTransform, model: &MomentModel, norm: NormKind, knots: &[TracedKnot],
) -> SensitivityPath {
    let n = knots.len();
    let dg = model.n_moments();
    let n_free = dg - transform.n_constrained();

    let mut lambdas = Array1::<f64>::zeros(n);
    let mut sensitivities = Array2::<f64>::zeros((n, dg));
    let mut variances = Array1::<f64>::zeros(n);
    let mut bias_bounds = Array1::<f64>::zeros(n);
    let mut active = Vec::with_capacity(n);
    let mut events = Vec::with_capacity(n);

    for (i, knot) in knots.iter().enumerate() {
        let k = transform.to_original(knot.state.k.view());
        lambdas[i] = knot.state.lam;
        variances[i] = model.variance(k.view());
        bias_bounds[i] = norm.dual_norm(knot.state.k.slice(s![n_free..]));
        sensitivities.row_mut(i).assign(&k);
        active.push(knot.state.active.clone());
        events.push(knot.event.clone());
    }

    SensitivityPath { norm, lambdas, sensitivities, active, events, variances, bias_bounds }
}

/// closed_form_path — the single-knot path when `B` has no columns.
///
/// With no misspecification directions the efficient sensitivity has zero
/// bias for every `lam`, so the path is the closed form at `lam = 0` with
/// every coordinate active.
pub fn closed_form_path(model: &MomentModel, norm: NormKind) -> SensitivityPath {
    let k = model.unconstrained_sensitivity();
    let dg = model.n_moments();
    let mut sensitivities = Array2::<f64>::zeros((1, dg));
    sensitivities.row_mut(0).assign(k);

    SensitivityPath {
        norm,
        lambdas: Array1::zeros(1),
        sensitivities,
        active: vec![vec![true; dg]],
        events: vec![KnotEvent::Start],
        variances: Array1::from_elem(1, model.variance(k.view())),
        bias_bounds: Array1::zeros(1),
    }
}
