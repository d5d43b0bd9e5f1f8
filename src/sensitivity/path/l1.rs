//! sensitivity::path::l1 — transition function for the one-norm ball.
//!
//! Purpose
//! -------
//! Trace the path of
//!
//! ```text
//! minimize ½ kᵗΣ̃k + lam·‖k_I‖∞   subject to   G̃ᵗk = −H
//! ```
//!
//! for `lam` from 0 upward, where `‖k_I‖∞` is the worst-case bias over
//! `{Bγ : ‖γ‖₁ ≤ 1}`.
//!
//! Key behaviors
//! -------------
//! - Let `t = ‖k_I‖∞`. Constrained coordinates with `|k_i| = t` are
//!   *pinned* at `σ_i t`; everything else is *free*. On a segment the
//!   problem is parametrized by `z = (k_free, t)` through `k = P z`, where
//!   `P` copies the free coordinates and maps `t` to `σ_i t` on pinned rows.
//!   The segment velocities are those of the max-norm system on
//!   `(PᵗΣ̃P, PᵗG̃)` with a single penalized coordinate `t` of sign +1.
//! - Knots: a free constrained coordinate reaches `±t` (join, becomes
//!   pinned), the dual weight `−σ_i a_i / lam` of a pinned coordinate
//!   reaches zero (leave, becomes free), or `t` reaches zero (floor).
//!
//! Invariants & assumptions
//! ------------------------
//! - `PathState::active` marks free coordinates; `PathState::signs` holds
//!   `σ_i` on pinned ones and zero elsewhere.
//! - Pinned coordinates are re-snapped to `σ_i t` at every knot, so `t` can
//!   be read off any pinned coordinate exactly.
//! - The path is terminal when nothing is pinned, when `t ≤ zero_tol`, or
//!   when fewer than `dk` free directions remain besides `t`.
use ndarray::{Array1, Array2};

use crate::{
    linalg::symmetrize,
    sensitivity::{
        errors::{PathError, PathResult},
        model::gls_solution,
        options::PathOptions,
        path::{
            state::{
                KnotEvent, PathState, Transition, min_entry, segment_direction, sign, tied_indices,
            },
            tracer::PathStepper,
        },
        transform::TransformedProblem,
    },
};

/// OneNormStep — stepper for the one-norm (ℓ1) misspecification ball.
#[derive(Debug, Clone, Copy)]
pub struct OneNormStep<'a> {
    problem: &'a TransformedProblem,
    options: &'a PathOptions,
}

impl<'a> OneNormStep<'a> {
    pub fn new(problem: &'a TransformedProblem, options: &'a PathOptions) -> Self {
        OneNormStep { problem, options }
    }

    /// Pinned coordinates: constrained and not free.
    fn pinned(&self, state: &PathState) -> Vec<usize> {
        (0..self.problem.dg()).filter(|&i| self.problem.constrained[i] && !state.active[i]).collect()
    }

    /// Current bound `t`, read off the pinned coordinates.
    pub(crate) fn bound(&self, state: &PathState) -> f64 {
        self.pinned(state).iter().fold(0.0_f64, |acc, &i| acc.max(state.k[i].abs()))
    }

    /// `dt/dlam` on the outgoing segment.
    fn bound_rate(&self, state: &PathState) -> f64 {
        match self.pinned(state).first() {
            Some(&i) => state.signs[i] * state.k_dot[i],
            None => 0.0,
        }
    }

    /// Build the state at a knot with bound `t`.
    ///
    /// Pinned coordinates are set to `σ_i t`; when `t ≤ zero_tol` every
    /// constrained coordinate is set to zero.
    pub(crate) fn at_knot(
        &self, lam: f64, mut k: Array1<f64>, mu: Array1<f64>, active: Vec<bool>,
        signs: Array1<f64>, joined: Vec<usize>, t: f64,
    ) -> PathResult<PathState> {
        let p = self.problem;
        let (dg, dk) = (p.dg(), p.dk());
        for i in 0..dg {
            if !p.constrained[i] {
                continue;
            }
            if t <= self.options.zero_tol {
                k[i] = 0.0;
            } else if !active[i] {
                k[i] = signs[i] * t;
            }
        }

        let mut state = PathState {
            lam,
            k,
            mu,
            active,
            joined,
            k_dot: Array1::zeros(dg),
            mu_dot: Array1::zeros(dk),
            signs,
        };
        if self.is_terminal(&state) {
            return Ok(state);
        }

        // Reduced parametrization k = P z with z = (k_free, t).
        let free: Vec<usize> = (0..dg).filter(|&i| state.active[i]).collect();
        let m = free.len() + 1;
        let mut proj = Array2::<f64>::zeros((dg, m));
        for (col, &i) in free.iter().enumerate() {
            proj[[i, col]] = 1.0;
        }
        for i in self.pinned(&state) {
            proj[[i, m - 1]] = state.signs[i];
        }

        let mut sigma_r = proj.t().dot(&p.sigma).dot(&proj);
        symmetrize(&mut sigma_r);
        let g_r = proj.t().dot(&p.g);
        let mut e = Array1::<f64>::zeros(m);
        e[m - 1] = 1.0;

        let (z_dot, mu_dot) = segment_direction(&sigma_r, &g_r, &e)?;
        state.k_dot = proj.dot(&z_dot);
        state.mu_dot = mu_dot;
        Ok(state)
    }
}

impl PathStepper for OneNormStep<'_> {
    /// `lam = 0`: the GLS solution. Constrained coordinates within the tie
    /// tolerance of `t = ‖k_I‖∞` start pinned. If `t` is already zero the
    /// state is terminal.
    fn initial(&self) -> PathResult<PathState> {
        let p = self.problem;
        let dg = p.dg();
        let (mu, k) = gls_solution(&p.sigma, &p.g, &p.h)?;
        let t = (0..dg).filter(|&i| p.constrained[i]).fold(0.0_f64, |acc, i| acc.max(k[i].abs()));

        let mut active = vec![true; dg];
        let mut signs = Array1::<f64>::zeros(dg);
        if t > self.options.zero_tol {
            let band = self.options.tie_tol * t.max(1.0);
            for i in 0..dg {
                if p.constrained[i] && t - k[i].abs() <= band {
                    active[i] = false;
                    signs[i] = sign(k[i]);
                }
            }
        }
        self.at_knot(0.0, k, mu, active, signs, Vec::new(), t)
    }

    fn is_terminal(&self, state: &PathState) -> bool {
        let n_pinned = self.pinned(state).len();
        n_pinned == 0
            || self.bound(state) <= self.options.zero_tol
            || state.n_active() < self.problem.dk()
    }

    fn step(&self, state: &PathState, knot: usize) -> PathResult<Transition> {
        let p = self.problem;
        let (zero_tol, tie_tol) = (self.options.zero_tol, self.options.tie_tol);
        let lam = state.lam;
        let t = self.bound(state);
        let t_dot = self.bound_rate(state);
        let a = p.dual_slack(&state.k, &state.mu);
        let a_dot = p.dual_slack(&state.k_dot, &state.mu_dot);

        let mut join = Array1::from_elem(p.dg(), f64::INFINITY);
        let mut join_sign = Array1::<f64>::zeros(p.dg());
        let mut leave = Array1::from_elem(p.dg(), f64::INFINITY);
        for i in 0..p.dg() {
            if !p.constrained[i] {
                continue;
            }
            if state.active[i] {
                let up = state.k_dot[i] - t_dot;
                if up > zero_tol {
                    join[i] = (t - state.k[i]) / up;
                    join_sign[i] = 1.0;
                }
                let down = state.k_dot[i] + t_dot;
                if down < -zero_tol {
                    let candidate = -(t + state.k[i]) / down;
                    if candidate < join[i] {
                        join[i] = candidate;
                        join_sign[i] = -1.0;
                    }
                }
            } else if !state.joined.contains(&i) && state.signs[i] * a_dot[i] > zero_tol {
                let ratio = -a[i] / a_dot[i];
                if ratio >= 0.0 {
                    leave[i] = ratio;
                }
            }
        }
        let floor = if t_dot < -zero_tol { -t / t_dot } else { f64::INFINITY };

        let (join_min, leave_min) = (min_entry(&join), min_entry(&leave));
        let d = join_min.min(leave_min).min(floor);
        if d < -tie_tol * lam.abs().max(1.0) {
            return Err(PathError::NegativeStep { step: d, lam, knot });
        }
        if !d.is_finite() {
            return Ok(Transition::Stationary);
        }
        let d = d.max(0.0);

        let k = &state.k + &(d * &state.k_dot);
        let mu = &state.mu + &(d * &state.mu_dot);
        let mut active = state.active.clone();
        let mut signs = state.signs.clone();
        let mut t_next = t + d * t_dot;

        let (event, joined) = if floor - d <= tie_tol * d.abs().max(1.0) {
            t_next = 0.0;
            (KnotEvent::Floor, Vec::new())
        } else if join_min < leave_min {
            let idx = tied_indices(&join, join_min, tie_tol);
            for &i in &idx {
                active[i] = false;
                signs[i] = join_sign[i];
            }
            (KnotEvent::Join(idx.clone()), idx)
        } else {
            let idx = tied_indices(&leave, leave_min, tie_tol);
            for &i in &idx {
                active[i] = true;
                signs[i] = 0.0;
            }
            (KnotEvent::Leave(idx), Vec::new())
        };

        let next = self.at_knot(lam + d, k, mu, active, signs, joined, t_next)?;
        Ok(Transition::Knot(next, event))
    }
}
