//! sensitivity::path::linf — transition function for the max-norm ball.
//!
//! Purpose
//! -------
//! Trace the path of
//!
//! ```text
//! minimize ½ kᵗΣ̃k + lam·‖k_I‖₁   subject to   G̃ᵗk = −H
//! ```
//!
//! for `lam` from 0 upward. `‖·‖₁` is the dual of the max-norm ball on `γ`,
//! so `‖k_I‖₁` is the worst-case bias of the estimator over
//! `{Bγ : ‖γ‖∞ ≤ 1}`.
//!
//! Key behaviors
//! -------------
//! - Between knots the active set `A` is fixed and `(k, mu)` move linearly
//!   with velocities from
//!   [`segment_direction`](super::state::segment_direction) applied to
//!   `(Σ̃_AA, G̃_A, s_A)`.
//! - A knot occurs when an active constrained coordinate reaches zero
//!   (leave) or the dual slack `a = Σ̃k + G̃mu` of an inactive coordinate
//!   reaches `±lam` (join).
//! - The path is terminal once `|A| ≤ max(dg − r, dk)`: no constrained
//!   coordinate can be dropped without losing feasibility.
//!
//! Invariants & assumptions
//! ------------------------
//! - Inactive coordinates are constrained and exactly zero.
//! - `|a_i| ≤ lam` on inactive coordinates; `a_i = −lam·sign(k_i)` on
//!   active constrained ones; `a_i = 0` on unconstrained ones.
use ndarray::{Array1, Axis};

use crate::{
    linalg::{mask_indices, submatrix},
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

/// MaxNormStep — stepper for the max-norm (ℓ∞) misspecification ball.
#[derive(Debug, Clone, Copy)]
pub struct MaxNormStep<'a> {
    problem: &'a TransformedProblem,
    options: &'a PathOptions,
}

impl<'a> MaxNormStep<'a> {
    pub fn new(problem: &'a TransformedProblem, options: &'a PathOptions) -> Self {
        MaxNormStep { problem, options }
    }

    /// Build the state at a knot: signs for the outgoing segment and, unless
    /// the state is terminal, its velocities.
    ///
    /// Active constrained coordinates with `|k_i| ≤ zero_tol` have just
    /// joined; their sign is read off the dual slack (`−sign(a_i)`), since
    /// `k_i` will move away from zero in the direction opposite to `a_i`.
    pub(crate) fn at_knot(
        &self, lam: f64, k: Array1<f64>, mu: Array1<f64>, active: Vec<bool>, joined: Vec<usize>,
    ) -> PathResult<PathState> {
        let p = self.problem;
        let (dg, dk) = (p.dg(), p.dk());
        let a = p.dual_slack(&k, &mu);

        let mut signs = Array1::<f64>::zeros(dg);
        for i in 0..dg {
            if active[i] && p.constrained[i] {
                signs[i] =
                    if k[i].abs() > self.options.zero_tol { sign(k[i]) } else { -sign(a[i]) };
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

        let idx = mask_indices(&state.active);
        let sigma_aa = submatrix(&p.sigma, &idx, &idx);
        let g_a = p.g.select(Axis(0), &idx);
        let s_a = state.signs.select(Axis(0), &idx);
        let (k_dot_a, mu_dot) = segment_direction(&sigma_aa, &g_a, &s_a)?;
        for (pos, &i) in idx.iter().enumerate() {
            state.k_dot[i] = k_dot_a[pos];
        }
        state.mu_dot = mu_dot;
        Ok(state)
    }
}

impl PathStepper for MaxNormStep<'_> {
    /// `lam = 0`: the GLS solution, with every coordinate active except
    /// constrained coordinates that are already zero.
    fn initial(&self) -> PathResult<PathState> {
        let p = self.problem;
        let (mu, k) = gls_solution(&p.sigma, &p.g, &p.h)?;
        let active =
            (0..p.dg()).map(|i| !(p.constrained[i] && k[i].abs() <= self.options.zero_tol)).collect();
        self.at_knot(0.0, k, mu, active, Vec::new())
    }

    fn is_terminal(&self, state: &PathState) -> bool {
        state.n_active() <= self.problem.n_unconstrained().max(self.problem.dk())
    }

    fn step(&self, state: &PathState, knot: usize) -> PathResult<Transition> {
        let p = self.problem;
        let zero_tol = self.options.zero_tol;
        let lam = state.lam;
        let a = p.dual_slack(&state.k, &state.mu);
        let a_dot = p.dual_slack(&state.k_dot, &state.mu_dot);

        let mut leave = Array1::from_elem(p.dg(), f64::INFINITY);
        let mut join = Array1::from_elem(p.dg(), f64::INFINITY);
        for i in 0..p.dg() {
            if state.active[i] {
                if p.constrained[i]
                    && !state.joined.contains(&i)
                    && state.k_dot[i].abs() > zero_tol
                {
                    let ratio = -state.k[i] / state.k_dot[i];
                    if ratio.is_finite() && ratio >= 0.0 {
                        leave[i] = ratio;
                    }
                }
            } else if a_dot[i] > 1.0 + zero_tol {
                join[i] = (lam - a[i]) / (a_dot[i] - 1.0);
            } else if a_dot[i] < -1.0 - zero_tol {
                join[i] = (-lam - a[i]) / (a_dot[i] + 1.0);
            }
        }

        let (leave_min, join_min) = (min_entry(&leave), min_entry(&join));
        let d = leave_min.min(join_min);
        if d < -self.options.tie_tol * lam.abs().max(1.0) {
            return Err(PathError::NegativeStep { step: d, lam, knot });
        }
        if !d.is_finite() {
            return Ok(Transition::Stationary);
        }
        let d = d.max(0.0);

        let mut k = &state.k + &(d * &state.k_dot);
        let mu = &state.mu + &(d * &state.mu_dot);
        let mut active = state.active.clone();

        let (event, joined) = if join_min < leave_min {
            let idx = tied_indices(&join, join_min, self.options.tie_tol);
            for &i in &idx {
                active[i] = true;
            }
            (KnotEvent::Join(idx.clone()), idx)
        } else {
            let idx = tied_indices(&leave, leave_min, self.options.tie_tol);
            for &i in &idx {
                active[i] = false;
                k[i] = 0.0;
            }
            (KnotEvent::Leave(idx), Vec::new())
        };

        let next = self.at_knot(lam + d, k, mu, active, joined)?;
        Ok(Transition::Knot(next, event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensitivity::path::state::kkt_residual;
    use crate::sensitivity::options::NormKind;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The initial state and its segment velocities.
    // - A leave transition, a simultaneous (tied) leave, a join transition,
    //   and the terminal rule.
    // - The negative-step guard on a state with an infeasible dual slack.
    // - The stationary outcome when no candidate step is finite.
    //
    // Problems are written directly in transformed coordinates.
    // -------------------------------------------------------------------------

    fn equal_weights(constrained: Vec<bool>) -> TransformedProblem {
        TransformedProblem::from_parts(
            Array2::eye(3),
            array![[1.0], [1.0], [1.0]],
            array![1.0],
            constrained,
        )
    }

    #[test]
    // Purpose
    // -------
    // One constrained coordinate: it leaves at lam = 1/2 and the path is then
    // terminal.
    //
    // Given
    // -----
    // - Σ̃ = I₃, G̃ = 1, H = 1, only coordinate 2 constrained.
    //
    // Expect
    // ------
    // - Initial k = −(1,1,1)/3 with k_dot = (−1/3, −1/3, 2/3).
    // - One Leave([2]) knot at lam = 0.5 with k = (−1/2, −1/2, 0).
    fn single_constraint_leaves_at_half() {
        // Arrange
        let p = equal_weights(vec![false, false, true]);
        let opts = PathOptions::default();
        let stepper = MaxNormStep::new(&p, &opts);

        // Act
        let s0 = stepper.initial().unwrap();
        let t1 = stepper.step(&s0, 1).unwrap();

        // Assert
        assert_abs_diff_eq!(s0.k[0], -1.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s0.k_dot[2], 2.0 / 3.0, epsilon = 1e-12);
        assert!(!stepper.is_terminal(&s0));
        match t1 {
            Transition::Knot(s1, KnotEvent::Leave(idx)) => {
                assert_eq!(idx, vec![2]);
                assert_abs_diff_eq!(s1.lam, 0.5, epsilon = 1e-12);
                assert_abs_diff_eq!(s1.k[0], -0.5, epsilon = 1e-12);
                assert_eq!(s1.k[2], 0.0);
                assert!(stepper.is_terminal(&s1));
                assert_eq!(s1.k_dot, Array1::<f64>::zeros(3));
                assert!(kkt_residual(&p, &s1, NormKind::LInf) < 1e-12);
            }
            other => panic!("expected a leave knot, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Two constrained coordinates hitting zero at the same lam leave
    // together.
    //
    // Given
    // -----
    // - Σ̃ = I₃, G̃ = 1, H = 1, coordinates 1 and 2 constrained.
    //
    // Expect
    // ------
    // - Leave([1, 2]) at lam = 1 with k = (−1, 0, 0).
    fn symmetric_constraints_leave_simultaneously() {
        // Arrange
        let p = equal_weights(vec![false, true, true]);
        let opts = PathOptions::default();
        let stepper = MaxNormStep::new(&p, &opts);

        // Act
        let s0 = stepper.initial().unwrap();
        let t1 = stepper.step(&s0, 1).unwrap();

        // Assert
        match t1 {
            Transition::Knot(s1, KnotEvent::Leave(idx)) => {
                assert_eq!(idx, vec![1, 2]);
                assert_abs_diff_eq!(s1.lam, 1.0, epsilon = 1e-12);
                assert_abs_diff_eq!(s1.k[0], -1.0, epsilon = 1e-12);
                assert!(stepper.is_terminal(&s1));
            }
            other => panic!("expected a tied leave knot, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // A coordinate that left can rejoin: its slack reaches the bound, it
    // re-enters with the sign read off the slack, and it is protected from
    // leaving on the next transition.
    //
    // Given
    // -----
    // - Σ̃ = I₄ except Σ̃₁₂ = 0.6, Σ̃₁₃ = −0.6; G̃ = (1, 1, 1, 0.5)ᵗ, H = 1;
    //   coordinates 1, 2, 3 constrained.
    //
    // Expect
    // ------
    // - Events Leave([2]) at 7/285, Join([2]) at 7/36, Leave([3]) at 7/16,
    //   Leave([1, 2]) at 1, then terminal with k = (−1, 0, 0, 0).
    // - At the join, k = (−4/9, −5/12, 0, −5/18), `joined == [2]` and the
    //   new sign of coordinate 2 is −1.
    fn left_coordinate_rejoins_with_sign_from_slack() {
        // Arrange
        let sigma = array![
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.6, -0.6],
            [0.0, 0.6, 1.0, 0.0],
            [0.0, -0.6, 0.0, 1.0]
        ];
        let p = TransformedProblem::from_parts(
            sigma,
            array![[1.0], [1.0], [1.0], [0.5]],
            array![1.0],
            vec![false, true, true, true],
        );
        let opts = PathOptions::default();
        let stepper = MaxNormStep::new(&p, &opts);

        // Act
        let mut states = vec![stepper.initial().unwrap()];
        let mut events = Vec::new();
        while !stepper.is_terminal(states.last().unwrap()) {
            let knot = states.len();
            match stepper.step(states.last().unwrap(), knot).unwrap() {
                Transition::Knot(next, event) => {
                    states.push(next);
                    events.push(event);
                }
                Transition::Stationary => panic!("unexpected stationary path"),
            }
        }

        // Assert
        assert_eq!(
            events,
            vec![
                KnotEvent::Leave(vec![2]),
                KnotEvent::Join(vec![2]),
                KnotEvent::Leave(vec![3]),
                KnotEvent::Leave(vec![1, 2]),
            ]
        );
        let lams: Vec<f64> = states.iter().map(|s| s.lam).collect();
        for (got, want) in lams.iter().zip([0.0, 7.0 / 285.0, 7.0 / 36.0, 7.0 / 16.0, 1.0]) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-12);
        }
        let at_join = &states[2];
        assert_eq!(at_join.joined, vec![2]);
        assert_eq!(at_join.signs[2], -1.0);
        assert_abs_diff_eq!(at_join.k[0], -4.0 / 9.0, epsilon = 1e-12);
        assert_abs_diff_eq!(at_join.k[1], -5.0 / 12.0, epsilon = 1e-12);
        assert_abs_diff_eq!(at_join.k[3], -5.0 / 18.0, epsilon = 1e-12);
        let last = states.last().unwrap();
        assert_abs_diff_eq!(last.k[0], -1.0, epsilon = 1e-12);
        for state in &states {
            assert!(kkt_residual(&p, state, NormKind::LInf) < 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // A transition out of a state whose inactive dual slack already exceeds
    // lam produces a negative step, reported as an error.
    //
    // Given
    // -----
    // - Σ̃ = I₃, G̃ = (1, 1, 4)ᵗ, H = 1, coordinates 1, 2 constrained.
    // - lam = 0.1, k = (−0.55, −0.45, 0), mu = 0.55, coordinate 2 inactive:
    //   a₂ = 2.2 > lam, mu_dot = 0.5, a_dot₂ = 2.
    //
    // Expect
    // ------
    // - Join candidate (0.1 − 2.2)/(2 − 1) = −2.1 beats the leave candidate
    //   0.9, giving `NegativeStep { step: −2.1, knot: 3 }`.
    fn infeasible_slack_yields_negative_step_error() {
        // Arrange
        let p = TransformedProblem::from_parts(
            Array2::eye(3),
            array![[1.0], [1.0], [4.0]],
            array![1.0],
            vec![false, true, true],
        );
        let opts = PathOptions::default();
        let stepper = MaxNormStep::new(&p, &opts);
        let state = stepper
            .at_knot(0.1, array![-0.55, -0.45, 0.0], array![0.55], vec![true, true, false], vec![])
            .unwrap();

        // Act
        let err = stepper.step(&state, 3).unwrap_err();

        // Assert
        match err {
            PathError::NegativeStep { step, lam, knot } => {
                assert_abs_diff_eq!(step, -2.1, epsilon = 1e-12);
                assert_abs_diff_eq!(lam, 0.1, epsilon = 1e-15);
                assert_eq!(knot, 3);
            }
            other => panic!("expected NegativeStep, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // When every coordinate is constrained and the solution cannot move,
    // the transition reports a stationary path.
    //
    // Given
    // -----
    // - Σ̃ = I₃, G̃ = 1, H = 1, all coordinates constrained.
    //
    // Expect
    // ------
    // - k_dot = 0 at the initial state and `Transition::Stationary`.
    fn fully_constrained_symmetric_problem_is_stationary() {
        // Arrange
        let p = equal_weights(vec![true, true, true]);
        let opts = PathOptions::default();
        let stepper = MaxNormStep::new(&p, &opts);

        // Act
        let s0 = stepper.initial().unwrap();
        let t = stepper.step(&s0, 1).unwrap();

        // Assert
        for &v in s0.k_dot.iter() {
            assert_abs_diff_eq!(v, 0.0, epsilon = 1e-14);
        }
        assert_eq!(t, Transition::Stationary);
    }
}
