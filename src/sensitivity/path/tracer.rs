//! sensitivity::path::tracer — the driver loop shared by both path variants.
//!
//! Purpose
//! -------
//! Run a [`PathStepper`] from its initial state until it reports a terminal
//! state, recording every knot. The loop knows nothing about norms: the
//! variant-specific logic lives entirely in the stepper's `initial`,
//! `is_terminal` and `step` methods.
//!
//! Key behaviors
//! -------------
//! - Records the initial state as a [`KnotEvent::Start`] knot.
//! - Stops on a terminal state, or on [`Transition::Stationary`] with a
//!   warning (the solution is constant beyond the last knot).
//! - Enforces a step budget and fails with
//!   [`PathError::MaxStepsExceeded`] instead of looping forever.
//! - Logs one `debug!` record per knot.
use log::{debug, warn};

use crate::sensitivity::{
    errors::{PathError, PathResult},
    options::{NormKind, PathOptions},
    path::{
        l1::OneNormStep,
        linf::MaxNormStep,
        state::{KnotEvent, PathState, TracedKnot, Transition},
    },
    transform::TransformedProblem,
};

/// PathStepper — transition function of one path variant.
///
/// Implementors are pure: `step` must not mutate the stepper or the input
/// state, and must return a state with `lam` no smaller than the input's
/// (or an error).
pub trait PathStepper {
    /// The state at `lam = 0`.
    fn initial(&self) -> PathResult<PathState>;

    /// Whether the path ends at `state`.
    fn is_terminal(&self, state: &PathState) -> bool;

    /// Compute the next knot. `knot` is the index the new knot will have
    /// and is only used for error reporting.
    fn step(&self, state: &PathState, knot: usize) -> PathResult<Transition>;
}

/// trace — compute every knot of the path for `problem` under `norm`.
///
/// Parameters
/// ----------
/// - `problem`: `&TransformedProblem`
///   The problem in transformed coordinates.
/// - `norm`: `NormKind`
///   Shape of the misspecification ball.
/// - `options`: `&PathOptions`
///   Tolerances and step budget.
///
/// Returns
/// -------
/// `PathResult<Vec<TracedKnot>>`
///   Knots in emission order; `lam` is non-decreasing.
///
/// Errors
/// ------
/// - `PathError::NegativeStep` when a transition would move `lam` backwards.
/// - `PathError::MaxStepsExceeded` when the budget
///   `options.step_budget(dg)` is exhausted before a terminal state.
/// - `PathError::Singular` when an active block cannot be factorized.
pub fn trace(
    problem: &TransformedProblem, norm: NormKind, options: &PathOptions,
) -> PathResult<Vec<TracedKnot>> {
    let budget = options.step_budget(problem.dg());
    match norm {
        NormKind::LInf => run(&MaxNormStep::new(problem, options), budget),
        NormKind::L1 => run(&OneNormStep::new(problem, options), budget),
    }
}

fn run<S: PathStepper>(stepper: &S, max_steps: usize) -> PathResult<Vec<TracedKnot>> {
    let mut state = stepper.initial()?;
    debug!("knot 0: lam = 0, {} active", state.n_active());
    let mut knots = vec![TracedKnot { state: state.clone(), event: KnotEvent::Start }];

    let mut steps = 0;
    while !stepper.is_terminal(&state) {
        if steps == max_steps {
            return Err(PathError::MaxStepsExceeded { max_steps });
        }
        steps += 1;

        match stepper.step(&state, knots.len())? {
            Transition::Knot(next, event) => {
                debug!(
                    "knot {}: lam = {:.6e}, {:?}, {} active",
                    knots.len(),
                    next.lam,
                    event,
                    next.n_active()
                );
                state = next;
                knots.push(TracedKnot { state: state.clone(), event });
            }
            Transition::Stationary => {
                warn!(
                    "no finite next knot after lam = {:.6e}; path is constant from knot {}",
                    state.lam,
                    knots.len() - 1
                );
                break;
            }
        }
    }

    Ok(knots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, Array2, array};
    use std::cell::Cell;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Dispatch by norm and knot recording for a small problem.
    // - Stationary termination.
    // - The step budget, using a stepper that never terminates.
    // - Error propagation from `step`.
    // -------------------------------------------------------------------------

    fn dummy_state(lam: f64) -> PathState {
        PathState {
            lam,
            k: Array1::zeros(1),
            mu: Array1::zeros(1),
            active: vec![true],
            joined: vec![],
            k_dot: Array1::zeros(1),
            mu_dot: Array1::zeros(1),
            signs: Array1::zeros(1),
        }
    }

    /// Steps forever by one unit of lam, or fails at a given knot.
    struct Endless {
        fail_at: Option<usize>,
        calls: Cell<usize>,
    }

    impl PathStepper for Endless {
        fn initial(&self) -> PathResult<PathState> {
            Ok(dummy_state(0.0))
        }

        fn is_terminal(&self, _state: &PathState) -> bool {
            false
        }

        fn step(&self, state: &PathState, knot: usize) -> PathResult<Transition> {
            self.calls.set(self.calls.get() + 1);
            if self.fail_at == Some(knot) {
                return Err(PathError::NegativeStep { step: -1.0, lam: state.lam, knot });
            }
            Ok(Transition::Knot(dummy_state(state.lam + 1.0), KnotEvent::Leave(vec![0])))
        }
    }

    #[test]
    // Purpose
    // -------
    // Both norms trace the one-constraint problem to the same endpoint with
    // their own terminal event.
    //
    // Given
    // -----
    // - Σ̃ = I₃, G̃ = 1, H = 1, coordinate 2 constrained.
    //
    // Expect
    // ------
    // - Max-norm: [Start, Leave([2])]; one-norm: [Start, Floor]; both end at
    //   lam = 0.5 with k = (−1/2, −1/2, 0).
    fn trace_dispatches_by_norm() {
        // Arrange
        let p = TransformedProblem::from_parts(
            Array2::eye(3),
            array![[1.0], [1.0], [1.0]],
            array![1.0],
            vec![false, false, true],
        );
        let opts = PathOptions::default();

        // Act
        let linf = trace(&p, NormKind::LInf, &opts).unwrap();
        let l1 = trace(&p, NormKind::L1, &opts).unwrap();

        // Assert
        assert_eq!(linf.len(), 2);
        assert_eq!(l1.len(), 2);
        assert_eq!(linf[0].event, KnotEvent::Start);
        assert_eq!(linf[1].event, KnotEvent::Leave(vec![2]));
        assert_eq!(l1[1].event, KnotEvent::Floor);
        for knots in [&linf, &l1] {
            let last = &knots[1].state;
            assert_abs_diff_eq!(last.lam, 0.5, epsilon = 1e-12);
            assert_abs_diff_eq!(last.k[0], -0.5, epsilon = 1e-12);
            assert_abs_diff_eq!(last.k[2], 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // A stationary transition ends the path after the initial knot.
    fn stationary_path_has_single_knot() {
        // Arrange
        let p = TransformedProblem::from_parts(
            Array2::eye(3),
            array![[1.0], [1.0], [1.0]],
            array![1.0],
            vec![true, true, true],
        );

        // Act
        let knots = trace(&p, NormKind::LInf, &PathOptions::default()).unwrap();

        // Assert
        assert_eq!(knots.len(), 1);
        assert_eq!(knots[0].event, KnotEvent::Start);
    }

    #[test]
    // Purpose
    // -------
    // The step budget bounds the number of transitions.
    //
    // Given
    // -----
    // - A stepper that never terminates and a budget of 5.
    //
    // Expect
    // ------
    // - `MaxStepsExceeded { max_steps: 5 }` after exactly 5 calls to `step`.
    fn step_budget_stops_endless_stepper() {
        // Arrange
        let stepper = Endless { fail_at: None, calls: Cell::new(0) };

        // Act
        let err = run(&stepper, 5).unwrap_err();

        // Assert
        assert_eq!(err, PathError::MaxStepsExceeded { max_steps: 5 });
        assert_eq!(stepper.calls.get(), 5);
    }

    #[test]
    // Purpose
    // -------
    // Errors from `step` abort the loop with the knot index they occurred at.
    fn step_errors_propagate_with_knot_index() {
        // Arrange
        let stepper = Endless { fail_at: Some(3), calls: Cell::new(0) };

        // Act
        let err = run(&stepper, 100).unwrap_err();

        // Assert
        assert_eq!(err, PathError::NegativeStep { step: -1.0, lam: 2.0, knot: 3 });
    }
}
