//! End-to-end engine scenarios against the Z3 backend.

use std::time::Duration;

use moxide_engine::{
    check_reachability, Algorithm, CheckError, CheckOptions, Verdict, Witness,
};
use moxide_ir::{next_var, Logic, Sort, Term, TransitionSystem, Value, Variable};

fn x_var() -> Variable {
    Variable::new("x", Sort::Int)
}

fn x() -> Term {
    Term::var(x_var())
}

fn x_next() -> Term {
    Term::var(next_var(&x_var()))
}

/// init `x = 0`, trans `x' = x + 1`, inv `true`.
fn counter() -> TransitionSystem {
    TransitionSystem::new(
        "counter",
        Logic::QfLia,
        vec![x_var()],
        x().eq(Term::int(0)),
        x_next().eq(x().add(Term::int(1))),
        Term::bool(true),
    )
}

/// init `x = 0`, trans `x' = 1 - x`, inv `true`.
fn toggle() -> TransitionSystem {
    TransitionSystem::new(
        "toggle",
        Logic::QfLia,
        vec![x_var()],
        x().eq(Term::int(0)),
        x_next().eq(Term::int(1).sub(x())),
        Term::bool(true),
    )
}

fn options(algorithm: Algorithm, incremental: bool) -> CheckOptions {
    CheckOptions {
        algorithm,
        incremental,
        ..CheckOptions::default()
    }
}

#[test]
fn counter_reaches_three_at_minimal_bound_with_batch_bmc() {
    let system = counter();
    let target = x().ge(Term::int(3));
    let verdict =
        check_reachability(&system, &target, &options(Algorithm::Bmc, false)).expect("verdict");
    assert_eq!(
        verdict,
        Verdict::Reachable {
            witness: Some(Witness::CounterexampleBound(3))
        }
    );
}

#[test]
fn counter_reaches_three_at_minimal_bound_with_incremental_bmc() {
    let system = counter();
    let target = x().ge(Term::int(3));
    let verdict =
        check_reachability(&system, &target, &options(Algorithm::Bmc, true)).expect("verdict");
    assert_eq!(
        verdict,
        Verdict::Reachable {
            witness: Some(Witness::CounterexampleBound(3))
        }
    );
}

#[test]
fn counter_violation_is_found_by_kinduction_too() {
    // The falsification query runs first at each bound, so the verdict
    // and bound are identical with induction checking enabled.
    let system = counter();
    let target = x().ge(Term::int(3));
    let verdict = check_reachability(&system, &target, &options(Algorithm::KInduction, false))
        .expect("verdict");
    assert_eq!(
        verdict,
        Verdict::Reachable {
            witness: Some(Witness::CounterexampleBound(3))
        }
    );
}

#[test]
fn toggle_is_proved_by_batch_kinduction() {
    let system = toggle();
    let target = x().ge(Term::int(2));
    let verdict = check_reachability(&system, &target, &options(Algorithm::KInduction, false))
        .expect("verdict");
    assert_eq!(
        verdict,
        Verdict::Unreachable {
            witness: Some(Witness::InductionBound(2))
        }
    );
}

#[test]
fn toggle_is_proved_by_incremental_kinduction_at_the_same_bound() {
    let system = toggle();
    let target = x().ge(Term::int(2));
    let verdict = check_reachability(&system, &target, &options(Algorithm::KInduction, true))
        .expect("verdict");
    assert_eq!(
        verdict,
        Verdict::Unreachable {
            witness: Some(Witness::InductionBound(2))
        }
    );
}

/// A system where plain induction never closes: the unreachable state
/// `x = 1` loops onto itself and can step into the target `x = 2`, so
/// every induction query has a counterexample-to-induction until the
/// simple-path constraint forbids repeating `x = 1`.
fn lasso() -> TransitionSystem {
    let stay_zero = Term::and(vec![
        x().eq(Term::int(0)),
        x_next().eq(Term::int(0)),
    ]);
    let loop_or_exit = Term::and(vec![
        x().eq(Term::int(1)),
        Term::or(vec![x_next().eq(Term::int(1)), x_next().eq(Term::int(2))]),
    ]);
    let stutter = Term::and(vec![
        x().eq(Term::int(0)).not(),
        x().eq(Term::int(1)).not(),
        x_next().eq(x()),
    ]);
    TransitionSystem::new(
        "lasso",
        Logic::QfLia,
        vec![x_var()],
        x().eq(Term::int(0)),
        Term::or(vec![stay_zero, loop_or_exit, stutter]),
        Term::bool(true),
    )
}

#[test]
fn simple_path_constraint_closes_the_lasso_proof() {
    let system = lasso();
    let target = x().eq(Term::int(2));
    let verdict = check_reachability(&system, &target, &options(Algorithm::KInduction, false))
        .expect("verdict");
    assert_eq!(
        verdict,
        Verdict::Unreachable {
            witness: Some(Witness::InductionBound(2))
        }
    );
}

#[test]
fn simple_path_constraint_closes_the_lasso_proof_incrementally() {
    let system = lasso();
    let target = x().eq(Term::int(2));
    let verdict = check_reachability(&system, &target, &options(Algorithm::KInduction, true))
        .expect("verdict");
    assert_eq!(
        verdict,
        Verdict::Unreachable {
            witness: Some(Witness::InductionBound(2))
        }
    );
}

/// init `x = 0`, trans `x' = 1 - x`, inv `0 <= x <= 1`: a finite state
/// space on which PDR must terminate.
fn bounded_toggle() -> TransitionSystem {
    TransitionSystem::new(
        "bounded-toggle",
        Logic::QfLia,
        vec![x_var()],
        x().eq(Term::int(0)),
        x_next().eq(Term::int(1).sub(x())),
        Term::and(vec![x().ge(Term::int(0)), x().le(Term::int(1))]),
    )
}

#[test]
fn pdr_reaches_a_fixpoint_on_a_finite_state_space() {
    let system = bounded_toggle();
    let target = x().ge(Term::int(2));
    let verdict =
        check_reachability(&system, &target, &options(Algorithm::Pdr, false)).expect("verdict");
    assert_eq!(
        verdict,
        Verdict::Unreachable {
            witness: Some(Witness::FixpointFrame(2))
        }
    );
}

/// init `x = 0`, trans `x' = x + 1`, inv `0 <= x <= 5`.
fn bounded_counter() -> TransitionSystem {
    TransitionSystem::new(
        "bounded-counter",
        Logic::QfLia,
        vec![x_var()],
        x().eq(Term::int(0)),
        x_next().eq(x().add(Term::int(1))),
        Term::and(vec![x().ge(Term::int(0)), x().le(Term::int(5))]),
    )
}

#[test]
fn pdr_finds_a_backward_trace_anchored_in_the_initial_states() {
    let system = bounded_counter();
    let target = x().ge(Term::int(3));
    let verdict =
        check_reachability(&system, &target, &options(Algorithm::Pdr, false)).expect("verdict");
    let Verdict::Reachable {
        witness: Some(Witness::CubeTrace(trace)),
    } = verdict
    else {
        panic!("expected a reachable verdict with a cube trace");
    };
    assert!(trace.len() >= 2);
    // The chain starts in a target state and ends in an initial state.
    match trace.first().and_then(|cube| cube.value("x")) {
        Some(Value::Int(n)) => assert!(*n >= 3, "first cube must satisfy the target, got {n}"),
        other => panic!("missing integer value in first cube: {other:?}"),
    }
    assert_eq!(trace.last().and_then(|cube| cube.value("x")), Some(&Value::Int(0)));
}

#[test]
fn expired_deadline_cancels_an_endless_bmc_run() {
    // Plain BMC on the toggle system can only terminate by cancellation:
    // the target is unreachable and no induction check runs.
    let system = toggle();
    let target = x().ge(Term::int(2));
    let options = CheckOptions {
        algorithm: Algorithm::Bmc,
        timeout: Some(Duration::from_millis(200)),
        ..CheckOptions::default()
    };
    let err = check_reachability(&system, &target, &options).unwrap_err();
    assert!(matches!(err, CheckError::Cancelled));
}

#[test]
fn engines_share_the_system_by_reference() {
    // Independent engine instances over one system: read-only sharing.
    let system = counter();
    let target = x().ge(Term::int(1));
    let first =
        check_reachability(&system, &target, &options(Algorithm::Bmc, false)).expect("verdict");
    let second =
        check_reachability(&system, &target, &options(Algorithm::Bmc, true)).expect("verdict");
    assert_eq!(first, second);
}
