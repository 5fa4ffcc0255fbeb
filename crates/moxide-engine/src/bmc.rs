//! Bounded model checking interleaved with k-induction.
//!
//! Both engines walk bounds 0, 1, 2, ... with no built-in cap. At each
//! bound the falsification query runs first; a satisfiable answer is a
//! counterexample at the current (hence minimal) bound. When induction
//! checking is enabled, an unsatisfiable inductive-step query proves the
//! property. The two queries run on independent oracles so that neither's
//! assertions pollute the other's.

use std::time::Instant;

use tracing::{debug, info};

use moxide_ir::{at_step, prime_map, step_map, Term, TransitionSystem};
use moxide_smt::{Oracle, SatResult};

use crate::error::CheckError;
use crate::result::{Verdict, Witness};

pub(crate) fn deadline_exceeded(deadline: Option<Instant>) -> bool {
    match deadline {
        Some(deadline) => Instant::now() >= deadline,
        None => false,
    }
}

/// `k` consecutive valid transitions:
/// `T(0,1) ∧ Inv(1) ∧ T(1,2) ∧ Inv(2) ∧ ... ∧ T(k-1,k) ∧ Inv(k)`.
pub fn unrolling(system: &TransitionSystem, k: usize) -> Term {
    let inv_next = system.inv().substitute(&prime_map(system.variables()));
    let mut parts = Vec::with_capacity(2 * k);
    for i in 0..k {
        let subs = step_map(system.variables(), i);
        parts.push(system.trans().substitute(&subs));
        parts.push(inv_next.substitute(&subs));
    }
    Term::and(parts)
}

/// Simple-path constraint: every pair of steps in `[0, k)` differs in at
/// least one state variable.
pub fn simple_path(system: &TransitionSystem, k: usize) -> Term {
    let mut pairs = Vec::new();
    for i in 0..k {
        for j in (i + 1)..k {
            let state: Vec<Term> = system
                .variables()
                .iter()
                .map(|v| Term::var(at_step(v, i)).neq(Term::var(at_step(v, j))))
                .collect();
            pairs.push(Term::or(state));
        }
    }
    Term::and(pairs)
}

/// Hypothesis for k-induction: the property held at every step up to
/// `k - 1`.
pub fn k_hypothesis(system: &TransitionSystem, property: &Term, k: usize) -> Term {
    Term::and(
        (0..k)
            .map(|i| property.substitute(&step_map(system.variables(), i)))
            .collect(),
    )
}

/// The falsification query at bound `k`:
/// `Unrolling(k) ∧ Init@0 ∧ Inv@0 ∧ ¬property@k`.
pub fn bmc_query(system: &TransitionSystem, property: &Term, k: usize) -> Term {
    let subs_0 = step_map(system.variables(), 0);
    let init_0 = system.init().substitute(&subs_0);
    let inv_0 = system.inv().substitute(&subs_0);
    let prop_k = property.substitute(&step_map(system.variables(), k));
    Term::and(vec![unrolling(system, k), init_0, inv_0, prop_k.not()])
}

/// The inductive-step query at bound `k`:
/// `Inv@0 ∧ Unrolling(k) ∧ hypothesis(k) ∧ simple-path(k) ∧ ¬property@k`.
pub fn kind_query(
    system: &TransitionSystem,
    property: &Term,
    k: usize,
    use_simple_path: bool,
) -> Term {
    let inv_0 = system.inv().substitute(&step_map(system.variables(), 0));
    let prop_k = property.substitute(&step_map(system.variables(), k));
    let sp = if use_simple_path {
        simple_path(system, k)
    } else {
        Term::bool(true)
    };
    Term::and(vec![
        inv_0,
        unrolling(system, k),
        k_hypothesis(system, property, k),
        sp,
        prop_k.not(),
    ])
}

/// Declare the step-indexed copies of every state variable for steps
/// `from..=to`.
fn declare_steps<O: Oracle>(
    oracle: &mut O,
    system: &TransitionSystem,
    from: usize,
    to: usize,
) -> Result<(), CheckError> {
    for step in from..=to {
        for v in system.variables() {
            let timed = at_step(v, step);
            oracle
                .declare_var(&timed.name, &timed.sort)
                .map_err(CheckError::oracle)?;
        }
    }
    Ok(())
}

/// Reset the oracle, re-declare steps `0..=max_step` and check the query
/// from scratch.
fn solve_fresh<O: Oracle>(
    oracle: &mut O,
    system: &TransitionSystem,
    max_step: usize,
    query: &Term,
) -> Result<bool, CheckError> {
    oracle.reset().map_err(CheckError::oracle)?;
    declare_steps(oracle, system, 0, max_step)?;
    oracle.assert(query).map_err(CheckError::oracle)?;
    match oracle.check_sat().map_err(CheckError::oracle)? {
        SatResult::Sat => Ok(true),
        SatResult::Unsat => Ok(false),
        SatResult::Unknown(reason) => Err(CheckError::OracleUnknown(reason)),
    }
}

/// Check the query in a scratch scope on top of the accumulated
/// assertions, leaving them untouched.
fn probe<O: Oracle>(oracle: &mut O, query: &Term) -> Result<bool, CheckError> {
    oracle.push().map_err(CheckError::oracle)?;
    oracle.assert(query).map_err(CheckError::oracle)?;
    let result = oracle.check_sat().map_err(CheckError::oracle)?;
    oracle.pop().map_err(CheckError::oracle)?;
    match result {
        SatResult::Sat => Ok(true),
        SatResult::Unsat => Ok(false),
        SatResult::Unknown(reason) => Err(CheckError::OracleUnknown(reason)),
    }
}

/// Assert a constraint permanently and checkpoint after it. Checkpoints
/// are never popped between bounds; the assertion set only grows.
fn push_assertion<O: Oracle>(oracle: &mut O, constraint: &Term) -> Result<(), CheckError> {
    oracle.assert(constraint).map_err(CheckError::oracle)?;
    oracle.push().map_err(CheckError::oracle)
}

/// Batch BMC/k-induction: state-free across bounds, the full unrolled
/// query is re-derived and re-asserted from scratch at every bound.
pub struct BmcInduction<'a, O: Oracle> {
    system: &'a TransitionSystem,
    check_induction: bool,
    use_simple_path: bool,
    bmc_oracle: O,
    ind_oracle: O,
    deadline: Option<Instant>,
}

impl<'a, O: Oracle> BmcInduction<'a, O> {
    pub fn new(
        system: &'a TransitionSystem,
        bmc_oracle: O,
        ind_oracle: O,
        check_induction: bool,
        use_simple_path: bool,
    ) -> Self {
        Self {
            system,
            check_induction,
            use_simple_path,
            bmc_oracle,
            ind_oracle,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Interleaves falsification and induction per bound until a verdict
    /// is reached.
    pub fn check_property(&mut self, property: &Term) -> Result<Verdict, CheckError> {
        debug!(system = %self.system.name(), "bmc/k-induction: checking property");
        let mut bound = 0usize;
        loop {
            if deadline_exceeded(self.deadline) {
                return Err(CheckError::Cancelled);
            }
            debug!(bound, "bmc: checking bound");
            let query = bmc_query(self.system, property, bound);
            if solve_fresh(&mut self.bmc_oracle, self.system, bound, &query)? {
                info!(bound, "bmc: target reached");
                return Ok(Verdict::Reachable {
                    witness: Some(Witness::CounterexampleBound(bound)),
                });
            }
            if self.check_induction {
                if deadline_exceeded(self.deadline) {
                    return Err(CheckError::Cancelled);
                }
                debug!(bound, "induction: checking bound");
                let query = kind_query(self.system, property, bound, self.use_simple_path);
                if !solve_fresh(&mut self.ind_oracle, self.system, bound, &query)? {
                    info!(bound, "induction: check passed");
                    return Ok(Verdict::Unreachable {
                        witness: Some(Witness::InductionBound(bound)),
                    });
                }
            }
            bound += 1;
        }
    }
}

/// Incremental BMC/k-induction: the same queries as the batch engine, but
/// assertions accumulate on persistent oracle scopes and are never
/// retracted; each bound only contributes the new one-step constraint.
pub struct BmcInductionIncr<'a, O: Oracle> {
    system: &'a TransitionSystem,
    check_induction: bool,
    use_simple_path: bool,
    bmc_oracle: O,
    ind_oracle: O,
    deadline: Option<Instant>,
}

impl<'a, O: Oracle> BmcInductionIncr<'a, O> {
    pub fn new(
        system: &'a TransitionSystem,
        bmc_oracle: O,
        ind_oracle: O,
        check_induction: bool,
        use_simple_path: bool,
    ) -> Self {
        Self {
            system,
            check_induction,
            use_simple_path,
            bmc_oracle,
            ind_oracle,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn check_property(&mut self, property: &Term) -> Result<Verdict, CheckError> {
        debug!(system = %self.system.name(), "incremental bmc/k-induction: checking property");
        let mut bound = 0usize;
        loop {
            if deadline_exceeded(self.deadline) {
                return Err(CheckError::Cancelled);
            }
            let not_prop = property
                .substitute(&step_map(self.system.variables(), bound))
                .not();
            self.push_bmc_constraints(bound)?;
            debug!(bound, "bmc: checking bound");
            if probe(&mut self.bmc_oracle, &not_prop)? {
                info!(bound, "bmc: target reached");
                return Ok(Verdict::Reachable {
                    witness: Some(Witness::CounterexampleBound(bound)),
                });
            }
            if self.check_induction {
                self.push_induction_constraints(bound, property)?;
                debug!(bound, "induction: checking bound");
                if !probe(&mut self.ind_oracle, &not_prop)? {
                    info!(bound, "induction: check passed");
                    return Ok(Verdict::Unreachable {
                        witness: Some(Witness::InductionBound(bound)),
                    });
                }
            }
            bound += 1;
        }
    }

    /// `trans ∧ inv'`, shifted into the step from `step` to `step + 1`.
    fn transition_step(&self, step: usize) -> Term {
        let vars = self.system.variables();
        let trans = Term::and(vec![
            self.system.trans().clone(),
            self.system.inv().substitute(&prime_map(vars)),
        ]);
        trans.substitute(&step_map(vars, step))
    }

    fn push_bmc_constraints(&mut self, bound: usize) -> Result<(), CheckError> {
        declare_steps(&mut self.bmc_oracle, self.system, bound, bound)?;
        let constraint = if bound == 0 {
            let subs_0 = step_map(self.system.variables(), 0);
            Term::and(vec![
                self.system.init().substitute(&subs_0),
                self.system.inv().substitute(&subs_0),
            ])
        } else {
            self.transition_step(bound - 1)
        };
        push_assertion(&mut self.bmc_oracle, &constraint)
    }

    fn push_induction_constraints(
        &mut self,
        bound: usize,
        property: &Term,
    ) -> Result<(), CheckError> {
        declare_steps(&mut self.ind_oracle, self.system, bound, bound)?;
        let vars = self.system.variables();
        let constraint = if bound == 0 {
            self.system.inv().substitute(&step_map(vars, 0))
        } else {
            let subs_prev = step_map(vars, bound - 1);
            let mut parts = vec![
                self.transition_step(bound - 1),
                property.substitute(&subs_prev),
            ];
            if self.use_simple_path {
                // New distinctness constraints between step bound-1 and
                // every earlier step; earlier pairs were pushed at
                // earlier bounds.
                for i in 0..bound - 1 {
                    let state: Vec<Term> = vars
                        .iter()
                        .map(|v| {
                            Term::var(at_step(v, i)).neq(Term::var(at_step(v, bound - 1)))
                        })
                        .collect();
                    parts.push(Term::or(state));
                }
            }
            Term::and(parts)
        };
        push_assertion(&mut self.ind_oracle, &constraint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{counter_system, ScriptedOracle};
    use moxide_ir::{Sort, Variable};

    fn x() -> Term {
        Term::var(Variable::new("x", Sort::Int))
    }

    #[test]
    fn unrolling_of_zero_steps_is_true() {
        let system = counter_system();
        assert_eq!(unrolling(&system, 0), Term::bool(true));
    }

    #[test]
    fn unrolling_chains_timed_transition_constraints() {
        let system = counter_system();
        let unrolled = unrolling(&system, 2);
        // trans(0,1) ∧ inv@1 ∧ trans(1,2) ∧ inv@2
        let x_at = |i| Term::var(at_step(&Variable::new("x", Sort::Int), i));
        let expected = Term::and(vec![
            x_at(1).eq(x_at(0).add(Term::int(1))),
            Term::bool(true),
            x_at(2).eq(x_at(1).add(Term::int(1))),
            Term::bool(true),
        ]);
        assert_eq!(unrolled, expected);
    }

    #[test]
    fn simple_path_is_trivial_below_two_steps() {
        let system = counter_system();
        assert_eq!(simple_path(&system, 0), Term::bool(true));
        assert_eq!(simple_path(&system, 1), Term::bool(true));
    }

    #[test]
    fn simple_path_distinguishes_all_step_pairs() {
        let system = counter_system();
        let x_at = |i| Term::var(at_step(&Variable::new("x", Sort::Int), i));
        let expected = Term::and(vec![
            x_at(0).neq(x_at(1)),
            x_at(0).neq(x_at(2)),
            x_at(1).neq(x_at(2)),
        ]);
        assert_eq!(simple_path(&system, 3), expected);
    }

    #[test]
    fn batch_engine_reports_sat_bmc_query_as_reachable() {
        let system = counter_system();
        let bmc = ScriptedOracle::sat_sequence(&[true]);
        let ind = ScriptedOracle::sat_sequence(&[]);
        let mut engine = BmcInduction::new(&system, bmc, ind, true, true);
        let property = x().lt(Term::int(3));
        let verdict = engine.check_property(&property).expect("verdict");
        assert_eq!(
            verdict,
            Verdict::Reachable {
                witness: Some(Witness::CounterexampleBound(0))
            }
        );
    }

    #[test]
    fn batch_engine_resets_oracle_at_every_bound() {
        let system = counter_system();
        // Two bounds of inconclusive answers, then a counterexample.
        let bmc = ScriptedOracle::sat_sequence(&[false, false, true]);
        let ind = ScriptedOracle::sat_sequence(&[true, true]);
        let mut engine = BmcInduction::new(&system, bmc, ind, true, true);
        let property = x().lt(Term::int(3));
        let verdict = engine.check_property(&property).expect("verdict");
        assert_eq!(
            verdict,
            Verdict::Reachable {
                witness: Some(Witness::CounterexampleBound(2))
            }
        );
        assert_eq!(engine.bmc_oracle.resets, 3);
        assert_eq!(engine.ind_oracle.resets, 2);
    }

    #[test]
    fn batch_engine_reports_unsat_induction_as_unreachable() {
        let system = counter_system();
        let bmc = ScriptedOracle::sat_sequence(&[false]);
        let ind = ScriptedOracle::sat_sequence(&[false]);
        let mut engine = BmcInduction::new(&system, bmc, ind, true, true);
        let property = x().lt(Term::int(3));
        let verdict = engine.check_property(&property).expect("verdict");
        assert_eq!(
            verdict,
            Verdict::Unreachable {
                witness: Some(Witness::InductionBound(0))
            }
        );
    }

    #[test]
    fn unknown_oracle_answer_is_fatal() {
        let system = counter_system();
        let bmc = ScriptedOracle::unknown("resource limit");
        let ind = ScriptedOracle::sat_sequence(&[]);
        let mut engine = BmcInduction::new(&system, bmc, ind, true, true);
        let property = x().lt(Term::int(3));
        let err = engine.check_property(&property).unwrap_err();
        assert!(matches!(err, CheckError::OracleUnknown(_)));
    }

    #[test]
    fn incremental_engine_accumulates_assertions_without_popping_them() {
        let system = counter_system();
        // Bound 0: bmc unsat, induction sat; bound 1: bmc unsat,
        // induction unsat => proved at bound 1.
        let bmc = ScriptedOracle::sat_sequence(&[false, false]);
        let ind = ScriptedOracle::sat_sequence(&[true, false]);
        let mut engine = BmcInductionIncr::new(&system, bmc, ind, true, true);
        let property = x().lt(Term::int(3));
        let verdict = engine.check_property(&property).expect("verdict");
        assert_eq!(
            verdict,
            Verdict::Unreachable {
                witness: Some(Witness::InductionBound(1))
            }
        );
        // Per bound: one persistent checkpoint plus one probe push/pop.
        assert_eq!(engine.bmc_oracle.pushes, 4);
        assert_eq!(engine.bmc_oracle.pops, 2);
        assert_eq!(engine.ind_oracle.pushes, 4);
        assert_eq!(engine.ind_oracle.pops, 2);
        assert_eq!(engine.bmc_oracle.resets, 0);
    }

    #[test]
    fn incremental_engine_reports_minimal_counterexample_bound() {
        let system = counter_system();
        let bmc = ScriptedOracle::sat_sequence(&[false, false, false, true]);
        let ind = ScriptedOracle::sat_sequence(&[true, true, true]);
        let mut engine = BmcInductionIncr::new(&system, bmc, ind, true, true);
        let property = x().lt(Term::int(3));
        let verdict = engine.check_property(&property).expect("verdict");
        assert_eq!(
            verdict,
            Verdict::Reachable {
                witness: Some(Witness::CounterexampleBound(3))
            }
        );
    }

    #[test]
    fn bmc_only_engine_skips_the_induction_oracle() {
        let system = counter_system();
        let bmc = ScriptedOracle::sat_sequence(&[false, true]);
        let ind = ScriptedOracle::sat_sequence(&[]);
        let mut engine = BmcInduction::new(&system, bmc, ind, false, true);
        let property = x().lt(Term::int(3));
        let verdict = engine.check_property(&property).expect("verdict");
        assert!(verdict.is_reachable());
        assert_eq!(engine.ind_oracle.checks, 0);
    }
}
