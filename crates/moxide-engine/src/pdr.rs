//! Backward reachability over monotone frames (PDR).
//!
//! `frames[i]` over-approximates the states reachable within at most `i`
//! steps from the initial states; `frames[0]` denotes exactly
//! `init ∧ inv`. Frames are only ever strengthened, by conjoining the
//! negation of a blocked cube.

use std::time::Instant;

use tracing::{debug, info};

use moxide_ir::{next_var, prime_map, Sort, Substitution, Term, TransitionSystem};
use moxide_smt::{Oracle, SatResult};

use crate::bmc::deadline_exceeded;
use crate::error::CheckError;
use crate::result::{Cube, Verdict, Witness};

enum BlockOutcome {
    /// The cube has no predecessor at some level; every frame up to that
    /// level now excludes it.
    Blocked,
    /// A predecessor chain reaches the initial frame; the cubes form a
    /// backward trace from a target state to an initial state.
    Unblockable(Vec<Cube>),
}

/// Backward-reachability engine. One oracle serves every query; each
/// query runs in its own push/pop scope, so no assertion outlives the
/// single call that made it.
pub struct Pdr<'a, O: Oracle> {
    system: &'a TransitionSystem,
    oracle: O,
    frames: Vec<Term>,
    prime_map: Substitution,
    inv_prime: Term,
    deadline: Option<Instant>,
}

impl<'a, O: Oracle> Pdr<'a, O> {
    pub fn new(system: &'a TransitionSystem, mut oracle: O) -> Result<Self, CheckError> {
        // PDR formulas range over the base and primed copies only; both
        // are declared once for the engine's lifetime.
        for v in system.variables() {
            oracle
                .declare_var(&v.name, &v.sort)
                .map_err(CheckError::oracle)?;
            let primed = next_var(v);
            oracle
                .declare_var(&primed.name, &primed.sort)
                .map_err(CheckError::oracle)?;
        }
        let prime_map = prime_map(system.variables());
        let inv_prime = system.inv().substitute(&prime_map);
        let frames = vec![Term::and(vec![
            system.init().clone(),
            system.inv().clone(),
        ])];
        Ok(Self {
            system,
            oracle,
            frames,
            prime_map,
            inv_prime,
            deadline: None,
        })
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn check_property(&mut self, property: &Term) -> Result<Verdict, CheckError> {
        debug!(system = %self.system.name(), "pdr: checking property");
        loop {
            if deadline_exceeded(self.deadline) {
                return Err(CheckError::Cancelled);
            }
            match self.bad_state(property)? {
                Some(cube) => match self.recursive_block(cube)? {
                    BlockOutcome::Blocked => {
                        debug!("pdr: cube blocked");
                    }
                    BlockOutcome::Unblockable(trace) => {
                        info!(frame = self.frames.len() - 1, "pdr: target reached");
                        return Ok(Verdict::Reachable {
                            witness: Some(Witness::CubeTrace(trace)),
                        });
                    }
                },
                None => {
                    if self.is_inductive()? {
                        let frame = self.frames.len() - 1;
                        info!(frame, "pdr: fixed point reached");
                        return Ok(Verdict::Unreachable {
                            witness: Some(Witness::FixpointFrame(frame)),
                        });
                    }
                    debug!(frame = self.frames.len(), "pdr: adding frame");
                    self.frames.push(self.system.inv().clone());
                }
            }
        }
    }

    /// A state in the current frontier that intersects the negated
    /// property, if any.
    fn bad_state(&mut self, property: &Term) -> Result<Option<Cube>, CheckError> {
        let frontier = self.frames.last().expect("frames are never empty").clone();
        let query = Term::and(vec![frontier, property.clone().not()]);
        self.solve(&query)
    }

    /// Satisfying full-state assignment for `formula`, evaluated in an
    /// isolated scope.
    fn solve(&mut self, formula: &Term) -> Result<Option<Cube>, CheckError> {
        self.oracle.push().map_err(CheckError::oracle)?;
        self.oracle.assert(formula).map_err(CheckError::oracle)?;
        let vars: Vec<(&str, &Sort)> = self
            .system
            .variables()
            .iter()
            .map(|v| (v.name.as_str(), &v.sort))
            .collect();
        let (result, model) = self
            .oracle
            .check_sat_with_model(&vars)
            .map_err(CheckError::oracle)?;
        self.oracle.pop().map_err(CheckError::oracle)?;

        match result {
            SatResult::Sat => {
                let model = model.ok_or_else(|| {
                    CheckError::OracleUnknown("oracle reported sat without a model".into())
                })?;
                let mut assignments = Vec::with_capacity(self.system.variables().len());
                for v in self.system.variables() {
                    let value = model
                        .get(&v.name)
                        .cloned()
                        .ok_or_else(|| CheckError::MissingModelValue(v.name.clone()))?;
                    assignments.push((v.clone(), value));
                }
                Ok(Some(Cube { assignments }))
            }
            SatResult::Unsat => Ok(None),
            SatResult::Unknown(reason) => Err(CheckError::OracleUnknown(reason)),
        }
    }

    /// Walk the frames from the frontier down to 1, replacing the cube by
    /// a predecessor at each level. No predecessor at level `i` blocks the
    /// cube in frames 1..=i; a chain that survives down to frame 0 is a
    /// genuine initial-to-target path.
    fn recursive_block(&mut self, cube: Cube) -> Result<BlockOutcome, CheckError> {
        let mut cube = cube;
        let mut trace = vec![cube.clone()];
        let frontier = self.frames.len();
        for i in (1..frontier).rev() {
            let cube_term = cube.to_term();
            let cube_prime = cube_term.substitute(&self.prime_map);
            let query = Term::and(vec![
                self.frames[i - 1].clone(),
                self.system.trans().clone(),
                self.inv_prime.clone(),
                cube_term.clone().not(),
                cube_prime,
            ]);
            match self.solve(&query)? {
                None => {
                    let blocker = cube_term.not();
                    for frame in &mut self.frames[1..=i] {
                        *frame = Term::and(vec![frame.clone(), blocker.clone()]);
                    }
                    return Ok(BlockOutcome::Blocked);
                }
                Some(predecessor) => {
                    trace.push(predecessor.clone());
                    cube = predecessor;
                }
            }
        }
        Ok(BlockOutcome::Unblockable(trace))
    }

    /// Fixpoint test: the last two frames denote the same state set. The
    /// comparison is semantic, via the oracle, never structural.
    fn is_inductive(&mut self) -> Result<bool, CheckError> {
        if self.frames.len() < 2 {
            return Ok(false);
        }
        let last = self.frames[self.frames.len() - 1].clone();
        let previous = self.frames[self.frames.len() - 2].clone();
        Ok(self.solve(&last.eq(previous).not())?.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{counter_system, ScriptedOracle};
    use moxide_ir::{Value, Variable};
    use moxide_smt::{Model, SatResult};

    fn model_with_x(n: i64) -> Model {
        let mut model = Model::default();
        model.values.insert("x".to_string(), Value::Int(n));
        model
    }

    fn property() -> Term {
        Term::var(Variable::new("x", Sort::Int)).lt(Term::int(3))
    }

    #[test]
    fn declares_base_and_primed_variables_once() {
        let system = counter_system();
        let oracle = ScriptedOracle::new(vec![]);
        let pdr = Pdr::new(&system, oracle).expect("engine");
        assert_eq!(pdr.oracle.declares, 2);
        assert_eq!(pdr.frames.len(), 1);
    }

    #[test]
    fn fixpoint_after_one_appended_frame() {
        let system = counter_system();
        // Frontier safe (unsat), frame appended without an equivalence
        // query while only one frame exists; frontier safe again, then
        // the symmetric-difference query is unsat: fixpoint at frame 1.
        let oracle = ScriptedOracle::sat_sequence(&[false, false, false]);
        let mut pdr = Pdr::new(&system, oracle).expect("engine");
        let verdict = pdr.check_property(&property()).expect("verdict");
        assert_eq!(
            verdict,
            Verdict::Unreachable {
                witness: Some(Witness::FixpointFrame(1))
            }
        );
        // Every query ran in its own scope.
        assert_eq!(pdr.oracle.pushes, pdr.oracle.pops);
    }

    #[test]
    fn bad_state_in_initial_frame_is_reachable_immediately() {
        let system = counter_system();
        let oracle = ScriptedOracle::new(vec![(SatResult::Sat, Some(model_with_x(4)))]);
        let mut pdr = Pdr::new(&system, oracle).expect("engine");
        let verdict = pdr.check_property(&property()).expect("verdict");
        match verdict {
            Verdict::Reachable {
                witness: Some(Witness::CubeTrace(trace)),
            } => {
                assert_eq!(trace.len(), 1);
                assert_eq!(trace[0].value("x"), Some(&Value::Int(4)));
            }
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn blocked_cube_strengthens_frames_and_loop_continues() {
        let system = counter_system();
        // 1. frontier query: safe (unsat)      -> append frame 1
        // 2. frontier query: bad cube x=4 (sat)
        // 3. predecessor query at frame 1: unsat -> blocked
        // 4. frontier query: safe (unsat)
        // 5. equivalence query: unsat          -> fixpoint at frame 1
        let oracle = ScriptedOracle::new(vec![
            (SatResult::Unsat, None),
            (SatResult::Sat, Some(model_with_x(4))),
            (SatResult::Unsat, None),
            (SatResult::Unsat, None),
            (SatResult::Unsat, None),
        ]);
        let mut pdr = Pdr::new(&system, oracle).expect("engine");
        let verdict = pdr.check_property(&property()).expect("verdict");
        assert_eq!(
            verdict,
            Verdict::Unreachable {
                witness: Some(Witness::FixpointFrame(1))
            }
        );
    }

    #[test]
    fn missing_model_value_is_fatal() {
        let system = counter_system();
        let oracle = ScriptedOracle::new(vec![(SatResult::Sat, Some(Model::default()))]);
        let mut pdr = Pdr::new(&system, oracle).expect("engine");
        let err = pdr.check_property(&property()).unwrap_err();
        assert!(matches!(err, CheckError::MissingModelValue(name) if name == "x"));
    }
}
