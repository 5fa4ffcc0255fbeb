//! Scripted oracle for engine protocol tests.

use std::collections::VecDeque;

use moxide_ir::{next_var, Logic, Sort, Term, TransitionSystem, Variable};
use moxide_smt::{Model, Oracle, SatResult};

/// An oracle that replays a fixed script of answers and records the
/// protocol the engine drove it through.
pub(crate) struct ScriptedOracle {
    responses: VecDeque<(SatResult, Option<Model>)>,
    pub declares: usize,
    pub asserts: usize,
    pub pushes: usize,
    pub pops: usize,
    pub checks: usize,
    pub resets: usize,
}

impl ScriptedOracle {
    pub fn new(responses: Vec<(SatResult, Option<Model>)>) -> Self {
        Self {
            responses: responses.into(),
            declares: 0,
            asserts: 0,
            pushes: 0,
            pops: 0,
            checks: 0,
            resets: 0,
        }
    }

    /// `true` entries answer sat, `false` entries unsat; no models.
    pub fn sat_sequence(sequence: &[bool]) -> Self {
        Self::new(
            sequence
                .iter()
                .map(|&sat| {
                    let result = if sat { SatResult::Sat } else { SatResult::Unsat };
                    (result, None)
                })
                .collect(),
        )
    }

    pub fn unknown(reason: &str) -> Self {
        Self::new(vec![(SatResult::Unknown(reason.to_string()), None)])
    }

    fn next_response(&mut self) -> (SatResult, Option<Model>) {
        self.checks += 1;
        self.responses
            .pop_front()
            .expect("scripted oracle ran out of answers")
    }
}

impl Oracle for ScriptedOracle {
    type Error = std::io::Error;

    fn declare_var(&mut self, _name: &str, _sort: &Sort) -> Result<(), Self::Error> {
        self.declares += 1;
        Ok(())
    }

    fn assert(&mut self, _term: &Term) -> Result<(), Self::Error> {
        self.asserts += 1;
        Ok(())
    }

    fn push(&mut self) -> Result<(), Self::Error> {
        self.pushes += 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<(), Self::Error> {
        self.pops += 1;
        Ok(())
    }

    fn check_sat(&mut self) -> Result<SatResult, Self::Error> {
        Ok(self.next_response().0)
    }

    fn check_sat_with_model(
        &mut self,
        _vars: &[(&str, &Sort)],
    ) -> Result<(SatResult, Option<Model>), Self::Error> {
        Ok(self.next_response())
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        self.resets += 1;
        Ok(())
    }
}

/// Single integer counter: init `x = 0`, trans `x' = x + 1`, inv `true`.
pub(crate) fn counter_system() -> TransitionSystem {
    let x = Variable::new("x", Sort::Int);
    let init = Term::var(x.clone()).eq(Term::int(0));
    let trans = Term::var(next_var(&x)).eq(Term::var(x.clone()).add(Term::int(1)));
    TransitionSystem::new(
        "counter",
        Logic::QfLia,
        vec![x],
        init,
        trans,
        Term::bool(true),
    )
}
