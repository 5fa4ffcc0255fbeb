use std::fmt;

use moxide_ir::{Term, Value, Variable};

/// A full-state assignment extracted from a satisfying oracle model:
/// one concrete value per state variable, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Cube {
    pub assignments: Vec<(Variable, Value)>,
}

impl Cube {
    /// The conjunction of equalities this cube denotes.
    pub fn to_term(&self) -> Term {
        Term::and(
            self.assignments
                .iter()
                .map(|(v, value)| Term::var(v.clone()).eq(value.to_term()))
                .collect(),
        )
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.assignments
            .iter()
            .find(|(v, _)| v.name == name)
            .map(|(_, value)| value)
    }
}

impl fmt::Display for Cube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (v, value) in &self.assignments {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{v} = {value}")?;
            first = false;
        }
        Ok(())
    }
}

/// Evidence attached to a verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum Witness {
    /// Minimal bound at which a counterexample was found.
    CounterexampleBound(usize),
    /// Bound at which the inductive step was discharged.
    InductionBound(usize),
    /// Frame index at which two consecutive frames became equivalent.
    FixpointFrame(usize),
    /// Chain of predecessor cubes from a target state down to an
    /// initial state.
    CubeTrace(Vec<Cube>),
}

/// The outcome of a verification run, under the convention that the input
/// target describes states to reach and the checked property is "the
/// target is never reached".
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The property holds: no target state is reachable.
    Unreachable { witness: Option<Witness> },
    /// The property is violated: some target state is reachable.
    Reachable { witness: Option<Witness> },
}

impl Verdict {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Verdict::Reachable { .. })
    }

    pub fn witness(&self) -> Option<&Witness> {
        match self {
            Verdict::Unreachable { witness } | Verdict::Reachable { witness } => witness.as_ref(),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Unreachable { witness } => {
                write!(f, "RESULT: UNREACHABLE")?;
                match witness {
                    Some(Witness::InductionBound(bound)) => {
                        write!(f, "\nInduction check passed at bound {bound}.")
                    }
                    Some(Witness::FixpointFrame(frame)) => {
                        write!(f, "\nFixed point reached at frame {frame}.")
                    }
                    _ => Ok(()),
                }
            }
            Verdict::Reachable { witness } => {
                write!(f, "RESULT: REACHABLE")?;
                match witness {
                    Some(Witness::CounterexampleBound(bound)) => {
                        write!(f, "\nTarget reached at bound {bound}.")
                    }
                    Some(Witness::CubeTrace(trace)) => {
                        write!(f, "\nTarget reached; backward trace:")?;
                        for (i, cube) in trace.iter().enumerate() {
                            write!(f, "\n  [{i}] {cube}")?;
                        }
                        Ok(())
                    }
                    _ => Ok(()),
                }
            }
        }
    }
}
