//! Timed and primed variable renaming.
//!
//! Engines never invent fresh variables directly; every renamed variable is
//! derived here, deterministically, so that two runs over the same system
//! assign time steps identically.

use indexmap::IndexMap;

use crate::terms::{Term, Variable};

/// The next-state (primed) counterpart of a state variable.
///
/// The mapping is a fixed bijection: the name deterministically encodes
/// "next of v" and the sort is preserved.
pub fn next_var(v: &Variable) -> Variable {
    Variable::new(format!("next({})", v.name), v.sort.clone())
}

/// The step-`i` counterpart of a state variable.
///
/// Injective in `(v, i)`: no two distinct (variable, step) pairs collide.
pub fn at_step(v: &Variable, step: usize) -> Variable {
    Variable::new(format!("{}@{step}", v.name), v.sort.clone())
}

/// An immutable mapping from variables to replacement terms, keyed by
/// variable identity (name and sort) and preserving insertion order.
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    map: IndexMap<Variable, Term>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `var` to `term`. A later insert for the same variable wins;
    /// the per-step map below relies on this for its precedence rule.
    pub fn insert(&mut self, var: Variable, term: Term) {
        self.map.insert(var, term);
    }

    pub fn get(&self, var: &Variable) -> Option<&Term> {
        self.map.get(var)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

/// Map from every state variable to its primed form.
pub fn prime_map(variables: &[Variable]) -> Substitution {
    let mut subs = Substitution::new();
    for v in variables {
        subs.insert(v.clone(), Term::var(next_var(v)));
    }
    subs
}

/// Map from `x` to `x@i` and from `next(x)` to `x@(i+1)`, for all state
/// variables `x`. Applied to the transition term this yields the
/// time-indexed constraint for the step from `i` to `i+1`.
///
/// Primed entries are inserted after base entries, so on a (nominally
/// impossible) key collision the primed binding takes precedence.
pub fn step_map(variables: &[Variable], step: usize) -> Substitution {
    let mut subs = Substitution::new();
    for v in variables {
        subs.insert(v.clone(), Term::var(at_step(v, step)));
    }
    for v in variables {
        subs.insert(next_var(v), Term::var(at_step(v, step + 1)));
    }
    subs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sorts::Sort;

    fn x() -> Variable {
        Variable::new("x", Sort::Int)
    }

    #[test]
    fn timed_views_are_distinct_across_steps_and_preserve_sort() {
        let v = Variable::new("b", Sort::BitVec(8));
        let t1 = at_step(&v, 1);
        let t2 = at_step(&v, 2);
        assert_ne!(t1, t2);
        assert_eq!(t1.sort, v.sort);
        assert_eq!(t2.sort, v.sort);
    }

    #[test]
    fn timed_views_are_injective_in_variable_and_step() {
        let a = Variable::new("a", Sort::Int);
        let b = Variable::new("b", Sort::Int);
        assert_ne!(at_step(&a, 3), at_step(&b, 3));
        assert_ne!(at_step(&a, 3), at_step(&a, 4));
    }

    #[test]
    fn next_is_distinct_from_every_timed_view() {
        let v = x();
        let n = next_var(&v);
        assert_eq!(n.sort, v.sort);
        for i in 0..16 {
            assert_ne!(n, at_step(&v, i));
        }
    }

    #[test]
    fn next_is_deterministic() {
        assert_eq!(next_var(&x()), next_var(&x()));
    }

    #[test]
    fn step_map_binds_base_and_primed_forms() {
        let vars = vec![x()];
        let subs = step_map(&vars, 4);
        assert_eq!(subs.len(), 2);
        assert_eq!(subs.get(&x()), Some(&Term::var(at_step(&x(), 4))));
        assert_eq!(
            subs.get(&next_var(&x())),
            Some(&Term::var(at_step(&x(), 5)))
        );
    }

    #[test]
    fn step_map_times_transition_step() {
        // next(x) = x + 1, shifted to the step from 2 to 3.
        let trans = Term::var(next_var(&x())).eq(Term::var(x()).add(Term::int(1)));
        let timed = trans.substitute(&step_map(&[x()], 2));
        let expected =
            Term::var(at_step(&x(), 3)).eq(Term::var(at_step(&x(), 2)).add(Term::int(1)));
        assert_eq!(timed, expected);
    }

    #[test]
    fn later_insert_takes_precedence() {
        let mut subs = Substitution::new();
        subs.insert(x(), Term::int(1));
        subs.insert(x(), Term::int(2));
        assert_eq!(subs.get(&x()), Some(&Term::int(2)));
        assert_eq!(subs.len(), 1);
    }
}
