#![doc = include_str!("../README.md")]

pub mod renaming;
pub mod sorts;
pub mod system;
pub mod terms;

pub use renaming::{at_step, next_var, prime_map, step_map, Substitution};
pub use sorts::Sort;
pub use system::{Logic, SystemError, TransitionSystem};
pub use terms::{Op, Term, Value, Variable};
