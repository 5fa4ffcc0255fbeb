//! Algorithm selection: thin glue mapping configuration to one of the
//! engines over one of the backends.

use std::str::FromStr;
use std::time::{Duration, Instant};

use tracing::info;

use moxide_ir::{Term, TransitionSystem};
use moxide_smt::backends::{Cvc5Oracle, Z3Oracle};
use moxide_smt::Oracle;

use crate::bmc::{BmcInduction, BmcInductionIncr};
use crate::error::CheckError;
use crate::pdr::Pdr;
use crate::result::Verdict;

/// The model-checking algorithms offered by the selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Falsification only.
    Bmc,
    /// Falsification interleaved with k-induction.
    KInduction,
    /// Backward reachability over frames.
    Pdr,
}

impl FromStr for Algorithm {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bmc" => Ok(Algorithm::Bmc),
            "kind" => Ok(Algorithm::KInduction),
            "pdr" => Ok(Algorithm::Pdr),
            other => Err(CheckError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Bmc => f.write_str("bmc"),
            Algorithm::KInduction => f.write_str("kind"),
            Algorithm::Pdr => f.write_str("pdr"),
        }
    }
}

/// The interchangeable oracle backends, selected by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverChoice {
    Z3,
    Cvc5,
}

impl FromStr for SolverChoice {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "z3" => Ok(SolverChoice::Z3),
            "cvc5" => Ok(SolverChoice::Cvc5),
            other => Err(CheckError::UnsupportedBackend(other.to_string())),
        }
    }
}

impl std::fmt::Display for SolverChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverChoice::Z3 => f.write_str("z3"),
            SolverChoice::Cvc5 => f.write_str("cvc5"),
        }
    }
}

/// Configuration for one verification run.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub algorithm: Algorithm,
    pub solver: SolverChoice,
    /// Strengthen k-induction with the simple-path constraint.
    pub use_simple_path: bool,
    /// Accumulate assertions across bounds instead of re-unrolling.
    pub incremental: bool,
    /// Optional wall-clock budget; the run aborts with
    /// [`CheckError::Cancelled`] when it expires.
    pub timeout: Option<Duration>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::KInduction,
            solver: SolverChoice::Z3,
            use_simple_path: true,
            incremental: false,
            timeout: None,
        }
    }
}

/// Decide whether a state satisfying `target` is reachable in `system`.
///
/// The engines check the negated target ("the target is never reached");
/// the verdict is reported back in terms of reachability.
pub fn check_reachability(
    system: &TransitionSystem,
    target: &Term,
    options: &CheckOptions,
) -> Result<Verdict, CheckError> {
    let property = target.clone().not();
    let deadline = options.timeout.map(|t| Instant::now() + t);
    let per_query_secs = options.timeout.map(|t| t.as_secs().max(1)).unwrap_or(0);
    info!(
        system = %system.name(),
        algorithm = %options.algorithm,
        solver = %options.solver,
        "starting verification"
    );
    match options.solver {
        SolverChoice::Z3 => run_engine(system, &property, options, deadline, || {
            Ok(Z3Oracle::with_timeout_secs(per_query_secs))
        }),
        SolverChoice::Cvc5 => run_engine(system, &property, options, deadline, || {
            Cvc5Oracle::with_timeout_secs(system.logic(), per_query_secs)
                .map_err(CheckError::oracle)
        }),
    }
}

fn run_engine<O, F>(
    system: &TransitionSystem,
    property: &Term,
    options: &CheckOptions,
    deadline: Option<Instant>,
    mut mk_oracle: F,
) -> Result<Verdict, CheckError>
where
    O: Oracle,
    F: FnMut() -> Result<O, CheckError>,
{
    match options.algorithm {
        Algorithm::Bmc | Algorithm::KInduction => {
            let check_induction = options.algorithm == Algorithm::KInduction;
            if options.incremental {
                let mut engine = BmcInductionIncr::new(
                    system,
                    mk_oracle()?,
                    mk_oracle()?,
                    check_induction,
                    options.use_simple_path,
                )
                .with_deadline(deadline);
                engine.check_property(property)
            } else {
                let mut engine = BmcInduction::new(
                    system,
                    mk_oracle()?,
                    mk_oracle()?,
                    check_induction,
                    options.use_simple_path,
                )
                .with_deadline(deadline);
                engine.check_property(property)
            }
        }
        Algorithm::Pdr => {
            let mut engine = Pdr::new(system, mk_oracle()?)?.with_deadline(deadline);
            engine.check_property(property)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_names_round_trip() {
        for name in ["bmc", "kind", "pdr"] {
            let algorithm: Algorithm = name.parse().expect("supported algorithm");
            assert_eq!(algorithm.to_string(), name);
        }
    }

    #[test]
    fn unsupported_algorithm_is_a_configuration_error() {
        let err = "ic3ia".parse::<Algorithm>().unwrap_err();
        assert!(matches!(err, CheckError::UnsupportedAlgorithm(name) if name == "ic3ia"));
    }

    #[test]
    fn unsupported_backend_is_a_configuration_error() {
        let err = "msat".parse::<SolverChoice>().unwrap_err();
        assert!(matches!(err, CheckError::UnsupportedBackend(name) if name == "msat"));
    }

    #[test]
    fn defaults_match_the_documented_configuration() {
        let options = CheckOptions::default();
        assert_eq!(options.algorithm, Algorithm::KInduction);
        assert_eq!(options.solver, SolverChoice::Z3);
        assert!(options.use_simple_path);
        assert!(!options.incremental);
        assert!(options.timeout.is_none());
    }
}
