use std::str::FromStr;

use thiserror::Error;

use crate::terms::{Term, Variable};

/// The fixed set of supported theories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Logic {
    QfLia,
    QfNia,
    QfLra,
    QfNra,
    QfBv,
    QfAbv,
}

impl Logic {
    pub fn is_int(self) -> bool {
        matches!(self, Logic::QfLia | Logic::QfNia)
    }

    pub fn is_real(self) -> bool {
        matches!(self, Logic::QfLra | Logic::QfNra)
    }

    pub fn is_bv(self) -> bool {
        matches!(self, Logic::QfBv | Logic::QfAbv)
    }

    pub fn name(self) -> &'static str {
        match self {
            Logic::QfLia => "QF_LIA",
            Logic::QfNia => "QF_NIA",
            Logic::QfLra => "QF_LRA",
            Logic::QfNra => "QF_NRA",
            Logic::QfBv => "QF_BV",
            Logic::QfAbv => "QF_ABV",
        }
    }
}

impl std::fmt::Display for Logic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SystemError {
    #[error("set-logic '{0}' is not supported")]
    UnsupportedLogic(String),
    #[error("system '{0}' declares sub-systems, which are not supported")]
    SubsystemsUnsupported(String),
}

impl FromStr for Logic {
    type Err = SystemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QF_LIA" => Ok(Logic::QfLia),
            "QF_NIA" => Ok(Logic::QfNia),
            "QF_LRA" => Ok(Logic::QfLra),
            "QF_NRA" => Ok(Logic::QfNra),
            "QF_BV" => Ok(Logic::QfBv),
            "QF_ABV" => Ok(Logic::QfAbv),
            other => Err(SystemError::UnsupportedLogic(other.to_string())),
        }
    }
}

/// A symbolic transition system. Immutable once constructed; engines only
/// ever read it, so independent engine instances may share one by
/// reference.
///
/// Variable order is significant: substitution maps and cube constructions
/// iterate it, which is what makes time-step assignment reproducible.
#[derive(Debug, Clone)]
pub struct TransitionSystem {
    name: String,
    logic: Logic,
    variables: Vec<Variable>,
    init: Term,
    trans: Term,
    inv: Term,
}

impl TransitionSystem {
    /// `init` and `inv` range over `variables`; `trans` additionally over
    /// their primed forms. Sub-system composition is rejected by the
    /// front end before this constructor runs.
    pub fn new(
        name: impl Into<String>,
        logic: Logic,
        variables: Vec<Variable>,
        init: Term,
        trans: Term,
        inv: Term,
    ) -> Self {
        Self {
            name: name.into(),
            logic,
            variables,
            init,
            trans,
            inv,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn logic(&self) -> Logic {
        self.logic
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn init(&self) -> &Term {
        &self.init
    }

    pub fn trans(&self) -> &Term {
        &self.trans
    }

    pub fn inv(&self) -> &Term {
        &self.inv
    }
}
