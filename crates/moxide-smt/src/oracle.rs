use std::collections::HashMap;

use moxide_ir::{Sort, Term, Value};

/// Result of a satisfiability check.
#[derive(Debug, Clone, PartialEq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown(String),
}

/// Variable assignments extracted from a satisfiable query.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub values: HashMap<String, Value>,
}

impl Model {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(Value::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}

/// The external decision procedure consumed by the engines.
///
/// An implementation owns whatever solver-side resources it needs and
/// releases them when dropped; engines acquire an oracle at construction
/// and hold it for their whole lifetime.
pub trait Oracle {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Declare a sorted constant. Declaring the same name twice with the
    /// same sort is permitted and idempotent in effect.
    fn declare_var(&mut self, name: &str, sort: &Sort) -> Result<(), Self::Error>;

    /// Assert a boolean term into the current scope.
    fn assert(&mut self, term: &Term) -> Result<(), Self::Error>;

    /// Push a scope checkpoint.
    fn push(&mut self) -> Result<(), Self::Error>;

    /// Pop to the previous checkpoint.
    fn pop(&mut self) -> Result<(), Self::Error>;

    /// Check satisfiability of the asserted scope content.
    fn check_sat(&mut self) -> Result<SatResult, Self::Error>;

    /// Check satisfiability and, if satisfiable, extract values for the
    /// given variables. Variables whose values the backend cannot
    /// represent are absent from the model.
    fn check_sat_with_model(
        &mut self,
        vars: &[(&str, &Sort)],
    ) -> Result<(SatResult, Option<Model>), Self::Error>;

    /// Drop all assertions and declarations.
    fn reset(&mut self) -> Result<(), Self::Error>;
}
