//! Typed abstract syntax for the MoXI-JSON command stream.

use serde::Deserialize;

/// One command of the input sequence. Commands the checker does not
/// consume (declarations, enumerations, ...) deserialize as
/// `Unsupported` and are skipped.
#[derive(Debug, Deserialize)]
#[serde(tag = "command")]
pub enum Command {
    #[serde(rename = "set-logic")]
    SetLogic { logic: String },
    #[serde(rename = "define-system")]
    DefineSystem(DefineSystemCommand),
    #[serde(rename = "check-system")]
    CheckSystem(CheckSystemCommand),
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
pub struct DefineSystemCommand {
    pub symbol: String,
    #[serde(default)]
    pub input: Vec<VarDecl>,
    #[serde(default)]
    pub output: Vec<VarDecl>,
    #[serde(default)]
    pub local: Vec<VarDecl>,
    pub init: TermNode,
    pub trans: TermNode,
    pub inv: TermNode,
    /// Sub-system composition is unsupported; a non-empty list is
    /// rejected during translation.
    #[serde(default)]
    pub subsys: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct CheckSystemCommand {
    pub symbol: String,
    #[serde(default)]
    pub input: Vec<VarDecl>,
    #[serde(default)]
    pub output: Vec<VarDecl>,
    #[serde(default)]
    pub local: Vec<VarDecl>,
    #[serde(default)]
    pub reachable: Vec<NamedFormula>,
    #[serde(default)]
    pub query: Vec<QueryEntry>,
}

/// A named "reachable" predicate declared by a check-system command.
#[derive(Debug, Deserialize)]
pub struct NamedFormula {
    pub symbol: String,
    pub formula: TermNode,
}

/// A query referencing declared predicates by name.
#[derive(Debug, Deserialize)]
pub struct QueryEntry {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub formulas: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct VarDecl {
    pub symbol: String,
    pub sort: SortNode,
}

#[derive(Debug, Deserialize)]
pub struct SortNode {
    pub identifier: SortIdentifier,
    #[serde(default)]
    pub parameters: Vec<SortNode>,
}

#[derive(Debug, Deserialize)]
pub struct SortIdentifier {
    pub symbol: String,
    #[serde(default)]
    pub indices: Vec<u32>,
}

/// A term: a leaf (variable reference, primed reference, literal) or an
/// operator application with optional numeric indices.
#[derive(Debug, Deserialize)]
pub struct TermNode {
    pub identifier: Identifier,
    #[serde(default)]
    pub args: Vec<TermNode>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    /// A leaf: variable, primed variable (`x'`), or literal token.
    Leaf(String),
    /// An operator, possibly with indices (extract, extend, rotate, ...).
    Operator {
        symbol: String,
        #[serde(default)]
        indices: Vec<u64>,
    },
}
