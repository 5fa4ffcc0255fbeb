use miette::Diagnostic;
use thiserror::Error;

use moxide_ir::{Logic, SystemError};

/// Fatal conditions detected while translating the MoXI-JSON input.
/// Translation aborts on the first error; nothing is downgraded.
#[derive(Debug, Error, Diagnostic)]
pub enum TranslateError {
    #[error("no set-logic command in the input")]
    #[diagnostic(code(moxide::moxi::no_logic))]
    NoLogic,

    #[error("no check-system command in the input")]
    #[diagnostic(code(moxide::moxi::no_check))]
    NoCheckSystem,

    #[error("system '{0}' to be checked is not defined")]
    #[diagnostic(code(moxide::moxi::undefined_system))]
    SystemNotDefined(String),

    #[error("no query references a declared reachability predicate")]
    #[diagnostic(code(moxide::moxi::no_query))]
    NoQuery,

    #[error(transparent)]
    #[diagnostic(
        code(moxide::moxi::system),
        help("supported logics are QF_LIA, QF_NIA, QF_LRA, QF_NRA, QF_BV and QF_ABV; sub-systems are not supported")
    )]
    System(#[from] SystemError),

    #[error("unknown sort '{0}'")]
    #[diagnostic(code(moxide::moxi::unknown_sort))]
    UnknownSort(String),

    #[error("sort '{sort}' is malformed: {detail}")]
    #[diagnostic(code(moxide::moxi::invalid_sort))]
    InvalidSort { sort: String, detail: String },

    #[error("unknown operator '{0}'")]
    #[diagnostic(code(moxide::moxi::unknown_operator))]
    UnknownSymbol(String),

    #[error("unknown identifier '{0}'")]
    #[diagnostic(code(moxide::moxi::unknown_identifier))]
    UnknownIdentifier(String),

    #[error("invalid bit-vector literal '{0}'")]
    #[diagnostic(code(moxide::moxi::invalid_bv_literal))]
    InvalidBvLiteral(String),

    #[error("invalid numeral '{0}' for logic {1}")]
    #[diagnostic(code(moxide::moxi::invalid_numeral))]
    InvalidNumeral(String, Logic),

    #[error("operator '{op}' expects {expected} operand(s), found {found}")]
    #[diagnostic(code(moxide::moxi::arity))]
    BadArity {
        op: String,
        expected: usize,
        found: usize,
    },

    #[error("operator '{op}' expects {expected} index(es), found {found}")]
    #[diagnostic(code(moxide::moxi::indices))]
    BadIndices {
        op: String,
        expected: usize,
        found: usize,
    },

    #[error("malformed MoXI-JSON input")]
    #[diagnostic(code(moxide::moxi::json))]
    Json(#[from] serde_json::Error),
}
