use num::BigRational;

use crate::renaming::Substitution;
use crate::sorts::Sort;

/// A sorted state variable. Two variables are the same entity iff both
/// name and sort are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    pub name: String,
    pub sort: Sort,
}

impl Variable {
    pub fn new(name: impl Into<String>, sort: Sort) -> Self {
        Self {
            name: name.into(),
            sort,
        }
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The closed operator set of the supported theories.
///
/// Indexed operators carry their numeric indices in the variant, so the
/// engines and backends dispatch over this enum exhaustively; operator
/// names only exist as strings inside the MoXI translator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Op {
    // Boolean connectives
    Not,
    Implies,
    And,
    Or,
    Xor,
    /// Equality, or iff on Bool operands.
    Eq,
    Ite,

    // Integer/real arithmetic
    Neg,
    Add,
    Sub,
    Mul,
    /// Real division `/`.
    Div,
    /// Integer division `div`.
    IntDiv,
    Mod,
    Abs,
    Divisible(u64),
    Le,
    Lt,
    Ge,
    Gt,
    ToReal,
    ToInt,
    IsInt,

    // Bit-vector
    BvAdd,
    BvSub,
    BvMul,
    BvUdiv,
    BvSdiv,
    BvUrem,
    BvSrem,
    BvAnd,
    BvOr,
    BvXor,
    BvNot,
    BvNeg,
    BvShl,
    BvLshr,
    BvAshr,
    BvUlt,
    BvUle,
    BvUgt,
    BvUge,
    BvSlt,
    BvSle,
    BvSgt,
    BvSge,
    Concat,
    Extract { high: u32, low: u32 },
    ZeroExtend(u32),
    SignExtend(u32),
    RotateLeft(u32),
    RotateRight(u32),

    // Arrays
    Select,
    Store,
}

/// Immutable expression tree over variables, literals and `Op` applications.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// Variable reference.
    Var(Variable),
    /// Boolean literal.
    BoolLit(bool),
    /// Integer literal.
    IntLit(i64),
    /// Exact rational literal.
    RealLit(BigRational),
    /// Fixed-width bit-vector literal.
    BvLit { bits: u64, width: u32 },
    /// Operator application.
    App(Op, Vec<Term>),
}

impl Term {
    pub fn var(v: Variable) -> Self {
        Term::Var(v)
    }

    pub fn bool(b: bool) -> Self {
        Term::BoolLit(b)
    }

    pub fn int(n: i64) -> Self {
        Term::IntLit(n)
    }

    pub fn real(r: BigRational) -> Self {
        Term::RealLit(r)
    }

    pub fn bv(bits: u64, width: u32) -> Self {
        Term::BvLit { bits, width }
    }

    /// N-ary conjunction; empty input collapses to `true`, a singleton to
    /// its only element.
    pub fn and(mut terms: Vec<Term>) -> Self {
        match terms.len() {
            0 => Term::BoolLit(true),
            1 => terms.remove(0),
            _ => Term::App(Op::And, terms),
        }
    }

    /// N-ary disjunction; empty input collapses to `false`.
    pub fn or(mut terms: Vec<Term>) -> Self {
        match terms.len() {
            0 => Term::BoolLit(false),
            1 => terms.remove(0),
            _ => Term::App(Op::Or, terms),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Term::App(Op::Not, vec![self])
    }

    pub fn implies(self, other: Term) -> Self {
        Term::App(Op::Implies, vec![self, other])
    }

    /// Equality; acts as iff on Bool operands.
    pub fn eq(self, other: Term) -> Self {
        Term::App(Op::Eq, vec![self, other])
    }

    pub fn neq(self, other: Term) -> Self {
        self.eq(other).not()
    }

    pub fn ite(self, then: Term, els: Term) -> Self {
        Term::App(Op::Ite, vec![self, then, els])
    }

    pub fn add(self, other: Term) -> Self {
        Term::App(Op::Add, vec![self, other])
    }

    pub fn sub(self, other: Term) -> Self {
        Term::App(Op::Sub, vec![self, other])
    }

    pub fn mul(self, other: Term) -> Self {
        Term::App(Op::Mul, vec![self, other])
    }

    pub fn lt(self, other: Term) -> Self {
        Term::App(Op::Lt, vec![self, other])
    }

    pub fn le(self, other: Term) -> Self {
        Term::App(Op::Le, vec![self, other])
    }

    pub fn gt(self, other: Term) -> Self {
        Term::App(Op::Gt, vec![self, other])
    }

    pub fn ge(self, other: Term) -> Self {
        Term::App(Op::Ge, vec![self, other])
    }

    /// Total structural substitution: every variable leaf present in the
    /// map is replaced, everywhere it occurs.
    pub fn substitute(&self, subs: &Substitution) -> Term {
        match self {
            Term::Var(v) => subs.get(v).cloned().unwrap_or_else(|| self.clone()),
            Term::BoolLit(_) | Term::IntLit(_) | Term::RealLit(_) | Term::BvLit { .. } => {
                self.clone()
            }
            Term::App(op, args) => Term::App(
                op.clone(),
                args.iter().map(|a| a.substitute(subs)).collect(),
            ),
        }
    }
}

/// A concrete value extracted from an oracle model.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Real(BigRational),
    BitVec { bits: u64, width: u32 },
}

impl Value {
    /// The literal term denoting this value.
    pub fn to_term(&self) -> Term {
        match self {
            Value::Bool(b) => Term::BoolLit(*b),
            Value::Int(n) => Term::IntLit(*n),
            Value::Real(r) => Term::RealLit(r.clone()),
            Value::BitVec { bits, width } => Term::BvLit {
                bits: *bits,
                width: *width,
            },
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::BitVec { bits, width } => {
                write!(f, "#b{bits:0width$b}", width = *width as usize)
            }
        }
    }
}
