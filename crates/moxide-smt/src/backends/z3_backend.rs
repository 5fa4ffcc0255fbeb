use std::collections::HashMap;

use num::{BigRational, ToPrimitive};
use thiserror::Error;
use z3::ast::Ast;
use z3::SatResult as Z3SatResult;

use moxide_ir::{Op, Sort, Term, Value};

use crate::oracle::{Model, Oracle, SatResult};

#[derive(Debug, Error)]
pub enum Z3Error {
    #[error("Z3 error: {0}")]
    Internal(String),
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),
    #[error("Sort mismatch: expected {expected}, got {found}")]
    SortMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// In-process Z3 oracle.
pub struct Z3Oracle {
    solver: z3::Solver,
    vars: HashMap<String, Z3Term>,
    params: Option<z3::Params>,
}

/// A translated term, tagged with its theory type.
#[derive(Clone)]
enum Z3Term {
    Bool(z3::ast::Bool),
    Int(z3::ast::Int),
    Real(z3::ast::Real),
    Bv(z3::ast::BV),
    /// Array node together with its index and value sorts, which drive
    /// the downcast of `select` results.
    Array(z3::ast::Array, Sort, Sort),
}

impl Z3Term {
    fn kind(&self) -> &'static str {
        match self {
            Z3Term::Bool(_) => "Bool",
            Z3Term::Int(_) => "Int",
            Z3Term::Real(_) => "Real",
            Z3Term::Bv(_) => "BitVec",
            Z3Term::Array(_, _, _) => "Array",
        }
    }

    fn into_bool(self) -> Result<z3::ast::Bool, Z3Error> {
        match self {
            Z3Term::Bool(b) => Ok(b),
            other => Err(Z3Error::SortMismatch {
                expected: "Bool",
                found: other.kind(),
            }),
        }
    }

    fn into_int(self) -> Result<z3::ast::Int, Z3Error> {
        match self {
            Z3Term::Int(i) => Ok(i),
            other => Err(Z3Error::SortMismatch {
                expected: "Int",
                found: other.kind(),
            }),
        }
    }

    fn into_real(self) -> Result<z3::ast::Real, Z3Error> {
        match self {
            Z3Term::Real(r) => Ok(r),
            other => Err(Z3Error::SortMismatch {
                expected: "Real",
                found: other.kind(),
            }),
        }
    }

    fn into_bv(self) -> Result<z3::ast::BV, Z3Error> {
        match self {
            Z3Term::Bv(bv) => Ok(bv),
            other => Err(Z3Error::SortMismatch {
                expected: "BitVec",
                found: other.kind(),
            }),
        }
    }

    fn into_dynamic(self) -> z3::ast::Dynamic {
        match self {
            Z3Term::Bool(b) => b.into(),
            Z3Term::Int(i) => i.into(),
            Z3Term::Real(r) => r.into(),
            Z3Term::Bv(bv) => bv.into(),
            Z3Term::Array(a, _, _) => a.into(),
        }
    }
}

fn z3_sort(sort: &Sort) -> z3::Sort {
    match sort {
        Sort::Bool => z3::Sort::bool(),
        Sort::Int => z3::Sort::int(),
        Sort::Real => z3::Sort::real(),
        Sort::BitVec(width) => z3::Sort::bitvector(*width),
        Sort::Array(index, value) => z3::Sort::array(&z3_sort(index), &z3_sort(value)),
    }
}

fn dynamic_to_term(node: z3::ast::Dynamic, sort: &Sort) -> Result<Z3Term, Z3Error> {
    match sort {
        Sort::Bool => node
            .as_bool()
            .map(Z3Term::Bool)
            .ok_or(Z3Error::SortMismatch {
                expected: "Bool",
                found: "other",
            }),
        Sort::Int => node
            .as_int()
            .map(Z3Term::Int)
            .ok_or(Z3Error::SortMismatch {
                expected: "Int",
                found: "other",
            }),
        Sort::Real => node
            .as_real()
            .map(Z3Term::Real)
            .ok_or(Z3Error::SortMismatch {
                expected: "Real",
                found: "other",
            }),
        Sort::BitVec(_) => node.as_bv().map(Z3Term::Bv).ok_or(Z3Error::SortMismatch {
            expected: "BitVec",
            found: "other",
        }),
        Sort::Array(index, value) => node
            .as_array()
            .map(|a| Z3Term::Array(a, (**index).clone(), (**value).clone()))
            .ok_or(Z3Error::SortMismatch {
                expected: "Array",
                found: "other",
            }),
    }
}

fn rational_to_real(r: &BigRational) -> Result<z3::ast::Real, Z3Error> {
    let num = r
        .numer()
        .to_i32()
        .ok_or_else(|| Z3Error::Internal(format!("real literal numerator out of range: {r}")))?;
    let den = r
        .denom()
        .to_i32()
        .ok_or_else(|| Z3Error::Internal(format!("real literal denominator out of range: {r}")))?;
    Ok(z3::ast::Real::from_real(num, den))
}

/// Rotation by a constant, composed from shifts so that the amount is
/// reduced modulo the width as SMT-LIB prescribes.
fn rotate(bv: &z3::ast::BV, width: u32, amount: u32, left: bool) -> z3::ast::BV {
    if width == 0 {
        return bv.clone();
    }
    let k = amount % width;
    if k == 0 {
        return bv.clone();
    }
    let near = z3::ast::BV::from_u64(u64::from(k), width);
    let far = z3::ast::BV::from_u64(u64::from(width - k), width);
    if left {
        bv.bvshl(&near).bvor(&bv.bvlshr(&far))
    } else {
        bv.bvlshr(&near).bvor(&bv.bvshl(&far))
    }
}

impl Z3Oracle {
    pub fn new() -> Self {
        Self {
            solver: z3::Solver::new(),
            vars: HashMap::new(),
            params: None,
        }
    }

    /// A solver whose individual queries give up after `timeout_secs`.
    /// A query that times out reports unknown, which the engines treat as
    /// a fatal oracle failure.
    pub fn with_timeout_secs(timeout_secs: u64) -> Self {
        if timeout_secs == 0 {
            return Self::new();
        }
        let solver = z3::Solver::new();
        let mut params = z3::Params::new();
        let timeout_ms = timeout_secs.saturating_mul(1000);
        params.set_u32("timeout", timeout_ms as u32);
        solver.set_params(&params);
        Self {
            solver,
            vars: HashMap::new(),
            params: Some(params),
        }
    }

    fn translate(&self, term: &Term) -> Result<Z3Term, Z3Error> {
        match term {
            Term::Var(v) => self
                .vars
                .get(&v.name)
                .cloned()
                .ok_or_else(|| Z3Error::UnknownVariable(v.name.clone())),
            Term::BoolLit(b) => Ok(Z3Term::Bool(z3::ast::Bool::from_bool(*b))),
            Term::IntLit(n) => Ok(Z3Term::Int(z3::ast::Int::from_i64(*n))),
            Term::RealLit(r) => Ok(Z3Term::Real(rational_to_real(r)?)),
            Term::BvLit { bits, width } => Ok(Z3Term::Bv(z3::ast::BV::from_u64(*bits, *width))),
            Term::App(op, args) => self.translate_app(op, args),
        }
    }

    fn translate_app(&self, op: &Op, args: &[Term]) -> Result<Z3Term, Z3Error> {
        match op {
            Op::Not => {
                let b = self.arg(args, 0)?.into_bool()?;
                Ok(Z3Term::Bool(b.not()))
            }
            Op::Implies => {
                let l = self.arg(args, 0)?.into_bool()?;
                let r = self.arg(args, 1)?.into_bool()?;
                Ok(Z3Term::Bool(l.implies(&r)))
            }
            Op::And => {
                let bools = self.bool_args(args)?;
                let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(z3::ast::Bool::and(&refs)))
            }
            Op::Or => {
                let bools = self.bool_args(args)?;
                let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(z3::ast::Bool::or(&refs)))
            }
            Op::Xor => {
                let l = self.arg(args, 0)?.into_bool()?;
                let r = self.arg(args, 1)?.into_bool()?;
                Ok(Z3Term::Bool(l.xor(&r)))
            }
            Op::Eq => {
                let l = self.arg(args, 0)?;
                let r = self.arg(args, 1)?;
                match (l, r) {
                    (Z3Term::Bool(a), Z3Term::Bool(b)) => Ok(Z3Term::Bool(a.eq(&b))),
                    (Z3Term::Int(a), Z3Term::Int(b)) => Ok(Z3Term::Bool(a.eq(&b))),
                    (Z3Term::Real(a), Z3Term::Real(b)) => Ok(Z3Term::Bool(a.eq(&b))),
                    (Z3Term::Bv(a), Z3Term::Bv(b)) => Ok(Z3Term::Bool(a.eq(&b))),
                    (Z3Term::Array(a, _, _), Z3Term::Array(b, _, _)) => {
                        Ok(Z3Term::Bool(a.eq(&b)))
                    }
                    (l, r) => Err(Z3Error::Internal(format!(
                        "sort mismatch in equality: {} vs {}",
                        l.kind(),
                        r.kind()
                    ))),
                }
            }
            Op::Ite => {
                let c = self.arg(args, 0)?.into_bool()?;
                let t = self.arg(args, 1)?;
                let e = self.arg(args, 2)?;
                match (t, e) {
                    (Z3Term::Bool(a), Z3Term::Bool(b)) => Ok(Z3Term::Bool(c.ite(&a, &b))),
                    (Z3Term::Int(a), Z3Term::Int(b)) => Ok(Z3Term::Int(c.ite(&a, &b))),
                    (Z3Term::Real(a), Z3Term::Real(b)) => Ok(Z3Term::Real(c.ite(&a, &b))),
                    (Z3Term::Bv(a), Z3Term::Bv(b)) => Ok(Z3Term::Bv(c.ite(&a, &b))),
                    (Z3Term::Array(a, i, v), Z3Term::Array(b, _, _)) => {
                        Ok(Z3Term::Array(c.ite(&a, &b), i, v))
                    }
                    (t, e) => Err(Z3Error::Internal(format!(
                        "sort mismatch in ite: {} vs {}",
                        t.kind(),
                        e.kind()
                    ))),
                }
            }
            Op::Neg => match self.arg(args, 0)? {
                Z3Term::Int(i) => Ok(Z3Term::Int(i.unary_minus())),
                Z3Term::Real(r) => Ok(Z3Term::Real(r.unary_minus())),
                other => Err(Z3Error::SortMismatch {
                    expected: "Int or Real",
                    found: other.kind(),
                }),
            },
            Op::Add | Op::Sub | Op::Mul => {
                let l = self.arg(args, 0)?;
                let r = self.arg(args, 1)?;
                match (l, r) {
                    (Z3Term::Int(a), Z3Term::Int(b)) => Ok(Z3Term::Int(match op {
                        Op::Add => &a + &b,
                        Op::Sub => &a - &b,
                        _ => &a * &b,
                    })),
                    (Z3Term::Real(a), Z3Term::Real(b)) => Ok(Z3Term::Real(match op {
                        Op::Add => &a + &b,
                        Op::Sub => &a - &b,
                        _ => &a * &b,
                    })),
                    (l, r) => Err(Z3Error::Internal(format!(
                        "sort mismatch in arithmetic: {} vs {}",
                        l.kind(),
                        r.kind()
                    ))),
                }
            }
            Op::Div => {
                let l = self.arg(args, 0)?.into_real()?;
                let r = self.arg(args, 1)?.into_real()?;
                Ok(Z3Term::Real(&l / &r))
            }
            Op::IntDiv => {
                let l = self.arg(args, 0)?.into_int()?;
                let r = self.arg(args, 1)?.into_int()?;
                Ok(Z3Term::Int(l.div(&r)))
            }
            Op::Mod => {
                let l = self.arg(args, 0)?.into_int()?;
                let r = self.arg(args, 1)?.into_int()?;
                Ok(Z3Term::Int(l.modulo(&r)))
            }
            Op::Abs => match self.arg(args, 0)? {
                Z3Term::Int(i) => {
                    let neg = i.unary_minus();
                    let cond = i.lt(&z3::ast::Int::from_i64(0));
                    Ok(Z3Term::Int(cond.ite(&neg, &i)))
                }
                Z3Term::Real(r) => {
                    let neg = r.unary_minus();
                    let cond = r.lt(&z3::ast::Real::from_real(0, 1));
                    Ok(Z3Term::Real(cond.ite(&neg, &r)))
                }
                other => Err(Z3Error::SortMismatch {
                    expected: "Int or Real",
                    found: other.kind(),
                }),
            },
            Op::Divisible(n) => {
                let l = self.arg(args, 0)?.into_int()?;
                let divisor = z3::ast::Int::from_i64(*n as i64);
                let zero = z3::ast::Int::from_i64(0);
                Ok(Z3Term::Bool(l.modulo(&divisor).eq(&zero)))
            }
            Op::Le | Op::Lt | Op::Ge | Op::Gt => {
                let l = self.arg(args, 0)?;
                let r = self.arg(args, 1)?;
                match (l, r) {
                    (Z3Term::Int(a), Z3Term::Int(b)) => Ok(Z3Term::Bool(match op {
                        Op::Le => a.le(&b),
                        Op::Lt => a.lt(&b),
                        Op::Ge => a.ge(&b),
                        _ => a.gt(&b),
                    })),
                    (Z3Term::Real(a), Z3Term::Real(b)) => Ok(Z3Term::Bool(match op {
                        Op::Le => a.le(&b),
                        Op::Lt => a.lt(&b),
                        Op::Ge => a.ge(&b),
                        _ => a.gt(&b),
                    })),
                    (l, r) => Err(Z3Error::Internal(format!(
                        "sort mismatch in comparison: {} vs {}",
                        l.kind(),
                        r.kind()
                    ))),
                }
            }
            Op::ToReal => {
                let i = self.arg(args, 0)?.into_int()?;
                Ok(Z3Term::Real(i.to_real()))
            }
            Op::ToInt => {
                let r = self.arg(args, 0)?.into_real()?;
                Ok(Z3Term::Int(r.to_int()))
            }
            Op::IsInt => {
                let r = self.arg(args, 0)?.into_real()?;
                // is_int(r) <=> to_real(to_int(r)) = r
                Ok(Z3Term::Bool(r.to_int().to_real().eq(&r)))
            }
            Op::BvAdd | Op::BvSub | Op::BvMul | Op::BvUdiv | Op::BvSdiv | Op::BvUrem
            | Op::BvSrem | Op::BvAnd | Op::BvOr | Op::BvXor | Op::BvShl | Op::BvLshr
            | Op::BvAshr => {
                let l = self.arg(args, 0)?.into_bv()?;
                let r = self.arg(args, 1)?.into_bv()?;
                Ok(Z3Term::Bv(match op {
                    Op::BvAdd => &l + &r,
                    Op::BvSub => &l - &r,
                    Op::BvMul => &l * &r,
                    Op::BvUdiv => l.bvudiv(&r),
                    Op::BvSdiv => l.bvsdiv(&r),
                    Op::BvUrem => l.bvurem(&r),
                    Op::BvSrem => l.bvsrem(&r),
                    Op::BvAnd => l.bvand(&r),
                    Op::BvOr => l.bvor(&r),
                    Op::BvXor => l.bvxor(&r),
                    Op::BvShl => l.bvshl(&r),
                    Op::BvLshr => l.bvlshr(&r),
                    _ => l.bvashr(&r),
                }))
            }
            Op::BvNot => {
                let bv = self.arg(args, 0)?.into_bv()?;
                Ok(Z3Term::Bv(bv.bvnot()))
            }
            Op::BvNeg => {
                let bv = self.arg(args, 0)?.into_bv()?;
                Ok(Z3Term::Bv(bv.bvneg()))
            }
            Op::BvUlt | Op::BvUle | Op::BvUgt | Op::BvUge | Op::BvSlt | Op::BvSle
            | Op::BvSgt | Op::BvSge => {
                let l = self.arg(args, 0)?.into_bv()?;
                let r = self.arg(args, 1)?.into_bv()?;
                Ok(Z3Term::Bool(match op {
                    Op::BvUlt => l.bvult(&r),
                    Op::BvUle => l.bvule(&r),
                    Op::BvUgt => l.bvugt(&r),
                    Op::BvUge => l.bvuge(&r),
                    Op::BvSlt => l.bvslt(&r),
                    Op::BvSle => l.bvsle(&r),
                    Op::BvSgt => l.bvsgt(&r),
                    _ => l.bvsge(&r),
                }))
            }
            Op::Concat => {
                let l = self.arg(args, 0)?.into_bv()?;
                let r = self.arg(args, 1)?.into_bv()?;
                Ok(Z3Term::Bv(l.concat(&r)))
            }
            Op::Extract { high, low } => {
                let bv = self.arg(args, 0)?.into_bv()?;
                Ok(Z3Term::Bv(bv.extract(*high, *low)))
            }
            Op::ZeroExtend(n) => {
                let bv = self.arg(args, 0)?.into_bv()?;
                Ok(Z3Term::Bv(bv.zero_ext(*n)))
            }
            Op::SignExtend(n) => {
                let bv = self.arg(args, 0)?.into_bv()?;
                Ok(Z3Term::Bv(bv.sign_ext(*n)))
            }
            Op::RotateLeft(n) => {
                let bv = self.arg(args, 0)?.into_bv()?;
                let width = bv.get_size();
                Ok(Z3Term::Bv(rotate(&bv, width, *n, true)))
            }
            Op::RotateRight(n) => {
                let bv = self.arg(args, 0)?.into_bv()?;
                let width = bv.get_size();
                Ok(Z3Term::Bv(rotate(&bv, width, *n, false)))
            }
            Op::Select => {
                let arr = self.arg(args, 0)?;
                let (arr, value_sort) = match arr {
                    Z3Term::Array(a, _, v) => (a, v),
                    other => {
                        return Err(Z3Error::SortMismatch {
                            expected: "Array",
                            found: other.kind(),
                        })
                    }
                };
                let idx = self.arg(args, 1)?.into_dynamic();
                dynamic_to_term(arr.select(&idx), &value_sort)
            }
            Op::Store => {
                let arr = self.arg(args, 0)?;
                let (arr, index_sort, value_sort) = match arr {
                    Z3Term::Array(a, i, v) => (a, i, v),
                    other => {
                        return Err(Z3Error::SortMismatch {
                            expected: "Array",
                            found: other.kind(),
                        })
                    }
                };
                let idx = self.arg(args, 1)?.into_dynamic();
                let val = self.arg(args, 2)?.into_dynamic();
                Ok(Z3Term::Array(arr.store(&idx, &val), index_sort, value_sort))
            }
        }
    }

    fn arg(&self, args: &[Term], i: usize) -> Result<Z3Term, Z3Error> {
        let term = args
            .get(i)
            .ok_or_else(|| Z3Error::Internal(format!("missing operand {i}")))?;
        self.translate(term)
    }

    fn bool_args(&self, args: &[Term]) -> Result<Vec<z3::ast::Bool>, Z3Error> {
        args.iter()
            .map(|t| self.translate(t).and_then(Z3Term::into_bool))
            .collect()
    }
}

impl Default for Z3Oracle {
    fn default() -> Self {
        Self::new()
    }
}

impl Oracle for Z3Oracle {
    type Error = Z3Error;

    fn declare_var(&mut self, name: &str, sort: &Sort) -> Result<(), Z3Error> {
        let node = match sort {
            Sort::Bool => Z3Term::Bool(z3::ast::Bool::new_const(name)),
            Sort::Int => Z3Term::Int(z3::ast::Int::new_const(name)),
            Sort::Real => Z3Term::Real(z3::ast::Real::new_const(name)),
            Sort::BitVec(width) => Z3Term::Bv(z3::ast::BV::new_const(name, *width)),
            Sort::Array(index, value) => Z3Term::Array(
                z3::ast::Array::new_const(name, &z3_sort(index), &z3_sort(value)),
                (**index).clone(),
                (**value).clone(),
            ),
        };
        self.vars.insert(name.to_string(), node);
        Ok(())
    }

    fn assert(&mut self, term: &Term) -> Result<(), Z3Error> {
        let b = self.translate(term)?.into_bool()?;
        self.solver.assert(&b);
        Ok(())
    }

    fn push(&mut self) -> Result<(), Z3Error> {
        self.solver.push();
        Ok(())
    }

    fn pop(&mut self) -> Result<(), Z3Error> {
        self.solver.pop(1);
        Ok(())
    }

    fn check_sat(&mut self) -> Result<SatResult, Z3Error> {
        match self.solver.check() {
            Z3SatResult::Sat => Ok(SatResult::Sat),
            Z3SatResult::Unsat => Ok(SatResult::Unsat),
            Z3SatResult::Unknown => Ok(SatResult::Unknown(
                self.solver
                    .get_reason_unknown()
                    .unwrap_or_else(|| "Z3 returned unknown".into()),
            )),
        }
    }

    fn check_sat_with_model(
        &mut self,
        vars: &[(&str, &Sort)],
    ) -> Result<(SatResult, Option<Model>), Z3Error> {
        match self.check_sat()? {
            SatResult::Sat => {}
            other => return Ok((other, None)),
        }
        let z3_model = self
            .solver
            .get_model()
            .ok_or_else(|| Z3Error::Internal("SAT but no model available".into()))?;

        let mut model = Model::default();
        for &(name, sort) in vars {
            let Some(node) = self.vars.get(name) else {
                continue;
            };
            let value = match (node, sort) {
                (Z3Term::Bool(v), Sort::Bool) => z3_model
                    .eval(v, true)
                    .and_then(|val| val.as_bool())
                    .map(Value::Bool),
                (Z3Term::Int(v), Sort::Int) => z3_model
                    .eval(v, true)
                    .and_then(|val| val.as_i64())
                    .map(Value::Int),
                (Z3Term::Real(v), Sort::Real) => z3_model
                    .eval(v, true)
                    .and_then(|val| val.as_rational())
                    .map(|(num, den)| Value::Real(BigRational::new(num.into(), den.into()))),
                (Z3Term::Bv(v), Sort::BitVec(width)) => z3_model
                    .eval(v, true)
                    .and_then(|val| val.as_u64())
                    .map(|bits| Value::BitVec {
                        bits,
                        width: *width,
                    }),
                // Array values have no scalar representation; leave them out.
                _ => None,
            };
            if let Some(value) = value {
                model.values.insert(name.to_string(), value);
            }
        }
        Ok((SatResult::Sat, Some(model)))
    }

    fn reset(&mut self) -> Result<(), Z3Error> {
        self.solver.reset();
        // Z3 may drop per-solver parameters on reset; reapply the timeout.
        if let Some(params) = &self.params {
            self.solver.set_params(params);
        }
        self.vars.clear();
        Ok(())
    }
}
