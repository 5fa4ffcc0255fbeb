//! Translation from the MoXI-JSON abstract syntax to the symbolic data
//! model. Operator names are matched as strings exactly once, here;
//! everything downstream dispatches over the closed `Op` enumeration.

use indexmap::IndexMap;
use num::{BigInt, BigRational, Num};

use moxide_ir::{next_var, Logic, Op, Sort, SystemError, Term, TransitionSystem, Variable};

use crate::ast::{
    CheckSystemCommand, Command, DefineSystemCommand, Identifier, SortNode, TermNode, VarDecl,
};
use crate::errors::TranslateError;

/// A translated verification task: the system under check and the target
/// predicate of the first query.
#[derive(Debug)]
pub struct VerificationTask {
    pub system: TransitionSystem,
    pub query_name: String,
    pub query: Term,
}

/// Parse a MoXI-JSON document and translate it.
pub fn parse_task(source: &str) -> Result<VerificationTask, TranslateError> {
    let commands: Vec<Command> = serde_json::from_str(source)?;
    translate(&commands)
}

/// Translate an already-parsed command sequence.
///
/// The logic is resolved first, so an unsupported theory aborts before
/// any term is constructed; sub-systems are rejected before any engine
/// could be built.
pub fn translate(commands: &[Command]) -> Result<VerificationTask, TranslateError> {
    let logic = find_logic(commands)?;
    let check = find_check_system(commands)?;
    let define = find_define_system(commands, &check.symbol)?;
    let system = build_system(define, logic)?;
    let (query_name, query) = build_query(check, logic)?;
    Ok(VerificationTask {
        system,
        query_name,
        query,
    })
}

/// The first set-logic command decides the theory.
fn find_logic(commands: &[Command]) -> Result<Logic, TranslateError> {
    for command in commands {
        if let Command::SetLogic { logic } = command {
            return logic.parse::<Logic>().map_err(TranslateError::from);
        }
    }
    Err(TranslateError::NoLogic)
}

fn find_check_system(commands: &[Command]) -> Result<&CheckSystemCommand, TranslateError> {
    for command in commands {
        if let Command::CheckSystem(check) = command {
            return Ok(check);
        }
    }
    Err(TranslateError::NoCheckSystem)
}

fn find_define_system<'a>(
    commands: &'a [Command],
    symbol: &str,
) -> Result<&'a DefineSystemCommand, TranslateError> {
    for command in commands {
        if let Command::DefineSystem(define) = command {
            if define.symbol == symbol {
                return Ok(define);
            }
        }
    }
    Err(TranslateError::SystemNotDefined(symbol.to_string()))
}

fn build_system(
    define: &DefineSystemCommand,
    logic: Logic,
) -> Result<TransitionSystem, TranslateError> {
    if !define.subsys.is_empty() {
        return Err(SystemError::SubsystemsUnsupported(define.symbol.clone()).into());
    }
    let variables = collect_variables(&define.input, &define.output, &define.local)?;
    let init = build_term(logic, &variables, &define.init)?;
    let trans = build_term(logic, &variables, &define.trans)?;
    let inv = build_term(logic, &variables, &define.inv)?;
    let ordered: Vec<Variable> = variables.into_values().collect();
    Ok(TransitionSystem::new(
        define.symbol.clone(),
        logic,
        ordered,
        init,
        trans,
        inv,
    ))
}

/// The first query formula that names a declared reachability predicate
/// becomes the target.
fn build_query(
    check: &CheckSystemCommand,
    logic: Logic,
) -> Result<(String, Term), TranslateError> {
    let variables = collect_variables(&check.input, &check.output, &check.local)?;
    for query in &check.query {
        for formula_name in &query.formulas {
            for reachable in &check.reachable {
                if reachable.symbol == *formula_name {
                    let term = build_term(logic, &variables, &reachable.formula)?;
                    return Ok((reachable.symbol.clone(), term));
                }
            }
        }
    }
    Err(TranslateError::NoQuery)
}

/// Declaration-ordered variable map over the input, output and local
/// sections.
fn collect_variables(
    input: &[VarDecl],
    output: &[VarDecl],
    local: &[VarDecl],
) -> Result<IndexMap<String, Variable>, TranslateError> {
    let mut variables = IndexMap::new();
    for decl in input.iter().chain(output).chain(local) {
        let sort = build_sort(&decl.sort)?;
        variables.insert(
            decl.symbol.clone(),
            Variable::new(decl.symbol.clone(), sort),
        );
    }
    Ok(variables)
}

fn build_sort(node: &SortNode) -> Result<Sort, TranslateError> {
    match node.identifier.symbol.as_str() {
        "Bool" => Ok(Sort::Bool),
        "Int" => Ok(Sort::Int),
        "Real" => Ok(Sort::Real),
        "BitVec" => {
            let width = node.identifier.indices.first().ok_or_else(|| {
                TranslateError::InvalidSort {
                    sort: "BitVec".into(),
                    detail: "missing width index".into(),
                }
            })?;
            Ok(Sort::BitVec(*width))
        }
        "Array" => {
            let [index, value] = node.parameters.as_slice() else {
                return Err(TranslateError::InvalidSort {
                    sort: "Array".into(),
                    detail: "expected exactly two sort parameters".into(),
                });
            };
            Ok(Sort::array(build_sort(index)?, build_sort(value)?))
        }
        other => Err(TranslateError::UnknownSort(other.to_string())),
    }
}

fn build_term(
    logic: Logic,
    variables: &IndexMap<String, Variable>,
    node: &TermNode,
) -> Result<Term, TranslateError> {
    match &node.identifier {
        Identifier::Operator { symbol, indices } => {
            let args = node
                .args
                .iter()
                .map(|arg| build_term(logic, variables, arg))
                .collect::<Result<Vec<_>, _>>()?;
            apply_op(symbol, indices, args)
        }
        Identifier::Leaf(name) => build_leaf(logic, variables, name),
    }
}

fn build_leaf(
    logic: Logic,
    variables: &IndexMap<String, Variable>,
    name: &str,
) -> Result<Term, TranslateError> {
    if let Some(v) = variables.get(name) {
        return Ok(Term::var(v.clone()));
    }
    if let Some(base) = name.strip_suffix('\'') {
        let v = variables
            .get(base)
            .ok_or_else(|| TranslateError::UnknownIdentifier(name.to_string()))?;
        return Ok(Term::var(next_var(v)));
    }
    match name {
        "true" => return Ok(Term::bool(true)),
        "false" => return Ok(Term::bool(false)),
        _ => {}
    }
    if logic.is_bv() && name.starts_with('#') {
        return bv_literal(name);
    }
    if logic.is_real() {
        return parse_decimal(name)
            .map(Term::real)
            .ok_or_else(|| TranslateError::InvalidNumeral(name.to_string(), logic));
    }
    if logic.is_int() {
        return name
            .parse::<i64>()
            .map(Term::int)
            .map_err(|_| TranslateError::InvalidNumeral(name.to_string(), logic));
    }
    Err(TranslateError::UnknownIdentifier(name.to_string()))
}

fn bv_literal(token: &str) -> Result<Term, TranslateError> {
    let invalid = || TranslateError::InvalidBvLiteral(token.to_string());
    if let Some(bin) = token.strip_prefix("#b") {
        if bin.is_empty() || bin.len() > 64 {
            return Err(invalid());
        }
        let bits = u64::from_str_radix(bin, 2).map_err(|_| invalid())?;
        Ok(Term::bv(bits, bin.len() as u32))
    } else if let Some(hex) = token.strip_prefix("#x") {
        if hex.is_empty() || hex.len() > 16 {
            return Err(invalid());
        }
        let bits = u64::from_str_radix(hex, 16).map_err(|_| invalid())?;
        Ok(Term::bv(bits, 4 * hex.len() as u32))
    } else {
        Err(invalid())
    }
}

fn parse_decimal(token: &str) -> Option<BigRational> {
    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let value = if let Some((int_part, frac_part)) = digits.split_once('.') {
        if frac_part.is_empty() {
            BigRational::from_integer(BigInt::from_str_radix(int_part, 10).ok()?)
        } else {
            let numer = BigInt::from_str_radix(&format!("{int_part}{frac_part}"), 10).ok()?;
            let denom = BigInt::from(10u32).pow(frac_part.len() as u32);
            BigRational::new(numer, denom)
        }
    } else {
        BigRational::from_integer(BigInt::from_str_radix(digits, 10).ok()?)
    };
    Some(if negative { -value } else { value })
}

fn exact<const N: usize>(
    op: &str,
    args: Vec<Term>,
) -> Result<[Term; N], TranslateError> {
    let found = args.len();
    args.try_into().map_err(|_| TranslateError::BadArity {
        op: op.to_string(),
        expected: N,
        found,
    })
}

fn one_index(op: &str, indices: &[u64]) -> Result<u64, TranslateError> {
    match indices {
        [index] => Ok(*index),
        _ => Err(TranslateError::BadIndices {
            op: op.to_string(),
            expected: 1,
            found: indices.len(),
        }),
    }
}

/// Operator dispatch: the only place operator names exist as strings.
fn apply_op(symbol: &str, indices: &[u64], args: Vec<Term>) -> Result<Term, TranslateError> {
    let term = match symbol {
        "const" => {
            let [value] = exact::<1>(symbol, args)?;
            value
        }

        // Boolean connectives
        "true" => Term::bool(true),
        "false" => Term::bool(false),
        "not" => {
            let [a] = exact::<1>(symbol, args)?;
            a.not()
        }
        "=>" => {
            let [a, b] = exact::<2>(symbol, args)?;
            a.implies(b)
        }
        "and" => Term::and(args),
        "or" => Term::or(args),
        "xor" => {
            let [a, b] = exact::<2>(symbol, args)?;
            Term::App(Op::Xor, vec![a, b])
        }
        "=" => {
            let [a, b] = exact::<2>(symbol, args)?;
            a.eq(b)
        }
        "distinct" => {
            let [a, b] = exact::<2>(symbol, args)?;
            a.neq(b)
        }
        "ite" => {
            let [c, t, e] = exact::<3>(symbol, args)?;
            c.ite(t, e)
        }

        // Integer/real arithmetic
        "-" => match args.len() {
            1 => {
                let [a] = exact::<1>(symbol, args)?;
                Term::App(Op::Neg, vec![a])
            }
            _ => {
                let [a, b] = exact::<2>(symbol, args)?;
                a.sub(b)
            }
        },
        "+" => {
            let [a, b] = exact::<2>(symbol, args)?;
            a.add(b)
        }
        "*" => {
            let [a, b] = exact::<2>(symbol, args)?;
            a.mul(b)
        }
        "/" => {
            let [a, b] = exact::<2>(symbol, args)?;
            Term::App(Op::Div, vec![a, b])
        }
        "div" => {
            let [a, b] = exact::<2>(symbol, args)?;
            Term::App(Op::IntDiv, vec![a, b])
        }
        "mod" => {
            let [a, b] = exact::<2>(symbol, args)?;
            Term::App(Op::Mod, vec![a, b])
        }
        "abs" => {
            let [a] = exact::<1>(symbol, args)?;
            Term::App(Op::Abs, vec![a])
        }
        "divisible" => {
            let n = one_index(symbol, indices)?;
            let [a] = exact::<1>(symbol, args)?;
            Term::App(Op::Divisible(n), vec![a])
        }
        "<=" => {
            let [a, b] = exact::<2>(symbol, args)?;
            a.le(b)
        }
        "<" => {
            let [a, b] = exact::<2>(symbol, args)?;
            a.lt(b)
        }
        ">=" => {
            let [a, b] = exact::<2>(symbol, args)?;
            a.ge(b)
        }
        ">" => {
            let [a, b] = exact::<2>(symbol, args)?;
            a.gt(b)
        }
        "to_real" => {
            let [a] = exact::<1>(symbol, args)?;
            Term::App(Op::ToReal, vec![a])
        }
        "to_int" => {
            let [a] = exact::<1>(symbol, args)?;
            Term::App(Op::ToInt, vec![a])
        }
        "is_int" => {
            let [a] = exact::<1>(symbol, args)?;
            Term::App(Op::IsInt, vec![a])
        }

        // Bit-vectors; nand/nor/xnor/smod are lowered to their
        // definitions here so the core operator set stays primitive.
        "bvadd" => bv_binary(symbol, Op::BvAdd, args)?,
        "bvsub" => bv_binary(symbol, Op::BvSub, args)?,
        "bvmul" => bv_binary(symbol, Op::BvMul, args)?,
        "bvudiv" => bv_binary(symbol, Op::BvUdiv, args)?,
        "bvsdiv" => bv_binary(symbol, Op::BvSdiv, args)?,
        "bvurem" => bv_binary(symbol, Op::BvUrem, args)?,
        "bvsrem" => bv_binary(symbol, Op::BvSrem, args)?,
        "bvand" => bv_binary(symbol, Op::BvAnd, args)?,
        "bvor" => bv_binary(symbol, Op::BvOr, args)?,
        "bvxor" => bv_binary(symbol, Op::BvXor, args)?,
        "bvshl" => bv_binary(symbol, Op::BvShl, args)?,
        "bvlshr" => bv_binary(symbol, Op::BvLshr, args)?,
        "bvashr" => bv_binary(symbol, Op::BvAshr, args)?,
        "bvult" => bv_binary(symbol, Op::BvUlt, args)?,
        "bvule" => bv_binary(symbol, Op::BvUle, args)?,
        "bvugt" => bv_binary(symbol, Op::BvUgt, args)?,
        "bvuge" => bv_binary(symbol, Op::BvUge, args)?,
        "bvslt" => bv_binary(symbol, Op::BvSlt, args)?,
        "bvsle" => bv_binary(symbol, Op::BvSle, args)?,
        "bvsgt" => bv_binary(symbol, Op::BvSgt, args)?,
        "bvsge" => bv_binary(symbol, Op::BvSge, args)?,
        "concat" => bv_binary(symbol, Op::Concat, args)?,
        "bvnot" => {
            let [a] = exact::<1>(symbol, args)?;
            Term::App(Op::BvNot, vec![a])
        }
        "bvneg" => {
            let [a] = exact::<1>(symbol, args)?;
            Term::App(Op::BvNeg, vec![a])
        }
        "bvnand" => {
            let [a, b] = exact::<2>(symbol, args)?;
            Term::App(Op::BvNot, vec![Term::App(Op::BvAnd, vec![a, b])])
        }
        "bvnor" => {
            let [a, b] = exact::<2>(symbol, args)?;
            Term::App(Op::BvNot, vec![Term::App(Op::BvOr, vec![a, b])])
        }
        "bvxnor" => {
            let [a, b] = exact::<2>(symbol, args)?;
            Term::App(Op::BvNot, vec![Term::App(Op::BvXor, vec![a, b])])
        }
        "bvsmod" => {
            // a - b * (a udiv b)
            let [a, b] = exact::<2>(symbol, args)?;
            let quotient = Term::App(Op::BvUdiv, vec![a.clone(), b.clone()]);
            Term::App(
                Op::BvSub,
                vec![a, Term::App(Op::BvMul, vec![b, quotient])],
            )
        }
        "extract" => {
            let (high, low) = match indices {
                [high, low] => (*high as u32, *low as u32),
                _ => {
                    return Err(TranslateError::BadIndices {
                        op: symbol.to_string(),
                        expected: 2,
                        found: indices.len(),
                    })
                }
            };
            let [a] = exact::<1>(symbol, args)?;
            Term::App(Op::Extract { high, low }, vec![a])
        }
        "zero_extend" => {
            let n = one_index(symbol, indices)? as u32;
            let [a] = exact::<1>(symbol, args)?;
            Term::App(Op::ZeroExtend(n), vec![a])
        }
        "sign_extend" => {
            let n = one_index(symbol, indices)? as u32;
            let [a] = exact::<1>(symbol, args)?;
            Term::App(Op::SignExtend(n), vec![a])
        }
        "rotate_left" => {
            let n = one_index(symbol, indices)? as u32;
            let [a] = exact::<1>(symbol, args)?;
            Term::App(Op::RotateLeft(n), vec![a])
        }
        "rotate_right" => {
            let n = one_index(symbol, indices)? as u32;
            let [a] = exact::<1>(symbol, args)?;
            Term::App(Op::RotateRight(n), vec![a])
        }

        // Arrays
        "select" => {
            let [a, i] = exact::<2>(symbol, args)?;
            Term::App(Op::Select, vec![a, i])
        }
        "store" => {
            let [a, i, v] = exact::<3>(symbol, args)?;
            Term::App(Op::Store, vec![a, i, v])
        }

        other => return Err(TranslateError::UnknownSymbol(other.to_string())),
    };
    Ok(term)
}

fn bv_binary(symbol: &str, op: Op, args: Vec<Term>) -> Result<Term, TranslateError> {
    let [a, b] = exact::<2>(symbol, args)?;
    Ok(Term::App(op, vec![a, b]))
}
